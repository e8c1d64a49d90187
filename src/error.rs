use super::{BoxError, Output};
use std::panic::Location;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// A dispatch collaborator failed, `location` is where [send](super::Registry::send) was called
    #[error("{source}")]
    Dispatch {
        output: Output,
        location: &'static Location<'static>,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Message in the form `<backend>: <error message> on <file> line <line>`
    pub fn report(&self) -> String {
        match self {
            Error::Dispatch {
                output,
                location,
                source,
            } => format!("{output}: {source} on {} line {}", location.file(), location.line()),
            other => other.to_string(),
        }
    }
}
