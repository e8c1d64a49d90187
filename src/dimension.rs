use super::{record::DimensionRecord, Error};

/// A name/value pair qualifying a [Metric](super::Metric), i.e. `Region=us-east-1`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    value: String,
}

impl Dimension {
    /// Fails with [Error::InvalidArgument] if `name` is empty
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument("dimension name must not be empty".into()));
        }

        Ok(Self {
            name,
            value: value.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn to_record(&self) -> DimensionRecord<'_> {
        DimensionRecord {
            name: &self.name,
            value: &self.value,
        }
    }
}
