//! # metrics_cloudwatch_buffer
//!
//! Buffers named metrics for the lifetime of a unit of work (usually one web request) and
//! flushes them to CloudWatch or a log sink, either explicitly via [Registry::send] or when the
//! [Registry] is shut down or dropped.
//!
//! # Example
//! ```
//! let mut metrics = metrics_cloudwatch_buffer::Builder::new()
//!     .enabled(true)
//!     .output(metrics_cloudwatch_buffer::Output::Log)
//!     .build()
//!     .unwrap();
//!
//! let region = metrics.dimension("Region", "us-east-1").unwrap();
//! metrics.on("requests").add_value(1.0).add_dimension(region);
//! metrics.send().unwrap();
//! ```

/// Error type returned by the dispatch collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub use {
    builder::Builder,
    dimension::Dimension,
    emf::EmfEmitter,
    error::Error,
    metric::{Metric, StatisticSet},
    output::{CloudWatch, LogSink, Output, TracingLog, WriterLog},
    record::{DimensionRecord, MetricDatum},
    registry::Registry,
};

mod builder;
mod dimension;
mod emf;
mod error;
mod metric;
mod output;
mod record;
mod registry;
#[cfg(test)]
mod test;
