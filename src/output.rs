//! # Output
//!
//! Dispatch routes for a flushed batch and the collaborators behind them

use super::{BoxError, Error, MetricDatum};
use std::fmt;
use std::str::FromStr;

/// Where [Registry::send](super::Registry::send) delivers buffered metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// One batched call to a [CloudWatch] client
    CloudWatch,
    /// One pretty-printed JSON record per metric to a [LogSink]
    Log,
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::CloudWatch => f.write_str("CloudWatch"),
            Output::Log => f.write_str("Log"),
        }
    }
}

impl FromStr for Output {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloudwatch" | "cloud" => Ok(Output::CloudWatch),
            "log" => Ok(Output::Log),
            other => Err(Error::Configuration(format!("unknown output {other:?}"))),
        }
    }
}

/// Metrics ingestion client, e.g. a wrapper around the AWS SDK `PutMetricData` call
pub trait CloudWatch {
    fn put_metric_data(&mut self, namespace: &str, data: &[MetricDatum<'_>]) -> Result<(), BoxError>;
}

/// Receives one serialized metric at a time
pub trait LogSink {
    fn log(&mut self, record: &MetricDatum<'_>) -> Result<(), BoxError>;
}

/// Default [LogSink], emits each record pretty-printed via [tracing::info!]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&mut self, record: &MetricDatum<'_>) -> Result<(), BoxError> {
        let pretty = serde_json::to_string_pretty(record)?;
        tracing::info!(target: "metrics_cloudwatch_buffer", "{pretty}");
        Ok(())
    }
}

/// [LogSink] writing pretty-printed records to an implementation of [std::io::Write]
pub struct WriterLog<W> {
    writer: W,
}

impl<W: std::io::Write> WriterLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: std::io::Write> LogSink for WriterLog<W> {
    fn log(&mut self, record: &MetricDatum<'_>) -> Result<(), BoxError> {
        serde_json::to_writer_pretty(&mut self.writer, record)?;
        writeln!(self.writer)?;
        Ok(())
    }
}
