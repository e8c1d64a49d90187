//! # EMF
//!
//! [CloudWatch] client that writes CloudWatch Embedded Metrics documents instead of calling the API,
//! for hosts (Lambda, ECS with the CloudWatch agent) that ingest metrics from stdout
//!
//! <https://docs.aws.amazon.com/AmazonCloudWatch/latest/monitoring/CloudWatch_Embedded_Metric_Format_Specification.html>

use super::{BoxError, CloudWatch, MetricDatum};
use serde::Serialize;
use serde_json::value::Value;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

/// The Embedded Metric Format supports a maximum of 100 values per key
const MAX_VALUES_PER_KEY: usize = 100;

#[derive(Serialize)]
struct EmbeddedMetrics<'a> {
    #[serde(rename = "_aws")]
    aws: EmbeddedMetricsAws<'a>,
    #[serde(flatten)]
    dimensions: BTreeMap<&'a str, &'a str>,
    #[serde(flatten)]
    values: BTreeMap<&'a str, Value>,
}

#[derive(Serialize)]
struct EmbeddedMetricsAws<'a> {
    #[serde(rename = "Timestamp")]
    timestamp: u64,
    // Every document carries exactly one namespace
    #[serde(rename = "CloudWatchMetrics")]
    cloudwatch_metrics: [EmbeddedNamespace<'a>; 1],
}

#[derive(Serialize)]
struct EmbeddedNamespace<'a> {
    #[serde(rename = "Namespace")]
    namespace: &'a str,
    // A single dimension set holding all dimensions of the document
    #[serde(rename = "Dimensions")]
    dimensions: [Vec<&'a str>; 1],
    #[serde(rename = "Metrics")]
    metrics: Vec<EmbeddedMetric<'a>>,
}

#[derive(Serialize)]
struct EmbeddedMetric<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Unit")]
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
}

/// Writes one EMF document per distinct dimension set, one document per line
///
/// * A metric with a single value is written as a number, several values as an array
/// * Values past the 100th spill into further documents with the same dimensions
/// * A metric holding a statistic set is written as an object of its statistics
/// * Metrics without any value, or named like one of their dimensions, are skipped
pub struct EmfEmitter<W> {
    writer: W,
    timestamp: Option<u64>,
}

impl<W: std::io::Write> EmfEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, timestamp: None }
    }

    /// Use a fixed timestamp (milliseconds since the epoch) instead of the current time
    pub fn with_timestamp(self, timestamp: u64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn timestamp(&self) -> u64 {
        match self.timestamp {
            Some(t) => t,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
    }
}

impl<W: std::io::Write> CloudWatch for EmfEmitter<W> {
    fn put_metric_data(&mut self, namespace: &str, data: &[MetricDatum<'_>]) -> Result<(), BoxError> {
        let timestamp = self.timestamp();

        // Group by dimension set, keeping the first-seen order of the sets
        let mut groups: Vec<(Vec<(&str, &str)>, Vec<&MetricDatum<'_>>)> = Vec::new();
        for datum in data {
            let key: Vec<(&str, &str)> = datum.dimensions.iter().map(|d| (d.name, d.value)).collect();
            match groups.iter_mut().find(|(dimensions, _)| *dimensions == key) {
                Some((_, members)) => members.push(datum),
                None => groups.push((key, vec![datum])),
            }
        }

        for (dimensions, members) in &groups {
            // Per metric, the value written into each successive document
            let mut pending: Vec<(&str, Option<&str>, Vec<Value>)> = Vec::with_capacity(members.len());
            for datum in members {
                if dimensions.iter().any(|(name, _)| *name == datum.name) {
                    error!("Unable to emit metric {} as a dimension has the same name", datum.name);
                    continue;
                }

                let values: Vec<Value> = match (datum.values, &datum.statistics) {
                    (_, Some(statistics)) => vec![serde_json::to_value(statistics)?],
                    (Some([value]), None) => vec![Value::from(*value)],
                    (Some(values), None) => values
                        .chunks(MAX_VALUES_PER_KEY)
                        .map(|chunk| Value::from(chunk.to_vec()))
                        .collect(),
                    (None, None) => Vec::new(),
                };

                if !values.is_empty() {
                    pending.push((datum.name, datum.unit, values));
                }
            }

            let documents = pending.iter().map(|(_, _, values)| values.len()).max().unwrap_or(0);
            for document in 0..documents {
                let mut emf = EmbeddedMetrics {
                    aws: EmbeddedMetricsAws {
                        timestamp,
                        cloudwatch_metrics: [EmbeddedNamespace {
                            namespace,
                            dimensions: [dimensions.iter().map(|(name, _)| *name).collect()],
                            metrics: Vec::with_capacity(pending.len()),
                        }],
                    },
                    dimensions: dimensions.iter().copied().collect(),
                    values: BTreeMap::new(),
                };

                for (name, unit, values) in &pending {
                    if let Some(value) = values.get(document) {
                        emf.aws.cloudwatch_metrics[0]
                            .metrics
                            .push(EmbeddedMetric { name: *name, unit: *unit });
                        emf.values.insert(*name, value.clone());
                    }
                }

                serde_json::to_writer(&mut self.writer, &emf)?;
                writeln!(self.writer)?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }
}
