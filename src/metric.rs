//! # Metric
//!
//! Accumulator for a single named measurement series

use super::{
    record::{self, MetricDatum},
    Dimension,
};
use serde::Serialize;

/// The CloudWatch API accepts at most 30 dimensions per metric
const MAX_DIMENSIONS: usize = 30;

/// Pre-aggregated measurements, sent instead of individual values
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatisticSet {
    #[serde(rename = "SampleCount")]
    pub sample_count: f64,
    #[serde(rename = "Sum")]
    pub sum: f64,
    #[serde(rename = "Minimum")]
    pub minimum: f64,
    #[serde(rename = "Maximum")]
    pub maximum: f64,
}

impl StatisticSet {
    pub fn is_finite(&self) -> bool {
        [self.sample_count, self.sum, self.minimum, self.maximum]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Fold a single measurement into the set
    pub fn record(&mut self, value: f64) {
        self.sample_count += 1.0;
        self.sum += value;
        self.minimum = self.minimum.min(value);
        self.maximum = self.maximum.max(value);
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Measurements {
    Values(Vec<f64>),
    Statistics(StatisticSet),
}

/// A named metric owned by a [Registry](super::Registry)
///
/// # Example
/// ```
/// use metrics_cloudwatch_buffer::{Dimension, Metric};
///
/// let mut metric = Metric::new("latency");
/// metric
///     .with_unit(metrics::Unit::Milliseconds)
///     .add_value(12.5)
///     .add_dimension(Dimension::new("Route", "/users").unwrap());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    name: String,
    unit: Option<metrics::Unit>,
    measurements: Measurements,
    dimensions: Vec<Dimension>,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            measurements: Measurements::Values(Vec::new()),
            dimensions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&metrics::Unit> {
        self.unit.as_ref()
    }

    /// Recorded values, empty when the metric holds a [StatisticSet]
    pub fn values(&self) -> &[f64] {
        match &self.measurements {
            Measurements::Values(values) => values,
            Measurements::Statistics(_) => &[],
        }
    }

    pub fn statistics(&self) -> Option<&StatisticSet> {
        match &self.measurements {
            Measurements::Values(_) => None,
            Measurements::Statistics(statistics) => Some(statistics),
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn with_unit(&mut self, unit: metrics::Unit) -> &mut Self {
        self.unit = Some(unit);
        self
    }

    /// Appends a measurement
    /// * If a [StatisticSet] was set, the value is folded into it instead
    /// * NaN and infinite values are dropped with an error log, CloudWatch rejects them
    pub fn add_value(&mut self, value: f64) -> &mut Self {
        if !value.is_finite() {
            tracing::error!("Unable to record {value} for {} as it is not a finite number", self.name);
            return self;
        }

        match &mut self.measurements {
            Measurements::Values(values) => values.push(value),
            Measurements::Statistics(statistics) => statistics.record(value),
        }
        self
    }

    /// Replaces any recorded values with a pre-aggregated set
    /// * A set holding NaN or infinite fields is dropped with an error log
    pub fn set_statistics(&mut self, statistics: StatisticSet) -> &mut Self {
        if !statistics.is_finite() {
            tracing::error!("Unable to record statistics for {} as they are not all finite", self.name);
            return self;
        }

        self.measurements = Measurements::Statistics(statistics);
        self
    }

    /// Attaches a dimension
    /// * A dimension with the same name is replaced in place (last write wins)
    /// * Metrics can have no more than 30 dimensions, extras are dropped with an error log
    pub fn add_dimension(&mut self, dimension: Dimension) -> &mut Self {
        if let Some(existing) = self.dimensions.iter_mut().find(|d| d.name() == dimension.name()) {
            *existing = dimension;
        } else if self.dimensions.len() < MAX_DIMENSIONS {
            self.dimensions.push(dimension);
        } else {
            tracing::error!(
                "Unable to add dimension {} to {} as it already has {MAX_DIMENSIONS} dimensions",
                dimension.name(),
                self.name
            );
        }
        self
    }

    /// Backend-ready record borrowing from this metric
    pub fn to_record(&self) -> MetricDatum<'_> {
        let (values, statistics) = match &self.measurements {
            Measurements::Values(values) => (Some(values.as_slice()), None),
            Measurements::Statistics(statistics) => (None, Some(*statistics)),
        };

        MetricDatum {
            name: &self.name,
            unit: self.unit.as_ref().map(record::unit_to_str),
            values,
            statistics,
            dimensions: self.dimensions.iter().map(Dimension::to_record).collect(),
        }
    }
}
