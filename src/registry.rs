//! # Registry
//!
//! Per unit of work metrics buffer returned from metrics_cloudwatch_buffer::Builder

use super::{CloudWatch, Dimension, Error, LogSink, Metric, MetricDatum, Output};
use std::collections::BTreeMap;
use std::panic::Location;
use tracing::{debug, error};

/// Dispatch route with its collaborator
pub(crate) enum Sink {
    CloudWatch {
        namespace: String,
        client: Box<dyn CloudWatch>,
    },
    Log(Box<dyn LogSink>),
}

impl Sink {
    fn output(&self) -> Output {
        match self {
            Sink::CloudWatch { .. } => Output::CloudWatch,
            Sink::Log(_) => Output::Log,
        }
    }
}

/// Configuration via Builder
pub(crate) struct Config {
    pub enabled: bool,
    pub send_on_shutdown: bool,
    pub throw_on_fail: bool,
    pub sink: Sink,
}

/// Buffers metrics by name until [send](Registry::send) or shutdown
///
/// Use [Builder](super::Builder) to construct. A registry belongs to a single unit of work, create
/// one per request rather than sharing one between threads.
///
/// # Example
/// ```
/// let mut metrics = metrics_cloudwatch_buffer::Builder::new()
///     .enabled(true)
///     .output(metrics_cloudwatch_buffer::Output::CloudWatch)
///     .cloudwatch_namespace("MyApplication")
///     .send_on_shutdown(true)
///     .build()
///     .unwrap();
///
/// metrics.on("requests").with_unit(metrics::Unit::Count).add_value(1.0);
///
/// // Flushed here, as an EMF document on stdout
/// drop(metrics);
/// ```
pub struct Registry {
    metrics: BTreeMap<String, Metric>,
    enabled: bool,
    send_on_shutdown: bool,
    throw_on_fail: bool,
    sink: Sink,
}

impl Registry {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            metrics: BTreeMap::new(),
            enabled: config.enabled,
            send_on_shutdown: config.send_on_shutdown,
            throw_on_fail: config.throw_on_fail,
            sink: config.sink,
        }
    }

    /// Returns the metric called `name`, creating it on first use
    /// * Repeated calls return the same metric until the next send() or clear()
    pub fn on(&mut self, name: impl Into<String>) -> &mut Metric {
        let name = name.into();
        self.metrics
            .entry(name)
            .or_insert_with_key(|name| Metric::new(name.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Convenience for [Dimension::new]
    pub fn dimension(&self, name: impl Into<String>, value: impl Into<String>) -> Result<Dimension, Error> {
        Dimension::new(name, value)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    pub fn set_send_on_shutdown(&mut self, send_on_shutdown: bool) -> &mut Self {
        self.send_on_shutdown = send_on_shutdown;
        self
    }

    pub fn set_throw_on_fail(&mut self, throw_on_fail: bool) -> &mut Self {
        self.throw_on_fail = throw_on_fail;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn output(&self) -> Output {
        self.sink.output()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Serialized form of every buffered metric, in name order
    pub fn records(&self) -> Vec<MetricDatum<'_>> {
        self.metrics.values().map(Metric::to_record).collect()
    }

    /// Discard all buffered metrics
    pub fn clear(&mut self) -> &mut Self {
        self.metrics.clear();
        self
    }

    /// Dispatch every buffered metric to the configured output, then clear the buffer
    ///
    /// * Does nothing while disabled or empty
    /// * Stops at the first failing dispatch, the remaining metrics are dropped
    /// * Failures are returned when throw_on_fail is set, otherwise logged and swallowed
    #[track_caller]
    pub fn send(&mut self) -> Result<(), Error> {
        if !self.enabled || self.metrics.is_empty() {
            return Ok(());
        }

        let location = Location::caller();
        let result = self.dispatch(location);
        debug!(output = %self.output(), count = self.metrics.len(), "cleared metrics buffer");
        self.clear();

        match result {
            Err(err) if !self.throw_on_fail => {
                error!("{}", err.report());
                Ok(())
            }
            result => result,
        }
    }

    fn dispatch(&mut self, location: &'static Location<'static>) -> Result<(), Error> {
        let records: Vec<MetricDatum<'_>> = self.metrics.values().map(Metric::to_record).collect();
        let output = self.sink.output();
        let failed = |source| Error::Dispatch {
            output,
            location,
            source,
        };

        match &mut self.sink {
            Sink::CloudWatch { namespace, client } => client.put_metric_data(namespace, &records).map_err(failed),
            Sink::Log(sink) => records.iter().try_for_each(|record| sink.log(record).map_err(failed)),
        }
    }

    /// Flush if send_on_shutdown is set, consuming the registry
    #[track_caller]
    pub fn shutdown(mut self) -> Result<(), Error> {
        if self.send_on_shutdown {
            self.send()
        } else {
            Ok(())
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if self.send_on_shutdown {
            if let Err(err) = self.send() {
                error!("{}", err.report());
            }
        }
    }
}
