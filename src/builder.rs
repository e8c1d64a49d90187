use super::{registry, CloudWatch, EmfEmitter, Error, LogSink, Output, TracingLog};

/// Builder for the metrics [Registry](super::Registry)
///
/// # Example
/// ```
///  let metrics = metrics_cloudwatch_buffer::Builder::new()
///      .enabled(true)
///      .output(metrics_cloudwatch_buffer::Output::CloudWatch)
///      .cloudwatch_namespace("MyApplication")
///      .build()
///      .unwrap();
/// ```
pub struct Builder {
    enabled: bool,
    send_on_shutdown: bool,
    throw_on_fail: bool,
    output: Option<Output>,
    cloudwatch_namespace: Option<String>,
    cloudwatch_client: Option<Box<dyn CloudWatch>>,
    log_sink: Option<Box<dyn LogSink>>,
    timestamp: Option<u64>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            enabled: false,
            send_on_shutdown: false,
            throw_on_fail: false,
            output: None,
            cloudwatch_namespace: None,
            cloudwatch_client: None,
            log_sink: None,
            timestamp: None,
        }
    }

    /// Reads configuration from the environment
    ///
    /// | Variable | Setter |
    /// |---|---|
    /// | `METRICS_BUFFER_ENABLED` | [Builder::enabled] |
    /// | `METRICS_BUFFER_SEND_ON_SHUTDOWN` | [Builder::send_on_shutdown] |
    /// | `METRICS_BUFFER_THROW_ON_FAIL` | [Builder::throw_on_fail] |
    /// | `METRICS_BUFFER_OUTPUT` | [Builder::output] (`cloudwatch`, `cloud` or `log`) |
    /// | `METRICS_BUFFER_NAMESPACE` | [Builder::cloudwatch_namespace] |
    ///
    /// Unset variables keep their defaults, malformed ones fail with [Error::Configuration]
    pub fn from_env() -> Result<Self, Error> {
        let mut builder = Self::new();

        if let Some(enabled) = env_bool("METRICS_BUFFER_ENABLED")? {
            builder.enabled = enabled;
        }
        if let Some(send_on_shutdown) = env_bool("METRICS_BUFFER_SEND_ON_SHUTDOWN")? {
            builder.send_on_shutdown = send_on_shutdown;
        }
        if let Some(throw_on_fail) = env_bool("METRICS_BUFFER_THROW_ON_FAIL")? {
            builder.throw_on_fail = throw_on_fail;
        }
        if let Some(output) = env_var("METRICS_BUFFER_OUTPUT")? {
            builder.output = Some(output.parse()?);
        }
        builder.cloudwatch_namespace = env_var("METRICS_BUFFER_NAMESPACE")?;

        Ok(builder)
    }

    /// Nothing is dispatched while disabled, defaults to false
    pub fn enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    /// Flush when the registry is shut down or dropped, defaults to false
    pub fn send_on_shutdown(self, send_on_shutdown: bool) -> Self {
        Self {
            send_on_shutdown,
            ..self
        }
    }

    /// Return dispatch failures from send() instead of logging them, defaults to false
    pub fn throw_on_fail(self, throw_on_fail: bool) -> Self {
        Self { throw_on_fail, ..self }
    }

    /// Sets the dispatch route
    /// * Must be set or build() will return Err(Configuration("output missing"))
    pub fn output(self, output: Output) -> Self {
        Self {
            output: Some(output),
            ..self
        }
    }

    /// Sets the CloudWatch namespace for all metrics
    /// * Required when output is [Output::CloudWatch]
    pub fn cloudwatch_namespace(self, namespace: impl Into<String>) -> Self {
        Self {
            cloudwatch_namespace: Some(namespace.into()),
            ..self
        }
    }

    /// Client receiving batches for [Output::CloudWatch]
    /// * Defaults to an [EmfEmitter] writing to stdout
    pub fn cloudwatch_client(self, client: impl CloudWatch + 'static) -> Self {
        Self {
            cloudwatch_client: Some(Box::new(client)),
            ..self
        }
    }

    /// Sink receiving records for [Output::Log]
    /// * Defaults to [TracingLog]
    pub fn log_sink(self, sink: impl LogSink + 'static) -> Self {
        Self {
            log_sink: Some(Box::new(sink)),
            ..self
        }
    }

    /// Fixed timestamp for the default [EmfEmitter], mostly useful for tests
    pub fn with_timestamp(self, timestamp: u64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self
        }
    }

    /// Private helper for consuming the builder into registry configuration
    fn config(self) -> Result<registry::Config, Error> {
        let output = self
            .output
            .ok_or_else(|| Error::Configuration("output missing".into()))?;

        let sink = match output {
            Output::CloudWatch => {
                let namespace = self
                    .cloudwatch_namespace
                    .ok_or_else(|| Error::Configuration("cloudwatch_namespace missing".into()))?;
                let client: Box<dyn CloudWatch> = match self.cloudwatch_client {
                    Some(client) => client,
                    None => {
                        let emitter = EmfEmitter::new(std::io::stdout());
                        let emitter = match self.timestamp {
                            Some(timestamp) => emitter.with_timestamp(timestamp),
                            None => emitter,
                        };
                        Box::new(emitter)
                    }
                };
                registry::Sink::CloudWatch { namespace, client }
            }
            Output::Log => registry::Sink::Log(self.log_sink.unwrap_or_else(|| Box::new(TracingLog))),
        };

        Ok(registry::Config {
            enabled: self.enabled,
            send_on_shutdown: self.send_on_shutdown,
            throw_on_fail: self.throw_on_fail,
            sink,
        })
    }

    /// Validate the configuration and construct the registry
    pub fn build(self) -> Result<registry::Registry, Error> {
        Ok(registry::Registry::new(self.config()?))
    }
}

fn env_var(name: &str) -> Result<Option<String>, Error> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::Configuration(format!("{name}: {err}"))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>, Error> {
    let Some(value) = env_var(name)? else {
        return Ok(None);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::Configuration(format!("{name}: expected a boolean, got {value:?}"))),
    }
}
