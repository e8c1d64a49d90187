use metrics_cloudwatch_buffer::{Builder, Error};

/// Stand-in for a request handler, records into a registry owned by the request
fn handle_request(route: &str, elapsed_ms: f64) -> Result<(), Error> {
    // e.g. METRICS_BUFFER_ENABLED=true METRICS_BUFFER_OUTPUT=log METRICS_BUFFER_SEND_ON_SHUTDOWN=true
    let mut metrics = Builder::from_env()?.build()?;

    let route = metrics.dimension("Route", route)?;
    metrics
        .on("requests")
        .with_unit(metrics::Unit::Count)
        .add_value(1.0)
        .add_dimension(route.clone());
    metrics
        .on("latency")
        .with_unit(metrics::Unit::Milliseconds)
        .add_value(elapsed_ms)
        .add_dimension(route);

    tracing::info!(buffered = metrics.len(), enabled = metrics.is_enabled(), "request handled");

    // Sends only if send_on_shutdown is set
    metrics.shutdown()
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .compact()
        .init();

    handle_request("/users", 12.5)?;
    handle_request("/orders", 48.0)
}
