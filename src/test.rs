use super::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    /// Records every batch as JSON, or fails every call when `fail` is set
    #[derive(Clone, Default)]
    struct MockCloudWatch {
        calls: Rc<RefCell<Vec<(String, Value)>>>,
        fail: bool,
    }

    impl CloudWatch for MockCloudWatch {
        fn put_metric_data(&mut self, namespace: &str, data: &[MetricDatum<'_>]) -> Result<(), BoxError> {
            if self.fail {
                return Err("throttled".into());
            }
            self.calls
                .borrow_mut()
                .push((namespace.to_owned(), serde_json::to_value(data)?));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockLog {
        records: Rc<RefCell<Vec<Value>>>,
        attempts: Rc<RefCell<usize>>,
        fail_on: Option<usize>,
    }

    impl LogSink for MockLog {
        fn log(&mut self, record: &MetricDatum<'_>) -> Result<(), BoxError> {
            let attempt = {
                let mut attempts = self.attempts.borrow_mut();
                *attempts += 1;
                *attempts
            };
            if self.fail_on == Some(attempt) {
                return Err("disk full".into());
            }
            self.records.borrow_mut().push(serde_json::to_value(record)?);
            Ok(())
        }
    }

    /// tracing writer capturing output for assertions
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, captured.contents())
    }

    fn log_registry(sink: MockLog) -> Registry {
        Builder::new().enabled(true).output(Output::Log).log_sink(sink).build().unwrap()
    }

    fn cloudwatch_registry(client: MockCloudWatch) -> Registry {
        Builder::new()
            .enabled(true)
            .output(Output::CloudWatch)
            .cloudwatch_namespace("MyApplication")
            .cloudwatch_client(client)
            .build()
            .unwrap()
    }

    #[test]
    fn on_returns_same_metric() {
        let mut metrics = log_registry(MockLog::default());

        let first: *const Metric = metrics.on("requests");
        let second: *const Metric = metrics.on("requests");
        assert!(std::ptr::eq(first, second));

        metrics.on("requests").add_value(1.0);
        metrics.on("requests").add_value(2.0);
        assert_eq!(metrics.get("requests").unwrap().values(), &[1.0, 2.0]);
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn distinct_names_do_not_collide() {
        let mut metrics = log_registry(MockLog::default());

        metrics.on("a").add_value(1.0);
        metrics.on("b").add_value(2.0);

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.get("a").unwrap().values(), &[1.0]);
        assert_eq!(metrics.get("b").unwrap().values(), &[2.0]);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut metrics = log_registry(MockLog::default());
        metrics.on("a");
        metrics.clear().clear();
        assert!(metrics.is_empty());
    }

    #[test]
    fn dimension_factory() {
        let metrics = log_registry(MockLog::default());
        assert_eq!(metrics.dimension("Region", "x").unwrap(), Dimension::new("Region", "x").unwrap());
        assert!(matches!(metrics.dimension("", "x"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn send_empty_is_noop() {
        let sink = MockLog::default();
        let mut metrics = log_registry(sink.clone());

        metrics.send().unwrap();
        assert_eq!(*sink.attempts.borrow(), 0);
    }

    #[test]
    fn send_disabled_is_noop() {
        let sink = MockLog::default();
        let mut metrics = log_registry(sink.clone());
        metrics.set_enabled(false).on("requests").add_value(1.0);

        metrics.send().unwrap();
        assert_eq!(*sink.attempts.borrow(), 0);
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn send_to_log() {
        let sink = MockLog::default();
        let mut metrics = log_registry(sink.clone());

        metrics.on("requests").add_value(1.0);
        metrics.send().unwrap();

        assert_eq!(
            *sink.records.borrow(),
            vec![json!({"MetricName": "requests", "Values": [1.0], "Dimensions": []})]
        );
        assert!(metrics.is_empty());
    }

    #[test]
    fn send_to_tracing_log() {
        let mut metrics = Builder::new().enabled(true).output(Output::Log).build().unwrap();
        let region = metrics.dimension("Region", "us-east-1").unwrap();
        metrics.on("requests").add_value(1.0).add_dimension(region);

        let (result, logs) = capture_logs(|| metrics.send());
        result.unwrap();

        assert!(logs.contains(r#""MetricName": "requests""#), "{logs}");
        assert!(logs.contains(r#""Value": "us-east-1""#), "{logs}");
    }

    #[test]
    fn send_to_cloudwatch_is_batched() {
        let client = MockCloudWatch::default();
        let mut metrics = cloudwatch_registry(client.clone());

        metrics.on("requests").with_unit(metrics::Unit::Count).add_value(1.0);
        metrics.on("latency").with_unit(metrics::Unit::Milliseconds).add_value(12.0);
        metrics.send().unwrap();

        assert_eq!(
            *client.calls.borrow(),
            vec![(
                "MyApplication".to_owned(),
                json!([
                    {"MetricName": "latency", "Unit": "Milliseconds", "Values": [12.0], "Dimensions": []},
                    {"MetricName": "requests", "Unit": "Count", "Values": [1.0], "Dimensions": []}
                ])
            )]
        );
        assert!(metrics.is_empty());
    }

    #[test]
    fn throw_on_fail_stops_dispatch() {
        let sink = MockLog {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut metrics = log_registry(sink.clone());
        metrics.set_throw_on_fail(true);

        metrics.on("a").add_value(1.0);
        metrics.on("b").add_value(2.0);

        let err = metrics.send().err().unwrap();
        assert!(matches!(err, Error::Dispatch { output: Output::Log, .. }));
        assert_eq!(err.to_string(), "disk full");

        assert_eq!(*sink.attempts.borrow(), 1);
        assert!(sink.records.borrow().is_empty());
        assert!(metrics.is_empty());
    }

    #[test]
    fn failure_is_logged_when_not_thrown() {
        let sink = MockLog {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut metrics = log_registry(sink.clone());

        metrics.on("a").add_value(1.0);
        metrics.on("b").add_value(2.0);

        let (result, logs) = capture_logs(|| metrics.send());
        assert!(result.is_ok());

        assert!(logs.contains("Log: disk full on "), "{logs}");
        assert!(logs.contains(&format!("{} line ", file!())), "{logs}");
        assert_eq!(*sink.attempts.borrow(), 1);
        assert!(metrics.is_empty());
    }

    #[test]
    fn cloudwatch_failure_is_returned() {
        let client = MockCloudWatch {
            fail: true,
            ..Default::default()
        };
        let mut metrics = cloudwatch_registry(client.clone());
        metrics.set_throw_on_fail(true).on("requests").add_value(1.0);

        let line = line!() + 1;
        let err = metrics.send().err().unwrap();

        assert_eq!(err.report(), format!("CloudWatch: throttled on {} line {line}", file!()));
        assert!(metrics.is_empty());
    }

    #[test]
    fn shutdown_sends_when_configured() {
        let sink = MockLog::default();
        let mut metrics = log_registry(sink.clone());
        metrics.set_send_on_shutdown(true).on("requests").add_value(1.0);

        metrics.shutdown().unwrap();
        assert_eq!(sink.records.borrow().len(), 1);
    }

    #[test]
    fn shutdown_skips_when_not_configured() {
        let sink = MockLog::default();
        let mut metrics = log_registry(sink.clone());
        metrics.on("requests").add_value(1.0);

        metrics.shutdown().unwrap();
        assert_eq!(*sink.attempts.borrow(), 0);
    }

    #[test]
    fn drop_sends_once() {
        let sink = MockLog::default();
        {
            let mut metrics = log_registry(sink.clone());
            metrics.set_send_on_shutdown(true);
            metrics.on("a").add_value(1.0);
            metrics.on("b").add_value(2.0);
        }
        assert_eq!(*sink.attempts.borrow(), 2);
        assert_eq!(sink.records.borrow()[0]["MetricName"], "a");
        assert_eq!(sink.records.borrow()[1]["MetricName"], "b");
    }

    #[test]
    fn drop_logs_failure() {
        let sink = MockLog {
            fail_on: Some(1),
            ..Default::default()
        };
        let metrics = {
            let mut metrics = log_registry(sink.clone());
            metrics.set_send_on_shutdown(true).set_throw_on_fail(true);
            metrics.on("a").add_value(1.0);
            metrics.on("b").add_value(2.0);
            metrics
        };

        let ((), logs) = capture_logs(|| drop(metrics));

        assert!(logs.contains("Log: disk full on "), "{logs}");
        assert!(logs.contains("registry.rs line "), "{logs}");
        assert_eq!(*sink.attempts.borrow(), 1);
        assert!(sink.records.borrow().is_empty());
    }

    #[test]
    fn default_cloudwatch_client_accepts_batches() {
        let mut metrics = Builder::new()
            .enabled(true)
            .output(Output::CloudWatch)
            .cloudwatch_namespace("MyApplication")
            .with_timestamp(1687657545423)
            .build()
            .unwrap();

        metrics.on("requests").add_value(1.0);
        metrics.send().unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn records_are_in_name_order() {
        let mut metrics = log_registry(MockLog::default());
        metrics.on("zeta");
        metrics.on("alpha").add_value(3.0);

        let names: Vec<&str> = metrics.records().iter().map(|r| r.name).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }
}
