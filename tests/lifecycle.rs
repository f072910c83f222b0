//! End-to-end session lifecycle tests against a stub engine.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use kubetunnel::{
    with_async_forward, with_forward, EngineError, Error, ForwardRequest, SessionRegistry,
    TunnelEngine, TunnelSpec,
};

/// Engine stub that records start/stop calls and can be told to fail.
#[derive(Default)]
struct StubEngine {
    fail_start: Option<String>,
    fail_stop: bool,
    starts: Mutex<Vec<TunnelSpec>>,
    stops: Mutex<Vec<(String, String)>>,
}

impl StubEngine {
    fn failing_start(message: &str) -> Self {
        Self {
            fail_start: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn start_count(&self) -> usize {
        self.starts.lock().len()
    }

    fn stop_calls(&self) -> Vec<(String, String)> {
        self.stops.lock().clone()
    }
}

impl TunnelEngine for StubEngine {
    fn start(&self, spec: &TunnelSpec) -> Result<(), EngineError> {
        if let Some(message) = &self.fail_start {
            return Err(EngineError::new(message.clone()));
        }
        self.starts.lock().push(spec.clone());
        Ok(())
    }

    fn stop(&self, namespace: &str, pod: &str) -> Result<(), EngineError> {
        self.stops
            .lock()
            .push((namespace.to_string(), pod.to_string()));
        if self.fail_stop {
            return Err(EngineError::new("stop failed"));
        }
        Ok(())
    }
}

fn request() -> ForwardRequest {
    ForwardRequest::new("test", "web", 9000).startup_settle(Duration::ZERO)
}

#[test]
fn normal_completion_stops_exactly_once() {
    let engine = StubEngine::default();

    let result = with_forward(&engine, request(), || 42).unwrap();

    assert_eq!(result, 42);
    assert_eq!(engine.start_count(), 1);
    assert_eq!(
        engine.stop_calls(),
        vec![("test".to_string(), "web".to_string())]
    );
}

#[test]
fn started_spec_defaults_remote_port_to_local() {
    let engine = StubEngine::default();

    with_forward(&engine, request(), || ()).unwrap();

    let starts = engine.starts.lock();
    assert_eq!(starts[0].local_port(), 9000);
    assert_eq!(starts[0].remote_port(), 9000);
}

#[test]
fn start_failure_surfaces_message_and_skips_stop() {
    let engine = StubEngine::failing_start("pod not found");

    let err = with_forward(&engine, request(), || ()).unwrap_err();

    match err {
        Error::TunnelStartFailed(message) => assert!(message.contains("pod not found")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(engine.stop_calls().is_empty());
}

#[test]
fn validation_failure_never_reaches_engine() {
    let engine = StubEngine::default();

    let err = with_forward(
        &engine,
        ForwardRequest::new("test", "a/b", 9000).startup_settle(Duration::ZERO),
        || (),
    )
    .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(engine.start_count(), 0);
    assert!(engine.stop_calls().is_empty());
}

#[test]
fn panicking_work_still_stops_the_tunnel() {
    let engine = StubEngine::default();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        with_forward(&engine, request(), || panic!("boom")).unwrap();
    }));

    assert!(outcome.is_err());
    assert_eq!(engine.start_count(), 1);
    assert_eq!(engine.stop_calls().len(), 1);
}

#[test]
fn work_error_propagates_unchanged_after_stop() {
    let engine = StubEngine::default();

    let result: Result<&str, &str> = with_forward(&engine, request(), || Err("caller error"))
        .unwrap();

    assert_eq!(result, Err("caller error"));
    assert_eq!(engine.stop_calls().len(), 1);
}

#[test]
fn stop_failure_does_not_mask_result() {
    let engine = StubEngine {
        fail_stop: true,
        ..Default::default()
    };

    let result = with_forward(&engine, request(), || 7).unwrap();

    assert_eq!(result, 7);
    assert_eq!(engine.stop_calls().len(), 1);
}

#[tokio::test]
async fn async_variant_matches_sync_outcomes() {
    let engine = StubEngine::default();

    let result = with_async_forward(&engine, request(), async { 42 })
        .await
        .unwrap();

    assert_eq!(result, 42);
    assert_eq!(engine.start_count(), 1);
    assert_eq!(
        engine.stop_calls(),
        vec![("test".to_string(), "web".to_string())]
    );

    let failing = StubEngine::failing_start("pod not found");
    let err = with_async_forward(&failing, request(), async {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TunnelStartFailed(_)));
    assert!(failing.stop_calls().is_empty());
}

#[tokio::test]
async fn cancellation_during_settle_still_stops() {
    let engine = Arc::new(StubEngine::default());

    let task_engine = Arc::clone(&engine);
    let handle = tokio::spawn(async move {
        let request = ForwardRequest::new("test", "web", 9000)
            .startup_settle(Duration::from_secs(60));
        with_async_forward(&*task_engine, request, async {}).await
    });

    // Let the task start the tunnel and enter the settle delay.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();
    let join = handle.await;

    assert!(join.unwrap_err().is_cancelled());
    assert_eq!(engine.start_count(), 1);
    assert_eq!(engine.stop_calls().len(), 1);
}

#[tokio::test]
async fn cancellation_during_work_still_stops() {
    let engine = Arc::new(StubEngine::default());

    let task_engine = Arc::clone(&engine);
    let handle = tokio::spawn(async move {
        with_async_forward(&*task_engine, request(), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
        .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();
    let join = handle.await;

    assert!(join.unwrap_err().is_cancelled());
    assert_eq!(engine.stop_calls().len(), 1);
}

#[test]
fn registry_rejects_concurrent_duplicate_session() {
    let engine = StubEngine::default();
    let registry = SessionRegistry::new();

    with_forward_registry_scenario(&engine, &registry);

    // Both tunnels were started; the duplicate was torn down immediately,
    // the outer one at scope exit.
    assert_eq!(engine.start_count(), 2);
    assert_eq!(engine.stop_calls().len(), 2);

    // After release the key is acquirable again.
    registry
        .with_forward(&engine, request(), || ())
        .unwrap();
    assert_eq!(registry.active_count(), 0);
}

fn with_forward_registry_scenario(engine: &StubEngine, registry: &SessionRegistry) {
    registry
        .with_forward(engine, request(), || {
            assert_eq!(registry.active_count(), 1);

            let err = registry.with_forward(engine, request(), || ()).unwrap_err();
            assert!(matches!(err, Error::DuplicateSession { .. }));

            // The duplicate's tunnel was stopped before the error surfaced.
            assert_eq!(engine.stop_calls().len(), 1);
        })
        .unwrap();
}

#[tokio::test]
async fn registry_async_duplicate_and_reacquire() {
    let engine = StubEngine::default();
    let registry = SessionRegistry::new();

    registry
        .with_async_forward(&engine, request(), async {
            let err = registry
                .with_async_forward(&engine, request(), async {})
                .await
                .unwrap_err();
            assert!(matches!(err, Error::DuplicateSession { .. }));
        })
        .await
        .unwrap();

    // Released; the same key is usable again.
    registry
        .with_async_forward(&engine, request(), async {})
        .await
        .unwrap();
}
