//! Session lifecycle controller.
//!
//! Turns the engine's one-shot start/stop primitives into a safe scoped
//! session: start the tunnel, wait out the settle delay, yield to the
//! caller's work, and stop the tunnel exactly once on every exit path —
//! normal completion, a panic inside the work body, or the surrounding
//! future being cancelled mid-suspension.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::TunnelEngine;
use crate::error::{Error, Result};
use crate::models::{SessionState, TunnelSpec};
use crate::registry::{Registration, SessionRegistry};

/// Runs `work` with a tunnel available, on the caller's thread.
///
/// The settle delay blocks the calling thread. See [`run_session_async`] for
/// the cooperative variant; the two share the same lifecycle guarantees.
pub fn run_session<E, T, F>(engine: &E, spec: TunnelSpec, settle: Duration, work: F) -> Result<T>
where
    E: TunnelEngine + ?Sized,
    F: FnOnce() -> T,
{
    run_session_in(engine, spec, settle, None, work)
}

/// Runs `work` with a tunnel available, suspending cooperatively.
///
/// The settle delay suspends only the current task. Cancelling the returned
/// future — during the settle delay or while `work` is pending — still stops
/// the tunnel before the cancellation completes.
pub async fn run_session_async<E, F>(
    engine: &E,
    spec: TunnelSpec,
    settle: Duration,
    work: F,
) -> Result<F::Output>
where
    E: TunnelEngine + ?Sized,
    F: Future,
{
    run_session_async_in(engine, spec, settle, None, work).await
}

pub(crate) fn run_session_in<E, T, F>(
    engine: &E,
    spec: TunnelSpec,
    settle: Duration,
    registry: Option<&SessionRegistry>,
    work: F,
) -> Result<T>
where
    E: TunnelEngine + ?Sized,
    F: FnOnce() -> T,
{
    let session = Session::start(engine, spec, registry)?;
    std::thread::sleep(settle);
    let output = work();
    session.complete();
    Ok(output)
}

pub(crate) async fn run_session_async_in<E, F>(
    engine: &E,
    spec: TunnelSpec,
    settle: Duration,
    registry: Option<&SessionRegistry>,
    work: F,
) -> Result<F::Output>
where
    E: TunnelEngine + ?Sized,
    F: Future,
{
    let session = Session::start(engine, spec, registry)?;
    tokio::time::sleep(settle).await;
    let output = work.await;
    session.complete();
    Ok(output)
}

// ============================================================================
// Session guard
// ============================================================================

/// A started tunnel session, responsible for its own teardown.
///
/// Dropping the session stops the tunnel; [`Session::complete`] does the same
/// through the success path. The `Stopped` check in [`Session::stop`] makes
/// the teardown run at most once however the session ends.
struct Session<'a, E: TunnelEngine + ?Sized> {
    engine: &'a E,
    spec: TunnelSpec,
    registration: Option<Registration<'a>>,
    state: SessionState,
}

impl<'a, E: TunnelEngine + ?Sized> Session<'a, E> {
    /// Starts the tunnel and, on success, returns a guard owning its
    /// teardown.
    ///
    /// A start failure is translated into [`Error::TunnelStartFailed`] and no
    /// stop call is made — nothing was started. Under a registry, the key is
    /// claimed immediately after the successful start; a duplicate key drops
    /// the guard, which tears the fresh tunnel down through the normal stop
    /// path before the error surfaces.
    fn start(
        engine: &'a E,
        spec: TunnelSpec,
        registry: Option<&'a SessionRegistry>,
    ) -> Result<Self> {
        debug!(
            namespace = spec.namespace(),
            pod = spec.pod(),
            local_port = spec.local_port(),
            remote_port = spec.remote_port(),
            "starting tunnel"
        );

        engine
            .start(&spec)
            .map_err(|e| Error::TunnelStartFailed(e.to_string()))?;

        let mut session = Self {
            engine,
            spec,
            registration: None,
            state: SessionState::Active,
        };

        if let Some(registry) = registry {
            session.registration = Some(registry.acquire(session.spec.key())?);
        }

        Ok(session)
    }

    /// Stops the tunnel through the success path and consumes the session.
    fn complete(mut self) {
        self.stop(SessionState::StoppingAfterSuccess);
    }

    fn stop(&mut self, next: SessionState) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = next;

        debug!(
            namespace = self.spec.namespace(),
            pod = self.spec.pod(),
            state = self.state.as_str(),
            "stopping tunnel"
        );

        // Best effort: a stop failure must not mask the outcome the session
        // already produced.
        if let Err(err) = self.engine.stop(self.spec.namespace(), self.spec.pod()) {
            warn!(
                namespace = self.spec.namespace(),
                pod = self.spec.pod(),
                error = %err,
                "failed to stop tunnel"
            );
        }

        // Deregister under the same all-paths guarantee as the stop itself.
        self.registration.take();

        self.state = SessionState::Stopped;
    }
}

impl<E: TunnelEngine + ?Sized> Drop for Session<'_, E> {
    fn drop(&mut self) {
        self.stop(SessionState::StoppingAfterFailure);
    }
}
