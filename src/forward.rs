//! Scoped acquisition entry points.
//!
//! Two thin wrappers over the session controller: a sequential one whose
//! settle delay blocks the calling thread, and a cooperative one whose settle
//! delay suspends only the current task. They share the same contract — the
//! tunnel is stopped exactly once on every exit path.

use std::future::Future;

use crate::engine::TunnelEngine;
use crate::error::Result;
use crate::models::ForwardRequest;
use crate::session::{run_session, run_session_async};

/// Runs `work` with a tunnel to the requested pod, blocking the calling
/// thread for the settle delay.
///
/// Validation and kubeconfig resolution happen before the engine is touched;
/// a validation failure never reaches the engine. If the engine fails to
/// start, [`Error::TunnelStartFailed`] is returned and no stop call is made.
/// Once started, the tunnel is stopped even if `work` panics.
///
/// ```no_run
/// use kubetunnel::{with_forward, ForwardRequest, KubectlEngine};
///
/// let engine = KubectlEngine::new();
/// with_forward(&engine, ForwardRequest::new("test", "web", 9000), || {
///     // talk to 127.0.0.1:9000
/// })?;
/// # Ok::<(), kubetunnel::Error>(())
/// ```
///
/// [`Error::TunnelStartFailed`]: crate::error::Error::TunnelStartFailed
pub fn with_forward<E, T, F>(engine: &E, request: ForwardRequest, work: F) -> Result<T>
where
    E: TunnelEngine + ?Sized,
    F: FnOnce() -> T,
{
    let settle = request.settle();
    let spec = request.build()?;
    run_session(engine, spec, settle, work)
}

/// Cooperative variant of [`with_forward`].
///
/// The settle delay suspends only the current task. Cancelling the returned
/// future during the settle delay or while `work` is pending still stops the
/// tunnel; outcomes are otherwise identical to the sequential variant for
/// identical inputs.
pub async fn with_async_forward<E, F>(
    engine: &E,
    request: ForwardRequest,
    work: F,
) -> Result<F::Output>
where
    E: TunnelEngine + ?Sized,
    F: Future,
{
    let settle = request.settle();
    let spec = request.build()?;
    run_session_async(engine, spec, settle, work).await
}
