//! Session registry for concurrent tunnels.
//!
//! Keeps `(namespace, pod, local_port)` keys unique among active sessions so
//! two tunnels never contend for the same local port against the same pod.
//! The key-space is guarded by a single registry-wide lock; `acquire` and
//! `release` may be called from concurrently scheduled sessions.

use std::collections::HashSet;
use std::future::Future;

use parking_lot::Mutex;

use crate::engine::TunnelEngine;
use crate::error::{Error, Result};
use crate::models::{ForwardRequest, SessionKey};
use crate::session::{run_session_async_in, run_session_in};

/// Tracks which tunnel sessions are currently active.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: Mutex<HashSet<SessionKey>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` for a session.
    ///
    /// Fails with [`Error::DuplicateSession`] if the key is already active.
    /// The returned [`Registration`] releases the key when dropped, so an
    /// entry is never left dangling.
    pub fn acquire(&self, key: SessionKey) -> Result<Registration<'_>> {
        let mut active = self.active.lock();

        if !active.insert(key.clone()) {
            return Err(Error::DuplicateSession {
                namespace: key.namespace,
                pod: key.pod,
                local_port: key.local_port,
            });
        }

        Ok(Registration {
            registry: self,
            key,
        })
    }

    /// Releases `key`. Idempotent; returns whether the key was active.
    pub fn release(&self, key: &SessionKey) -> bool {
        self.active.lock().remove(key)
    }

    /// Returns true if a session is active for `key`.
    pub fn is_active(&self, key: &SessionKey) -> bool {
        self.active.lock().contains(key)
    }

    /// Number of currently active sessions.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Registry-aware variant of [`with_forward`].
    ///
    /// The session registers its key right after a successful engine start
    /// and deregisters inside the guaranteed-stop step.
    ///
    /// [`with_forward`]: crate::forward::with_forward
    pub fn with_forward<E, T, F>(&self, engine: &E, request: ForwardRequest, work: F) -> Result<T>
    where
        E: TunnelEngine + ?Sized,
        F: FnOnce() -> T,
    {
        let settle = request.settle();
        let spec = request.build()?;
        run_session_in(engine, spec, settle, Some(self), work)
    }

    /// Registry-aware variant of [`with_async_forward`].
    ///
    /// [`with_async_forward`]: crate::forward::with_async_forward
    pub async fn with_async_forward<E, F>(
        &self,
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
        run_session_async_in(engine, spec, settle, Some(self), work).await
    }
}

/// An active claim on a session key; releases the key on drop.
#[derive(Debug)]
pub struct Registration<'r> {
    registry: &'r SessionRegistry,
    key: SessionKey,
}

impl Registration<'_> {
    /// The key this registration holds.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
