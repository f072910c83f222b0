//! Error types for the kubetunnel library.

use thiserror::Error;

/// Result type alias for kubetunnel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing a port-forward session.
#[derive(Error, Debug)]
pub enum Error {
    /// A namespace, pod name, or port failed validation. Raised before any
    /// engine call is made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The tunneling engine failed to start the port-forward. Wraps the
    /// engine's own failure message; the engine's native error type is never
    /// exposed to callers.
    #[error("Failed to start port-forward: {0}")]
    TunnelStartFailed(String),

    /// A session is already active for the same namespace, pod, and local
    /// port. Only raised when running under a [`SessionRegistry`].
    ///
    /// [`SessionRegistry`]: crate::registry::SessionRegistry
    #[error("Session already active for {namespace}/{pod} on local port {local_port}")]
    DuplicateSession {
        namespace: String,
        pod: String,
        local_port: u16,
    },

    /// The home directory could not be determined while resolving the default
    /// kubeconfig location.
    #[error("Could not find home directory")]
    HomeDirUnavailable,
}
