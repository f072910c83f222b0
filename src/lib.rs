//! KubeTunnel
//!
//! Scoped Kubernetes port-forward sessions with guaranteed teardown.
//! Provides functionality to:
//! - Tunnel a local port to a port on a pod for the duration of a closure
//!   or future, stopping the tunnel on every exit path
//! - Validate tunnel parameters and resolve the kubeconfig before any
//!   engine call
//! - Run multiple concurrent sessions under a registry that keeps
//!   `(namespace, pod, local port)` keys unique
//!
//! The actual tunneling is delegated to an engine behind the [`TunnelEngine`]
//! trait; [`KubectlEngine`] (a `kubectl port-forward` child process per
//! tunnel) is the default implementation.
//!
//! # Example
//!
//! ```no_run
//! use kubetunnel::{with_forward, ForwardRequest, KubectlEngine};
//!
//! let engine = KubectlEngine::new();
//! let request = ForwardRequest::new("test", "web", 9000).to_port(80);
//!
//! with_forward(&engine, request, || {
//!     // 127.0.0.1:9000 now reaches port 80 on the pod
//! })?;
//! // tunnel is stopped here, whether the closure returned or panicked
//! # Ok::<(), kubetunnel::Error>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod forward;
pub mod models;
pub mod registry;
pub mod session;
pub mod validate;

// Re-export commonly used types
pub use config::{resolve_kubeconfig, KUBECONFIG_ENV};
pub use engine::{EngineError, KubectlEngine, TunnelEngine};
pub use error::{Error, Result};
pub use forward::{with_async_forward, with_forward};
pub use models::{ForwardRequest, SessionKey, SessionState, TunnelSpec, DEFAULT_STARTUP_SETTLE};
pub use registry::{Registration, SessionRegistry};
pub use session::{run_session, run_session_async};
