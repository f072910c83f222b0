//! The tunnel engine seam.
//!
//! The engine is the component that actually opens sockets and proxies bytes
//! between the local port and the cluster API server. This library treats it
//! as opaque: it is consumed strictly through [`TunnelEngine::start`] and
//! [`TunnelEngine::stop`], and its failures are reduced to a single
//! message-carrying [`EngineError`].
//!
//! [`KubectlEngine`] is the default implementation, delegating to a
//! `kubectl port-forward` child process per tunnel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use parking_lot::Mutex;
use thiserror::Error;

use crate::models::TunnelSpec;

/// Failure surfaced by a tunnel engine.
///
/// Deliberately structureless: callers of this library never handle engine
/// errors directly, they see [`Error::TunnelStartFailed`] instead.
///
/// [`Error::TunnelStartFailed`]: crate::error::Error::TunnelStartFailed
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Control-plane interface to the tunneling engine.
///
/// Implementations must tolerate `stop` for a tunnel they no longer track
/// (the session controller guarantees at most one stop per start, but an
/// engine may have lost the child on its own).
pub trait TunnelEngine {
    /// Starts a tunnel for `spec`. Returning `Ok` means the engine has begun
    /// establishing the tunnel; it does not guarantee the local port is
    /// already connectable.
    fn start(&self, spec: &TunnelSpec) -> std::result::Result<(), EngineError>;

    /// Stops the tunnel for the given namespace and pod. Idempotent.
    fn stop(&self, namespace: &str, pod: &str) -> std::result::Result<(), EngineError>;
}

// ============================================================================
// kubectl-backed engine
// ============================================================================

/// Tunnel engine backed by `kubectl port-forward` child processes.
pub struct KubectlEngine {
    kubectl: PathBuf,

    /// Running children keyed by (namespace, pod).
    children: Mutex<HashMap<(String, String), Child>>,
}

impl KubectlEngine {
    /// Creates an engine that finds `kubectl` on `$PATH`.
    pub fn new() -> Self {
        Self::with_kubectl("kubectl")
    }

    /// Creates an engine using a specific kubectl binary.
    pub fn with_kubectl(path: impl Into<PathBuf>) -> Self {
        Self {
            kubectl: path.into(),
            children: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for KubectlEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelEngine for KubectlEngine {
    fn start(&self, spec: &TunnelSpec) -> std::result::Result<(), EngineError> {
        let (stdout, stderr) = if spec.verbose() {
            (Stdio::inherit(), Stdio::inherit())
        } else {
            (Stdio::null(), Stdio::null())
        };

        let child = Command::new(&self.kubectl)
            .args(port_forward_args(spec))
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| EngineError::new(format!("Failed to start kubectl: {}", e)))?;

        let key = (spec.namespace().to_string(), spec.pod().to_string());
        let mut children = self.children.lock();

        // Kill any forgotten child for the same target before tracking the
        // new one; wait to avoid zombies.
        if let Some(mut old_child) = children.insert(key, child) {
            let _ = old_child.kill();
            let _ = old_child.wait();
        }

        Ok(())
    }

    fn stop(&self, namespace: &str, pod: &str) -> std::result::Result<(), EngineError> {
        let key = (namespace.to_string(), pod.to_string());

        if let Some(mut child) = self.children.lock().remove(&key) {
            child
                .kill()
                .map_err(|e| EngineError::new(format!("Failed to kill kubectl: {}", e)))?;
            let _ = child.wait();
        }

        Ok(())
    }
}

/// Builds the kubectl argument vector for a tunnel spec.
fn port_forward_args(spec: &TunnelSpec) -> Vec<String> {
    vec![
        "--kubeconfig".to_string(),
        spec.kubeconfig().display().to_string(),
        "port-forward".to_string(),
        "-n".to_string(),
        spec.namespace().to_string(),
        spec.pod().to_string(),
        format!("{}:{}", spec.local_port(), spec.remote_port()),
        "--address=127.0.0.1".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForwardRequest;

    #[test]
    fn test_port_forward_args() {
        let spec = ForwardRequest::new("test", "web", 9000)
            .to_port(80)
            .build()
            .unwrap();

        let args = port_forward_args(&spec);
        assert!(args.contains(&"port-forward".to_string()));
        assert!(args.contains(&"test".to_string()));
        assert!(args.contains(&"web".to_string()));
        assert!(args.contains(&"9000:80".to_string()));
        assert!(args.contains(&"--address=127.0.0.1".to_string()));
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let engine = KubectlEngine::new();
        assert!(engine.stop("test", "web").is_ok());
    }
}
