//! Data models for tunnel requests, specs, and session state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::resolve_kubeconfig;
use crate::error::Result;
use crate::validate::{validate_identifier, validate_port};

/// Default settle delay applied after a successful engine start. The engine
/// establishes the tunnel asynchronously on its side and is not guaranteed
/// connectable the instant start returns.
pub const DEFAULT_STARTUP_SETTLE: Duration = Duration::from_millis(250);

// ============================================================================
// Tunnel Spec
// ============================================================================

/// Immutable description of one requested tunnel.
///
/// A spec is only constructed through [`ForwardRequest::build`], so every
/// instance has already passed validation and carries a resolved kubeconfig
/// path. Fields are private; one spec is built per session and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    namespace: String,
    pod: String,
    local_port: u16,
    remote_port: u16,
    kubeconfig: PathBuf,
    verbose: bool,
}

impl TunnelSpec {
    /// Target namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Target pod name.
    pub fn pod(&self) -> &str {
        &self.pod
    }

    /// Local port the tunnel listens on.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Port inside the pod.
    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// Resolved kubeconfig path handed to the engine.
    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }

    /// Whether the engine should emit diagnostic output.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns the registry key identifying this tunnel.
    pub fn key(&self) -> SessionKey {
        SessionKey {
            namespace: self.namespace.clone(),
            pod: self.pod.clone(),
            local_port: self.local_port,
        }
    }
}

// ============================================================================
// Session Key
// ============================================================================

/// Identity of a tunnel session for registry purposes.
///
/// Two sessions with the same key would contend for the same local port, so
/// the [`SessionRegistry`] keeps keys unique among active sessions.
///
/// [`SessionRegistry`]: crate::registry::SessionRegistry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub namespace: String,
    pub pod: String,
    pub local_port: u16,
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.pod, self.local_port)
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle state of a tunnel session.
///
/// Owned exclusively by the session controller; callers observe it only
/// indirectly through whether the scoped call returned or failed. A session
/// moves `Idle -> Starting -> Active -> Stopping* -> Stopped` and never
/// revisits an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Active,
    StoppingAfterSuccess,
    StoppingAfterFailure,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::StoppingAfterSuccess => "stopping-after-success",
            Self::StoppingAfterFailure => "stopping-after-failure",
            Self::Stopped => "stopped",
        }
    }
}

// ============================================================================
// Forward Request
// ============================================================================

/// Parameters for a port-forward session, prior to validation.
///
/// The remote port defaults to the local port, the kubeconfig falls back to
/// `$KUBECONFIG` and then `~/.kube/config`, and the settle delay defaults to
/// [`DEFAULT_STARTUP_SETTLE`].
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    namespace: String,
    pod: String,
    local_port: u16,
    remote_port: Option<u16>,
    config_path: Option<PathBuf>,
    startup_settle: Duration,
    verbose: bool,
}

impl ForwardRequest {
    /// Creates a request tunneling `port` on localhost to the same port on
    /// the pod.
    pub fn new(namespace: impl Into<String>, pod: impl Into<String>, port: u16) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            local_port: port,
            remote_port: None,
            config_path: None,
            startup_settle: DEFAULT_STARTUP_SETTLE,
            verbose: false,
        }
    }

    /// Sets the port inside the pod, when it differs from the local port.
    pub fn to_port(mut self, port: u16) -> Self {
        self.remote_port = Some(port);
        self
    }

    /// Sets an explicit kubeconfig path. Ignored if the file does not exist.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Sets the settle delay applied after a successful start.
    pub fn startup_settle(mut self, settle: Duration) -> Self {
        self.startup_settle = settle;
        self
    }

    /// Forwards the engine's diagnostic output to the caller's stdio.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The configured settle delay.
    pub fn settle(&self) -> Duration {
        self.startup_settle
    }

    /// Validates all parameters, resolves the kubeconfig, and produces an
    /// immutable [`TunnelSpec`].
    pub fn build(&self) -> Result<TunnelSpec> {
        validate_identifier("namespace", &self.namespace)?;
        validate_identifier("pod", &self.pod)?;
        validate_port("port", self.local_port)?;

        let remote_port = self.remote_port.unwrap_or(self.local_port);
        validate_port("to_port", remote_port)?;

        let kubeconfig = resolve_kubeconfig(self.config_path.as_deref())?;

        Ok(TunnelSpec {
            namespace: self.namespace.clone(),
            pod: self.pod.clone(),
            local_port: self.local_port,
            remote_port,
            kubeconfig,
            verbose: self.verbose,
        })
    }
}
