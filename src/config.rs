//! Kubeconfig resolution.
//!
//! Decides which cluster access configuration file a session should use.
//! The file is located and handed to the engine as-is; it is never parsed
//! here, and (except for the explicit and environment overrides) it is not
//! required to exist — a missing file surfaces later, from the engine, at
//! start time.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming an alternative kubeconfig file.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Resolves the kubeconfig path for a session.
///
/// Precedence, first match wins:
/// 1. `explicit`, if provided and the path exists;
/// 2. `$KUBECONFIG`, if set, non-empty, and the path exists;
/// 3. `~/.kube/config`, returned unconditionally.
pub fn resolve_kubeconfig(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    if let Some(env_path) = env::var_os(KUBECONFIG_ENV) {
        let env_path = PathBuf::from(env_path);
        if !env_path.as_os_str().is_empty() && env_path.exists() {
            return Ok(env_path);
        }
    }

    let home = dirs::home_dir().ok_or(Error::HomeDirUnavailable)?;
    Ok(home.join(".kube").join("config"))
}
