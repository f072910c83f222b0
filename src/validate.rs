//! Parameter validation for tunnel requests.
//!
//! These checks run before any I/O or engine call; a malformed namespace,
//! pod name, or port never reaches the tunneling engine.

use crate::error::{Error, Result};

/// Validates a Kubernetes identifier (namespace or pod name).
///
/// Rejects empty values and values containing a path-separator character,
/// which would otherwise change the meaning of the resource path handed to
/// the engine.
pub fn validate_identifier(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{name} cannot be empty")));
    }

    if value.chars().any(std::path::is_separator) {
        return Err(Error::InvalidArgument(format!(
            "{name}={value} contains an illegal path separator"
        )));
    }

    Ok(())
}

/// Validates a TCP port number.
///
/// The `u16` type already rules out values above 65535; only 0 is rejected.
pub fn validate_port(name: &str, port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::InvalidArgument(format!(
            "{name}={port} is not a valid port"
        )));
    }

    Ok(())
}
