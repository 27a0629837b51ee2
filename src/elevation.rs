//! Privilege elevation for the `nft` listing
//!
//! Listing the ruleset needs `CAP_NET_ADMIN`. nft-viewer never elevates on its
//! own: `nft` runs directly unless an elevation method is configured, either
//! through the `elevation` key of the config file or through
//! `NFT_VIEWER_ELEVATION_METHOD`. When already running as root the method is
//! ignored.
//!
//! # Environment Variables
//!
//! - `NFT_VIEWER_ELEVATION_METHOD`: `sudo`, `run0` or `pkexec` (case
//!   insensitive). Takes precedence over the config file. Empty means unset.
//!
//! # Example
//!
//! ```no_run
//! use nft_viewer::elevation::{ElevationMethod, nft_command};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut cmd = nft_command("nft", &["--json", "list", "ruleset"], Some(ElevationMethod::Sudo))?;
//! let output = cmd.output().await?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::process::Command;

/// Environment variable overriding the configured elevation method
pub const ELEVATION_ENV: &str = "NFT_VIEWER_ELEVATION_METHOD";

/// Error type for privilege elevation
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    /// Requested elevation method is not available (binary not found)
    #[error("Elevation method '{0}' is not available (binary not found)")]
    MethodNotAvailable(ElevationMethod),

    /// Invalid value for `NFT_VIEWER_ELEVATION_METHOD`
    #[error("Invalid NFT_VIEWER_ELEVATION_METHOD '{0}'. Valid options: sudo, run0, pkexec")]
    InvalidMethod(String),
}

/// Helper used to run `nft` as root
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ElevationMethod {
    Sudo,
    Run0,
    Pkexec,
}

impl ElevationMethod {
    /// Reads `NFT_VIEWER_ELEVATION_METHOD`, falling back to `configured`.
    ///
    /// # Errors
    ///
    /// Returns [`ElevationError::InvalidMethod`] for unknown names.
    pub fn resolve(configured: Option<Self>) -> Result<Option<Self>, ElevationError> {
        match std::env::var(ELEVATION_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::from_str(value.trim())
                .map(Some)
                .map_err(|_| ElevationError::InvalidMethod(value)),
            _ => Ok(configured),
        }
    }
}

/// Checks if a binary exists in PATH
fn binary_exists(name: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                let full_path = dir.join(name);
                if full_path.is_file() {
                    Some(full_path)
                } else {
                    None
                }
            })
        })
        .is_some()
}

/// Builds the command that runs `program` with `args`.
///
/// Without a method, or when running as root, `program` is executed
/// directly. Arguments are passed without shell interpretation.
///
/// # Errors
///
/// Returns [`ElevationError::MethodNotAvailable`] if the helper binary is not
/// in `PATH`.
pub fn nft_command(
    program: &str,
    args: &[&str],
    method: Option<ElevationMethod>,
) -> Result<Command, ElevationError> {
    let method = match method {
        Some(m) if !nix::unistd::getuid().is_root() => m,
        _ => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            return Ok(cmd);
        }
    };

    let helper: &str = method.as_ref();
    if !binary_exists(helper) {
        return Err(ElevationError::MethodNotAvailable(method));
    }

    let mut cmd = Command::new(helper);
    cmd.arg(program).args(args);
    Ok(cmd)
}
