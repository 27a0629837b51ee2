use crate::core::error::{Error, Result};
use crate::elevation::ElevationMethod;
use crate::style::ColorMode;
use crate::utils::default_config_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bounds for `timeout_secs`
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Persistent defaults, all overridable on the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub color: ColorMode,
    /// Print exact counters instead of `1.2 K`
    pub exact: bool,
    /// Path or name of the `nft` binary
    pub nft_command: Option<String>,
    /// Elevation helper for the `nft` run; absent means run directly
    pub elevation: Option<ElevationMethod>,
    /// How long `nft` may take (clamped to 1..=300 seconds)
    pub timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            exact: false,
            nft_command: None,
            elevation: None,
            timeout_secs: 10,
        }
    }
}

impl ViewerConfig {
    /// Timeout after clamping
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
    }
}

/// Loads the config file, or returns defaults if there is none.
///
/// An explicit `path` must exist. Without one the XDG location is used and a
/// missing file is not an error.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or is not valid JSON
/// for [`ViewerConfig`].
///
/// # Async
/// Uses `tokio::fs` for non-blocking I/O.
pub async fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let (path, required): (PathBuf, bool) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(ViewerConfig::default()),
        },
    };

    let json = match tokio::fs::read_to_string(&path).await {
        Ok(json) => json,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", path.display());
            return Ok(ViewerConfig::default());
        }
        Err(e) => {
            return Err(Error::Config {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };

    let config: ViewerConfig = serde_json::from_str(&json).map_err(|e| Error::Config {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_full_config() {
        let file = write_config(
            r#"{"color": "never", "exact": true, "nft_command": "/usr/sbin/nft",
                "elevation": "run0", "timeout_secs": 30}"#,
        );
        let config = load_config(Some(file.path())).await.unwrap();
        assert_eq!(config.color, ColorMode::Never);
        assert!(config.exact);
        assert_eq!(config.nft_command.as_deref(), Some("/usr/sbin/nft"));
        assert_eq!(config.elevation, Some(ElevationMethod::Run0));
        assert_eq!(config.timeout_secs(), 30);
    }

    #[tokio::test]
    async fn test_partial_config_uses_defaults() {
        let file = write_config(r#"{"exact": true}"#);
        let config = load_config(Some(file.path())).await.unwrap();
        assert_eq!(
            config,
            ViewerConfig {
                exact: true,
                ..ViewerConfig::default()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_error() {
        let file = write_config(r#"{"color": "sometimes"}"#);
        let result = load_config(Some(file.path())).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let result = load_config(Some(missing.as_path())).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_timeout_clamped() {
        let mut config = ViewerConfig {
            timeout_secs: 0,
            ..ViewerConfig::default()
        };
        assert_eq!(config.timeout_secs(), MIN_TIMEOUT_SECS);
        config.timeout_secs = 10_000;
        assert_eq!(config.timeout_secs(), MAX_TIMEOUT_SECS);
    }
}
