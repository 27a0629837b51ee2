//! Ruleset provider
//!
//! Delivers the raw JSON text of the ruleset listing. The text is returned
//! untouched so `--json` can pass it through verbatim; parsing happens in
//! [`crate::core::ruleset`].

use crate::config::ViewerConfig;
use crate::core::error::ProviderError;
use crate::elevation::{ElevationMethod, nft_command};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Arguments of the listing command
pub const LIST_RULESET_ARGS: [&str; 5] =
    ["--json", "--handle", "--numeric-priority", "list", "ruleset"];

/// Default `nft` binary
pub const DEFAULT_NFT_COMMAND: &str = "nft";

/// Environment variable overriding the `nft` binary
pub const NFT_COMMAND_ENV: &str = "NFT_VIEWER_NFT_COMMAND";

/// How to run `nft`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftCommand {
    pub program: String,
    pub elevation: Option<ElevationMethod>,
    pub timeout: Duration,
}

impl Default for NftCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_NFT_COMMAND.to_string(),
            elevation: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl NftCommand {
    /// Combines the config with `NFT_VIEWER_NFT_COMMAND` and
    /// `NFT_VIEWER_ELEVATION_METHOD`; the environment wins.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Elevation`] for an invalid elevation method.
    pub fn from_config(config: &ViewerConfig) -> Result<Self, ProviderError> {
        let program = std::env::var(NFT_COMMAND_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| config.nft_command.clone())
            .unwrap_or_else(|| DEFAULT_NFT_COMMAND.to_string());

        Ok(Self {
            program,
            elevation: ElevationMethod::resolve(config.elevation)?,
            timeout: Duration::from_secs(config.timeout_secs()),
        })
    }

    /// Runs the listing command and returns its stdout.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::NotFound`] if the binary cannot be spawned
    /// - [`ProviderError::Timeout`] if it runs longer than `self.timeout`
    /// - [`ProviderError::PermissionDenied`] or [`ProviderError::Failed`] on a
    ///   non-zero exit, classified from stderr
    pub async fn run(&self) -> Result<String, ProviderError> {
        let mut cmd = nft_command(&self.program, &LIST_RULESET_ARGS, self.elevation)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            "Running {} {} (elevation: {:?})",
            self.program,
            LIST_RULESET_ARGS.join(" "),
            self.elevation
        );

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::NotFound(self.program.clone())
            } else {
                ProviderError::Failed {
                    message: format!("failed to start {}: {e}", self.program),
                    exit_code: None,
                }
            }
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| ProviderError::Read {
                source_name: self.program.clone(),
                error: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("nft listing failed: {}", stderr.trim());
            return Err(ProviderError::from_stderr(&stderr, output.status.code()));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!("Received {} bytes of ruleset JSON", text.len());
        Ok(text)
    }
}

/// Where the listing comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesetSource {
    /// Run `nft`
    Nft(NftCommand),
    /// Read a saved listing
    File(PathBuf),
    /// Read the listing from standard input
    Stdin,
}

impl RulesetSource {
    /// `--input` argument: `-` selects stdin, anything else a file.
    pub fn from_input(input: PathBuf) -> Self {
        if input.as_os_str() == "-" {
            RulesetSource::Stdin
        } else {
            RulesetSource::File(input)
        }
    }

    /// Fetches the raw listing text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if `nft` fails or the input cannot be read.
    pub async fn fetch(&self) -> Result<String, ProviderError> {
        match self {
            RulesetSource::Nft(command) => command.run().await,
            RulesetSource::File(path) => {
                debug!("Reading ruleset from {}", path.display());
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| ProviderError::Read {
                        source_name: path.display().to_string(),
                        error: e,
                    })
            }
            RulesetSource::Stdin => {
                debug!("Reading ruleset from stdin");
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .map_err(|e| ProviderError::Read {
                        source_name: "stdin".to_string(),
                        error: e,
                    })?;
                Ok(text)
            }
        }
    }
}
