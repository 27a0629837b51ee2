use thiserror::Error;

/// Core error types for nft-viewer
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ruleset provider could not deliver a listing
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The listing is not an nftables JSON document
    #[error("Unable to parse nftables output: {0}")]
    MalformedDocument(String),

    /// Configuration file could not be used
    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },
}

/// Failures of the ruleset provider (`nft`, a file, or stdin)
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Permission denied - run with sudo")]
    PermissionDenied(String),

    #[error("nftables error: {message}")]
    Failed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("nft binary not found: {0}")]
    NotFound(String),

    #[error("nft did not answer within {0}s")]
    Timeout(u64),

    #[error("Elevation error: {0}")]
    Elevation(#[from] crate::elevation::ElevationError),

    #[error("Failed to read ruleset from {source_name}: {error}")]
    Read {
        source_name: String,
        error: std::io::Error,
    },
}

impl ProviderError {
    /// Classifies a failed `nft` run by its stderr text.
    pub fn from_stderr(stderr: &str, exit_code: Option<i32>) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("permission denied") || lower.contains("operation not permitted") {
            Self::PermissionDenied(stderr.trim().to_string())
        } else {
            Self::Failed {
                message: stderr.trim().to_string(),
                exit_code,
            }
        }
    }
}

/// A single rule that could not be rendered.
///
/// Never fatal: the report builder turns it into a warning and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("counter: {0}")]
    Counter(#[from] CounterError),
}

/// Rejected arguments to the counter formatter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    #[error("precision must be in range 0-3, got {0}")]
    InvalidPrecision(u8),

    #[error("magnitude is not a finite number")]
    NotFinite,
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Known nft failure messages and what to tell the user about them.
pub struct NftablesErrorPattern;

impl NftablesErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        if lower.contains("permission denied") || lower.contains("operation not permitted") {
            return ErrorTranslation::new("Insufficient permissions to list the ruleset")
                .with_suggestion("Run with sudo, or set NFT_VIEWER_ELEVATION_METHOD=sudo")
                .with_suggestion("Listing requires the CAP_NET_ADMIN capability");
        }

        if lower.contains("cache initialization failed") {
            return ErrorTranslation::new(
                "Failed to initialize nftables cache - insufficient privileges",
            )
            .with_suggestion("This usually means you need elevated privileges")
            .with_suggestion("Run with sudo, or configure \"elevation\" in config.json");
        }

        if lower.contains("no such file") || lower.contains("not found") {
            return ErrorTranslation::new("nftables is not installed or not found in PATH")
                .with_suggestion("Install nftables: sudo apt install nftables  (Debian/Ubuntu)")
                .with_suggestion("Or: sudo dnf install nftables  (Fedora/RHEL)")
                .with_suggestion("Or: sudo pacman -S nftables  (Arch)")
                .with_suggestion("Or point NFT_VIEWER_NFT_COMMAND at the nft binary");
        }

        if lower.contains("timeout") || lower.contains("did not answer") {
            return ErrorTranslation::new("nft did not answer in time")
                .with_suggestion("Check system load: uptime")
                .with_suggestion("Raise \"timeout_secs\" in config.json");
        }

        if lower.contains("netlink") {
            return ErrorTranslation::new("Communication error with kernel netlink interface")
                .with_suggestion("Check kernel modules: lsmod | grep nf_tables")
                .with_suggestion("Load nf_tables module: sudo modprobe nf_tables");
        }

        if lower.contains("parse") || lower.contains("json") {
            return ErrorTranslation::new("The ruleset listing is not valid nftables JSON")
                .with_suggestion("Check the input with: nft --json list ruleset | head")
                .with_suggestion("Files given with --input must contain the full JSON document");
        }

        ErrorTranslation::new(format!("Firewall error: {msg}"))
            .with_suggestion("Verify nftables is working: sudo nft list ruleset")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
