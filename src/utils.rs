//! Directory lookup following the XDG Base Directory specification
//!
//! - Config: `~/.config/nft-viewer/` - optional `config.json`

use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "nft-viewer", "nft-viewer").map(|pd| pd.config_dir().to_path_buf())
}

/// Default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.json"))
}
