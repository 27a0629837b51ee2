//! nft-viewer - iptables-style listing of the nftables ruleset
//!
//! # Architecture
//!
//! - [`core`] - Ruleset indexing, hook classification, expression rendering
//! - [`provider`] - Fetching the JSON listing from `nft`, a file or stdin
//! - [`elevation`] - Optional privilege elevation for the `nft` run
//! - [`layout`] - Text tables for reports
//! - [`style`] - Terminal emphasis
//! - [`config`] - Config file
//! - [`utils`] - XDG directories

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod elevation;
pub mod layout;
pub mod provider;
pub mod style;
pub mod utils;

// Re-export commonly used types
pub use crate::core::error::{Error, Result};
pub use crate::core::report::{Report, ReportBuilder, ReportFilter};
pub use crate::core::ruleset::Ruleset;
