//! Core ruleset viewing functionality
//!
//! Everything here is synchronous and works on an already fetched listing:
//!
//! - [`ruleset`]: Indexing of the `nft --json` document (tables, chains, rules, sets)
//! - [`hooks`]: Classification of chains into pipeline buckets
//! - [`expr`]: Rule expressions to display rows
//! - [`counters`]: Human-readable packet and byte counters
//! - [`sets`]: Named sets as nft statements
//! - [`report`]: Filtered per-hook report
//! - [`error`]: Error types

pub mod counters;
pub mod error;
pub mod expr;
pub mod hooks;
pub mod report;
pub mod ruleset;
pub mod sets;

#[cfg(test)]
pub mod test_helpers;
