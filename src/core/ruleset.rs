//! Ruleset model and indexer
//!
//! `nft --json list ruleset` returns one flat `nftables` array in which every
//! element is an object with a single key naming its kind:
//!
//! ```json
//! { "nftables": [
//!     { "metainfo": { "json_schema_version": 1 } },
//!     { "table": { "family": "inet", "name": "filter", "handle": 1 } },
//!     { "chain": { "family": "inet", "table": "filter", "name": "input",
//!                  "type": "filter", "hook": "input", "prio": 0, "policy": "drop" } },
//!     { "rule":  { "family": "inet", "table": "filter", "chain": "input",
//!                  "handle": 4, "expr": [ { "accept": null } ] } }
//! ] }
//! ```
//!
//! [`Ruleset::from_statements`] sorts these into lookup maps. Every map keeps
//! first-insertion order so that output follows the listing order. Kinds we do
//! not display (`metainfo`, `map`, `flowtable`, ...) are ignored.

use crate::core::error::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A table, identified by family and name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub family: String,
    pub name: String,
    #[serde(default)]
    pub handle: Option<u64>,
}

/// A base or regular chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub family: String,
    pub table: String,
    pub name: String,
    /// Base chain type (`filter`, `nat`, `route`), `None` for regular chains
    pub chain_type: Option<String>,
    /// Hook as written in the listing, `None` for regular chains
    pub hook: Option<String>,
    pub priority: i64,
    pub policy: Option<String>,
    pub handle: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawChain {
    #[serde(default)]
    family: String,
    #[serde(default)]
    table: String,
    name: String,
    #[serde(default, rename = "type")]
    chain_type: Option<String>,
    #[serde(default)]
    hook: Option<String>,
    #[serde(default)]
    prio: Option<Value>,
    #[serde(default)]
    policy: Option<String>,
    #[serde(default)]
    handle: Option<u64>,
}

impl From<RawChain> for Chain {
    fn from(raw: RawChain) -> Self {
        let priority = raw
            .prio
            .as_ref()
            .map_or(0, |prio| resolve_priority(prio, &raw.family));
        Self {
            family: raw.family,
            table: raw.table,
            name: raw.name,
            chain_type: raw.chain_type,
            hook: raw.hook,
            priority,
            policy: raw.policy,
            handle: raw.handle,
        }
    }
}

/// Maps a chain priority to its numeric value.
///
/// Numeric output (`nft -y`) gives plain integers. Without it nft prints the
/// standard symbolic names, optionally with an offset (`"filter + 5"`).
/// Anything unrecognised counts as 0.
pub fn resolve_priority(prio: &Value, family: &str) -> i64 {
    match prio {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => parse_symbolic_priority(s, family).unwrap_or_else(|| {
            debug!("Unrecognised chain priority '{s}', using 0");
            0
        }),
        _ => 0,
    }
}

fn parse_symbolic_priority(text: &str, family: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }

    let (name, offset) = if let Some((name, off)) = text.split_once('+') {
        (name.trim(), off.trim().parse::<i64>().ok()?)
    } else if let Some((name, off)) = text.split_once('-') {
        (name.trim(), -off.trim().parse::<i64>().ok()?)
    } else {
        (text, 0)
    };

    let base = if family == "bridge" {
        match name {
            "dstnat" => -300,
            "filter" => -200,
            "out" => 100,
            "srcnat" => 300,
            _ => return None,
        }
    } else {
        match name {
            "raw" => -300,
            "mangle" => -150,
            "dstnat" => -100,
            "filter" => 0,
            "security" => 50,
            "srcnat" => 100,
            _ => return None,
        }
    };
    Some(base + offset)
}

/// A rule; expressions stay raw until rendering
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    pub chain: String,
    #[serde(default)]
    pub handle: Option<u64>,
    #[serde(default)]
    pub expr: Option<Vec<Value>>,
}

/// Declared element type of a set: a plain type or a concatenation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SetType {
    Single(String),
    Concat(Vec<String>),
}

impl std::fmt::Display for SetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetType::Single(t) => f.write_str(t),
            SetType::Concat(parts) => f.write_str(&parts.join(" . ")),
        }
    }
}

/// Set flags: newer `nft` prints a lone flag as a bare string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SetFlags {
    One(String),
    Many(Vec<String>),
}

impl Default for SetFlags {
    fn default() -> Self {
        SetFlags::Many(Vec::new())
    }
}

impl SetFlags {
    pub fn as_slice(&self) -> &[String] {
        match self {
            SetFlags::One(flag) => std::slice::from_ref(flag),
            SetFlags::Many(flags) => flags,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// A named set and its elements
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Set {
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub table: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub set_type: Option<SetType>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub flags: SetFlags,
    #[serde(default)]
    pub elem: Vec<Value>,
}

/// Chains grouped by base chain type; `None` holds regular chains
pub type ChainGroups = IndexMap<Option<String>, IndexMap<String, Chain>>;

/// Indexed view of one ruleset snapshot
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    pub tables: IndexMap<String, Table>,
    pub chains: ChainGroups,
    pub rules_by_chain: IndexMap<String, Vec<Rule>>,
    pub sets: IndexMap<String, Set>,
}

impl Ruleset {
    /// Parses the JSON text of `nft --json list ruleset` and indexes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDocument`] if the text is not JSON or has no
    /// top-level `nftables` array.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| Error::MalformedDocument(e.to_string()))?;
        Self::from_document(&document)
    }

    /// Indexes an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDocument`] if there is no `nftables` array.
    pub fn from_document(document: &Value) -> Result<Self> {
        let statements = document
            .get("nftables")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::MalformedDocument("missing nftables array".to_string()))?;
        Ok(Self::from_statements(statements))
    }

    /// Indexes a statement list. Malformed statements are logged and skipped.
    pub fn from_statements(statements: &[Value]) -> Self {
        let mut ruleset = Self::default();

        for (index, statement) in statements.iter().enumerate() {
            let Some(object) = statement.as_object() else {
                debug!("Ignoring non-object statement #{index}");
                continue;
            };

            if let Some(set) = object.get("set") {
                match Set::deserialize(set) {
                    Ok(set) => {
                        ruleset.sets.insert(set.name.clone(), set);
                    }
                    Err(e) => warn!("Skipping malformed set statement #{index}: {e}"),
                }
            }

            if let Some(chain) = object.get("chain") {
                match RawChain::deserialize(chain) {
                    Ok(raw) => {
                        let chain = Chain::from(raw);
                        ruleset
                            .chains
                            .entry(chain.chain_type.clone())
                            .or_default()
                            .insert(chain.name.clone(), chain);
                    }
                    Err(e) => warn!("Skipping malformed chain statement #{index}: {e}"),
                }
            }

            if let Some(table) = object.get("table") {
                match Table::deserialize(table) {
                    Ok(table) => {
                        ruleset.tables.insert(table.name.clone(), table);
                    }
                    Err(e) => warn!("Skipping malformed table statement #{index}: {e}"),
                }
            }

            if let Some(rule) = object.get("rule") {
                match Rule::deserialize(rule) {
                    Ok(rule) => {
                        ruleset
                            .rules_by_chain
                            .entry(rule.chain.clone())
                            .or_default()
                            .push(rule);
                    }
                    Err(e) => warn!("Skipping malformed rule statement #{index}: {e}"),
                }
            }
        }

        debug!(
            "Indexed {} tables, {} chains, {} rules, {} sets",
            ruleset.tables.len(),
            ruleset.chains.values().map(IndexMap::len).sum::<usize>(),
            ruleset.rules_by_chain.values().map(Vec::len).sum::<usize>(),
            ruleset.sets.len()
        );

        ruleset
    }

    /// Rules recorded for a chain name, in listing order
    pub fn rules_for(&self, chain: &str) -> &[Rule] {
        self.rules_by_chain.get(chain).map_or(&[], Vec::as_slice)
    }

    /// Looks up a chain by name in any chain-type group
    pub fn find_chain(&self, name: &str) -> Option<&Chain> {
        self.chains.values().find_map(|group| group.get(name))
    }
}
