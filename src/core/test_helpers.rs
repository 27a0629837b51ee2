//! Shared test utilities for core module tests
//!
//! Builders for nftables JSON statements and a small canonical ruleset.
//! This module is only compiled in test mode.

use crate::core::ruleset::Ruleset;
use serde_json::{Value, json};
use std::sync::Mutex;

/// Mutex for tests that need exclusive access to environment variables.
///
/// # Example
///
/// ```ignore
/// let _guard = ENV_VAR_MUTEX.lock().unwrap();
/// unsafe {
///     std::env::set_var("NFT_VIEWER_ELEVATION_METHOD", "sudo");
/// }
/// // ... test with custom env state ...
/// unsafe {
///     std::env::remove_var("NFT_VIEWER_ELEVATION_METHOD");
/// }
/// ```
pub static ENV_VAR_MUTEX: Mutex<()> = Mutex::new(());

/// `{"chain": ...}` for a base chain with policy `accept`
pub fn base_chain(table: &str, name: &str, chain_type: &str, hook: &str, prio: i64) -> Value {
    json!({ "chain": {
        "family": "inet", "table": table, "name": name,
        "type": chain_type, "hook": hook, "prio": prio, "policy": "accept"
    }})
}

/// `{"chain": ...}` for a regular chain (no hook)
pub fn regular_chain(table: &str, name: &str) -> Value {
    json!({ "chain": { "family": "inet", "table": table, "name": name } })
}

/// `{"rule": ...}` in family `inet`
pub fn rule(table: &str, chain: &str, handle: u64, expr: Value) -> Value {
    json!({ "rule": {
        "family": "inet", "table": table, "chain": chain, "handle": handle, "expr": expr
    }})
}

/// `meta l4proto` / `payload` style match on `tcp dport`
pub fn tcp_dport(port: Value) -> Value {
    json!({ "match": {
        "op": "==",
        "left": { "payload": { "protocol": "tcp", "field": "dport" } },
        "right": port
    }})
}

pub fn counter(packets: u64, bytes: u64) -> Value {
    json!({ "counter": { "packets": packets, "bytes": bytes } })
}

/// Statements of the canonical test ruleset.
///
/// - `filter/input` (input hook, prio 0, policy drop): rules 4, 5, 6
/// - `filter/services` (regular chain): rule 7
/// - `nat/prerouting` (prio -100): rule 8
/// - `nat/postrouting` (prio 100): rule 9
/// - set `blocklist` in `filter`
pub fn sample_statements() -> Vec<Value> {
    let mut input = base_chain("filter", "input", "filter", "input", 0);
    input["chain"]["policy"] = json!("drop");

    vec![
        json!({ "metainfo": { "version": "1.0.9", "json_schema_version": 1 } }),
        json!({ "table": { "family": "inet", "name": "filter", "handle": 1 } }),
        json!({ "table": { "family": "inet", "name": "nat", "handle": 2 } }),
        input,
        regular_chain("filter", "services"),
        base_chain("nat", "prerouting", "nat", "prerouting", -100),
        base_chain("nat", "postrouting", "nat", "postrouting", 100),
        json!({ "set": {
            "family": "inet", "table": "filter", "name": "blocklist",
            "type": "ipv4_addr", "flags": ["interval"],
            "elem": [ { "prefix": { "addr": "203.0.113.0", "len": 24 } } ]
        }}),
        rule(
            "filter",
            "input",
            4,
            json!([
                { "match": { "op": "in",
                    "left": { "ct": { "key": "state" } }, "right": "invalid" } },
                counter(3, 180),
                { "drop": null }
            ]),
        ),
        rule(
            "filter",
            "input",
            5,
            json!([tcp_dport(json!(22)), counter(1234, 98_304), { "accept": null }]),
        ),
        rule("filter", "input", 6, json!([{ "jump": { "target": "services" } }])),
        rule(
            "filter",
            "services",
            7,
            json!([
                { "match": { "op": "==",
                    "left": { "payload": { "protocol": "ip", "field": "saddr" } },
                    "right": "@blocklist" } },
                { "drop": null }
            ]),
        ),
        rule(
            "nat",
            "prerouting",
            8,
            json!([tcp_dport(json!(8080)), { "dnat": { "addr": "10.0.0.2", "port": 80 } }]),
        ),
        rule(
            "nat",
            "postrouting",
            9,
            json!([
                { "match": { "op": "==",
                    "left": { "meta": { "key": "oifname" } }, "right": "eth0" } },
                { "masquerade": null }
            ]),
        ),
    ]
}

/// `{"nftables": [...]}` wrapping [`sample_statements`]
pub fn sample_document() -> Value {
    json!({ "nftables": sample_statements() })
}

/// The canonical ruleset, indexed
pub fn sample_ruleset() -> Ruleset {
    Ruleset::from_statements(&sample_statements())
}
