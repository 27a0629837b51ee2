//! Hook pipeline classification
//!
//! Base chains are attached to one of the netfilter hooks; regular chains are
//! only reachable through `jump`/`goto` and land in the "unhooked" bucket.

use crate::core::ruleset::{Chain, ChainGroups};
use std::str::FromStr;
use tracing::debug;

/// Pipeline position of a chain, in packet traversal order
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Bucket {
    Ingress,
    Prerouting,
    Input,
    Forward,
    Output,
    Postrouting,
    /// Regular chains without a hook
    Unhooked,
}

impl Bucket {
    pub const COUNT: usize = 7;

    /// Maps a chain's `hook` attribute to its bucket.
    ///
    /// Returns `None` for hooks outside the displayed pipeline (e.g. `egress`).
    /// `"unhooked"` is not a hook name and is rejected as well.
    pub fn from_hook(hook: Option<&str>) -> Option<Self> {
        match hook {
            None => Some(Bucket::Unhooked),
            Some(name) => match Bucket::from_str(name) {
                Ok(Bucket::Unhooked) | Err(_) => None,
                Ok(bucket) => Some(bucket),
            },
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Chains sorted into the seven pipeline buckets
#[derive(Debug, Clone, Default)]
pub struct HookBuckets<'a> {
    lists: [Vec<&'a Chain>; Bucket::COUNT],
}

impl<'a> HookBuckets<'a> {
    /// Classifies every chain of every chain-type group.
    ///
    /// Each group is stable-sorted by ascending priority before its chains are
    /// distributed, so equal priorities keep listing order. Groups are handled
    /// in first-seen order and are not merged into one global order: when nat
    /// and filter chains share a hook, all chains of the earlier group come
    /// first.
    pub fn classify(groups: &'a ChainGroups) -> Self {
        let mut buckets = Self::default();

        for group in groups.values() {
            let mut sorted: Vec<&Chain> = group.values().collect();
            sorted.sort_by_key(|chain| chain.priority);

            for chain in sorted {
                match Bucket::from_hook(chain.hook.as_deref()) {
                    Some(bucket) => buckets.lists[bucket.index()].push(chain),
                    None => debug!(
                        "Dropping chain {} with unsupported hook {:?}",
                        chain.name, chain.hook
                    ),
                }
            }
        }

        buckets
    }

    /// Chains in `bucket`, in display order
    pub fn get(&self, bucket: Bucket) -> &[&'a Chain] {
        &self.lists[bucket.index()]
    }

    /// Total number of classified chains
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ruleset::Ruleset;
    use serde_json::{Value, json};
    use strum::IntoEnumIterator;

    fn chain(name: &str, chain_type: Option<&str>, hook: Option<&str>, prio: Option<i64>) -> Value {
        let mut body = json!({ "family": "inet", "table": "filter", "name": name });
        if let Some(t) = chain_type {
            body["type"] = json!(t);
        }
        if let Some(h) = hook {
            body["hook"] = json!(h);
        }
        if let Some(p) = prio {
            body["prio"] = json!(p);
        }
        json!({ "chain": body })
    }

    fn names(chains: &[&Chain]) -> Vec<String> {
        chains.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_bucket_order_and_names() {
        let all: Vec<String> = Bucket::iter().map(|b| b.to_string()).collect();
        assert_eq!(
            all,
            vec!["ingress", "prerouting", "input", "forward", "output", "postrouting", "unhooked"]
        );
    }

    #[test]
    fn test_from_hook() {
        assert_eq!(Bucket::from_hook(None), Some(Bucket::Unhooked));
        assert_eq!(Bucket::from_hook(Some("input")), Some(Bucket::Input));
        assert_eq!(Bucket::from_hook(Some("egress")), None);
        assert_eq!(Bucket::from_hook(Some("unhooked")), None);
    }

    #[test]
    fn test_sorted_by_priority_within_group() {
        let ruleset = Ruleset::from_statements(&[
            chain("late", Some("filter"), Some("input"), Some(10)),
            chain("early", Some("filter"), Some("input"), Some(-10)),
            chain("middle", Some("filter"), Some("input"), None),
        ]);
        let buckets = HookBuckets::classify(&ruleset.chains);
        assert_eq!(names(buckets.get(Bucket::Input)), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_equal_priority_keeps_listing_order() {
        let ruleset = Ruleset::from_statements(&[
            chain("b", Some("filter"), Some("forward"), Some(0)),
            chain("a", Some("filter"), Some("forward"), Some(0)),
            chain("c", Some("filter"), Some("forward"), Some(0)),
        ]);
        let buckets = HookBuckets::classify(&ruleset.chains);
        assert_eq!(names(buckets.get(Bucket::Forward)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_chain_without_hook_or_priority_is_unhooked() {
        let ruleset = Ruleset::from_statements(&[chain("helper", None, None, None)]);
        let buckets = HookBuckets::classify(&ruleset.chains);
        let unhooked = buckets.get(Bucket::Unhooked);
        assert_eq!(unhooked.len(), 1);
        assert_eq!(unhooked[0].priority, 0);
    }

    #[test]
    fn test_unknown_hook_is_dropped() {
        let ruleset = Ruleset::from_statements(&[
            chain("egress_chain", Some("filter"), Some("egress"), Some(0)),
            chain("in", Some("filter"), Some("input"), Some(0)),
        ]);
        let buckets = HookBuckets::classify(&ruleset.chains);
        assert_eq!(buckets.len(), 1);
        for bucket in Bucket::iter() {
            assert!(!names(buckets.get(bucket)).contains(&"egress_chain".to_string()));
        }
    }

    #[test]
    fn test_chain_types_interleave_in_group_order() {
        // nat group is seen first, so its chain leads even with a higher priority
        let ruleset = Ruleset::from_statements(&[
            chain("nat_pre", Some("nat"), Some("prerouting"), Some(-100)),
            chain("filter_pre", Some("filter"), Some("prerouting"), Some(-200)),
        ]);
        let buckets = HookBuckets::classify(&ruleset.chains);
        assert_eq!(
            names(buckets.get(Bucket::Prerouting)),
            vec!["nat_pre", "filter_pre"]
        );
    }

    #[test]
    fn test_empty() {
        let ruleset = Ruleset::default();
        let buckets = HookBuckets::classify(&ruleset.chains);
        assert!(buckets.is_empty());
    }
}
