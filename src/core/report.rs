//! Report builder
//!
//! Walks the hook buckets in pipeline order, applies the user's filters and
//! renders every rule of every selected chain into rows. The result is plain
//! data; [`crate::layout`] turns it into text.

use crate::core::error::RuleError;
use crate::core::expr::{DisplayRow, RenderOptions, render_rule};
use crate::core::hooks::{Bucket, HookBuckets};
use crate::core::ruleset::{Chain, Rule, Ruleset};
use crate::style::Tone;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::debug;

/// Filter value that disables the chain/table/hook filters
pub const MATCH_ALL: &str = "all";

/// Which buckets to list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookFilter {
    #[default]
    All,
    Only(Bucket),
}

impl HookFilter {
    pub fn selects(self, bucket: Bucket) -> bool {
        match self {
            HookFilter::All => true,
            HookFilter::Only(wanted) => wanted == bucket,
        }
    }
}

impl FromStr for HookFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == MATCH_ALL {
            return Ok(HookFilter::All);
        }
        Bucket::from_str(s).map(HookFilter::Only).map_err(|_| {
            let valid: Vec<String> = Bucket::iter().map(|b| b.to_string()).collect();
            format!("invalid hook '{s}', expected all, {}", valid.join(", "))
        })
    }
}

/// User selection of what to list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub hook: HookFilter,
    pub chain: Option<String>,
    pub table: Option<String>,
}

impl ReportFilter {
    fn accepts(&self, chain: &Chain) -> bool {
        let matches = |filter: &Option<String>, value: &str| match filter.as_deref() {
            None | Some(MATCH_ALL) => true,
            Some(wanted) => wanted == value,
        };
        matches(&self.chain, &chain.name) && matches(&self.table, &chain.table)
    }
}

/// Chain metadata row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRow {
    pub name: String,
    pub table: String,
    pub priority: i64,
    pub policy: Option<String>,
}

impl From<&Chain> for ChainRow {
    fn from(chain: &Chain) -> Self {
        Self {
            name: chain.name.clone(),
            table: chain.table.clone(),
            priority: chain.priority,
            policy: chain.policy.clone(),
        }
    }
}

/// One rendered rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    pub table: String,
    /// `chain/handle`
    pub handle: String,
    pub display: DisplayRow,
}

/// Chain rows followed by the rule rows that belong to them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowGroup {
    pub chains: Vec<ChainRow>,
    pub rules: Vec<RuleRow>,
}

/// Everything listed for one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub bucket: Bucket,
    /// Chains classified into the bucket, before filtering
    pub chain_count: usize,
    pub groups: Vec<RowGroup>,
}

/// Why a rule was left out of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TableMismatch {
        rule_table: String,
        chain_table: String,
    },
    Malformed(RuleError),
}

/// A rule that was not rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    pub chain: String,
    pub handle: Option<u64>,
    pub reason: SkipReason,
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::TableMismatch {
                rule_table,
                chain_table,
            } => write!(
                f,
                "skipping rule {}/{}: recorded table '{rule_table}' differs from chain table '{chain_table}'",
                self.chain,
                self.handle.map_or_else(|| "?".to_string(), |h| h.to_string()),
            ),
            SkipReason::Malformed(error) => {
                write!(f, "skipping malformed rule in {}: {error}", self.chain)
            }
        }
    }
}

/// Rendered report: sections in pipeline order plus skipped-rule warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub sections: Vec<Section>,
    pub warnings: Vec<RuleWarning>,
}

impl Report {
    /// Total number of rendered rule rows
    pub fn rule_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.groups)
            .map(|g| g.rules.len())
            .sum()
    }
}

/// Builds a [`Report`] from an indexed ruleset.
pub struct ReportBuilder<'a> {
    ruleset: &'a Ruleset,
    filter: ReportFilter,
    options: RenderOptions,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(ruleset: &'a Ruleset) -> Self {
        Self {
            ruleset,
            filter: ReportFilter::default(),
            options: RenderOptions::default(),
        }
    }

    pub fn filter(mut self, filter: ReportFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Lists every selected bucket. The unhooked bucket is split per chain,
    /// since its chains share no pipeline order.
    pub fn build(&self) -> Report {
        let buckets = HookBuckets::classify(&self.ruleset.chains);
        let mut report = Report::default();

        for bucket in Bucket::iter().filter(|b| self.filter.hook.selects(*b)) {
            let split = bucket == Bucket::Unhooked;
            if let Some(section) =
                self.build_section(bucket, buckets.get(bucket), split, &mut report.warnings)
            {
                report.sections.push(section);
            }
        }

        report
    }

    /// Builds one bucket. Returns `None` if no rule rows were produced.
    pub fn build_section(
        &self,
        bucket: Bucket,
        chains: &[&Chain],
        split_per_chain: bool,
        warnings: &mut Vec<RuleWarning>,
    ) -> Option<Section> {
        let mut groups = Vec::new();
        let mut current = RowGroup::default();

        for chain in chains.iter().filter(|c| self.filter.accepts(c)) {
            current.chains.push(ChainRow::from(*chain));

            for rule in self.ruleset.rules_for(&chain.name) {
                match self.render_owned_rule(chain, rule) {
                    Ok(row) => current.rules.push(row),
                    Err(reason) => warnings.push(RuleWarning {
                        chain: chain.name.clone(),
                        handle: rule.handle,
                        reason,
                    }),
                }
            }

            if split_per_chain {
                let group = std::mem::take(&mut current);
                if !group.rules.is_empty() {
                    groups.push(group);
                }
            }
        }

        if !split_per_chain && !current.rules.is_empty() {
            groups.push(current);
        }

        if groups.is_empty() {
            debug!("Nothing to list for hook {bucket}");
            return None;
        }

        Some(Section {
            bucket,
            chain_count: chains.len(),
            groups,
        })
    }

    fn render_owned_rule(&self, chain: &Chain, rule: &Rule) -> Result<RuleRow, SkipReason> {
        let rule_table = rule
            .table
            .as_deref()
            .ok_or(SkipReason::Malformed(RuleError::MissingField("table")))?;
        if rule_table != chain.table {
            return Err(SkipReason::TableMismatch {
                rule_table: rule_table.to_string(),
                chain_table: chain.table.clone(),
            });
        }

        let display = render_rule(rule, self.options).map_err(SkipReason::Malformed)?;
        let handle = rule
            .handle
            .ok_or(SkipReason::Malformed(RuleError::MissingField("handle")))?;

        Ok(RuleRow {
            table: rule_table.to_string(),
            handle: self
                .options
                .emphasis
                .paint(&format!("{}/{handle}", chain.name), Tone::Handle),
            display,
        })
    }
}
