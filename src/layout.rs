//! Text layout of a [`Report`]
//!
//! Each section is printed as
//!
//! ```text
//! Hook: input, Chains: 2
//!
//! chain  table   priority  default
//! ------ ------- --------- --------
//! input  filter         0  drop
//!
//! table   handle    pkts   bytes  target  log  proto  filter
//! ...
//! ```
//!
//! Sections of the unhooked bucket repeat the chain/rule table pair for every
//! chain. Column widths ignore ANSI escapes, so painted cells stay aligned.

use crate::core::error::{Error, Result};
use crate::core::hooks::Bucket;
use crate::core::report::{ChainRow, Report, RowGroup, RuleRow, Section};
use crate::style::{Emphasis, Tone};
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator, TableFormat};
use prettytable::{Cell, Row, Table};
use serde_json::Value;
use std::fmt::Write;

const CHAIN_COLUMNS: [&str; 4] = ["chain", "table", "priority", "default"];
const RULE_COLUMNS: [&str; 8] = [
    "table", "handle", "pkts", "bytes", "target", "log", "proto", "filter",
];

fn table_format() -> TableFormat {
    FormatBuilder::new()
        .column_separator(' ')
        .separator(LinePosition::Title, LineSeparator::new('-', ' ', ' ', ' '))
        .padding(0, 1)
        .build()
}

fn titles(columns: &[&str], right_aligned: &[usize]) -> Row {
    Row::new(
        columns
            .iter()
            .enumerate()
            .map(|(i, name)| aligned(name, right_aligned.contains(&i)))
            .collect(),
    )
}

fn aligned(text: &str, right: bool) -> Cell {
    if right {
        Cell::new(text).style_spec("r")
    } else {
        Cell::new(text)
    }
}

fn optional(text: Option<&str>) -> Cell {
    Cell::new(text.unwrap_or_default())
}

fn chain_table(chains: &[ChainRow]) -> Table {
    let mut table = Table::new();
    table.set_format(table_format());
    table.set_titles(titles(&CHAIN_COLUMNS, &[2]));

    for chain in chains {
        table.add_row(Row::new(vec![
            Cell::new(&chain.name),
            Cell::new(&chain.table),
            aligned(&chain.priority.to_string(), true),
            optional(chain.policy.as_deref()),
        ]));
    }
    table
}

fn rule_table(rules: &[RuleRow]) -> Table {
    let mut table = Table::new();
    table.set_format(table_format());
    table.set_titles(titles(&RULE_COLUMNS, &[2, 3]));

    for rule in rules {
        let display = &rule.display;
        table.add_row(Row::new(vec![
            Cell::new(&rule.table),
            Cell::new(&rule.handle),
            aligned(display.packets.as_deref().unwrap_or_default(), true),
            aligned(display.bytes.as_deref().unwrap_or_default(), true),
            optional(display.target.as_deref()),
            optional(display.log.as_deref()),
            Cell::new(&display.family),
            Cell::new(&display.filter),
        ]));
    }
    table
}

/// `Hook: <name>, Chains: <n>`
pub fn section_header(bucket: Bucket, chain_count: usize, emphasis: Emphasis) -> String {
    format!(
        "Hook: {}, Chains: {chain_count}",
        emphasis.paint(bucket.as_ref(), Tone::Hook)
    )
}

fn write_group(out: &mut String, group: &RowGroup) {
    let _ = writeln!(out, "{}", chain_table(&group.chains));
    let _ = writeln!(out, "{}", rule_table(&group.rules));
}

/// Lays out one section.
pub fn render_section(section: &Section, emphasis: Emphasis) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}\n",
        section_header(section.bucket, section.chain_count, emphasis)
    );
    for group in &section.groups {
        write_group(&mut out, group);
    }
    out
}

/// Lays out the whole report. An empty report renders as an empty string.
pub fn render_report(report: &Report, emphasis: Emphasis) -> String {
    report
        .sections
        .iter()
        .map(|section| render_section(section, emphasis))
        .collect()
}

/// One statement per line
pub fn render_set_lines(lines: &[String]) -> String {
    lines.iter().fold(String::new(), |mut out, line| {
        let _ = writeln!(out, "{line}");
        out
    })
}

/// Returns the listing unchanged once it is known to be an nftables document.
///
/// # Errors
///
/// Returns [`Error::MalformedDocument`] if `text` is not JSON or has no
/// top-level `nftables` array.
pub fn json_passthrough(text: &str) -> Result<&str> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| Error::MalformedDocument(e.to_string()))?;
    if document.get("nftables").is_some_and(Value::is_array) {
        Ok(text)
    } else {
        Err(Error::MalformedDocument("missing nftables array".to_string()))
    }
}
