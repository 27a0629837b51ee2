//! Rule expression model and renderer
//!
//! A rule's `expr` array is a sequence of single-key objects such as
//! `{"match": {...}}`, `{"counter": {...}}` or `{"accept": null}`. Each one is
//! parsed into an [`Expression`] and the whole list is folded into one
//! [`DisplayRow`]: match terms joined with `AND`, the effective target, the
//! counters and the log annotation.
//!
//! Shapes we do not know are kept as [`Expression::Unknown`] and show up in
//! the filter column as `[unknown: ['key']]`, so nothing disappears silently.

use crate::core::counters::format_counter;
use crate::core::error::RuleError;
use crate::core::ruleset::Rule;
use crate::core::sets::format_element;
use crate::style::{Emphasis, Tone};
use serde_json::{Map, Value};

/// Joined match text longer than this is broken onto one line per term.
pub const MAX_INLINE_FILTER_LEN: usize = 60;

/// Filter text of a rule without match expressions
pub const WILDCARD: &str = "*";

/// One parsed rule expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Match(Match),
    /// Legacy xtables extension; only targets are recoverable
    Xt { target: Option<String> },
    Counter { packets: u64, bytes: u64 },
    Verdict(Verdict),
    Log {
        level: Option<String>,
        prefix: Option<String>,
    },
    /// Parsed but never displayed
    NonDisplay(NonDisplay),
    /// Anything else, by top-level keys
    Unknown(Vec<String>),
}

/// `left op right` comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub left: String,
    pub op: String,
    pub right: Operand,
}

/// Right-hand side of a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `@name` reference to a named set
    SetRef(String),
    /// `addr/len`
    Prefix(String),
    /// Anonymous set literal `{ a, b }`
    Set(String),
    /// `low-high`
    Range(String),
    Literal(String),
}

impl Operand {
    fn text(&self) -> &str {
        match self {
            Operand::SetRef(s)
            | Operand::Prefix(s)
            | Operand::Set(s)
            | Operand::Range(s)
            | Operand::Literal(s) => s,
        }
    }

    /// Membership operands always read as `in`
    fn forces_in(&self) -> bool {
        !matches!(self, Operand::Literal(_))
    }
}

impl Match {
    /// Operator as displayed
    pub fn display_op(&self) -> &str {
        if self.right.forces_in() { "in" } else { &self.op }
    }

    /// Unstyled `left op right`
    pub fn plain(&self) -> String {
        format!("{} {} {}", self.left, self.display_op(), self.right.text())
    }

    fn styled(&self, emphasis: Emphasis) -> String {
        match &self.right {
            Operand::SetRef(name) => format!(
                "{} {} {}",
                self.left,
                self.display_op(),
                emphasis.paint(name, Tone::SetReference)
            ),
            _ => self.plain(),
        }
    }
}

/// Target-producing statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Drop,
    Reject,
    Return,
    Jump(String),
    Goto(String),
    Masquerade,
    Snat,
    Dnat,
    Redirect,
}

impl Verdict {
    /// Target column label, e.g. `jump services`
    pub fn label(&self, emphasis: Emphasis) -> String {
        match self {
            Verdict::Accept => emphasis.paint("accept", Tone::Accept),
            Verdict::Drop => emphasis.paint("drop", Tone::Drop),
            Verdict::Reject => emphasis.paint("reject", Tone::Reject),
            Verdict::Return => emphasis.paint("return", Tone::Return),
            Verdict::Jump(dest) => format!("{} {dest}", emphasis.paint("jump", Tone::Branch)),
            Verdict::Goto(dest) => format!("{} {dest}", emphasis.paint("goto", Tone::Branch)),
            Verdict::Masquerade => emphasis.paint("masquerade", Tone::Nat),
            Verdict::Snat => emphasis.paint("snat", Tone::Nat),
            Verdict::Dnat => emphasis.paint("dnat", Tone::Nat),
            Verdict::Redirect => emphasis.paint("redirect", Tone::Nat),
        }
    }
}

/// Statements that never contribute to the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonDisplay {
    Queue,
    Limit,
    Quota,
    Notrack,
    /// `{"counter": "name"}` reference to a named counter object
    NamedCounter,
}

/// Generic text form of a JSON value: strings verbatim, everything else as
/// compact JSON.
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field<'a>(object: &'a Value, key: &str, missing: &'static str) -> Result<&'a Value, RuleError> {
    object.get(key).ok_or(RuleError::MissingField(missing))
}

fn string_field(object: &Value, key: &str, missing: &'static str) -> Result<String, RuleError> {
    field(object, key, missing).map(literal)
}

fn u64_field(object: &Value, key: &str, missing: &'static str) -> Result<u64, RuleError> {
    field(object, key, missing)?
        .as_u64()
        .ok_or(RuleError::InvalidField {
            field: missing,
            expected: "an unsigned integer",
        })
}

/// Short label for the left side of a match.
fn left_label(left: &Value) -> Result<String, RuleError> {
    if let Some(meta) = left.get("meta")
        && let Some(key) = meta.get("key")
    {
        return Ok(literal(key));
    }

    if let Some(payload) = left.get("payload") {
        if payload.get("protocol").is_some() || payload.get("field").is_some() {
            let protocol = string_field(payload, "protocol", "payload.protocol")?;
            let field = string_field(payload, "field", "payload.field")?;
            return Ok(format!("{protocol} {field}"));
        }
        // raw payload expression
        let base = string_field(payload, "base", "payload.base")?;
        let offset = string_field(payload, "offset", "payload.offset")?;
        let len = string_field(payload, "len", "payload.len")?;
        return Ok(format!("@{base},{offset},{len}"));
    }

    if let Some(ct) = left.get("ct") {
        return string_field(ct, "key", "ct.key");
    }

    Ok(literal(left))
}

/// Classifies the right side of a match.
fn right_operand(right: &Value) -> Result<Operand, RuleError> {
    match right {
        Value::String(s) if s.starts_with('@') => Ok(Operand::SetRef(s.clone())),
        Value::Object(map) => {
            let present = |key: &str| map.get(key).filter(|v| !v.is_null());

            if let Some(prefix) = present("prefix") {
                let addr = string_field(prefix, "addr", "prefix.addr")?;
                let len = string_field(prefix, "len", "prefix.len")?;
                Ok(Operand::Prefix(format!("{addr}/{len}")))
            } else if let Some(set) = present("set") {
                Ok(Operand::Set(set_literal(set)))
            } else if let Some(range) = present("range") {
                let bounds = range.as_array().filter(|b| b.len() >= 2).ok_or(
                    RuleError::InvalidField {
                        field: "range",
                        expected: "a two-element array",
                    },
                )?;
                Ok(Operand::Range(format!(
                    "{}-{}",
                    literal(&bounds[0]),
                    literal(&bounds[1])
                )))
            } else {
                Ok(Operand::Literal(right.to_string()))
            }
        }
        other => Ok(Operand::Literal(literal(other))),
    }
}

/// `{ a, b, c }` form of an anonymous set
fn set_literal(set: &Value) -> String {
    match set.as_array() {
        Some(items) => {
            let items: Vec<String> = items.iter().filter_map(format_element).collect();
            format!("{{ {} }}", items.join(", "))
        }
        None => literal(set),
    }
}

impl Expression {
    /// Parses one element of a rule's `expr` array.
    ///
    /// Keys are tested in a fixed order, so an object carrying several
    /// statement keys is read as the first one found.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if a recognised statement lacks a field it needs.
    pub fn parse(value: &Value) -> Result<Self, RuleError> {
        let Some(object) = value.as_object() else {
            return Ok(Expression::Unknown(Vec::new()));
        };

        if let Some(m) = object.get("match") {
            let left = left_label(field(m, "left", "match.left")?)?;
            let op = string_field(m, "op", "match.op")?;
            let right = right_operand(field(m, "right", "match.right")?)?;
            return Ok(Expression::Match(Match { left, op, right }));
        }

        if let Some(xt) = object.get("xt") {
            let kind = string_field(xt, "type", "xt.type")?;
            let target = if kind == "target" {
                Some(string_field(xt, "name", "xt.name")?)
            } else {
                None
            };
            return Ok(Expression::Xt { target });
        }

        if let Some(counter) = object.get("counter") {
            if counter.is_string() {
                return Ok(Expression::NonDisplay(NonDisplay::NamedCounter));
            }
            let packets = u64_field(counter, "packets", "counter.packets")?;
            let bytes = u64_field(counter, "bytes", "counter.bytes")?;
            return Ok(Expression::Counter { packets, bytes });
        }

        if let Some(action) = parse_action(object)? {
            return Ok(action);
        }

        if object.contains_key("queue") {
            return Ok(Expression::NonDisplay(NonDisplay::Queue));
        }
        if object.contains_key("limit") {
            return Ok(Expression::NonDisplay(NonDisplay::Limit));
        }
        if object.contains_key("quota") {
            return Ok(Expression::NonDisplay(NonDisplay::Quota));
        }
        if object.contains_key("notrack") {
            return Ok(Expression::NonDisplay(NonDisplay::Notrack));
        }

        Ok(Expression::Unknown(object.keys().cloned().collect()))
    }

    /// Parses a whole `expr` array; the first malformed element fails the rule.
    pub fn parse_all(values: &[Value]) -> Result<Vec<Self>, RuleError> {
        values.iter().map(Self::parse).collect()
    }
}

/// Verdicts and `log`, in lookup order: `log` is tested between
/// `masquerade` and the NAT verbs.
fn parse_action(object: &Map<String, Value>) -> Result<Option<Expression>, RuleError> {
    if let Some(jump) = object.get("jump") {
        let target = string_field(jump, "target", "jump.target")?;
        return Ok(Some(Expression::Verdict(Verdict::Jump(target))));
    }
    for (key, verdict) in [
        ("return", Verdict::Return),
        ("drop", Verdict::Drop),
        ("reject", Verdict::Reject),
        ("accept", Verdict::Accept),
        ("masquerade", Verdict::Masquerade),
    ] {
        if object.contains_key(key) {
            return Ok(Some(Expression::Verdict(verdict)));
        }
    }
    if let Some(log) = object.get("log") {
        return Ok(Some(parse_log(log)));
    }
    for (key, verdict) in [
        ("snat", Verdict::Snat),
        ("dnat", Verdict::Dnat),
        ("redirect", Verdict::Redirect),
    ] {
        if object.contains_key(key) {
            return Ok(Some(Expression::Verdict(verdict)));
        }
    }
    if let Some(goto) = object.get("goto") {
        let target = string_field(goto, "target", "goto.target")?;
        return Ok(Some(Expression::Verdict(Verdict::Goto(target))));
    }
    Ok(None)
}

/// How rows are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Print counters as exact integers instead of `1.2 K`
    pub exact: bool,
    pub emphasis: Emphasis,
}

/// Display columns of one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayRow {
    pub packets: Option<String>,
    pub bytes: Option<String>,
    pub target: Option<String>,
    pub log: Option<String>,
    pub family: String,
    pub filter: String,
}

enum Term<'a> {
    Match(&'a Match),
    Text(String),
}

impl Term<'_> {
    fn plain(&self) -> String {
        match self {
            Term::Match(m) => m.plain(),
            Term::Text(t) => t.clone(),
        }
    }

    fn styled(&self, emphasis: Emphasis) -> String {
        match self {
            Term::Match(m) => m.styled(emphasis),
            Term::Text(t) => t.clone(),
        }
    }
}

fn unknown_text(keys: &[String]) -> String {
    let quoted: Vec<String> = keys.iter().map(|k| format!("'{k}'")).collect();
    format!("[unknown: [{}]]", quoted.join(", "))
}

/// Folds parsed expressions into a display row.
///
/// The last verdict wins. Counters are formatted unless `options.exact`.
///
/// # Errors
///
/// Only counter formatting can fail here, which does not happen for finite
/// counter values.
pub fn render_expressions(
    expressions: &[Expression],
    family: &str,
    options: RenderOptions,
) -> Result<DisplayRow, RuleError> {
    let mut row = DisplayRow {
        family: family.to_string(),
        ..DisplayRow::default()
    };
    let mut terms: Vec<Term<'_>> = Vec::new();

    for expression in expressions {
        match expression {
            Expression::Match(m) => terms.push(Term::Match(m)),
            Expression::Xt { target: Some(name) } => row.target = Some(name.clone()),
            Expression::Xt { target: None } => terms.push(Term::Text("XT".to_string())),
            Expression::Counter { packets, bytes } => {
                if options.exact {
                    row.packets = Some(packets.to_string());
                    row.bytes = Some(bytes.to_string());
                } else {
                    row.packets = Some(format_counter(*packets)?);
                    row.bytes = Some(format_counter(*bytes)?);
                }
            }
            Expression::Verdict(verdict) => row.target = Some(verdict.label(options.emphasis)),
            Expression::Log { level, prefix } => {
                row.log = Some(format!(
                    "level: {}, prefix: \"{}\"",
                    level.as_deref().unwrap_or("-"),
                    prefix.as_deref().unwrap_or("-")
                ));
            }
            Expression::NonDisplay(_) => {}
            Expression::Unknown(keys) => terms.push(Term::Text(unknown_text(keys))),
        }
    }

    if terms.is_empty() {
        terms.push(Term::Text(WILDCARD.to_string()));
    }

    let plain_len = terms
        .iter()
        .map(|t| t.plain().chars().count())
        .sum::<usize>()
        + " AND ".len() * (terms.len() - 1);

    let styled: Vec<String> = terms.iter().map(|t| t.styled(options.emphasis)).collect();
    row.filter = if plain_len > MAX_INLINE_FILTER_LEN {
        styled.join("\nAND ")
    } else {
        let connector = format!(" {} ", options.emphasis.paint("AND", Tone::Connector));
        styled.join(connector.as_str())
    };

    Ok(row)
}

/// Renders one rule.
///
/// # Errors
///
/// Returns [`RuleError::MissingField`] if the rule has no `family` or `expr`,
/// or any error from parsing its expressions.
pub fn render_rule(rule: &Rule, options: RenderOptions) -> Result<DisplayRow, RuleError> {
    let exprs = rule.expr.as_deref().ok_or(RuleError::MissingField("expr"))?;
    let family = rule
        .family
        .as_deref()
        .ok_or(RuleError::MissingField("family"))?;
    let expressions = Expression::parse_all(exprs)?;
    render_expressions(&expressions, family, options)
}

/// Parses `{"log": {...}}` bodies. `{"log": null}` carries no options.
fn parse_log(log: &Value) -> Expression {
    Expression::Log {
        level: log.get("level").filter(|v| !v.is_null()).map(literal),
        prefix: log.get("prefix").filter(|v| !v.is_null()).map(literal),
    }
}
