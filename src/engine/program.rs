//! Rule-program compilation and indexing.
//!
//! This module holds the *static* side of the engine: the immutable
//! [`RuleProgram`] compiled once from source text and shared (read-only)
//! across every evaluation that follows.
//!
//! Parsing is intentionally split into two phases:
//!
//! 1. **Compile** (this module): parse the line-based program source into
//!    rule definitions, resolve references, validate, and precompute cheap
//!    per-alternative gates (`AltFlags`).
//! 2. **Run** (see `matcher.rs`): depth-first expansion of the compiled
//!    rules against a token sequence.
//!
//! ## Source syntax
//!
//! ```text
//! # comment
//! program statement                  # names the entry rule
//!
//! rule statement -> top:             # '-> top' declares the result variable
//!     greeting top:@person           # one alternative per line
//!     top:greeting
//!
//! rule greeting -> word:
//!     word:"hello"
//! ```
//!
//! Items are whitespace-separated, each optionally prefixed `var:`:
//!
//! - `"word"` literal (normalized token equality)
//! - `/pattern/` category (anchored regex on the normalized token)
//! - `@ns` / `@` graph-vertex lookup (optionally within a namespace)
//! - `name` sub-rule reference
//!
//! ## Validation
//!
//! - malformed lines, bad category patterns, duplicate rule names, a rule
//!   with no alternatives, or an entry rule without a result variable are
//!   [`CompileError::Syntax`];
//! - an item naming an undefined rule, or a result variable some alternative
//!   never binds, is [`CompileError::UnknownReference`];
//! - a reference cycle in which no participating rule has a non-recursive
//!   alternative is [`CompileError::CycleWithoutBase`], detected with a
//!   groundedness least-fixpoint: every traversal of such a cycle would be
//!   infinite, so the program is rejected up front.
//!
//! ## Invariants
//!
//! - `RuleId` is an index into `RuleProgram::rules`; `by_name` stays aligned
//!   with that vector.
//! - A compiled program never changes. Evaluations against it are safe to
//!   run concurrently; each run allocates its own context state.

use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char as pchar, space0, space1};
use nom::combinator::{all_consuming, map, opt};
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded, terminated};
use nom::IResult;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

/// Rule identifier (index into the rules vector).
pub(crate) type RuleId = usize;

bitflags::bitflags! {
    /// Cheap per-alternative gates computed at compile time.
    ///
    /// The matcher uses `HAS_SUBRULE` to skip alternatives that cannot
    /// complete once the depth budget is exhausted, without walking their
    /// items.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AltFlags: u8 {
        const HAS_SUBRULE = 1 << 0;
        const HAS_LOOKUP  = 1 << 1;
    }
}

/// Leaf matching condition against a single token.
#[derive(Debug)]
pub(crate) enum Term {
    /// Normalized token must equal the literal.
    Literal(String),
    /// Anchored pattern must match the normalized token.
    Category(Regex),
    /// Token must resolve to a graph vertex, optionally within a namespace.
    Lookup(Option<String>),
}

#[derive(Debug)]
pub(crate) enum ItemKind {
    Term(Term),
    SubRule(RuleId),
}

/// One positional element of an alternative, optionally binding a variable.
#[derive(Debug)]
pub(crate) struct Item {
    pub var: Option<String>,
    pub kind: ItemKind,
}

#[derive(Debug)]
pub(crate) struct Alternative {
    pub items: Vec<Item>,
    pub flags: AltFlags,
}

/// A named pattern node: ordered alternatives, optionally declaring the
/// variable whose bound value is the rule's result.
#[derive(Debug)]
pub(crate) struct RuleDef {
    pub name: String,
    pub result: Option<String>,
    pub alternatives: Vec<Alternative>,
}

/// Why a program failed to compile. Fatal to engine initialization; always
/// reported, never swallowed.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("rule \"{rule}\" references undefined name \"{name}\"")]
    UnknownReference { rule: String, name: String },
    #[error("rule(s) {rules:?} form a reference cycle with no non-recursive alternative")]
    CycleWithoutBase { rules: Vec<String> },
}

/// An immutable, compiled set of hierarchical matching rules with one entry
/// point. Owned by the engine instance that compiled it; safely shared
/// (read-only) across concurrent evaluations.
#[derive(Debug)]
pub struct RuleProgram {
    pub(crate) rules: Vec<RuleDef>,
    pub(crate) by_name: HashMap<String, RuleId>,
    pub(crate) entry: RuleId,
}

impl RuleProgram {
    /// Compile program source text. No side effects beyond allocation.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        let debug = std::env::var_os("LEXIGRAPH_DEBUG_RULES").is_some();

        let mut entry_name: Option<String> = None;
        let mut headers: Vec<RawRule> = Vec::new();

        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("program ") {
                let name = rest.trim();
                if entry_name.is_some() {
                    return Err(syntax(line_no, "duplicate program directive"));
                }
                if name.is_empty() || !name.chars().all(is_ident_char) {
                    return Err(syntax(line_no, "program directive expects a rule name"));
                }
                entry_name = Some(name.to_string());
                continue;
            }

            if let Some(rest) = line.strip_prefix("rule ") {
                let (name, result) = parse_rule_header(rest, line_no)?;
                if headers.iter().any(|r| r.name == name) {
                    return Err(syntax(line_no, format!("duplicate rule \"{name}\"")));
                }
                headers.push(RawRule { name, result, line: line_no, alternatives: Vec::new() });
                continue;
            }

            let Some(current) = headers.last_mut() else {
                return Err(syntax(line_no, "pattern line outside of a rule"));
            };
            match alternative_line(line) {
                Ok((_, items)) => current.alternatives.push((items, line_no)),
                Err(_) => return Err(syntax(line_no, "invalid pattern item")),
            }
        }

        if headers.is_empty() {
            return Err(syntax(source.lines().count().max(1), "program declares no rules"));
        }
        for raw in &headers {
            if raw.alternatives.is_empty() {
                return Err(syntax(raw.line, format!("rule \"{}\" has no alternatives", raw.name)));
            }
        }

        let by_name: HashMap<String, RuleId> =
            headers.iter().enumerate().map(|(id, r)| (r.name.clone(), id)).collect();

        let entry = match &entry_name {
            Some(name) => *by_name.get(name).ok_or_else(|| CompileError::UnknownReference {
                rule: "program".to_string(),
                name: name.clone(),
            })?,
            None => 0,
        };

        let entry_line = headers[entry].line;
        let mut rules = Vec::with_capacity(headers.len());
        for raw in headers {
            rules.push(lower_rule(raw, &by_name)?);
        }

        let entry_rule = &rules[entry];
        if entry_rule.result.is_none() {
            return Err(syntax(
                entry_line,
                format!("entry rule \"{}\" must declare a result variable", entry_rule.name),
            ));
        }

        check_grounded(&rules)?;

        if debug {
            eprintln!(
                "[compile] {} rule(s), entry=\"{}\"",
                rules.len(),
                rules[entry].name
            );
        }

        Ok(RuleProgram { rules, by_name, entry })
    }

    /// Name of the entry-point rule.
    pub fn entry_rule(&self) -> &str {
        &self.rules[self.entry].name
    }

    /// O(1) lookup of a rule by name.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Rule names in declaration order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }
}

struct RawRule {
    name: String,
    result: Option<String>,
    line: usize,
    alternatives: Vec<(Vec<RawItem>, usize)>,
}

fn syntax(line: usize, message: impl Into<String>) -> CompileError {
    CompileError::Syntax { line, message: message.into() }
}

/// Parse the remainder of a `rule` header: `name [-> var] :`.
fn parse_rule_header(rest: &str, line: usize) -> Result<(String, Option<String>), CompileError> {
    let Some(rest) = rest.trim().strip_suffix(':') else {
        return Err(syntax(line, "rule header must end with ':'"));
    };
    let (name, result) = match rest.split_once("->") {
        Some((name, var)) => (name.trim(), Some(var.trim())),
        None => (rest.trim(), None),
    };
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(syntax(line, "rule header expects a rule name"));
    }
    if let Some(var) = result {
        if var.is_empty() || !var.chars().all(is_ident_char) {
            return Err(syntax(line, "rule header expects a variable name after '->'"));
        }
    }
    Ok((name.to_string(), result.map(str::to_string)))
}

fn lower_rule(raw: RawRule, by_name: &HashMap<String, RuleId>) -> Result<RuleDef, CompileError> {
    let mut alternatives = Vec::with_capacity(raw.alternatives.len());
    for (items, line) in raw.alternatives {
        let mut flags = AltFlags::empty();
        let mut lowered = Vec::with_capacity(items.len());
        let mut bound = false;

        for item in items {
            let kind = match item.kind {
                RawItemKind::Literal(text) => {
                    if text.is_empty() || text.chars().any(char::is_whitespace) {
                        return Err(syntax(line, "a literal matches exactly one token"));
                    }
                    ItemKind::Term(Term::Literal(text))
                }
                RawItemKind::Category(pattern) => {
                    let re = Regex::new(&format!("^(?:{pattern})$"))
                        .map_err(|e| syntax(line, format!("invalid category pattern: {e}")))?;
                    ItemKind::Term(Term::Category(re))
                }
                RawItemKind::Lookup(namespace) => {
                    flags |= AltFlags::HAS_LOOKUP;
                    ItemKind::Term(Term::Lookup(namespace))
                }
                RawItemKind::Reference(name) => {
                    let id = by_name.get(&name).ok_or_else(|| CompileError::UnknownReference {
                        rule: raw.name.clone(),
                        name: name.clone(),
                    })?;
                    flags |= AltFlags::HAS_SUBRULE;
                    ItemKind::SubRule(*id)
                }
            };
            bound |= item.var.as_deref() == raw.result.as_deref() && item.var.is_some();
            lowered.push(Item { var: item.var, kind });
        }

        if let (Some(var), false) = (&raw.result, bound) {
            return Err(CompileError::UnknownReference { rule: raw.name.clone(), name: var.clone() });
        }
        alternatives.push(Alternative { items: lowered, flags });
    }
    Ok(RuleDef { name: raw.name, result: raw.result, alternatives })
}

/// Groundedness least-fixpoint: a rule is grounded when some alternative
/// references only grounded rules (leaf items are always grounded). Rules
/// that never become grounded sit on a cycle with no non-recursive
/// alternative.
fn check_grounded(rules: &[RuleDef]) -> Result<(), CompileError> {
    let mut grounded = vec![false; rules.len()];
    loop {
        let mut changed = false;
        for (id, rule) in rules.iter().enumerate() {
            if grounded[id] {
                continue;
            }
            let ok = rule.alternatives.iter().any(|alt| {
                alt.items.iter().all(|item| match item.kind {
                    ItemKind::SubRule(sub) => grounded[sub],
                    ItemKind::Term(_) => true,
                })
            });
            if ok {
                grounded[id] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut ungrounded: Vec<String> = rules
        .iter()
        .enumerate()
        .filter(|(id, _)| !grounded[*id])
        .map(|(_, r)| r.name.clone())
        .collect();
    if ungrounded.is_empty() {
        Ok(())
    } else {
        ungrounded.sort();
        Err(CompileError::CycleWithoutBase { rules: ungrounded })
    }
}

// --- Line parser --------------------------------------------------------------

#[derive(Debug)]
enum RawItemKind {
    Literal(String),
    Category(String),
    Lookup(Option<String>),
    Reference(String),
}

#[derive(Debug)]
struct RawItem {
    var: Option<String>,
    kind: RawItemKind,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(is_ident_char)(input)
}

fn literal(input: &str) -> IResult<&str, RawItemKind> {
    map(delimited(pchar('"'), take_while(|c| c != '"'), pchar('"')), |s: &str| {
        RawItemKind::Literal(s.to_lowercase())
    })(input)
}

fn category(input: &str) -> IResult<&str, RawItemKind> {
    map(delimited(pchar('/'), take_while1(|c| c != '/'), pchar('/')), |s: &str| {
        RawItemKind::Category(s.to_string())
    })(input)
}

fn lookup(input: &str) -> IResult<&str, RawItemKind> {
    map(preceded(pchar('@'), opt(ident)), |ns| {
        RawItemKind::Lookup(ns.map(str::to_string))
    })(input)
}

fn reference(input: &str) -> IResult<&str, RawItemKind> {
    map(ident, |s: &str| RawItemKind::Reference(s.to_string()))(input)
}

fn item(input: &str) -> IResult<&str, RawItem> {
    let (input, var) = opt(terminated(ident, pchar(':')))(input)?;
    let (input, kind) = alt((literal, category, lookup, reference))(input)?;
    Ok((input, RawItem { var: var.map(str::to_string), kind }))
}

fn alternative_line(input: &str) -> IResult<&str, Vec<RawItem>> {
    all_consuming(delimited(space0, separated_list1(space1, item), space0))(input)
}
