//! Matching and evaluation.
//!
//! This module is the operational core of the engine:
//!
//! - Try each sentence-start alignment as an independent top-level attempt.
//! - For each attempt, expand the entry rule depth-first over the token
//!   sequence, trying alternatives in declared order.
//! - Bound exploration of cyclic rule references with a per-path recursion
//!   budget, and collapse re-derived states with signature dedup
//!   (see `dedup.rs`).
//! - Resolve each completed candidate's result binding against the graph
//!   (see `resolve.rs`) and group the survivors into `ContextGroup`s.
//!
//! ## Key concepts
//!
//! - **Rule** (`program.rs`): ordered alternatives of positional items.
//! - **PartialMatch**: a partially matched alternative as the engine
//!   advances through its items.
//! - **RuleMatch**: one complete way a rule matched from a given position.
//! - **Context / ContextGroup** (`crate`): the caller-facing results.
//!
//! ## Search shape
//!
//! ```text
//! for each start alignment:
//!     match entry rule at depth 0
//!         for each alternative (declared order):
//!             work-stack expansion of PartialMatches
//!                 Term items     -> single continuation or dead branch
//!                 SubRule items  -> recurse (depth + 1), one continuation
//!                                   per sub-match, preferred first
//!     keep completions that consumed through the last token
//!     resolve result bindings; misses prune the candidate
//!     survivors (if any) -> one ContextGroup
//! ```
//!
//! The output is deterministic for a given program, token sequence, and
//! depth budget: every collection iterated here is ordered, and hash sets
//! are used only for membership tests.
//!
//! ## Depth policy
//!
//! `max_depth` bounds rule-nesting depth per search path: the entry rule
//! runs at depth 0 and descending into a sub-rule reference requires
//! `depth < max_depth`. Exhausting the budget abandons the branch as "no
//! match along this path"; it is never an error. The budget is the caller's
//! tradeoff: too small truncates deeply nested parses, too large risks
//! combinatorial blow-up on ambiguous cyclic grammars.
//!
//! ## Debugging
//!
//! Setting `LEXIGRAPH_DEBUG_RULES=1` prints trace information about rule
//! entry, completions, and pruning.

use super::dedup::ContextKey;
use super::metrics::{AttemptMetrics, MatchCounters, MatchMetrics, RunMetrics, RunResult};
use super::program::{AltFlags, ItemKind, RuleId, RuleProgram, Term};
use super::resolve::resolve_value;
use super::tokenizer::Token;
use crate::graph::GraphStore;
use crate::{Binding, BoundValue, Context, ContextGroup};
use std::collections::HashSet;
use std::time::Instant;

/// Internal helper representing a partially matched alternative as the
/// engine advances through its items.
///
/// ```text
/// items: [ Literal("hello"), SubRule(person) ]
///          ^ next_idx (0-based) when the first item is consumed
///
/// pos points one past the last consumed token
/// ```
struct PartialMatch {
    next_idx: usize,
    pos: usize,
    bindings: Vec<Binding>,
    result: Option<BoundValue>,
}

/// One complete way a rule matched from a given start position.
struct RuleMatch {
    alternative: usize,
    end: usize,
    bindings: Vec<Binding>,
    result: Option<BoundValue>,
}

/// Matcher orchestrates evaluating a compiled [`RuleProgram`] against a
/// token sequence.
///
/// Usage: create with `Matcher::new(program, tokens, store, max_depth)` then
/// call [`run`](Matcher::run). The call is read-only with respect to the
/// program, the tokens, and the store; it allocates only its own context
/// state, so any number of matchers may run concurrently against one shared
/// program.
pub struct Matcher<'a> {
    program: &'a RuleProgram,
    tokens: &'a [Token],
    store: &'a dyn GraphStore,
    max_depth: usize,
    counters: MatchCounters,
}

impl<'a> Matcher<'a> {
    pub fn new(
        program: &'a RuleProgram,
        tokens: &'a [Token],
        store: &'a dyn GraphStore,
        max_depth: usize,
    ) -> Self {
        Matcher { program, tokens, store, max_depth, counters: MatchCounters::default() }
    }

    /// Run the evaluation: one top-level attempt per start alignment, one
    /// group per attempt that produced at least one completed context.
    ///
    /// An empty result is the ordinary "no interpretation found" outcome,
    /// not an error.
    pub fn run(mut self) -> RunResult {
        let debug = std::env::var_os("LEXIGRAPH_DEBUG_RULES").is_some();
        let total_start = Instant::now();
        let mut groups = Vec::new();
        let mut attempts = Vec::new();

        for start in 0..self.tokens.len() {
            let attempt_start = Instant::now();
            self.counters = MatchCounters::default();

            let matches = self.match_rule(self.program.entry, start, 0);
            let mut contexts = Vec::new();
            for m in matches {
                if m.end != self.tokens.len() {
                    continue;
                }
                // The compiler guarantees the entry rule binds its result
                // variable on every alternative.
                let Some(result) = m.result else { continue };
                let Some(vertex) = resolve_value(self.store, self.tokens, &result) else {
                    self.counters.lookup_misses += 1;
                    continue;
                };
                contexts.push(Context::new(start, m.end, m.alternative, m.bindings, vertex));
            }

            if debug {
                eprintln!(
                    "[attempt] start={} completed={} explored={} depth_pruned={}",
                    start,
                    contexts.len(),
                    self.counters.explored,
                    self.counters.depth_pruned,
                );
            }

            attempts.push(AttemptMetrics {
                start,
                duration: attempt_start.elapsed(),
                completed: contexts.len(),
                counters: self.counters.clone(),
            });
            if !contexts.is_empty() {
                groups.push(ContextGroup::new(start, contexts));
            }
        }

        let match_total = total_start.elapsed();
        RunResult {
            groups,
            metrics: RunMetrics {
                total: match_total,
                matching: MatchMetrics { total: match_total, attempts },
                resolve: std::time::Duration::ZERO,
            },
        }
    }

    /// Find every way `rule_id` matches starting at token `pos`, in
    /// preference order (declared alternative order, then sub-match
    /// preference), deduplicated by signature.
    fn match_rule(&mut self, rule_id: RuleId, pos: usize, depth: usize) -> Vec<RuleMatch> {
        let program = self.program;
        let tokens = self.tokens;
        let rule = &program.rules[rule_id];

        let mut results: Vec<RuleMatch> = Vec::new();
        let mut seen: HashSet<ContextKey> = HashSet::new();

        for (alt_idx, alt) in rule.alternatives.iter().enumerate() {
            // An alternative that descends cannot complete once the budget
            // is exhausted; skip it without walking its items.
            if depth == self.max_depth && alt.flags.contains(AltFlags::HAS_SUBRULE) {
                self.counters.depth_pruned += 1;
                continue;
            }

            let mut stack = vec![PartialMatch {
                next_idx: 0,
                pos,
                bindings: Vec::new(),
                result: None,
            }];

            while let Some(m) = stack.pop() {
                self.counters.explored += 1;

                if m.next_idx == alt.items.len() {
                    let key = ContextKey::new(alt_idx, m.pos, &m.bindings, m.result.as_ref());
                    if seen.insert(key) {
                        results.push(RuleMatch {
                            alternative: alt_idx,
                            end: m.pos,
                            bindings: m.bindings,
                            result: m.result,
                        });
                    } else {
                        self.counters.dedup_skipped += 1;
                    }
                    continue;
                }

                let item = &alt.items[m.next_idx];
                match &item.kind {
                    ItemKind::Term(term) => {
                        if m.pos >= tokens.len() {
                            continue;
                        }
                        let Some(value) = self.match_term(term, m.pos) else { continue };
                        let mut m = m;
                        if let Some(var) = &item.var {
                            if rule.result.as_deref() == Some(var.as_str()) {
                                m.result = Some(value.clone());
                            }
                            m.bindings.push(Binding { var: var.clone(), value });
                        }
                        m.next_idx += 1;
                        m.pos += 1;
                        stack.push(m);
                    }
                    ItemKind::SubRule(sub) => {
                        if depth == self.max_depth {
                            self.counters.depth_pruned += 1;
                            continue;
                        }
                        let sub_matches = self.match_rule(*sub, m.pos, depth + 1);
                        // Push in reverse so the preferred sub-match is
                        // explored first (the stack is LIFO).
                        for sub_match in sub_matches.into_iter().rev() {
                            let RuleMatch {
                                end,
                                bindings: sub_bindings,
                                result: sub_result,
                                ..
                            } = sub_match;

                            let mut bindings = m.bindings.clone();
                            bindings.extend(sub_bindings);
                            let mut result = m.result.clone();
                            if let Some(var) = &item.var {
                                let value = sub_result
                                    .unwrap_or(BoundValue::Span { start: m.pos, end });
                                if rule.result.as_deref() == Some(var.as_str()) {
                                    result = Some(value.clone());
                                }
                                bindings.push(Binding { var: var.clone(), value });
                            }
                            stack.push(PartialMatch {
                                next_idx: m.next_idx + 1,
                                pos: end,
                                bindings,
                                result,
                            });
                        }
                    }
                }
            }
        }

        results
    }

    /// Match a leaf condition against the token at `pos`.
    ///
    /// Lexical conditions return a span value; lookup conditions consult the
    /// graph store and return the vertex, with a miss pruning the branch.
    fn match_term(&mut self, term: &Term, pos: usize) -> Option<BoundValue> {
        let token = &self.tokens[pos];
        match term {
            Term::Literal(lit) => {
                (token.norm == *lit).then(|| BoundValue::Span { start: pos, end: pos + 1 })
            }
            Term::Category(re) => {
                re.is_match(&token.norm).then(|| BoundValue::Span { start: pos, end: pos + 1 })
            }
            Term::Lookup(namespace) => {
                match self.store.lookup_symbol(&token.norm, namespace.as_deref()) {
                    Some(vertex) => Some(BoundValue::Vertex(vertex.id)),
                    None => {
                        self.counters.lookup_misses += 1;
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::program::{Alternative, Item, RuleDef};
    use super::super::tokenizer::tokenize;
    use crate::MemoryGraph;
    use std::collections::HashMap;

    fn lexicon() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_vertex("lex/hello", "hello");
        g.link_symbol("hello", None, "lex/hello");
        g.add_vertex("lex/hi", "hi");
        g.link_symbol("hi", None, "lex/hi");
        g.add_vertex("person/alice", "Alice");
        g.link_symbol("alice", Some("person"), "person/alice");
        g.add_vertex("thing/widget", "widget");
        g.link_symbol("widget", Some("thing"), "thing/widget");
        g.add_vertex("city/nyc", "New York City");
        g.link_symbol("new york", None, "city/nyc");
        g
    }

    fn run(source: &str, sentence: &str, max_depth: usize) -> RunResult {
        let program = RuleProgram::compile(source).unwrap();
        let tokens = tokenize(sentence);
        let store = lexicon();
        Matcher::new(&program, &tokens, &store, max_depth).run()
    }

    /// Vertex ids per group, preserving order.
    fn vertex_ids(result: &RunResult) -> Vec<Vec<String>> {
        result
            .groups
            .iter()
            .map(|g| {
                g.contexts()
                    .iter()
                    .map(|c| c.top_vertex().unwrap().id.clone())
                    .collect()
            })
            .collect()
    }

    const GREETING: &str = "program greeting\nrule greeting -> g:\n    g:\"hello\"\n";

    #[test]
    fn literal_entry_resolves_to_vertex() {
        let result = run(GREETING, "hello", 3);
        assert_eq!(vertex_ids(&result), vec![vec!["lex/hello"]]);

        let group = &result.groups[0];
        assert_eq!(group.start(), 0);
        let context = &group.contexts()[0];
        assert_eq!(context.end(), 1);
        assert_eq!(
            context.bindings(),
            &[Binding { var: "g".to_string(), value: BoundValue::Span { start: 0, end: 1 } }]
        );
    }

    #[test]
    fn non_matching_sentence_yields_empty_sequence() {
        let result = run(GREETING, "goodbye", 3);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn empty_sentence_yields_empty_sequence() {
        let result = run(GREETING, "", 3);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn sibling_alternatives_stay_in_declared_order() {
        let source = "program greet\n\
                      rule greet -> g:\n    g:casual\n    g:formal\n\
                      rule casual -> w:\n    w:\"hello\"\n\
                      rule formal -> w:\n    w:\"hello\"\n";
        let result = run(source, "hello", 3);
        assert_eq!(result.groups.len(), 1);

        let contexts = result.groups[0].contexts();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].alternative(), 0);
        assert_eq!(contexts[1].alternative(), 1);
        for context in contexts {
            assert_eq!(context.top_vertex().unwrap().id, "lex/hello");
            assert_eq!(context.bindings().len(), 2);
        }
    }

    #[test]
    fn sub_rule_bindings_accumulate_in_match_order() {
        let source = "program s\n\
                      rule s -> top:\n    inner top:@person\n\
                      rule inner -> w:\n    w:\"hello\"\n";
        let result = run(source, "hello alice", 3);
        let context = &result.groups[0].contexts()[0];
        let vars: Vec<&str> = context.bindings().iter().map(|b| b.var.as_str()).collect();
        assert_eq!(vars, vec!["w", "top"]);
        assert_eq!(
            context.bindings()[1].value,
            BoundValue::Vertex("person/alice".to_string())
        );
    }

    #[test]
    fn unnamed_sub_rule_result_falls_back_to_span() {
        // `name` declares no result variable, so binding it yields the
        // consumed span, resolved lexically across both tokens.
        let source = "program place\n\
                      rule place -> p:\n    p:name\n\
                      rule name:\n    \"new\" \"york\"\n";
        let result = run(source, "new york", 3);
        assert_eq!(vertex_ids(&result), vec![vec!["city/nyc"]]);
    }

    #[test]
    fn lookup_miss_prunes_branch_but_not_siblings() {
        let source = "program who\nrule who -> w:\n    w:@robot\n    w:@person\n";
        let result = run(source, "alice", 3);
        assert_eq!(vertex_ids(&result), vec![vec!["person/alice"]]);
        // The pruned sibling shows up in the counters, not the results.
        assert!(result.metrics.matching.attempts[0].counters.lookup_misses >= 1);
    }

    #[test]
    fn unresolvable_result_binding_prunes_candidate() {
        // "xyzzy" matches the category but resolves to no vertex.
        let source = "program w\nrule w -> v:\n    v:/[a-z]+/\n";
        let result = run(source, "xyzzy", 3);
        assert!(result.groups.is_empty());
        assert!(result.metrics.matching.attempts[0].counters.lookup_misses >= 1);
    }

    #[test]
    fn one_group_per_start_alignment() {
        let result = run(GREETING, "xyzzy hello", 3);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].start(), 1);

        let result = run(GREETING, "hello hello", 3);
        // Each alignment must consume through the last token; "hello" at
        // offset 0 leaves a trailing token, so only offset 1 completes.
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].start(), 1);
    }

    const CHAIN: &str = "program chain\n\
                         rule chain -> v:\n    v:@thing\n    \"very\" v:chain\n";

    #[test]
    fn depth_zero_admits_only_leaf_alternatives() {
        let result = run(CHAIN, "widget", 0);
        assert_eq!(vertex_ids(&result), vec![vec!["thing/widget"]]);

        let result = run(CHAIN, "very widget", 0);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].start(), 1);
    }

    #[test]
    fn increasing_depth_is_monotonic() {
        let sentence = "very very widget";
        let mut previous: Option<Vec<(usize, String)>> = None;
        for depth in 0..4 {
            let result = run(CHAIN, sentence, depth);
            let mut found = Vec::new();
            for group in &result.groups {
                for context in group.contexts() {
                    found.push((context.start(), context.top_vertex().unwrap().id.clone()));
                }
            }
            if let Some(previous) = &previous {
                for entry in previous {
                    assert!(found.contains(entry), "depth {depth} lost {entry:?}");
                }
            }
            previous = Some(found);
        }
        // At depth 2 the full sentence parses from offset 0.
        let result = run(CHAIN, sentence, 2);
        assert_eq!(result.groups.len(), 3);
        assert_eq!(result.groups[0].start(), 0);
    }

    #[test]
    fn grounded_cycle_terminates_under_small_budget() {
        // Deeper nesting than the budget allows: no completion, no hang.
        let result = run(CHAIN, "very very very very widget", 3);
        assert_eq!(result.groups.len(), 4);
        assert!(result.groups.iter().all(|g| g.start() > 0));
        assert!(result.metrics.matching.attempts[0].counters.depth_pruned > 0);
    }

    #[test]
    fn baseless_cycle_terminates_and_yields_nothing() {
        // `rule loop -> v: v:loop` cannot be compiled (CycleWithoutBase),
        // so build it directly to pin down the evaluator-side guarantee.
        let program = RuleProgram {
            rules: vec![RuleDef {
                name: "loop".to_string(),
                result: Some("v".to_string()),
                alternatives: vec![Alternative {
                    items: vec![Item {
                        var: Some("v".to_string()),
                        kind: ItemKind::SubRule(0),
                    }],
                    flags: AltFlags::HAS_SUBRULE,
                }],
            }],
            by_name: HashMap::from([("loop".to_string(), 0)]),
            entry: 0,
        };
        let tokens = tokenize("hello");
        let store = lexicon();
        let result = Matcher::new(&program, &tokens, &store, 3).run();
        assert!(result.groups.is_empty());
        assert!(result.metrics.matching.attempts[0].counters.depth_pruned > 0);
    }

    #[test]
    fn equivalent_derivations_are_deduplicated() {
        // Both alternatives of `word` match "hi" without binding, so the
        // parent sees one state twice; the group keeps a single context.
        let source = "program twin\n\
                      rule twin -> t:\n    t:word\n\
                      rule word:\n    \"hi\"\n    /hi/\n";
        let result = run(source, "hi", 3);
        assert_eq!(vertex_ids(&result), vec![vec!["lex/hi"]]);
        assert_eq!(result.metrics.matching.attempts[0].counters.dedup_skipped, 1);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let source = "program greet\n\
                      rule greet -> g:\n    g:casual\n    g:formal\n\
                      rule casual -> w:\n    w:\"hello\"\n\
                      rule formal -> w:\n    w:\"hello\"\n";
        let first = run(source, "xyzzy hello", 4);
        let second = run(source, "xyzzy hello", 4);
        assert_eq!(vertex_ids(&first), vertex_ids(&second));
        let alts = |r: &RunResult| -> Vec<Vec<usize>> {
            r.groups
                .iter()
                .map(|g| g.contexts().iter().map(|c| c.alternative()).collect())
                .collect()
        };
        assert_eq!(alts(&first), alts(&second));
    }
}
