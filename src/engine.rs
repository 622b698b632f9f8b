//! Evaluation engine.
//!
//! This module is the *internal entry point* for the interpreter engine. The
//! public surface lives in `src/api.rs`; the engine is split into focused
//! submodules under `src/engine/` with stable crate-internal paths (for
//! example `crate::engine::Matcher` and `crate::engine::RuleProgram`).
//!
//! ## How the parts work together
//!
//! Interpreting a sentence is a pipeline:
//!
//! ```text
//! program source ──┐
//!                  │  RuleProgram::compile       (program.rs)
//!                  └──────────────┬─────────────
//!                                 │  (compiled once, shared read-only)
//! sentence ──── tokenize ─────────┼─ Token sequence   (tokenizer.rs)
//!                                 v
//!                        Matcher::run (matcher.rs)
//!                          - one attempt per start alignment
//!                          - depth-first, declared-order expansion
//!                          - depth budget bounds cyclic rules
//!                          - dedup via ContextKey (dedup.rs)
//!                          - result bindings resolved (resolve.rs)
//!                                 │
//!                                 v
//!                         Vec<ContextGroup>
//! ```
//!
//! Ambiguity is enumerated rather than resolved early: every completed
//! candidate becomes a context, grouped per top-level attempt and ranked by
//! declared rule order. "No interpretation" is an empty sequence, never an
//! error.
//!
//! ## Responsibilities by module
//!
//! - `program.rs`: parses and validates rule-program source into the
//!   immutable `RuleProgram` (errors: syntax, unknown reference, cycle
//!   without base).
//! - `tokenizer.rs`: splits a raw sentence into `Token`s.
//! - `matcher.rs`: performs the depth-bounded backtracking search.
//! - `dedup.rs`: defines stable signatures that keep cyclic exploration
//!   finite and results free of redundant duplicates.
//! - `resolve.rs`: turns bindings into graph vertices by pure lookup.
//! - `metrics.rs`: optional timing/counter data for runs and attempts.
//!
//! ## Debugging
//!
//! Set `LEXIGRAPH_DEBUG_RULES=1` to print compile, match, and resolve
//! traces.

#[path = "engine/dedup.rs"]
mod dedup;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/program.rs"]
mod program;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/tokenizer.rs"]
mod tokenizer;

pub use matcher::Matcher;
pub use metrics::{AttemptMetrics, MatchCounters, MatchMetrics, RunMetrics, RunResult};
pub use program::{CompileError, RuleProgram};
pub use resolve::{resolve_binding, ResolveError};
pub use tokenizer::{tokenize, Token};

pub(crate) use resolve::top_vertex;
