//! Evaluation run metrics.
//!
//! A small set of structs used to observe and debug engine behavior:
//!
//! - `Engine::interpret` for normal operation.
//! - `Engine::interpret_verbose` for profiling and inspecting what each
//!   top-level attempt explored and pruned.
//!
//! Metrics are intentionally simple and *opt-in*: the counters are plain
//! integers bumped on the hot path, and the per-attempt breakdown is only
//! formatted when a caller asks for it.

use crate::ContextGroup;
use std::time::Duration;

/// Timing for a full evaluation run.
#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time (matching + resolution/formatting).
    pub total: Duration,
    /// Matching-phase breakdown.
    pub matching: MatchMetrics,
    /// Time spent mapping contexts to caller-facing output.
    pub resolve: Duration,
}

/// Timings for the matching phase.
#[derive(Debug, Default, Clone)]
pub struct MatchMetrics {
    /// Total elapsed time across all top-level attempts.
    pub total: Duration,
    /// One entry per sentence-start alignment tried.
    pub attempts: Vec<AttemptMetrics>,
}

/// Timing and search counters for a single top-level attempt.
#[derive(Debug, Default, Clone)]
pub struct AttemptMetrics {
    /// Token offset of the attempt's start alignment.
    pub start: usize,
    /// Elapsed time for the attempt.
    pub duration: Duration,
    /// Completed contexts the attempt contributed to its group.
    pub completed: usize,
    /// Search counters accumulated during the attempt.
    pub counters: MatchCounters,
}

/// Counters bumped during search.
#[derive(Debug, Default, Clone)]
pub struct MatchCounters {
    /// Partial-match states popped from the work stack.
    pub explored: usize,
    /// Branches abandoned because the depth budget was exhausted.
    pub depth_pruned: usize,
    /// Completed states skipped as duplicates of an equivalent signature.
    pub dedup_skipped: usize,
    /// Branches pruned because a graph lookup found no vertex.
    pub lookup_misses: usize,
}

/// Matcher output bundled with timing information.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Terminal context groups, in alignment order.
    pub groups: Vec<ContextGroup>,
    /// Timing measurements for the run.
    pub metrics: RunMetrics,
}
