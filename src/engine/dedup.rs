//! Deduplication signatures for the search.
//!
//! The matcher explores a rule graph that may contain cycles, so the same
//! match state can be re-derived along different paths. Without a *stable*
//! signature to recognize equivalent states, the engine would:
//!
//! - return redundant duplicate contexts,
//! - waste work expanding branches that add nothing, and
//! - produce output whose shape depends on derivation order.
//!
//! This module defines `ContextKey`, the hashable signature the matcher
//! keeps in a per-invocation visited set.
//!
//! ## What counts as "the same state"
//!
//! The key combines:
//!
//! - the alternative index (the rule-position cursor),
//! - the end token cursor,
//! - the accumulated binding sequence, and
//! - the rule's result value.
//!
//! Distinct declared alternatives are distinct cursors even when they bind
//! identically, so enumerated ambiguity survives; distinct derivations of
//! the same observable state collapse.
//!
//! ## Tradeoffs
//!
//! Building a key clones the binding sequence. Signatures are only built at
//! completion points (not per expansion step), which keeps the allocation
//! cost proportional to the number of candidate results.

use crate::{Binding, BoundValue};

/// Stable signature of a completed match within one rule invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ContextKey {
    alternative: usize,
    end: usize,
    bindings: Vec<Binding>,
    result: Option<BoundValue>,
}

impl ContextKey {
    pub(crate) fn new(
        alternative: usize,
        end: usize,
        bindings: &[Binding],
        result: Option<&BoundValue>,
    ) -> Self {
        ContextKey { alternative, end, bindings: bindings.to_vec(), result: result.cloned() }
    }
}
