extern crate self as lexigraph;

#[macro_use]
mod macros;
mod api;
mod engine;
mod graph;
mod programs;

pub use api::{
    AttemptTrace, BindingSummary, ContextSummary, Engine, GroupTrace, InterpretDetails,
    InterpretResult, InterpretResultVerbose, Interpretation, InterpretationGroup, Options,
    DEFAULT_MAX_DEPTH,
};
pub use engine::{resolve_binding, tokenize, CompileError, ResolveError, RuleProgram, Token};
pub use graph::{GraphStore, MemoryGraph, Vertex};

// --- Core data model ---------------------------------------------------------

/// Value bound to a rule variable while matching proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundValue {
    /// Identifier of a resolved graph vertex.
    Vertex(String),
    /// Half-open range of token indices consumed by the bound item.
    Span { start: usize, end: usize },
}

/// Association between a rule variable and a resolved vertex or token span,
/// accumulated as matching proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Variable name as written in the program source.
    pub var: String,
    pub value: BoundValue,
}

/// One candidate interpretation of a sentence under a rule program.
///
/// A `Context` records where its top-level attempt started, the entry
/// alternative that completed (the rule-position cursor), the bindings
/// accumulated along the whole match path, and the resolved vertex for the
/// entry rule's result variable. Contexts are created by the evaluator and
/// read-only once returned.
#[derive(Debug, Clone)]
pub struct Context {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) alternative: usize,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) top: Option<Vertex>,
}

impl Context {
    pub(crate) fn new(
        start: usize,
        end: usize,
        alternative: usize,
        bindings: Vec<Binding>,
        top: Vertex,
    ) -> Self {
        Context { start, end, alternative, bindings, top: Some(top) }
    }

    /// Token index where this top-level attempt started.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Token index one past the last consumed token.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Index of the entry-rule alternative that completed (declaration order).
    pub fn alternative(&self) -> usize {
        self.alternative
    }

    /// Bindings accumulated along the match path, in match order.
    ///
    /// Sub-rule bindings appear before the binding of the item that invoked
    /// the sub-rule; no binding exists for a rule the path never visited.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// The vertex resolved for the entry rule's result variable.
    ///
    /// Fails with [`ResolveError::Incomplete`] only when the context lacks a
    /// resolved result, which cannot happen for contexts placed in a returned
    /// [`ContextGroup`].
    pub fn top_vertex(&self) -> Result<&Vertex, ResolveError> {
        engine::top_vertex(self)
    }
}

/// Ordered collection of sibling [`Context`]s: the alternatives considered
/// equally reachable from one top-level entry into the matcher.
///
/// Insertion order encodes preference (earlier = preferred) and is preserved
/// end-to-end. A group is never empty and never contains two contexts with
/// the same (cursor, binding-set) signature.
#[derive(Debug, Clone)]
pub struct ContextGroup {
    pub(crate) start: usize,
    pub(crate) contexts: Vec<Context>,
}

impl ContextGroup {
    pub(crate) fn new(start: usize, contexts: Vec<Context>) -> Self {
        debug_assert!(!contexts.is_empty(), "context groups are never empty");
        ContextGroup { start, contexts }
    }

    /// Token index of the sentence-start alignment this group belongs to.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The sibling contexts, in preference order.
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }
}
