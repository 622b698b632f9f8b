//! Binding resolution.
//!
//! Matching produces bindings that are either graph-vertex identifiers
//! (from `@ns` lookup items) or token spans (from literals, categories, and
//! sub-rules without their own lookups). Resolution turns a bound value into
//! a [`Vertex`] by pure lookup against the graph store:
//!
//! - a vertex binding is fetched by id;
//! - a span binding is looked up lexically, joining the normalized token
//!   forms with single spaces (so a two-token span like `new york` resolves
//!   as one symbol).
//!
//! A miss is never fatal to the overall evaluation: the matcher treats it as
//! a failed match and prunes that branch. Resolution never creates vertices.

use super::tokenizer::Token;
use crate::graph::{GraphStore, Vertex};
use crate::{Binding, BoundValue, Context};
use thiserror::Error;

/// Resolution failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A lookup missed. Recovered locally during matching (the branch is
    /// pruned); surfaced only through [`resolve_binding`].
    #[error("no vertex found for {0:?}")]
    NotFound(String),
    /// A context lacks a resolved result vertex. This is an internal
    /// invariant violation: the matcher resolves the entry result before a
    /// context is placed in a group.
    #[error("context has no resolved vertex for the entry rule's result variable")]
    Incomplete,
}

/// Resolve a bound value against the store. `None` means not found.
pub(crate) fn resolve_value(
    store: &dyn GraphStore,
    tokens: &[Token],
    value: &BoundValue,
) -> Option<Vertex> {
    let debug = std::env::var_os("LEXIGRAPH_DEBUG_RULES").is_some();
    let resolved = match value {
        BoundValue::Vertex(id) => store.vertex(id),
        BoundValue::Span { start, end } => {
            let symbol =
                tokens[*start..*end].iter().map(|t| t.norm.as_str()).collect::<Vec<_>>().join(" ");
            store.lookup_symbol(&symbol, None)
        }
    };
    if debug {
        match &resolved {
            Some(v) => eprintln!("[resolve] value={value:?} -> vertex=\"{}\"", v.id),
            None => eprintln!("[resolve] value={value:?} -> not found"),
        }
    }
    resolved
}

/// Resolve a single binding to a vertex.
pub fn resolve_binding(
    store: &dyn GraphStore,
    tokens: &[Token],
    binding: &Binding,
) -> Result<Vertex, ResolveError> {
    resolve_value(store, tokens, &binding.value)
        .ok_or_else(|| ResolveError::NotFound(binding.var.clone()))
}

/// Accessor behind [`Context::top_vertex`].
pub(crate) fn top_vertex(context: &Context) -> Result<&Vertex, ResolveError> {
    context.top.as_ref().ok_or(ResolveError::Incomplete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tokenizer::tokenize;
    use crate::MemoryGraph;

    fn store() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_vertex("city/nyc", "New York City");
        g.link_symbol("new york", None, "city/nyc");
        g.add_vertex("person/alice", "Alice");
        g.link_symbol("alice", Some("person"), "person/alice");
        g
    }

    #[test]
    fn span_bindings_resolve_lexically() {
        let tokens = tokenize("New York");
        let binding = Binding {
            var: "place".to_string(),
            value: BoundValue::Span { start: 0, end: 2 },
        };
        let vertex = resolve_binding(&store(), &tokens, &binding).unwrap();
        assert_eq!(vertex.id, "city/nyc");
    }

    #[test]
    fn vertex_bindings_resolve_by_id() {
        let binding = Binding {
            var: "who".to_string(),
            value: BoundValue::Vertex("person/alice".to_string()),
        };
        let vertex = resolve_binding(&store(), &[], &binding).unwrap();
        assert_eq!(vertex.label, "Alice");
    }

    #[test]
    fn misses_are_not_found() {
        let tokens = tokenize("atlantis");
        let binding = Binding {
            var: "place".to_string(),
            value: BoundValue::Span { start: 0, end: 1 },
        };
        let err = resolve_binding(&store(), &tokens, &binding).unwrap_err();
        assert_eq!(err, ResolveError::NotFound("place".to_string()));
    }

    #[test]
    fn context_without_result_is_incomplete() {
        let context = Context {
            start: 0,
            end: 1,
            alternative: 0,
            bindings: Vec::new(),
            top: None,
        };
        assert_eq!(context.top_vertex().unwrap_err(), ResolveError::Incomplete);
    }
}
