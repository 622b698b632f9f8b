//! Graph-store interface.
//!
//! The engine treats the knowledge graph as an external, read-only
//! collaborator: it loads rule-program source text by identifier and resolves
//! symbols to vertices, and never writes. [`GraphStore`] is the seam; the
//! real store behind it may impose its own concurrency discipline, but each
//! call here is one lookup with one result and no lock held across calls.
//!
//! [`MemoryGraph`] is the in-memory implementation used by the CLI, the
//! built-in demo program, and tests.

use std::collections::HashMap;

/// An opaque node in the external knowledge graph.
///
/// The core only reads vertices; it never creates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    /// Stable identifier, e.g. `person/alice`.
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

/// Read-only access to the external graph store.
pub trait GraphStore: Send + Sync {
    /// Load rule-program source text by identifier, or `None` when the store
    /// holds no program under that identifier.
    fn program_source(&self, id: &str) -> Option<String>;

    /// Resolve a normalized symbol to a vertex.
    ///
    /// A `namespace` of `None` consults only symbols linked without a
    /// namespace; it is not a wildcard. A miss is the ordinary "no vertex
    /// for this word" outcome, not an error.
    fn lookup_symbol(&self, symbol: &str, namespace: Option<&str>) -> Option<Vertex>;

    /// Fetch a vertex by identifier.
    fn vertex(&self, id: &str) -> Option<Vertex>;
}

/// In-memory graph store.
#[derive(Debug, Default, Clone)]
pub struct MemoryGraph {
    vertices: HashMap<String, Vertex>,
    symbols: HashMap<(Option<String>, String), String>,
    programs: HashMap<String, String>,
}

impl MemoryGraph {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a vertex.
    pub fn add_vertex(&mut self, id: &str, label: &str) {
        self.vertices.insert(id.to_string(), Vertex { id: id.to_string(), label: label.to_string() });
    }

    /// Link a symbol (optionally within a namespace) to a vertex id.
    pub fn link_symbol(&mut self, symbol: &str, namespace: Option<&str>, vertex_id: &str) {
        self.symbols
            .insert((namespace.map(str::to_string), symbol.to_lowercase()), vertex_id.to_string());
    }

    /// Store rule-program source text under an identifier.
    pub fn add_program(&mut self, id: &str, source: &str) {
        self.programs.insert(id.to_string(), source.to_string());
    }

    /// Load a lexicon in the CLI's line format:
    ///
    /// ```text
    /// # symbol  namespace  vertex-id  label...
    /// alice     person     person/alice  Alice
    /// hello     -          lex/hello     hello
    /// ```
    ///
    /// Fields are whitespace-separated; `-` means no namespace; the label is
    /// the remainder of the line (defaults to the symbol). Lines starting
    /// with `#` and blank lines are skipped.
    pub fn load_lexicon(&mut self, text: &str) -> Result<(), String> {
        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(symbol), Some(namespace), Some(id)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(format!(
                    "lexicon line {}: expected 'symbol namespace vertex-id [label...]'",
                    idx + 1
                ));
            };
            let label = fields.collect::<Vec<_>>().join(" ");
            let label: &str = if label.is_empty() { symbol } else { label.as_str() };
            let namespace = (namespace != "-").then_some(namespace);

            self.add_vertex(id, label);
            self.link_symbol(symbol, namespace, id);
        }
        Ok(())
    }
}

impl GraphStore for MemoryGraph {
    fn program_source(&self, id: &str) -> Option<String> {
        self.programs.get(id).cloned()
    }

    fn lookup_symbol(&self, symbol: &str, namespace: Option<&str>) -> Option<Vertex> {
        let key = (namespace.map(str::to_string), symbol.to_lowercase());
        let id = self.symbols.get(&key)?;
        self.vertices.get(id).cloned()
    }

    fn vertex(&self, id: &str) -> Option<Vertex> {
        self.vertices.get(id).cloned()
    }
}
