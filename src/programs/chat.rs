//! Small-talk demo program.
//!
//! A compact program that exercises every item form: literals, a category,
//! namespaced lookups, and sub-rule composition with ranked alternatives.
//! The matching lexicon lives in [`graph`], stored together with the program
//! source the way the real deployment keeps both in the graph store.

use crate::graph::MemoryGraph;

/// Identifier under which the demo program is stored.
pub const PROGRAM_ID: &str = "prog/chat";

/// Rule-program source for the demo interpreter.
pub const PROGRAM: &str = r#"# Small-talk: resolve a sentence to the vertex it is about.
program statement

rule statement -> top:
    greeting top:@person
    top:@person action @thing
    top:greeting

rule greeting -> word:
    word:"hello"
    word:"hi"
    word:"hey" "there"

rule action:
    /likes|loves|wants|knows/
"#;

/// Build the demo store: lexicon vertices, symbol links, and the stored
/// program source.
pub fn graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();

    g.add_vertex("person/alice", "Alice");
    g.link_symbol("alice", Some("person"), "person/alice");
    g.add_vertex("person/bob", "Bob");
    g.link_symbol("bob", Some("person"), "person/bob");

    g.add_vertex("thing/coffee", "coffee");
    g.link_symbol("coffee", Some("thing"), "thing/coffee");
    g.add_vertex("thing/tea", "tea");
    g.link_symbol("tea", Some("thing"), "thing/tea");

    g.add_vertex("lex/hello", "hello");
    g.link_symbol("hello", None, "lex/hello");
    g.add_vertex("lex/hi", "hi");
    g.link_symbol("hi", None, "lex/hi");
    g.add_vertex("lex/hey", "hey");
    g.link_symbol("hey", None, "lex/hey");

    g.add_program(PROGRAM_ID, PROGRAM);
    g
}

#[cfg(test)]
mod tests;
