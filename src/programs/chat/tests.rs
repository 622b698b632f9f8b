use crate::api::{Engine, Options};
use crate::programs::chat;
use std::sync::Arc;

fn demo_engine() -> Engine {
    Engine::from_store(Arc::new(chat::graph()), chat::PROGRAM_ID).unwrap()
}

#[test]
fn chat_examples_resolve() {
    // Array of (input, expected vertex ids per group, in ranked order).
    let cases: Vec<(&str, Vec<Vec<&str>>)> = vec![
        ("hello alice", vec![vec!["person/alice"]]),
        ("hi bob", vec![vec!["person/bob"]]),
        ("hey there alice", vec![vec!["person/alice"]]),
        ("alice likes coffee", vec![vec!["person/alice"]]),
        ("bob wants tea", vec![vec!["person/bob"]]),
        ("hello", vec![vec!["lex/hello"]]),
        ("hi", vec![vec!["lex/hi"]]),
        ("hey there", vec![vec!["lex/hey"]]),
        ("Hello Alice", vec![vec!["person/alice"]]),
        // Leading tokens the program cannot match are skipped by later
        // alignments.
        ("um hello", vec![vec!["lex/hello"]]),
        ("goodbye", vec![]),
        ("alice likes bob", vec![]),
        ("", vec![]),
    ];

    let engine = demo_engine();
    let options = Options::default();

    for (input, expected) in cases {
        let out = engine.interpret(input, &options);
        let got: Vec<Vec<&str>> = out
            .groups
            .iter()
            .map(|g| g.interpretations.iter().map(|i| i.vertex.as_str()).collect())
            .collect();
        assert_eq!(got, expected, "input: {input:?}");
    }
}

#[test]
fn stored_program_compiles_from_the_store() {
    let engine = demo_engine();
    assert!(engine.is_loaded());
    let program = engine.program().unwrap();
    assert_eq!(program.entry_rule(), "statement");
    assert!(program.contains("greeting"));
}

#[test]
fn greeting_alternatives_rank_by_declaration() {
    let engine = demo_engine();
    let groups = engine.evaluate("hello", &Options::default());
    assert_eq!(groups.len(), 1);
    // The bare-greeting reading comes from the third statement alternative.
    assert_eq!(groups[0].contexts()[0].alternative(), 2);
}
