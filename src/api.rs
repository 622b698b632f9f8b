use crate::engine::{tokenize, CompileError, Matcher, RuleProgram, RunResult};
use crate::graph::GraphStore;
use crate::{Context, ContextGroup};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};

static DEMO_ENGINE: Lazy<Engine> = Lazy::new(|| {
    Engine::from_store(Arc::new(crate::programs::chat::graph()), crate::programs::chat::PROGRAM_ID)
        .expect("built-in demo program compiles")
});

/// Default recursion-depth budget for [`Options`].
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Options that affect evaluation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Recursion-depth budget per search path: the number of sub-rule
    /// descents allowed below the entry rule.
    ///
    /// This is the caller's tradeoff knob: too small truncates deeply nested
    /// parses, too large risks combinatorial blow-up on ambiguous cyclic
    /// grammars. Exceeding the budget silently abandons the branch.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// One resolved interpretation of (part of) the sentence.
///
/// `start`/`end` are byte offsets into the original sentence.
#[derive(Debug, Clone)]
pub struct Interpretation {
    /// Identifier of the resolved top vertex, e.g. `person/alice`.
    pub vertex: String,
    /// Label of the resolved top vertex.
    pub label: String,
    /// Slice of the original sentence this interpretation covers.
    pub body: String,
    /// Start byte index of the covered slice.
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
    /// Index of the entry-rule alternative that produced it (rank).
    pub alternative: usize,
}

/// Sibling interpretations from one sentence-start alignment, in preference
/// order.
#[derive(Debug, Clone)]
pub struct InterpretationGroup {
    /// Start byte index of the alignment in the original sentence.
    pub start: usize,
    pub interpretations: Vec<Interpretation>,
}

/// Result from [`Engine::interpret`].
#[derive(Debug, Clone)]
pub struct InterpretResult {
    /// The interpreted sentence.
    pub text: String,
    /// Resolved interpretation groups, in alignment order. Empty when no
    /// interpretation was found or no program is loaded.
    pub groups: Vec<InterpretationGroup>,
    /// Total elapsed time spent matching + resolving.
    pub elapsed: Duration,
}

/// A compact binding rendering used in verbose traces.
#[derive(Debug, Clone)]
pub struct BindingSummary {
    pub var: String,
    pub value: String,
}

/// A compact context rendering used in verbose traces.
#[derive(Debug, Clone)]
pub struct ContextSummary {
    pub vertex: String,
    pub label: String,
    pub alternative: usize,
    pub bindings: Vec<BindingSummary>,
}

/// Contexts of one group, as compact summaries.
#[derive(Debug, Clone)]
pub struct GroupTrace {
    /// Token offset of the group's start alignment.
    pub start: usize,
    pub contexts: Vec<ContextSummary>,
}

/// Per-attempt search trace.
#[derive(Debug, Clone)]
pub struct AttemptTrace {
    /// Token offset of the attempt's start alignment.
    pub start: usize,
    pub duration: Duration,
    /// Completed contexts contributed by this attempt.
    pub completed: usize,
    /// Partial-match states popped from the work stack.
    pub explored: usize,
    /// Branches abandoned on the depth budget.
    pub depth_pruned: usize,
    /// Completed states skipped as duplicates.
    pub dedup_skipped: usize,
    /// Branches pruned on graph-lookup misses.
    pub lookup_misses: usize,
}

/// Additional details returned by [`Engine::interpret_verbose`].
///
/// This is intentionally compact: it is meant for debugging and performance
/// inspection without dumping the entire search state.
#[derive(Debug, Clone)]
pub struct InterpretDetails {
    /// Total elapsed time.
    pub total: Duration,
    /// Time spent in the matching phase.
    pub match_total: Duration,
    /// Time spent mapping contexts to interpretations.
    pub resolve: Duration,
    /// One trace per sentence-start alignment tried.
    pub attempts: Vec<AttemptTrace>,
    /// Context summaries per group.
    pub groups: Vec<GroupTrace>,
    /// Rule names of the loaded program, in declaration order.
    pub rule_names: Vec<String>,
}

/// Result from [`Engine::interpret_verbose`].
#[derive(Debug, Clone)]
pub struct InterpretResultVerbose {
    pub text: String,
    pub groups: Vec<InterpretationGroup>,
    pub elapsed: Duration,
    pub details: InterpretDetails,
}

/// The interpreter engine: a rule program compiled once, bound to a graph
/// store, reused across interpret calls.
///
/// The compiled program is immutable and reference-counted, so clones of an
/// `Engine` are cheap and concurrent `interpret` calls need no external
/// synchronization; each call allocates its own context state.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn GraphStore>,
    program: Option<Arc<RuleProgram>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("program_loaded", &self.program.is_some())
            .finish()
    }
}

impl Engine {
    /// Compile `source` into an engine bound to `store`.
    pub fn new(store: Arc<dyn GraphStore>, source: &str) -> Result<Self, CompileError> {
        let program = RuleProgram::compile(source)?;
        Ok(Engine { store, program: Some(Arc::new(program)) })
    }

    /// Load program source from the store by identifier and compile it.
    ///
    /// A store with no program under `program_id` yields an engine in the
    /// "no program loaded" state, where every interpret call returns the
    /// empty-result outcome. Malformed source is a genuine error.
    pub fn from_store(store: Arc<dyn GraphStore>, program_id: &str) -> Result<Self, CompileError> {
        match store.program_source(program_id) {
            Some(source) => Self::new(store, &source),
            None => {
                if std::env::var_os("LEXIGRAPH_DEBUG_RULES").is_some() {
                    eprintln!("[engine] no program stored under \"{program_id}\"");
                }
                Ok(Engine { store, program: None })
            }
        }
    }

    /// Engine wired to the built-in demo program and lexicon.
    pub fn demo() -> Engine {
        DEMO_ENGINE.clone()
    }

    /// Whether a compiled program is loaded.
    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    /// The compiled program, when loaded.
    pub fn program(&self) -> Option<&RuleProgram> {
        self.program.as_deref()
    }

    /// Evaluate `sentence` and return the raw context groups.
    ///
    /// An empty sequence is the ordinary "no interpretation found" outcome
    /// (including the "no program loaded" state), never an error.
    pub fn evaluate(&self, sentence: &str, options: &Options) -> Vec<ContextGroup> {
        let Some(program) = &self.program else { return Vec::new() };
        let tokens = tokenize(sentence);
        Matcher::new(program, &tokens, self.store.as_ref(), options.max_depth).run().groups
    }

    /// Interpret `sentence`: evaluate it and resolve every context in every
    /// group to its top vertex.
    pub fn interpret(&self, sentence: &str, options: &Options) -> InterpretResult {
        let total_start = Instant::now();
        let (groups, _) = self.run(sentence, options);
        InterpretResult { text: sentence.to_string(), groups, elapsed: total_start.elapsed() }
    }

    /// Interpret `sentence` and return extra (compact) debug details.
    ///
    /// This is useful for profiling and rule debugging. The plain
    /// [`interpret`](Engine::interpret) path does not allocate these traces.
    pub fn interpret_verbose(&self, sentence: &str, options: &Options) -> InterpretResultVerbose {
        let total_start = Instant::now();
        let (groups, run) = self.run(sentence, options);
        let elapsed = total_start.elapsed();

        let attempts = run
            .as_ref()
            .map(|run| {
                run.metrics
                    .matching
                    .attempts
                    .iter()
                    .map(|a| AttemptTrace {
                        start: a.start,
                        duration: a.duration,
                        completed: a.completed,
                        explored: a.counters.explored,
                        depth_pruned: a.counters.depth_pruned,
                        dedup_skipped: a.counters.dedup_skipped,
                        lookup_misses: a.counters.lookup_misses,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let group_traces = run
            .as_ref()
            .map(|run| run.groups.iter().map(group_to_trace).collect())
            .unwrap_or_default();

        let details = InterpretDetails {
            total: elapsed,
            match_total: run.as_ref().map(|r| r.metrics.matching.total).unwrap_or_default(),
            resolve: run.as_ref().map(|r| r.metrics.resolve).unwrap_or_default(),
            attempts,
            groups: group_traces,
            rule_names: self
                .program
                .as_ref()
                .map(|p| p.rule_names().map(str::to_string).collect())
                .unwrap_or_default(),
        };

        InterpretResultVerbose { text: sentence.to_string(), groups, elapsed, details }
    }

    /// Shared path behind the interpret variants.
    fn run(&self, sentence: &str, options: &Options) -> (Vec<InterpretationGroup>, Option<RunResult>) {
        let Some(program) = &self.program else { return (Vec::new(), None) };
        let tokens = tokenize(sentence);
        let mut run =
            Matcher::new(program, &tokens, self.store.as_ref(), options.max_depth).run();

        let resolve_start = Instant::now();
        let groups = run
            .groups
            .iter()
            .map(|group| InterpretationGroup {
                start: tokens[group.contexts()[0].start()].start,
                interpretations: group
                    .contexts()
                    .iter()
                    .filter_map(|context| context_to_interpretation(sentence, &tokens, context))
                    .collect(),
            })
            .collect();
        run.metrics.resolve = resolve_start.elapsed();
        run.metrics.total += run.metrics.resolve;

        (groups, Some(run))
    }
}

fn context_to_interpretation(
    sentence: &str,
    tokens: &[crate::Token],
    context: &Context,
) -> Option<Interpretation> {
    let vertex = match context.top_vertex() {
        Ok(vertex) => vertex,
        Err(err) => {
            debug_assert!(false, "context in a returned group must resolve: {err}");
            return None;
        }
    };
    let start = tokens[context.start()].start;
    let end = tokens[context.end() - 1].end;

    Some(Interpretation {
        vertex: vertex.id.clone(),
        label: vertex.label.clone(),
        body: sentence.get(start..end).unwrap_or("").to_string(),
        start,
        end,
        alternative: context.alternative(),
    })
}

fn group_to_trace(group: &ContextGroup) -> GroupTrace {
    GroupTrace {
        start: group.start(),
        contexts: group
            .contexts()
            .iter()
            .map(|context| ContextSummary {
                vertex: context
                    .top_vertex()
                    .map(|v| v.id.clone())
                    .unwrap_or_else(|_| "<unresolved>".to_string()),
                label: context
                    .top_vertex()
                    .map(|v| v.label.clone())
                    .unwrap_or_default(),
                alternative: context.alternative(),
                bindings: context
                    .bindings()
                    .iter()
                    .map(|binding| BindingSummary {
                        var: binding.var.clone(),
                        value: format_bound_value(&binding.value),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn format_bound_value(value: &crate::BoundValue) -> String {
    match value {
        crate::BoundValue::Vertex(id) => id.clone(),
        crate::BoundValue::Span { start, end } => format!("tokens {start}..{end}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryGraph;

    #[test]
    fn demo_engine_interprets_greetings() {
        let engine = Engine::demo();
        let out = engine.interpret("hello alice", &Options::default());

        assert_eq!(out.text, "hello alice");
        assert_eq!(out.groups.len(), 1);
        let interp = &out.groups[0].interpretations[0];
        assert_eq!(interp.vertex, "person/alice");
        assert_eq!(interp.body, "hello alice");
        assert_eq!((interp.start, interp.end), (0, 11));
    }

    #[test]
    fn leading_skip_reports_byte_offsets() {
        let engine = Engine::demo();
        let out = engine.interpret("um, hello", &Options::default());

        assert_eq!(out.groups.len(), 1);
        // The group starts at "hello", past "um" and the comma.
        assert_eq!(out.groups[0].start, 4);
        assert_eq!(out.groups[0].interpretations[0].body, "hello");
    }

    #[test]
    fn no_parse_is_an_empty_result_not_an_error() {
        let engine = Engine::demo();
        let out = engine.interpret("entirely unknown words", &Options::default());
        assert!(out.groups.is_empty());
    }

    #[test]
    fn missing_program_yields_empty_results() {
        let engine =
            Engine::from_store(Arc::new(MemoryGraph::new()), "prog/absent").unwrap();
        assert!(!engine.is_loaded());

        let out = engine.interpret("hello alice", &Options::default());
        assert!(out.groups.is_empty());
        assert!(engine.evaluate("hello alice", &Options::default()).is_empty());
    }

    #[test]
    fn malformed_stored_program_is_reported() {
        let mut store = MemoryGraph::new();
        store.add_program("prog/bad", "rule broken\n");
        let err = Engine::from_store(Arc::new(store), "prog/bad").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn verbose_includes_metrics_and_rules() {
        let engine = Engine::demo();
        let out = engine.interpret_verbose("hello alice", &Options::default());

        assert_eq!(out.text, "hello alice");
        assert_eq!(out.elapsed, out.details.total);
        assert!(out.details.match_total <= out.details.total);
        assert!(!out.details.rule_names.is_empty());
        assert_eq!(out.details.attempts.len(), 2);
        assert_eq!(out.details.groups.len(), out.groups.len());
        assert!(out.details.attempts.iter().any(|a| a.explored > 0));
    }

    #[test]
    fn evaluate_exposes_raw_context_groups() {
        let engine = Engine::demo();
        let groups = engine.evaluate("hello alice", &Options::default());
        assert_eq!(groups.len(), 1);
        let context = &groups[0].contexts()[0];
        assert_eq!(context.top_vertex().unwrap().id, "person/alice");
        assert!(!context.bindings().is_empty());
    }
}
