use lexigraph::{AttemptTrace, InterpretDetails};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(input: &str, details: &InterpretDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Interpreting: \"{}\"", input), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Attempts ━━━", ansi::GRAY));
    print_attempts(details, &palette);

    println!("\n{}", palette.paint("━━━ Interpretations ━━━", ansi::GRAY));
    if details.groups.is_empty() {
        println!("{}", palette.dim("  No interpretation found"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • No rule program loaded (missing or empty store)");
        println!("  • Leaf conditions didn't match the tokens");
        println!("  • Graph lookups missed (check the lexicon)");
        println!("  • The depth budget cut off nested parses (try --depth)");
        println!("\n{}", palette.dim("  Tip: Set LEXIGRAPH_DEBUG_RULES=1 to see match/resolve details"));
    } else {
        print_groups(details, &palette);
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Matching: {}  │  Resolve: {}",
        palette.paint(format!("{:?}", details.total), ansi::GREEN),
        palette.paint(format!("{:?}", details.match_total), ansi::CYAN),
        palette.dim(format!("{:?}", details.resolve)),
    );
    println!();
}

fn print_attempts(details: &InterpretDetails, palette: &ansi::Palette) {
    for attempt in &details.attempts {
        println!(
            "  {} {}  {}",
            palette.paint(format!("@token {}:", attempt.start), ansi::BLUE),
            if attempt.completed > 0 {
                palette.paint(format!("✓ {} context(s)", attempt.completed), ansi::GREEN)
            } else {
                palette.dim("✗ 0 contexts".to_string())
            },
            palette.dim(fmt_counters(attempt)),
        );
    }
}

fn fmt_counters(attempt: &AttemptTrace) -> String {
    format!(
        "explored {} │ depth-pruned {} │ dedup {} │ misses {} │ {:?}",
        attempt.explored, attempt.depth_pruned, attempt.dedup_skipped, attempt.lookup_misses, attempt.duration,
    )
}

fn print_groups(details: &InterpretDetails, palette: &ansi::Palette) {
    for group in &details.groups {
        println!("  {}", palette.paint(format!("group @token {}", group.start), ansi::YELLOW));
        for (idx, context) in group.contexts.iter().enumerate() {
            println!(
                "    {} {} {} {}",
                palette.paint(format!("[{}]", idx), ansi::GRAY),
                palette.bold(palette.paint(&context.vertex, ansi::GREEN)),
                palette.dim("│"),
                palette.paint(format!("\"{}\"  alt {}", context.label, context.alternative), ansi::BLUE),
            );
            for binding in &context.bindings {
                println!(
                    "        {} {} {}",
                    palette.paint(&binding.var, ansi::CYAN),
                    palette.dim("="),
                    palette.dim(&binding.value),
                );
            }
        }
    }
}
