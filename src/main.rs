mod debug_report;

use lexigraph::{Engine, MemoryGraph, Options, DEFAULT_MAX_DEPTH};
use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let options = Options { max_depth: config.depth };
    let res = engine.interpret_verbose(&config.input, &options);
    debug_report::print_run(&config.input, &res.details, config.color);
}

struct CliConfig {
    input: String,
    program_path: Option<String>,
    graph_path: Option<String>,
    depth: usize,
    color: bool,
}

fn build_engine(config: &CliConfig) -> Result<Engine, String> {
    let Some(program_path) = &config.program_path else {
        if config.graph_path.is_some() {
            return Err("error: --graph requires --program".to_string());
        }
        return Ok(Engine::demo());
    };

    let source = std::fs::read_to_string(program_path)
        .map_err(|err| format!("error: failed to read {program_path}: {err}"))?;

    let mut graph = MemoryGraph::new();
    if let Some(graph_path) = &config.graph_path {
        let text = std::fs::read_to_string(graph_path)
            .map_err(|err| format!("error: failed to read {graph_path}: {err}"))?;
        graph.load_lexicon(&text).map_err(|err| format!("error: {graph_path}: {err}"))?;
    }

    Engine::new(Arc::new(graph), &source).map_err(|err| format!("error: {err}"))
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut program_path: Option<String> = None;
    let mut graph_path: Option<String> = None;
    let mut depth = DEFAULT_MAX_DEPTH;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("lexigraph {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--program" => {
                let value = args.next().ok_or_else(|| "error: --program expects a path".to_string())?;
                program_path = Some(value);
            }
            "--graph" => {
                let value = args.next().ok_or_else(|| "error: --graph expects a path".to_string())?;
                graph_path = Some(value);
            }
            "--depth" => {
                let value = args.next().ok_or_else(|| "error: --depth expects a value".to_string())?;
                depth = parse_depth(&value)?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    if input.is_some() {
                        return Err("error: input provided multiple times".to_string());
                    }
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--program=") => {
                program_path = Some(arg.trim_start_matches("--program=").to_string());
            }
            _ if arg.starts_with("--graph=") => {
                graph_path = Some(arg.trim_start_matches("--graph=").to_string());
            }
            _ if arg.starts_with("--depth=") => {
                depth = parse_depth(arg.trim_start_matches("--depth="))?;
            }
            _ if arg.starts_with("--input=") => {
                let value = arg.trim_start_matches("--input=");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value.to_string());
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(rest);
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, program_path, graph_path, depth, color })
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn parse_depth(value: &str) -> Result<usize, String> {
    value.parse::<usize>().map_err(|_| format!("error: invalid --depth '{value}' (expected an integer)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "lexigraph {version}

Rule-driven sentence interpreter CLI.

Usage:
  lexigraph [OPTIONS] [--] <sentence...>
  lexigraph [OPTIONS] --input <text>

Options:
  -i, --input <text>       Sentence to interpret. If omitted, reads remaining
                           args or stdin when no args are provided.
  --program <path>         Rule-program source file. Default: the built-in
                           demo program.
  --graph <path>           Lexicon file ('symbol namespace vertex-id [label...]'
                           per line, '-' for no namespace). Requires --program.
  --depth <n>              Recursion-depth budget per search path.
                           Default: {default_depth}
  --color                  Force ANSI color output.
  --no-color               Disable ANSI color output.
  -h, --help               Show this help message.
  -V, --version            Print version information.

Exit codes:
  0  Success.
  1  Program or lexicon failed to load.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        default_depth = DEFAULT_MAX_DEPTH
    )
}
