use std::{fs, path::PathBuf, process::ExitCode, thread, time::Duration};

use clap::{Parser, ValueEnum};

use seqscript_core::{
    BufferStrategy, ConsoleReporter, Evaluator, InterpreterConfig, Lexer, Outcome, ScopeMode,
    StdoutSink, parse, pretty,
};

#[derive(Parser)]
#[command(name = "seqscript", version, about = "Run a seqscript program")]
struct Cli {
    /// Source file path
    path: PathBuf,

    /// Print the token stream before running
    #[arg(long)]
    tokens: bool,

    /// Print the typed syntax tree before running
    #[arg(long)]
    dump_ast: bool,

    /// Token buffering strategy used by the parser
    #[arg(long, value_enum, default_value_t = BufferArg::Window)]
    buffer: BufferArg,

    /// Maximum parser lookahead
    #[arg(long, default_value_t = seqscript_core::common::config::DEFAULT_MAX_LOOKAHEAD)]
    lookahead: usize,

    /// Hide outer variables from map/reduce bodies
    #[arg(long)]
    isolated_lambdas: bool,

    /// Always walk the tree inside map/reduce
    #[arg(long)]
    no_fast_path: bool,

    /// Largest number of elements a range may hold
    #[arg(long, default_value_t = seqscript_core::common::config::DEFAULT_MAX_RANGE_LEN)]
    max_range_len: usize,

    /// Stop the run after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum BufferArg {
    Eager,
    Window,
    Single,
}

impl Cli {
    fn config(&self) -> InterpreterConfig {
        let buffer = match self.buffer {
            BufferArg::Eager => BufferStrategy::Eager,
            BufferArg::Window => BufferStrategy::Window,
            BufferArg::Single => BufferStrategy::Single,
        };
        let scope_mode = if self.isolated_lambdas {
            ScopeMode::Isolated
        } else {
            ScopeMode::Transparent
        };

        InterpreterConfig::new()
            .with_buffer(buffer)
            .with_max_lookahead(self.lookahead)
            .with_scope_mode(scope_mode)
            .with_fast_path(!self.no_fast_path)
            .with_max_range_len(self.max_range_len)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

/// One line per token. Lexical errors are listed in place; the parser
/// reports them again as diagnostics.
fn token_listing(source: &str) -> Vec<String> {
    Lexer::new(source)
        .map(|item| match item {
            Ok(token) => format!(
                "{:>4}:{:<4} {:<18} {}",
                token.line,
                token.column,
                token.ty.to_string(),
                token.lexeme.escape_debug()
            ),
            Err(err) => {
                let (line, column) = err.location();
                format!("{:>4}:{:<4} {:<18} {}", line, column, "<error>", err)
            }
        })
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = match fs::read_to_string(&cli.path) {
        Ok(content) => content,
        Err(error) => {
            eprintln!("Error reading file '{}': {}", cli.path.display(), error);
            return ExitCode::FAILURE;
        }
    };

    let config = cli.config();
    let mut reporter = ConsoleReporter::new(std::io::stderr());

    if cli.tokens {
        for line in token_listing(&source) {
            println!("{}", line);
        }
    }

    let program = parse(&source, &config, &mut reporter);
    tracing::debug!("parsed {} statements", program.len());

    if cli.dump_ast {
        print!("{}", pretty(&program));
    }

    let mut evaluator = Evaluator::new(config);

    if let Some(ms) = cli.timeout_ms {
        let token = evaluator.cancellation();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            token.cancel();
        });
    }

    let outcome = evaluator.execute(&program, &mut reporter, &mut StdoutSink::stdout());

    match outcome {
        Outcome::Cancelled => {
            eprintln!("Run cancelled");
            ExitCode::from(2)
        }
        Outcome::Completed if reporter.reported() > 0 => ExitCode::FAILURE,
        Outcome::Completed => ExitCode::SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_listing_keeps_lex_errors_inline() {
        let listing = token_listing("out 1 # 2");

        assert_eq!(listing.len(), 4);
        assert!(listing[0].contains("out"));
        assert!(listing[2].contains("<error>"));
        assert!(listing[3].ends_with(" 2"));
    }
}
