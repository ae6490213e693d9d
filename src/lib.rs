pub mod backend;
pub mod common;
pub mod frontend;
pub mod middle;

pub use frontend::ast::Program;
pub use frontend::lexer::{Lexer, Token, TokenType};
pub use frontend::parser::{Parser, parse};
pub use frontend::pretty::pretty;
pub use frontend::scanner::Scanner;

pub use middle::types::Type;

pub use backend::cancel::CancellationToken;
pub use backend::evaluator::{Evaluator, Outcome};

pub use common::config::{BufferStrategy, InterpreterConfig, ScopeMode};
pub use common::diagnostics::{ConsoleReporter, Diagnostic, DiagnosticBag, DiagnosticSink, Severity};
pub use common::output::{OutputSink, StdoutSink};
pub use common::value::Value;

/// Parses and executes `source` in one go.
pub fn run(
    source: &str,
    config: InterpreterConfig,
    diagnostics: &mut dyn DiagnosticSink,
    output: &mut dyn OutputSink,
) -> Outcome {
    let program = parse(source, &config, diagnostics);
    Evaluator::new(config).execute(&program, diagnostics, output)
}
