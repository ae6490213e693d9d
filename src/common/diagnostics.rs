use std::fmt::{self, Display};
use std::io::Write;

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
            Severity::Fatal => write!(f, "Fatal"),
        }
    }
}

/// A located message produced by any stage of the pipeline.
///
/// `chained` holds related sub-messages (for example the location of a
/// previous declaration) that belong to the same report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub chained: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn new(severity: Severity, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            severity,
            line,
            column,
            message: message.into(),
            chained: vec![],
        }
    }

    pub fn warning(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, line, column, message)
    }

    pub fn error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, line, column, message)
    }

    pub fn fatal(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, line, column, message)
    }

    pub fn chain(mut self, related: Diagnostic) -> Self {
        self.chained.push(related);
        self
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(
            f,
            "{}{} at {}:{}: {}",
            "  ".repeat(depth),
            self.severity,
            self.line,
            self.column,
            self.message
        )?;
        for related in &self.chained {
            writeln!(f)?;
            related.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Where diagnostics go. Every stage receives one explicitly.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }
}

/// Collects diagnostics in report order.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    items: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn messages(&self) -> Vec<&str> {
        self.items.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn into_items(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}

/// Prints each diagnostic as soon as it is reported, coloured by severity.
pub struct ConsoleReporter<W: Write> {
    out: W,
    reported: usize,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, reported: 0 }
    }

    pub fn reported(&self) -> usize {
        self.reported
    }

    fn print(&mut self, diagnostic: &Diagnostic, depth: usize) -> std::io::Result<()> {
        let severity = match diagnostic.severity {
            Severity::Warning => diagnostic.severity.to_string().yellow().bold(),
            Severity::Error => diagnostic.severity.to_string().red().bold(),
            Severity::Fatal => diagnostic.severity.to_string().magenta().bold(),
        };
        let location = format!("{}:{}", diagnostic.line, diagnostic.column);

        writeln!(
            self.out,
            "{}{} at {}: {}",
            "  ".repeat(depth),
            severity,
            location.blue(),
            diagnostic.message
        )?;

        for related in &diagnostic.chained {
            self.print(related, depth + 1)?;
        }

        Ok(())
    }
}

impl<W: Write> DiagnosticSink for ConsoleReporter<W> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.reported += 1;
        if let Err(err) = self.print(&diagnostic, 0) {
            tracing::warn!("failed to write diagnostic: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diagnostic = Diagnostic::error(3, 14, "zero division");
        assert_eq!(diagnostic.to_string(), "Error at 3:14: zero division");
    }

    #[test]
    fn test_display_chained() {
        let diagnostic = Diagnostic::error(2, 5, "variable 'x' is already declared")
            .chain(Diagnostic::warning(1, 5, "previous declaration of 'x'"));

        assert_eq!(
            diagnostic.to_string(),
            "Error at 2:5: variable 'x' is already declared\n  Warning at 1:5: previous declaration of 'x'"
        );
    }

    #[test]
    fn test_bag_collects_in_order() {
        let mut bag = DiagnosticBag::new();
        bag.report(Diagnostic::warning(1, 1, "first"));
        assert!(!bag.has_errors());

        bag.report(Diagnostic::fatal(2, 1, "second"));
        assert!(bag.has_errors());
        assert_eq!(bag.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_console_reporter_writes_lines() {
        colored::control::set_override(false);

        let mut buffer = Vec::new();
        {
            let mut reporter = ConsoleReporter::new(&mut buffer);
            reporter.report(
                Diagnostic::error(1, 9, "bad").chain(Diagnostic::warning(1, 1, "because")),
            );
            assert_eq!(reporter.reported(), 1);
        }

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "Error at 1:9: bad\n  Warning at 1:1: because\n");
    }
}
