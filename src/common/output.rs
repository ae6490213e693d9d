use std::io::Write;

/// Append-only destination for `print` and `out`.
pub trait OutputSink {
    fn write_line(&mut self, line: &str);
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line)
    }
}

impl OutputSink for String {
    fn write_line(&mut self, line: &str) {
        self.push_str(line);
        self.push('\n');
    }
}

impl OutputSink for Vec<String> {
    fn write_line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes lines to any `io::Write`, flushing after every line so partial
/// output survives an aborted run.
pub struct WriterSink<W: Write> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) {
        let result = writeln!(self.out, "{}", line).and_then(|_| self.out.flush());
        if let Err(err) = result {
            tracing::warn!("failed to write output line: {}", err);
        }
    }
}

pub type StdoutSink = WriterSink<std::io::Stdout>;

impl StdoutSink {
    pub fn stdout() -> Self {
        WriterSink::new(std::io::stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_sink_appends_newlines() {
        let mut out = String::new();
        out.write_line("6, 8, 10");
        out.write_line("");
        assert_eq!(out, "6, 8, 10\n\n");
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_line("hello");
        sink.write_line("world");
        assert_eq!(sink.into_inner(), b"hello\nworld\n");
    }
}
