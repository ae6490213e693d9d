/// How the parser buffers tokens pulled from the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferStrategy {
    /// Lex the whole input up front.
    Eager,
    /// Keep a small window of tokens, refilled on demand.
    #[default]
    Window,
    /// Cache a single token; lookahead beyond 1 is rejected.
    Single,
}

/// Visibility of outer variables inside `map`/`reduce` transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Transformations see their bindings and fall through to outer variables.
    #[default]
    Transparent,
    /// Transformations see only their own bindings.
    Isolated,
}

pub const DEFAULT_MAX_LOOKAHEAD: usize = 2;
pub const DEFAULT_CANCEL_CHECK_INTERVAL: usize = 100;
pub const DEFAULT_MAX_RANGE_LEN: usize = 100_000_000;

/// Deepest expression nesting the parser accepts.
pub const MAX_EXPRESSION_DEPTH: usize = 128;
/// Deepest chain of evaluations, forced initializers included.
pub const MAX_EVALUATION_DEPTH: usize = 2 * MAX_EXPRESSION_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub buffer: BufferStrategy,
    pub max_lookahead: usize,
    pub scope_mode: ScopeMode,
    /// Number of loop iterations between two cancellation checks.
    pub cancel_check_interval: usize,
    /// Compile eligible `map`/`reduce` bodies into an op tree.
    pub fast_path: bool,
    /// Largest number of elements a `{first, last}` range may hold.
    pub max_range_len: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            buffer: BufferStrategy::default(),
            max_lookahead: DEFAULT_MAX_LOOKAHEAD,
            scope_mode: ScopeMode::default(),
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            fast_path: true,
            max_range_len: DEFAULT_MAX_RANGE_LEN,
        }
    }
}

impl InterpreterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(mut self, buffer: BufferStrategy) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_max_lookahead(mut self, max_lookahead: usize) -> Self {
        self.max_lookahead = max_lookahead.max(1);
        self
    }

    pub fn with_scope_mode(mut self, scope_mode: ScopeMode) -> Self {
        self.scope_mode = scope_mode;
        self
    }

    pub fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval.max(1);
        self
    }

    pub fn with_fast_path(mut self, fast_path: bool) -> Self {
        self.fast_path = fast_path;
        self
    }

    pub fn with_max_range_len(mut self, max_range_len: usize) -> Self {
        self.max_range_len = max_range_len;
        self
    }

    /// Lookahead actually available to the parser with the chosen buffer.
    pub fn effective_lookahead(&self) -> usize {
        match self.buffer {
            BufferStrategy::Single => 1,
            BufferStrategy::Eager | BufferStrategy::Window => self.max_lookahead.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.buffer, BufferStrategy::Window);
        assert_eq!(config.max_lookahead, 2);
        assert_eq!(config.scope_mode, ScopeMode::Transparent);
        assert_eq!(config.cancel_check_interval, 100);
        assert!(config.fast_path);
        assert_eq!(config.max_range_len, 100_000_000);
    }

    #[test]
    fn test_range_cap_builder() {
        let config = InterpreterConfig::new().with_max_range_len(0);
        assert_eq!(config.max_range_len, 0);
        assert_eq!(config.buffer, BufferStrategy::Window);
    }

    #[test]
    fn test_single_buffer_caps_lookahead() {
        let config = InterpreterConfig::new()
            .with_buffer(BufferStrategy::Single)
            .with_max_lookahead(4);
        assert_eq!(config.effective_lookahead(), 1);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = InterpreterConfig::new()
            .with_max_lookahead(0)
            .with_cancel_check_interval(0);
        assert_eq!(config.max_lookahead, 1);
        assert_eq!(config.cancel_check_interval, 1);
    }
}
