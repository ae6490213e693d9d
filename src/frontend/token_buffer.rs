//! Bounded lookahead over the lexer's token stream.
//!
//! All strategies behave the same to the parser: `la(k)` is idempotent until
//! `consume()` is called, and asking further ahead than the configured bound
//! fails instead of silently lexing more.

use std::collections::VecDeque;

use thiserror::Error;

use crate::common::config::{BufferStrategy, InterpreterConfig};

use super::lexer::{LexError, LexResult, Lexer, Token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("lookahead of {requested} exceeds the configured maximum of {max}")]
    LookaheadExceeded { requested: usize, max: usize },
    #[error(transparent)]
    Lex(#[from] LexError),
}

pub trait TokenBuffer {
    /// Token `k` positions ahead, `k` starting at 1. `Ok(None)` past the end.
    fn la(&mut self, k: usize) -> Result<Option<&Token>, BufferError>;

    /// Drops the token (or lexical error) at `la(1)`.
    fn consume(&mut self);

    fn max_lookahead(&self) -> usize;
}

fn check_bound(k: usize, max: usize) -> Result<(), BufferError> {
    if k == 0 || k > max {
        return Err(BufferError::LookaheadExceeded { requested: k, max });
    }
    Ok(())
}

fn surface(item: Option<&LexResult>) -> Result<Option<&Token>, BufferError> {
    match item {
        Some(Ok(token)) => Ok(Some(token)),
        Some(Err(err)) => Err(BufferError::Lex(err.clone())),
        None => Ok(None),
    }
}

pub fn for_config(source: &str, config: &InterpreterConfig) -> Box<dyn TokenBuffer> {
    let lexer = Lexer::new(source);
    let max = config.effective_lookahead();

    match config.buffer {
        BufferStrategy::Eager => Box::new(EagerBuffer::new(lexer, max)),
        BufferStrategy::Window => Box::new(WindowBuffer::new(lexer, max)),
        BufferStrategy::Single => Box::new(SingleBuffer::new(lexer)),
    }
}

/// Materializes the entire stream when built.
pub struct EagerBuffer {
    items: Vec<LexResult>,
    current: usize,
    max: usize,
}

impl EagerBuffer {
    pub fn new(lexer: Lexer, max: usize) -> Self {
        Self {
            items: lexer.collect(),
            current: 0,
            max,
        }
    }
}

impl TokenBuffer for EagerBuffer {
    fn la(&mut self, k: usize) -> Result<Option<&Token>, BufferError> {
        check_bound(k, self.max)?;
        surface(self.items.get(self.current + k - 1))
    }

    fn consume(&mut self) {
        if self.current < self.items.len() {
            self.current += 1;
        }
    }

    fn max_lookahead(&self) -> usize {
        self.max
    }
}

/// Holds at most `max` pending tokens, pulling from the lexer on demand.
pub struct WindowBuffer {
    lexer: Lexer,
    window: VecDeque<LexResult>,
    exhausted: bool,
    max: usize,
}

impl WindowBuffer {
    pub fn new(lexer: Lexer, max: usize) -> Self {
        Self {
            lexer,
            window: VecDeque::with_capacity(max),
            exhausted: false,
            max,
        }
    }

    fn fill(&mut self, wanted: usize) {
        while self.window.len() < wanted && !self.exhausted {
            match self.lexer.next_token() {
                Some(item) => self.window.push_back(item),
                None => self.exhausted = true,
            }
        }
    }
}

impl TokenBuffer for WindowBuffer {
    fn la(&mut self, k: usize) -> Result<Option<&Token>, BufferError> {
        check_bound(k, self.max)?;
        self.fill(k);
        surface(self.window.get(k - 1))
    }

    fn consume(&mut self) {
        self.fill(1);
        self.window.pop_front();
    }

    fn max_lookahead(&self) -> usize {
        self.max
    }
}

/// Caches exactly one token; only `la(1)` is allowed.
pub struct SingleBuffer {
    lexer: Lexer,
    cached: Option<LexResult>,
    exhausted: bool,
}

impl SingleBuffer {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            cached: None,
            exhausted: false,
        }
    }

    fn fill(&mut self) {
        if self.cached.is_none() && !self.exhausted {
            self.cached = self.lexer.next_token();
            self.exhausted = self.cached.is_none();
        }
    }
}

impl TokenBuffer for SingleBuffer {
    fn la(&mut self, k: usize) -> Result<Option<&Token>, BufferError> {
        check_bound(k, 1)?;
        self.fill();
        surface(self.cached.as_ref())
    }

    fn consume(&mut self) {
        self.fill();
        self.cached = None;
    }

    fn max_lookahead(&self) -> usize {
        1
    }
}
