use std::fmt::Display;

use thiserror::Error;

use super::scanner::Scanner;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenType {
    // literals
    Int,
    Float,
    String,
    Id,

    // keywords
    Var,
    Map,
    Reduce,
    Print,
    Out,

    // operators
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,

    // misc
    LParen,
    RParen,
    LCurly,
    RCurly,
    Comma,
    Arrow,
}

impl TokenType {
    /// Canonical spelling of fixed-text tokens. Literal kinds have none.
    pub fn spelling(self) -> Option<&'static str> {
        let text = match self {
            TokenType::Int | TokenType::Float | TokenType::String | TokenType::Id => return None,
            TokenType::Var => "var",
            TokenType::Map => "map",
            TokenType::Reduce => "reduce",
            TokenType::Print => "print",
            TokenType::Out => "out",
            TokenType::Add => "+",
            TokenType::Sub => "-",
            TokenType::Mul => "*",
            TokenType::Div => "/",
            TokenType::Pow => "^",
            TokenType::Eq => "=",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LCurly => "{",
            TokenType::RCurly => "}",
            TokenType::Comma => ",",
            TokenType::Arrow => "->",
        };
        Some(text)
    }

    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenType::Add | TokenType::Sub | TokenType::Mul | TokenType::Div | TokenType::Pow
        )
    }

    fn keyword(text: &str) -> Option<TokenType> {
        match text {
            "var" => Some(TokenType::Var),
            "map" => Some(TokenType::Map),
            "reduce" => Some(TokenType::Reduce),
            "print" => Some(TokenType::Print),
            "out" => Some(TokenType::Out),
            _ => None,
        }
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.spelling() {
            Some(text) => write!(f, "'{}'", text),
            None => match self {
                TokenType::Int => write!(f, "integer literal"),
                TokenType::Float => write!(f, "float literal"),
                TokenType::String => write!(f, "string literal"),
                _ => write!(f, "identifier"),
            },
        }
    }
}

/// A classified lexeme and the position of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,

    // in source
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(ty: TokenType, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            ty,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    fn fixed(ty: TokenType, line: usize, column: usize) -> Self {
        Self::new(ty, ty.spelling().unwrap_or_default(), line, column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("malformed number '{text}': more than one decimal point")]
    MalformedNumber {
        text: String,
        line: usize,
        column: usize,
    },
    #[error("unterminated string literal")]
    UnterminatedString { line: usize, column: usize },
    #[error("unexpected character {found:?}")]
    UnexpectedCharacter {
        found: char,
        line: usize,
        column: usize,
    },
}

impl LexError {
    pub fn location(&self) -> (usize, usize) {
        match self {
            LexError::MalformedNumber { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::UnexpectedCharacter { line, column, .. } => (*line, *column),
        }
    }
}

pub type LexResult = Result<Token, LexError>;

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lazily turns characters into tokens; `None` marks end of stream.
pub struct Lexer {
    scanner: Scanner,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::from(Scanner::new(source))
    }

    pub fn from(scanner: Scanner) -> Self {
        Self { scanner }
    }

    /// Lexes everything, stopping at the first error.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        Lexer::new(source).collect()
    }

    pub fn next_token(&mut self) -> Option<LexResult> {
        // whitespace never produces tokens
        while self.scanner.peek().is_some_and(char::is_whitespace) {
            self.scanner.advance();
        }

        let start = self.scanner.current;
        let (line, column) = self.scanner.position();
        let c = self.scanner.advance()?;

        let token = match c {
            // simple one character tokens
            '+' => Ok(Token::fixed(TokenType::Add, line, column)),
            '*' => Ok(Token::fixed(TokenType::Mul, line, column)),
            '/' => Ok(Token::fixed(TokenType::Div, line, column)),
            '^' => Ok(Token::fixed(TokenType::Pow, line, column)),
            '=' => Ok(Token::fixed(TokenType::Eq, line, column)),
            ',' => Ok(Token::fixed(TokenType::Comma, line, column)),
            '(' => Ok(Token::fixed(TokenType::LParen, line, column)),
            ')' => Ok(Token::fixed(TokenType::RParen, line, column)),
            '{' => Ok(Token::fixed(TokenType::LCurly, line, column)),
            '}' => Ok(Token::fixed(TokenType::RCurly, line, column)),

            // a minus is always an operator on its own, the parser owns negation
            '-' => {
                if self.scanner.advance_if('>') {
                    Ok(Token::fixed(TokenType::Arrow, line, column))
                } else {
                    Ok(Token::fixed(TokenType::Sub, line, column))
                }
            }

            '"' => self.string(start, line, column),

            '0'..='9' => self.number(start, line, column),

            c if is_identifier_start(c) => Ok(self.identifier(start, line, column)),

            found => Err(LexError::UnexpectedCharacter {
                found,
                line,
                column,
            }),
        };

        if let Err(err) = &token {
            tracing::trace!("lexical error: {}", err);
        }

        Some(token)
    }

    fn string(&mut self, start: usize, line: usize, column: usize) -> LexResult {
        // embedded new lines are kept, the scanner keeps line/column in sync
        loop {
            match self.scanner.advance() {
                Some('"') => break,
                Some(_) => {}
                None => return Err(LexError::UnterminatedString { line, column }),
            }
        }

        let lexeme = self.scanner.get_lexeme(start + 1, self.scanner.current - 1);
        Ok(Token::new(TokenType::String, lexeme, line, column))
    }

    fn number(&mut self, start: usize, line: usize, column: usize) -> LexResult {
        let mut dots = 0;

        while let Some(c) = self.scanner.advance() {
            if c == '.' {
                dots += 1;
            } else if !c.is_ascii_digit() {
                self.scanner.unread();
                break;
            }
        }

        let lexeme = self.scanner.get_lexeme(start, self.scanner.current);
        match dots {
            0 => Ok(Token::new(TokenType::Int, lexeme, line, column)),
            1 => Ok(Token::new(TokenType::Float, lexeme, line, column)),
            _ => Err(LexError::MalformedNumber {
                text: lexeme,
                line,
                column,
            }),
        }
    }

    fn identifier(&mut self, start: usize, line: usize, column: usize) -> Token {
        while self.scanner.peek().is_some_and(is_identifier_part) {
            self.scanner.advance();
        }

        let lexeme = self.scanner.get_lexeme(start, self.scanner.current);
        let ty = TokenType::keyword(&lexeme).unwrap_or(TokenType::Id);
        Token::new(ty, lexeme, line, column)
    }
}

impl Iterator for Lexer {
    type Item = LexResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
