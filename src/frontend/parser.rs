use std::collections::HashMap;

use thiserror::Error;

use crate::common::config::{InterpreterConfig, MAX_EXPRESSION_DEPTH, ScopeMode};
use crate::common::diagnostics::{Diagnostic, DiagnosticSink};
use crate::middle::{type_system, types::Type};

use super::ast::{BinaryOp, Decl, Expr, Location, Program, Stmt};
use super::lexer::{LexError, Token, TokenType};
use super::token_buffer::{self, BufferError, TokenBuffer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("unexpected end of input, expected {expected}")]
    EndOfInput {
        expected: String,
        line: usize,
        column: usize,
    },
    #[error(transparent)]
    Lex(LexError),
    /// The grammar asked for more lookahead than the buffer allows. Nothing
    /// sensible can be parsed after that.
    #[error("{0}")]
    Fatal(BufferError),
}

impl ParseError {
    pub fn location(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. } | ParseError::EndOfInput { line, column, .. } => {
                (*line, *column)
            }
            ParseError::Lex(err) => err.location(),
            ParseError::Fatal(_) => (0, 0),
        }
    }

    fn to_diagnostic(&self) -> Diagnostic {
        let (line, column) = self.location();
        Diagnostic::error(line, column, self.to_string())
    }
}

impl From<BufferError> for ParseError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Lex(err) => ParseError::Lex(err),
            fatal @ BufferError::LookaheadExceeded { .. } => ParseError::Fatal(fatal),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Names visible at one nesting level while parsing.
#[derive(Debug, Default)]
struct StaticScope {
    barrier: bool,
    symbols: HashMap<String, (Type, Location)>,
}

pub struct Parser<'d> {
    buffer: Box<dyn TokenBuffer>,
    diagnostics: &'d mut dyn DiagnosticSink,
    scope_mode: ScopeMode,
    scopes: Vec<StaticScope>,

    // position of the last consumed token, and its line while inside a statement
    last_location: Location,
    statement_line: Option<usize>,
    depth: usize,
}

/// Parses `source` with the buffer and scoping configured in `config`.
pub fn parse(
    source: &str,
    config: &InterpreterConfig,
    diagnostics: &mut dyn DiagnosticSink,
) -> Program {
    let buffer = token_buffer::for_config(source, config);
    Parser::new(buffer, config.scope_mode, diagnostics).parse_program()
}

impl<'d> Parser<'d> {
    pub fn new(
        buffer: Box<dyn TokenBuffer>,
        scope_mode: ScopeMode,
        diagnostics: &'d mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            buffer,
            diagnostics,
            scope_mode,
            scopes: vec![StaticScope::default()],
            last_location: Location::new(1, 1),
            statement_line: None,
            depth: 0,
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        loop {
            if matches!(self.buffer.la(1), Ok(None)) {
                break;
            }

            self.statement_line = None;
            self.depth = 0;
            match self.statement() {
                Ok(Some(stmt)) => statements.push(stmt),
                Ok(None) => {}
                Err(err @ ParseError::Fatal(_)) => {
                    let Location { line, column } = self.last_location;
                    self.diagnostics
                        .report(Diagnostic::fatal(line, column, err.to_string()));
                    return Program::default();
                }
                Err(err) => {
                    let line = self.recovery_line(&err);
                    self.diagnostics.report(err.to_diagnostic());
                    self.synchronize(line);
                }
            }
        }

        Program { statements }
    }

    /// A lexical error is dropped together with the rest of its own line.
    /// A syntax error drops the rest of the line the statement had reached,
    /// or the offending token's line when the statement consumed nothing.
    fn recovery_line(&self, err: &ParseError) -> usize {
        match err {
            ParseError::Lex(lex) => lex.location().0,
            _ => self.statement_line.unwrap_or(err.location().0),
        }
    }

    fn synchronize(&mut self, line: usize) {
        self.scopes.truncate(1);

        let mut discarded = 0;
        loop {
            let on_line = match self.buffer.la(1) {
                Ok(Some(token)) => token.line == line,
                Err(BufferError::Lex(err)) => err.location().0 == line,
                _ => false,
            };
            if !on_line {
                break;
            }
            self.buffer.consume();
            discarded += 1;
        }

        tracing::debug!("recovered at line {}, discarded {} tokens", line, discarded);
    }

    fn peek(&mut self) -> ParseResult<Option<Token>> {
        Ok(self.buffer.la(1)?.cloned())
    }

    fn peek_type(&mut self) -> ParseResult<Option<TokenType>> {
        Ok(self.buffer.la(1)?.map(|token| token.ty))
    }

    fn end_of_input(&self, expected: &str) -> ParseError {
        ParseError::EndOfInput {
            expected: expected.to_string(),
            line: self.last_location.line,
            column: self.last_location.column,
        }
    }

    fn advance(&mut self, expected: &str) -> ParseResult<Token> {
        let token = match self.peek()? {
            Some(token) => token,
            None => return Err(self.end_of_input(expected)),
        };

        self.buffer.consume();
        self.last_location = Location::new(token.line, token.column);
        self.statement_line = Some(token.line);
        Ok(token)
    }

    fn expect(&mut self, ty: TokenType) -> ParseResult<Token> {
        match self.peek()? {
            Some(token) if token.ty == ty => self.advance(&ty.to_string()),
            Some(token) => Err(ParseError::Syntax {
                message: format!("expected {}, found {}", ty, describe(&token)),
                line: token.line,
                column: token.column,
            }),
            None => Err(self.end_of_input(&ty.to_string())),
        }
    }

    fn statement(&mut self) -> ParseResult<Option<Stmt>> {
        let token = match self.peek()? {
            Some(token) => token,
            None => return Err(self.end_of_input("a statement")),
        };

        match token.ty {
            TokenType::Var => self.var_declaration(),
            TokenType::Print => self.print_statement().map(Some),
            TokenType::Out => self.out_statement().map(Some),
            TokenType::Id if self.looks_like_declaration() => Err(ParseError::Syntax {
                message: format!("missing 'var' before declaration of '{}'", token.lexeme),
                line: token.line,
                column: token.column,
            }),
            _ => Err(ParseError::Syntax {
                message: format!("expected a statement, found {}", describe(&token)),
                line: token.line,
                column: token.column,
            }),
        }
    }

    // `x = ...` needs a second token of lookahead to tell apart
    fn looks_like_declaration(&mut self) -> bool {
        if self.buffer.max_lookahead() < 2 {
            return false;
        }
        matches!(self.buffer.la(2), Ok(Some(token)) if token.ty == TokenType::Eq)
    }

    fn var_declaration(&mut self) -> ParseResult<Option<Stmt>> {
        let keyword = self.advance("'var'")?;
        let name = self.expect(TokenType::Id)?;
        self.expect(TokenType::Eq)?;
        let initializer = self.expression()?;

        let location = Location::new(keyword.line, keyword.column);

        if let Some((_, previous)) = self.scopes[0].symbols.get(&name.lexeme) {
            self.diagnostics.report(
                Diagnostic::error(
                    name.line,
                    name.column,
                    format!("variable '{}' is already declared", name.lexeme),
                )
                .chain(Diagnostic::warning(
                    previous.line,
                    previous.column,
                    format!("previous declaration of '{}'", name.lexeme),
                )),
            );
            return Ok(None);
        }

        self.scopes[0].symbols.insert(
            name.lexeme.clone(),
            (initializer.ty(), Location::new(name.line, name.column)),
        );

        Ok(Some(Stmt::Decl(Decl::var(name.lexeme, initializer, location))))
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.advance("'print'")?;
        let text = self.expect(TokenType::String)?;

        Ok(Stmt::Print {
            text: text.lexeme,
            location: Location::new(keyword.line, keyword.column),
        })
    }

    fn out_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.advance("'out'")?;
        let expr = self.expression()?;

        Ok(Stmt::Out {
            expr,
            location: Location::new(keyword.line, keyword.column),
        })
    }

    /// `primary (op expr)?`: every operator takes the whole rest of the
    /// expression as its right operand, so chains are right-associative and
    /// there is no precedence between operators.
    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(|parser| parser.operation())
    }

    fn operation(&mut self) -> ParseResult<Expr> {
        let left = self.primary()?;

        let op = match self.peek_type()?.and_then(BinaryOp::from_token) {
            Some(op) => op,
            None => return Ok(left),
        };

        let operator = self.advance("an operator")?;
        let right = self.expression()?;

        Ok(Expr::binary(
            op,
            left,
            right,
            Location::new(operator.line, operator.column),
            &mut *self.diagnostics,
        ))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = match self.peek()? {
            Some(token) => token,
            None => return Err(self.end_of_input("an expression")),
        };
        let location = Location::new(token.line, token.column);

        match token.ty {
            TokenType::Int => {
                self.advance("an expression")?;
                Ok(Expr::int_literal(token.lexeme, location, &mut *self.diagnostics))
            }
            TokenType::Float => {
                self.advance("an expression")?;
                Ok(Expr::float_literal(token.lexeme, location, &mut *self.diagnostics))
            }
            TokenType::String => {
                self.advance("an expression")?;
                Ok(Expr::string_literal(token.lexeme, location))
            }
            TokenType::Id => {
                self.advance("an expression")?;
                let ty = self.resolve(&token.lexeme, location);
                Ok(Expr::id(token.lexeme, ty, location))
            }
            TokenType::LParen => {
                self.advance("an expression")?;
                let inner = self.expression()?;
                self.expect(TokenType::RParen)?;
                Ok(Expr::paren(inner, location))
            }
            TokenType::LCurly => {
                self.advance("an expression")?;
                let first = self.expression()?;
                self.expect(TokenType::Comma)?;
                let last = self.expression()?;
                self.expect(TokenType::RCurly)?;
                Ok(Expr::seq(first, last, location, &mut *self.diagnostics))
            }
            TokenType::Sub => self.negation(location),
            TokenType::Map => self.map_expression(location),
            TokenType::Reduce => self.reduce_expression(location),
            _ => Err(ParseError::Syntax {
                message: format!("expected an expression, found {}", describe(&token)),
                line: token.line,
                column: token.column,
            }),
        }
    }

    /// Unary minus binds to the following primary only. Directly in front of
    /// a numeric literal it becomes part of the literal.
    fn negation(&mut self, location: Location) -> ParseResult<Expr> {
        self.advance("'-'")?;

        match self.peek()? {
            Some(token) if token.ty == TokenType::Int => {
                self.advance("an expression")?;
                let text = format!("-{}", token.lexeme);
                Ok(Expr::int_literal(text, location, &mut *self.diagnostics))
            }
            Some(token) if token.ty == TokenType::Float => {
                self.advance("an expression")?;
                let text = format!("-{}", token.lexeme);
                Ok(Expr::float_literal(text, location, &mut *self.diagnostics))
            }
            _ => {
                let inner = self.nested(|parser| parser.primary())?;
                Ok(Expr::negate(inner, location, &mut *self.diagnostics))
            }
        }
    }

    /// Bounds the recursion of `body`. Every operator, parenthesis and unary
    /// minus nests one level deeper.
    fn nested(
        &mut self,
        body: impl FnOnce(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            let (line, column) = match self.buffer.la(1) {
                Ok(Some(token)) => (token.line, token.column),
                _ => (self.last_location.line, self.last_location.column),
            };
            return Err(ParseError::Syntax {
                message: format!(
                    "expression is nested too deeply (limit {})",
                    MAX_EXPRESSION_DEPTH
                ),
                line,
                column,
            });
        }

        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    fn map_expression(&mut self, location: Location) -> ParseResult<Expr> {
        self.advance("'map'")?;
        self.expect(TokenType::LParen)?;
        let sequence = self.expression()?;
        self.expect(TokenType::Comma)?;
        let name = self.expect(TokenType::Id)?;
        self.expect(TokenType::Arrow)?;

        let binding = Decl::binding(
            name.lexeme,
            type_system::element_binding(sequence.ty()),
            Location::new(name.line, name.column),
        );

        let transformation = self.scoped(&[&binding], |parser| parser.expression())?;
        self.expect(TokenType::RParen)?;

        Ok(Expr::map(
            sequence,
            binding,
            transformation,
            location,
            &mut *self.diagnostics,
        ))
    }

    fn reduce_expression(&mut self, location: Location) -> ParseResult<Expr> {
        self.advance("'reduce'")?;
        self.expect(TokenType::LParen)?;
        let sequence = self.expression()?;
        self.expect(TokenType::Comma)?;
        let seed = self.expression()?;
        self.expect(TokenType::Comma)?;
        let previous = self.expect(TokenType::Id)?;
        let current = self.expect(TokenType::Id)?;
        self.expect(TokenType::Arrow)?;

        let accumulator = Decl::binding(
            previous.lexeme,
            type_system::accumulator_binding(sequence.ty(), seed.ty()),
            Location::new(previous.line, previous.column),
        );
        let element = Decl::binding(
            current.lexeme,
            type_system::element_binding(sequence.ty()),
            Location::new(current.line, current.column),
        );

        // the element is declared last so it wins when both names are equal
        let transformation =
            self.scoped(&[&accumulator, &element], |parser| parser.expression())?;
        self.expect(TokenType::RParen)?;

        Ok(Expr::reduce(
            sequence,
            seed,
            accumulator,
            element,
            transformation,
            location,
            &mut *self.diagnostics,
        ))
    }

    /// Runs `body` with the given bindings visible, behind a barrier scope.
    fn scoped<T>(
        &mut self,
        bindings: &[&Decl],
        body: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let mut scope = StaticScope {
            barrier: true,
            symbols: HashMap::new(),
        };
        for binding in bindings {
            scope
                .symbols
                .insert(binding.name.clone(), (binding.ty(), binding.location));
        }

        self.scopes.push(scope);
        let result = body(self);
        self.scopes.pop();
        result
    }

    fn resolve(&mut self, name: &str, location: Location) -> Type {
        for scope in self.scopes.iter().rev() {
            if let Some((ty, _)) = scope.symbols.get(name) {
                return *ty;
            }
            if scope.barrier && self.scope_mode == ScopeMode::Isolated {
                break;
            }
        }

        self.diagnostics.report(Diagnostic::error(
            location.line,
            location.column,
            format!("undeclared variable '{}'", name),
        ));
        Type::Erroneous
    }
}

fn describe(token: &Token) -> String {
    match token.ty {
        TokenType::Int | TokenType::Float | TokenType::Id => {
            format!("{} '{}'", token.ty, token.lexeme)
        }
        _ => token.ty.to_string(),
    }
}
