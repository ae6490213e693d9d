use crate::common::diagnostics::{Diagnostic, DiagnosticSink};
use crate::middle::{type_system, types::Type};

use super::lexer::TokenType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn from_token(ty: TokenType) -> Option<Self> {
        match ty {
            TokenType::Add => Some(BinaryOp::Add),
            TokenType::Sub => Some(BinaryOp::Sub),
            TokenType::Mul => Some(BinaryOp::Mul),
            TokenType::Div => Some(BinaryOp::Div),
            TokenType::Pow => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

///
/// Expressions
///

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral { text: String, value: i64 },
    FloatLiteral { text: String, value: f64 },
    StringLiteral(String),
    Id(String),
    Paren(Box<Expr>),
    Negate(Box<Expr>),
    Binary(BinaryExpr),
    Seq(SeqExpr),
    Map(MapExpr),
    Reduce(ReduceExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeqExpr {
    pub first: Box<Expr>,
    pub last: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapExpr {
    pub sequence: Box<Expr>,
    pub binding: Decl,
    pub transformation: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReduceExpr {
    pub sequence: Box<Expr>,
    pub seed: Box<Expr>,
    pub accumulator: Decl,
    pub element: Decl,
    pub transformation: Box<Expr>,
}

/// An expression node. Its type is computed by the constructor and cannot
/// change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
    ty: Type,
}

impl Expr {
    pub fn ty(&self) -> Type {
        self.ty
    }

    fn typed(kind: ExprKind, location: Location, ty: Type) -> Self {
        Self { kind, location, ty }
    }

    pub fn int_literal(
        text: impl Into<String>,
        location: Location,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Self {
        let text = text.into();
        match text.parse::<i64>() {
            Ok(value) => Self::typed(ExprKind::IntLiteral { text, value }, location, Type::Int),
            Err(_) => {
                diagnostics.report(Diagnostic::error(
                    location.line,
                    location.column,
                    format!("integer literal '{}' is out of range", text),
                ));
                Self::typed(
                    ExprKind::IntLiteral { text, value: 0 },
                    location,
                    Type::Erroneous,
                )
            }
        }
    }

    pub fn float_literal(
        text: impl Into<String>,
        location: Location,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Self {
        let text = text.into();
        match text.parse::<f64>() {
            Ok(value) => Self::typed(ExprKind::FloatLiteral { text, value }, location, Type::Float),
            Err(_) => {
                diagnostics.report(Diagnostic::error(
                    location.line,
                    location.column,
                    format!("invalid float literal '{}'", text),
                ));
                Self::typed(
                    ExprKind::FloatLiteral { text, value: 0.0 },
                    location,
                    Type::Erroneous,
                )
            }
        }
    }

    pub fn string_literal(text: impl Into<String>, location: Location) -> Self {
        Self::typed(ExprKind::StringLiteral(text.into()), location, Type::String)
    }

    /// An identifier use. `ty` comes from the declaration it resolved to.
    pub fn id(name: impl Into<String>, ty: Type, location: Location) -> Self {
        Self::typed(ExprKind::Id(name.into()), location, ty)
    }

    pub fn paren(inner: Expr, location: Location) -> Self {
        let ty = inner.ty;
        Self::typed(ExprKind::Paren(Box::new(inner)), location, ty)
    }

    pub fn negate(inner: Expr, location: Location, diagnostics: &mut dyn DiagnosticSink) -> Self {
        let ty = type_system::negate(location, (inner.ty, inner.location), diagnostics);
        Self::typed(ExprKind::Negate(Box::new(inner)), location, ty)
    }

    pub fn binary(
        op: BinaryOp,
        left: Expr,
        right: Expr,
        location: Location,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Self {
        let ty = type_system::binary(
            op,
            location,
            (left.ty, left.location),
            (right.ty, right.location),
            diagnostics,
        );
        Self::typed(
            ExprKind::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }),
            location,
            ty,
        )
    }

    /// Bounds are checked statically; their order only when evaluated.
    pub fn seq(
        first: Expr,
        last: Expr,
        location: Location,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Self {
        let ty = type_system::seq(
            location,
            (first.ty, first.location),
            (last.ty, last.location),
            diagnostics,
        );
        Self::typed(
            ExprKind::Seq(SeqExpr {
                first: Box::new(first),
                last: Box::new(last),
            }),
            location,
            ty,
        )
    }

    pub fn map(
        sequence: Expr,
        binding: Decl,
        transformation: Expr,
        location: Location,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Self {
        let sequence_ok = type_system::check_sequence_operand(
            "map",
            location,
            (sequence.ty, sequence.location),
            diagnostics,
        );
        let ty = type_system::map(
            location,
            sequence_ok,
            (transformation.ty, transformation.location),
            diagnostics,
        );

        Self::typed(
            ExprKind::Map(MapExpr {
                sequence: Box::new(sequence),
                binding,
                transformation: Box::new(transformation),
            }),
            location,
            ty,
        )
    }

    pub fn reduce(
        sequence: Expr,
        seed: Expr,
        accumulator: Decl,
        element: Decl,
        transformation: Expr,
        location: Location,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Self {
        let sequence_ok = type_system::check_sequence_operand(
            "reduce",
            location,
            (sequence.ty, sequence.location),
            diagnostics,
        );
        let seed_ok = type_system::check_seed(location, (seed.ty, seed.location), diagnostics);
        let ty = type_system::reduce(
            location,
            sequence_ok && seed_ok,
            accumulator.ty,
            (transformation.ty, transformation.location),
            diagnostics,
        );

        Self::typed(
            ExprKind::Reduce(ReduceExpr {
                sequence: Box::new(sequence),
                seed: Box::new(seed),
                accumulator,
                element,
                transformation: Box::new(transformation),
            }),
            location,
            ty,
        )
    }
}

///
/// Statements
///

/// A named binding. Top-level `var` statements always carry an initializer;
/// the bindings introduced by `map`/`reduce` never do.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub initializer: Option<Box<Expr>>,
    pub location: Location,
    ty: Type,
}

impl Decl {
    pub fn var(name: impl Into<String>, initializer: Expr, location: Location) -> Self {
        Self {
            name: name.into(),
            ty: initializer.ty,
            initializer: Some(Box::new(initializer)),
            location,
        }
    }

    pub fn binding(name: impl Into<String>, ty: Type, location: Location) -> Self {
        Self {
            name: name.into(),
            initializer: None,
            location,
            ty,
        }
    }

    pub fn ty(&self) -> Type {
        self.ty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Decl(Decl),
    Print { text: String, location: Location },
    Out { expr: Expr, location: Location },
}

impl Stmt {
    pub fn location(&self) -> Location {
        match self {
            Stmt::Decl(decl) => decl.location,
            Stmt::Print { location, .. } | Stmt::Out { location, .. } => *location,
        }
    }
}

/// Statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}
