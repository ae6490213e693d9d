//! Compiled fast path for `map`/`reduce` bodies.
//!
//! A body made only of numeric literals, parentheses, negation, binary
//! operators and variable reads is turned into a tree of closures
//! specialised for `i64`/`f64` operands. The per-element work then skips
//! node dispatch and scope lookups entirely. Results and diagnostics are the
//! same as walking the tree: both operands are always evaluated, left first,
//! and the same scalar kernels from `common::value` do the arithmetic.

use std::fmt::Display;

use crate::common::diagnostics::DiagnosticSink;
use crate::common::value::{self, Value};
use crate::frontend::ast::{BinaryOp, Expr, ExprKind, Location};

use super::evaluator::arith_diagnostic;

/// Per-iteration storage for the variables a combinator binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Element = 0,
    Accumulator = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Int,
    Float,
}

impl Kind {
    pub fn of(value: &Value) -> Option<Kind> {
        match value {
            Value::Int(_) => Some(Kind::Int),
            Value::Float(_) => Some(Kind::Float),
            _ => None,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Frame {
    ints: [i64; 2],
    floats: [f64; 2],
}

impl Frame {
    /// Stores a scalar into `slot`; non-numeric values are ignored.
    pub fn set(&mut self, slot: Slot, value: &Value) {
        match value {
            Value::Int(n) => self.ints[slot as usize] = *n,
            Value::Float(f) => self.floats[slot as usize] = *f,
            _ => {}
        }
    }

    fn int(&self, slot: Slot) -> i64 {
        self.ints[slot as usize]
    }

    fn float(&self, slot: Slot) -> f64 {
        self.floats[slot as usize]
    }
}

/// A name the compiled body reads from the frame instead of the scope chain.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub slot: Slot,
    pub kind: Kind,
}

/// Supplies the values of variables declared outside the body.
pub trait Environment<'p> {
    /// The variable's current value if it is a number. Must leave no trace
    /// (diagnostics, memoised values) when it returns `None`.
    fn constant(&mut self, name: &'p str, at: Location) -> Option<Value>;
}

type IntOp = Box<dyn Fn(&Frame, &mut dyn DiagnosticSink) -> Option<i64>>;
type FloatOp = Box<dyn Fn(&Frame, &mut dyn DiagnosticSink) -> Option<f64>>;

pub enum Compiled {
    Int(IntOp),
    Float(FloatOp),
}

impl std::fmt::Debug for Compiled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Compiled({})", self.kind())
    }
}

impl Compiled {
    pub fn kind(&self) -> Kind {
        match self {
            Compiled::Int(_) => Kind::Int,
            Compiled::Float(_) => Kind::Float,
        }
    }

    pub fn eval(&self, frame: &Frame, diagnostics: &mut dyn DiagnosticSink) -> Value {
        let result = match self {
            Compiled::Int(op) => op(frame, diagnostics).map(Value::Int),
            Compiled::Float(op) => op(frame, diagnostics).map(Value::Float),
        };
        result.unwrap_or(Value::Error)
    }

    fn widened(self) -> FloatOp {
        match self {
            Compiled::Int(op) => float_op(move |frame, diagnostics| {
                op(frame, diagnostics).map(|n| n as f64)
            }),
            Compiled::Float(op) => op,
        }
    }
}

/// Compiles `expr`, or returns `None` when some part of it has no compiled
/// form. `bindings` are searched in order, so put the one that should win a
/// name clash first.
pub fn compile<'p>(
    expr: &'p Expr,
    bindings: &[Binding],
    env: &mut dyn Environment<'p>,
) -> Option<Compiled> {
    match &expr.kind {
        ExprKind::IntLiteral { value, .. } => Some(int_constant(*value)),
        ExprKind::FloatLiteral { value, .. } => Some(float_constant(*value)),
        ExprKind::Id(name) => {
            if let Some(binding) = bindings.iter().find(|b| b.name == name) {
                return Some(slot_read(*binding));
            }
            match env.constant(name, expr.location)? {
                Value::Int(n) => Some(int_constant(n)),
                Value::Float(f) => Some(float_constant(f)),
                _ => None,
            }
        }
        ExprKind::Paren(inner) => compile(inner, bindings, env),
        ExprKind::Negate(inner) => Some(match compile(inner, bindings, env)? {
            Compiled::Int(op) => Compiled::Int(int_op(move |frame, diagnostics| {
                op(frame, diagnostics).map(i64::wrapping_neg)
            })),
            Compiled::Float(op) => Compiled::Float(float_op(move |frame, diagnostics| {
                op(frame, diagnostics).map(|f| -f)
            })),
        }),
        ExprKind::Binary(binary) => {
            let left = compile(&binary.left, bindings, env)?;
            let right = compile(&binary.right, bindings, env)?;
            Some(compile_binary(binary.op, left, right, expr.location))
        }
        ExprKind::StringLiteral(_)
        | ExprKind::Seq(_)
        | ExprKind::Map(_)
        | ExprKind::Reduce(_) => None,
    }
}

fn int_op(op: impl Fn(&Frame, &mut dyn DiagnosticSink) -> Option<i64> + 'static) -> IntOp {
    Box::new(op)
}

fn float_op(op: impl Fn(&Frame, &mut dyn DiagnosticSink) -> Option<f64> + 'static) -> FloatOp {
    Box::new(op)
}

fn int_constant(value: i64) -> Compiled {
    Compiled::Int(int_op(move |_, _| Some(value)))
}

fn float_constant(value: f64) -> Compiled {
    Compiled::Float(float_op(move |_, _| Some(value)))
}

fn slot_read(binding: Binding) -> Compiled {
    let slot = binding.slot;
    match binding.kind {
        Kind::Int => Compiled::Int(int_op(move |frame, _| Some(frame.int(slot)))),
        Kind::Float => Compiled::Float(float_op(move |frame, _| Some(frame.float(slot)))),
    }
}

fn compile_binary(op: BinaryOp, left: Compiled, right: Compiled, at: Location) -> Compiled {
    match (left, right) {
        (Compiled::Int(l), Compiled::Int(r)) => int_int(op, l, r, at),
        (Compiled::Float(l), Compiled::Int(r)) if op == BinaryOp::Pow => float_int_pow(l, r, at),
        (l, Compiled::Float(r)) if op == BinaryOp::Pow => float_exponent(l.widened(), r, at),
        (l, r) => float_float(op, l.widened(), r.widened(), at),
    }
}

fn int_int(op: BinaryOp, l: IntOp, r: IntOp, at: Location) -> Compiled {
    let op = match op {
        BinaryOp::Add => int_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a?.wrapping_add(b?))
        }),
        BinaryOp::Sub => int_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a?.wrapping_sub(b?))
        }),
        BinaryOp::Mul => int_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a?.wrapping_mul(b?))
        }),
        BinaryOp::Div => int_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            value::int_div(a?, b?)
                .map_err(|err| d.report(arith_diagnostic(at, err)))
                .ok()
        }),
        BinaryOp::Pow => int_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            value::int_pow(a?, b?)
                .map_err(|err| d.report(arith_diagnostic(at, err)))
                .ok()
        }),
    };
    Compiled::Int(op)
}

fn float_float(op: BinaryOp, l: FloatOp, r: FloatOp, at: Location) -> Compiled {
    let op = match op {
        BinaryOp::Add => float_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a? + b?)
        }),
        BinaryOp::Sub => float_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a? - b?)
        }),
        BinaryOp::Mul => float_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a? * b?)
        }),
        BinaryOp::Div => float_op(move |f, d| {
            let (a, b) = (l(f, d), r(f, d));
            Some(a? / b?)
        }),
        // integer exponents are routed elsewhere before widening
        BinaryOp::Pow => return float_exponent(l, r, at),
    };
    Compiled::Float(op)
}

fn float_int_pow(l: FloatOp, r: IntOp, at: Location) -> Compiled {
    Compiled::Float(float_op(move |f, d| {
        let (a, b) = (l(f, d), r(f, d));
        value::float_pow(a?, b?)
            .map_err(|err| d.report(arith_diagnostic(at, err)))
            .ok()
    }))
}

// a float exponent is always rejected, once both sides evaluated cleanly
fn float_exponent(l: FloatOp, r: FloatOp, at: Location) -> Compiled {
    Compiled::Float(float_op(move |f, d| {
        let (a, b) = (l(f, d), r(f, d));
        a?;
        b?;
        d.report(arith_diagnostic(at, value::ArithError::NonIntegerExponent));
        None
    }))
}
