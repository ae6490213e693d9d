use std::{
    fmt::Display,
    ops::{Add, Div, Mul, Neg, Sub},
    rc::Rc,
};

use thiserror::Error;

use crate::frontend::ast::BinaryOp;

/// Runtime value. `Error` is absorbing: anything computed from it is
/// `Error` again and nobody reports it twice.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    IntArray(Rc<Vec<i64>>),
    FloatArray(Rc<Vec<f64>>),
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithError {
    #[error("zero division")]
    ZeroDivision,
    #[error("negative exponent")]
    NegativeExponent,
    #[error("exponent must be a non-negative integer")]
    NonIntegerExponent,
    #[error("arithmetic on a non-numeric value")]
    NotArithmetic,
}

pub type ArithResult = Result<Value, ArithError>;

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn int_array(values: Vec<i64>) -> Self {
        Value::IntArray(Rc::new(values))
    }

    pub fn float_array(values: Vec<f64>) -> Self {
        Value::FloatArray(Rc::new(values))
    }

    /// Widens an `Int` to `Float`; other values are returned unchanged.
    pub fn to_float(self) -> Value {
        match self {
            Value::Int(n) => Value::Float(n as f64),
            other => other,
        }
    }

    pub fn binary(self, op: BinaryOp, rhs: Value) -> ArithResult {
        match op {
            BinaryOp::Add => self + rhs,
            BinaryOp::Sub => self - rhs,
            BinaryOp::Mul => self * rhs,
            BinaryOp::Div => self / rhs,
            BinaryOp::Pow => self.pow(rhs),
        }
    }

    pub fn pow(self, rhs: Value) -> ArithResult {
        match (self, rhs) {
            (Value::Error, _) | (_, Value::Error) => Ok(Value::Error),
            (Value::Int(base), Value::Int(exp)) => int_pow(base, exp).map(Value::Int),
            (Value::Float(base), Value::Int(exp)) => float_pow(base, exp).map(Value::Float),
            (Value::Int(_) | Value::Float(_), Value::Float(_)) => {
                Err(ArithError::NonIntegerExponent)
            }
            _ => Err(ArithError::NotArithmetic),
        }
    }
}

// Scalar kernels shared by the tree walker and the compiled op tree, so both
// paths compute bit-identical results.

pub fn int_div(left: i64, right: i64) -> Result<i64, ArithError> {
    if right == 0 {
        return Err(ArithError::ZeroDivision);
    }
    Ok(left.wrapping_div(right))
}

pub fn int_pow(base: i64, exp: i64) -> Result<i64, ArithError> {
    if exp < 0 {
        return Err(ArithError::NegativeExponent);
    }
    // exact by parity; going through f64 would lose it for huge exponents
    if base == -1 {
        return Ok(if exp % 2 == 0 { 1 } else { -1 });
    }
    Ok((base as f64).powf(exp as f64) as i64)
}

pub fn float_pow(base: f64, exp: i64) -> Result<f64, ArithError> {
    if exp < 0 {
        return Err(ArithError::NegativeExponent);
    }
    Ok(base.powf(exp as f64))
}

/// Widening helper for the mixed `Int`/`Float` cases of `+ - * /`.
fn float_pair(left: Value, right: Value) -> Option<(f64, f64)> {
    match (left, right) {
        (Value::Float(l), Value::Float(r)) => Some((l, r)),
        (Value::Int(l), Value::Float(r)) => Some((l as f64, r)),
        (Value::Float(l), Value::Int(r)) => Some((l, r as f64)),
        _ => None,
    }
}

macro_rules! arith_impl {
    ($trait:ident, $method:ident, $int:expr, $float:expr) => {
        impl $trait for Value {
            type Output = ArithResult;

            fn $method(self, rhs: Self) -> Self::Output {
                match (self, rhs) {
                    (Value::Error, _) | (_, Value::Error) => Ok(Value::Error),
                    (Value::Int(l), Value::Int(r)) => $int(l, r).map(Value::Int),
                    (l, r) => match float_pair(l, r) {
                        Some((l, r)) => Ok(Value::Float($float(l, r))),
                        None => Err(ArithError::NotArithmetic),
                    },
                }
            }
        }
    };
}

arith_impl!(
    Add,
    add,
    |l: i64, r: i64| -> Result<i64, ArithError> { Ok(l.wrapping_add(r)) },
    |l: f64, r: f64| l + r
);
arith_impl!(
    Sub,
    sub,
    |l: i64, r: i64| -> Result<i64, ArithError> { Ok(l.wrapping_sub(r)) },
    |l: f64, r: f64| l - r
);
arith_impl!(
    Mul,
    mul,
    |l: i64, r: i64| -> Result<i64, ArithError> { Ok(l.wrapping_mul(r)) },
    |l: f64, r: f64| l * r
);
arith_impl!(Div, div, int_div, |l: f64, r: f64| l / r);

impl Neg for Value {
    type Output = ArithResult;

    fn neg(self) -> Self::Output {
        match self {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Error => Ok(Value::Error),
            _ => Err(ArithError::NotArithmetic),
        }
    }
}

/// Shortest round-trip form, keeping a `.0` on integral values so floats
/// stay distinguishable from integers in the output.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn join<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<String>>().join(", ")
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::IntArray(items) => write!(f, "{}", join(items, |n| n.to_string())),
            Value::FloatArray(items) => write!(f, "{}", join(items, |n| format_float(*n))),
            Value::Error => Ok(()),
        }
    }
}
