//! Typing rules applied eagerly while the AST is built.
//!
//! Every rule returns the resulting [`Type`] and reports at most one
//! diagnostic. Operands that are already `Erroneous` never produce a new
//! report.

use crate::common::diagnostics::{Diagnostic, DiagnosticSink};
use crate::frontend::ast::{BinaryOp, Location};

use super::types::Type;

fn mismatch(
    diagnostics: &mut dyn DiagnosticSink,
    at: Location,
    message: String,
    found: Type,
    found_at: Location,
) -> Type {
    diagnostics.report(
        Diagnostic::error(at.line, at.column, message).chain(Diagnostic::warning(
            found_at.line,
            found_at.column,
            format!("found `{}` here", found),
        )),
    );
    Type::Erroneous
}

/// `Int ⊕ Int → Int`, any Float among numbers → `Float`.
pub fn binary(
    op: BinaryOp,
    at: Location,
    left: (Type, Location),
    right: (Type, Location),
    diagnostics: &mut dyn DiagnosticSink,
) -> Type {
    let ((left_ty, left_at), (right_ty, right_at)) = (left, right);

    if left_ty.is_erroneous() || right_ty.is_erroneous() {
        return Type::Erroneous;
    }

    for (ty, ty_at) in [(left_ty, left_at), (right_ty, right_at)] {
        if !ty.is_arithmetic() {
            return mismatch(
                diagnostics,
                at,
                format!("operator '{}' expects numeric operands", op.symbol()),
                ty,
                ty_at,
            );
        }
    }

    match (left_ty, right_ty) {
        (Type::Int, Type::Int) => Type::Int,
        _ => Type::Float,
    }
}

pub fn negate(at: Location, operand: (Type, Location), diagnostics: &mut dyn DiagnosticSink) -> Type {
    let (ty, ty_at) = operand;
    if ty.is_erroneous() || ty.is_arithmetic() {
        return ty;
    }

    mismatch(
        diagnostics,
        at,
        "unary '-' expects a numeric operand".into(),
        ty,
        ty_at,
    )
}

/// Both bounds of `{first, last}` must be integers.
pub fn seq(
    at: Location,
    first: (Type, Location),
    last: (Type, Location),
    diagnostics: &mut dyn DiagnosticSink,
) -> Type {
    if first.0.is_erroneous() || last.0.is_erroneous() {
        return Type::Erroneous;
    }

    for (ty, ty_at) in [first, last] {
        if ty != Type::Int {
            return mismatch(
                diagnostics,
                at,
                "range bounds must be integers".into(),
                ty,
                ty_at,
            );
        }
    }

    Type::SeqInt
}

/// Static type of the variable a combinator binds to each element.
pub fn element_binding(sequence: Type) -> Type {
    sequence.element().unwrap_or(Type::Erroneous)
}

/// Checks the first operand of `map`/`reduce`. Returns `false` (after
/// reporting) when it is not a sequence.
pub fn check_sequence_operand(
    combinator: &str,
    at: Location,
    sequence: (Type, Location),
    diagnostics: &mut dyn DiagnosticSink,
) -> bool {
    let (ty, ty_at) = sequence;
    if ty.is_sequence() {
        return true;
    }
    if !ty.is_erroneous() {
        mismatch(
            diagnostics,
            at,
            format!("{} expects a sequence as its first argument", combinator),
            ty,
            ty_at,
        );
    }
    false
}

pub fn map(
    at: Location,
    sequence_ok: bool,
    transformation: (Type, Location),
    diagnostics: &mut dyn DiagnosticSink,
) -> Type {
    let (ty, ty_at) = transformation;
    if !sequence_ok || ty.is_erroneous() {
        return Type::Erroneous;
    }

    match ty.sequence_of() {
        Some(seq) => seq,
        None => mismatch(
            diagnostics,
            at,
            "map transformation must produce a number".into(),
            ty,
            ty_at,
        ),
    }
}

/// Checks a `reduce` seed. Returns `false` (after reporting) when it is not
/// a number.
pub fn check_seed(at: Location, seed: (Type, Location), diagnostics: &mut dyn DiagnosticSink) -> bool {
    let (ty, ty_at) = seed;
    if ty.is_arithmetic() {
        return true;
    }
    if !ty.is_erroneous() {
        mismatch(
            diagnostics,
            at,
            "reduce expects a numeric seed".into(),
            ty,
            ty_at,
        );
    }
    false
}

/// Static type of the accumulator binding inside a `reduce` body.
pub fn accumulator_binding(sequence: Type, seed: Type) -> Type {
    if !seed.is_arithmetic() {
        return Type::Erroneous;
    }
    if seed == Type::Float || sequence == Type::SeqFloat {
        Type::Float
    } else {
        Type::Int
    }
}

pub fn reduce(
    at: Location,
    operands_ok: bool,
    accumulator: Type,
    transformation: (Type, Location),
    diagnostics: &mut dyn DiagnosticSink,
) -> Type {
    let (ty, ty_at) = transformation;
    if !operands_ok || ty.is_erroneous() {
        return Type::Erroneous;
    }

    if !ty.is_arithmetic() {
        return mismatch(
            diagnostics,
            at,
            "reduce transformation must produce a number".into(),
            ty,
            ty_at,
        );
    }

    if accumulator == Type::Float || ty == Type::Float {
        Type::Float
    } else {
        Type::Int
    }
}
