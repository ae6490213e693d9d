use std::rc::Rc;

use crate::common::config::{InterpreterConfig, MAX_EVALUATION_DEPTH};
use crate::common::diagnostics::{Diagnostic, DiagnosticSink};
use crate::common::output::OutputSink;
use crate::common::value::{ArithError, ArithResult, Value};
use crate::frontend::ast::{
    Expr, ExprKind, Location, MapExpr, Program, ReduceExpr, SeqExpr, Stmt,
};
use crate::middle::types::Type;

use super::cancel::CancellationToken;
use super::optree::{self, Binding, Compiled, Environment, Frame, Kind, Slot};
use super::scope::{ScopeChain, Variable};

/// How a call to [`Evaluator::execute`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

pub(crate) fn arith_diagnostic(at: Location, err: ArithError) -> Diagnostic {
    Diagnostic::error(at.line, at.column, err.to_string())
}

/// Executes programs statement by statement.
///
/// `execute` takes `&mut self`, so one evaluator runs at most one program
/// at a time. All run state (scopes, memoised variables) lives only for the
/// duration of the call.
#[derive(Debug, Default)]
pub struct Evaluator {
    config: InterpreterConfig,
    cancel: CancellationToken,
}

impl Evaluator {
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    pub fn with_cancellation(config: InterpreterConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// A handle that stops the current (or next) run when cancelled.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn execute(
        &mut self,
        program: &Program,
        diagnostics: &mut dyn DiagnosticSink,
        output: &mut dyn OutputSink,
    ) -> Outcome {
        if self.cancel.is_cancelled() {
            tracing::debug!("cancelled before the first statement");
            return Outcome::Cancelled;
        }

        let mut run = Run::new(&self.config, &self.cancel, diagnostics);

        for stmt in &program.statements {
            run.statement(stmt, output);
            if run.halted {
                tracing::debug!("run halted at line {}", stmt.location().line);
                return Outcome::Cancelled;
            }
        }

        Outcome::Completed
    }
}

/// Diagnostics and memoised variables produced while forcing a variable for
/// the op tree, kept aside until it is known the value is usable.
#[derive(Debug, Default)]
struct Speculation<'p> {
    held: Vec<Diagnostic>,
    memoized: Vec<(usize, &'p str)>,
}

struct Run<'r, 'p> {
    config: &'r InterpreterConfig,
    cancel: &'r CancellationToken,
    diagnostics: &'r mut dyn DiagnosticSink,
    scopes: ScopeChain<'p>,
    speculation: Vec<Speculation<'p>>,
    halted: bool,
    // nested `evaluate` calls, including initializers forced on read
    depth: usize,
}

impl DiagnosticSink for Run<'_, '_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        match self.speculation.last_mut() {
            Some(speculation) => speculation.held.push(diagnostic),
            None => self.diagnostics.report(diagnostic),
        }
    }
}

impl<'p> Environment<'p> for Run<'_, 'p> {
    fn constant(&mut self, name: &'p str, at: Location) -> Option<Value> {
        self.speculation.push(Speculation::default());
        let value = self.read(name, at);
        let speculation = self.speculation.pop().unwrap_or_default();

        if value.is_arithmetic() {
            self.commit(speculation);
            Some(value)
        } else {
            self.roll_back(speculation);
            None
        }
    }
}

/// Elements of an evaluated sequence.
#[derive(Debug, Clone)]
enum Elements {
    Int(Rc<Vec<i64>>),
    Float(Rc<Vec<f64>>),
}

impl Elements {
    fn of(value: &Value) -> Option<Elements> {
        match value {
            Value::IntArray(items) => Some(Elements::Int(Rc::clone(items))),
            Value::FloatArray(items) => Some(Elements::Float(Rc::clone(items))),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        match self {
            Elements::Int(items) => items.len(),
            Elements::Float(items) => items.len(),
        }
    }

    fn get(&self, index: usize) -> Value {
        match self {
            Elements::Int(items) => items.get(index).map_or(Value::Error, |n| Value::Int(*n)),
            Elements::Float(items) => items.get(index).map_or(Value::Error, |f| Value::Float(*f)),
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Elements::Int(_) => Kind::Int,
            Elements::Float(_) => Kind::Float,
        }
    }
}

/// Collects `map` results, switching to floats on the first float.
enum MapBuilder {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl MapBuilder {
    fn with_capacity(capacity: usize) -> Self {
        MapBuilder::Ints(Vec::with_capacity(capacity))
    }

    /// Returns false when `value` is not a number.
    fn push(&mut self, value: Value) -> bool {
        match value {
            Value::Int(n) => match self {
                MapBuilder::Ints(items) => items.push(n),
                MapBuilder::Floats(items) => items.push(n as f64),
            },
            Value::Float(f) => {
                if let MapBuilder::Ints(items) = self {
                    let mut widened = Vec::with_capacity(items.capacity());
                    widened.extend(items.iter().map(|n| *n as f64));
                    *self = MapBuilder::Floats(widened);
                }
                if let MapBuilder::Floats(items) = self {
                    items.push(f);
                }
            }
            _ => return false,
        }
        true
    }

    fn finish(self) -> Value {
        match self {
            MapBuilder::Ints(items) => Value::int_array(items),
            MapBuilder::Floats(items) => Value::float_array(items),
        }
    }
}

impl<'r, 'p> Run<'r, 'p> {
    fn new(
        config: &'r InterpreterConfig,
        cancel: &'r CancellationToken,
        diagnostics: &'r mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            config,
            cancel,
            diagnostics,
            scopes: ScopeChain::new(config.scope_mode),
            speculation: vec![],
            halted: false,
            depth: 0,
        }
    }

    fn error(&mut self, at: Location, message: impl Into<String>) -> Value {
        self.report(Diagnostic::error(at.line, at.column, message));
        Value::Error
    }

    fn statement(&mut self, stmt: &'p Stmt, output: &mut dyn OutputSink) {
        tracing::trace!(line = stmt.location().line, "executing statement");

        match stmt {
            Stmt::Decl(decl) => {
                if let Some(initializer) = decl.initializer.as_deref() {
                    self.scopes.declare(&decl.name, initializer);
                }
            }
            Stmt::Print { text, .. } => output.write_line(text),
            Stmt::Out { expr, .. } => {
                if expr.ty() == Type::String {
                    self.error(expr.location, "strings cannot be printed with 'out'");
                    return;
                }

                let value = self.evaluate(expr);
                // a halted run prints nothing more, not even what it computed
                if !self.halted && !value.is_error() {
                    output.write_line(&value.to_string());
                }
            }
        }
    }

    fn evaluate(&mut self, expr: &'p Expr) -> Value {
        // already diagnosed while parsing
        if self.halted || expr.ty().is_erroneous() {
            return Value::Error;
        }
        if self.depth >= MAX_EVALUATION_DEPTH {
            return self.error(
                expr.location,
                format!("evaluation is nested too deeply (limit {})", MAX_EVALUATION_DEPTH),
            );
        }

        self.depth += 1;
        let value = self.dispatch(expr);
        self.depth -= 1;
        value
    }

    fn dispatch(&mut self, expr: &'p Expr) -> Value {
        match &expr.kind {
            ExprKind::IntLiteral { value, .. } => Value::Int(*value),
            ExprKind::FloatLiteral { value, .. } => Value::Float(*value),
            // strings only exist as `print` text
            ExprKind::StringLiteral(_) => Value::Error,
            ExprKind::Id(name) => self.read(name, expr.location),
            ExprKind::Paren(inner) => self.evaluate(inner),
            ExprKind::Negate(inner) => {
                let value = self.evaluate(inner);
                self.arith(-value, expr.location)
            }
            ExprKind::Binary(binary) => {
                let left = self.evaluate(&binary.left);
                let right = self.evaluate(&binary.right);
                self.arith(left.binary(binary.op, right), expr.location)
            }
            ExprKind::Seq(seq) => self.range(seq, expr.location),
            ExprKind::Map(map) => self.map(map, expr.location),
            ExprKind::Reduce(reduce) => self.reduce(reduce, expr.location),
        }
    }

    fn arith(&mut self, result: ArithResult, at: Location) -> Value {
        match result {
            Ok(value) => value,
            // operand kinds were checked statically, nothing new to say
            Err(ArithError::NotArithmetic) => Value::Error,
            Err(err) => {
                self.report(arith_diagnostic(at, err));
                Value::Error
            }
        }
    }

    /// Reads a variable, evaluating and memoising a pending initializer. The
    /// initializer runs with the scope chain cut back to where it was declared.
    fn read(&mut self, name: &'p str, at: Location) -> Value {
        let Some(depth) = self.scopes.resolve(name) else {
            return self.error(at, format!("undeclared variable '{}'", name));
        };

        let initializer = match self.scopes.get(depth, name) {
            Some(Variable::Ready { value, .. }) => return value.clone(),
            Some(Variable::Pending(initializer)) => *initializer,
            Some(Variable::Forcing(_)) | None => {
                tracing::warn!("variable '{}' read while being evaluated", name);
                return Value::Error;
            }
        };

        if let Some(variable) = self.scopes.get_mut(depth, name) {
            *variable = Variable::Forcing(initializer);
        }

        let detached = self.scopes.detach_above(depth);
        let value = self.evaluate(initializer);
        self.scopes.reattach(detached);

        if let Some(variable) = self.scopes.get_mut(depth, name) {
            *variable = Variable::Ready {
                value: value.clone(),
                initializer: Some(initializer),
            };
        }
        if let Some(speculation) = self.speculation.last_mut() {
            speculation.memoized.push((depth, name));
        }

        tracing::trace!("memoised '{}'", name);
        value
    }

    fn commit(&mut self, speculation: Speculation<'p>) {
        match self.speculation.last_mut() {
            Some(outer) => {
                outer.held.extend(speculation.held);
                outer.memoized.extend(speculation.memoized);
            }
            None => {
                for diagnostic in speculation.held {
                    self.diagnostics.report(diagnostic);
                }
            }
        }
    }

    fn roll_back(&mut self, speculation: Speculation<'p>) {
        for (depth, name) in speculation.memoized {
            if let Some(variable) = self.scopes.get_mut(depth, name) {
                variable.forget();
            }
        }
    }

    /// Samples the cancellation token every `cancel_check_interval`
    /// iterations, starting with the first.
    fn interrupted(&mut self, index: usize) -> bool {
        if self.halted {
            return true;
        }
        if index % self.config.cancel_check_interval.max(1) == 0 && self.cancel.is_cancelled() {
            tracing::debug!("cancellation observed at iteration {}", index);
            self.halted = true;
        }
        self.halted
    }

    fn range(&mut self, seq: &'p SeqExpr, at: Location) -> Value {
        let first = self.evaluate(&seq.first);
        let last = self.evaluate(&seq.last);

        let (first, last) = match (first, last) {
            (Value::Int(first), Value::Int(last)) => (first, last),
            (Value::Error, _) | (_, Value::Error) => return Value::Error,
            _ => return self.error(at, "range bounds must be integers"),
        };

        if last < first {
            return Value::int_array(vec![]);
        }

        let len = (last as i128 - first as i128 + 1) as u128;
        let mut items: Vec<i64> = Vec::new();
        let reserved = usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.config.max_range_len)
            .is_some_and(|len| items.try_reserve_exact(len).is_ok());
        if !reserved {
            return self.error(at, format!("range of {} elements is too large", len));
        }

        items.extend(first..=last);
        Value::int_array(items)
    }

    /// Runs `body` with `bindings` in a fresh barrier scope.
    fn scoped(
        &mut self,
        bindings: &[(&'p str, Value)],
        body: impl FnOnce(&mut Self) -> Value,
    ) -> Value {
        self.scopes.push_barrier();
        for (name, value) in bindings {
            self.scopes.bind(name, value.clone());
        }
        let result = body(self);
        self.scopes.pop();
        result
    }

    fn compile(
        &mut self,
        combinator: &str,
        transformation: &'p Expr,
        bindings: &[Binding],
        len: usize,
    ) -> Option<Compiled> {
        if !self.config.fast_path || len == 0 {
            return None;
        }

        let compiled = optree::compile(transformation, bindings, self);
        match &compiled {
            Some(compiled) => tracing::debug!(
                "compiled {} body at {} to a {} op tree",
                combinator,
                transformation.location,
                compiled.kind()
            ),
            None => tracing::debug!(
                "{} body at {} not compilable, walking the tree",
                combinator,
                transformation.location
            ),
        }
        compiled
    }

    fn map(&mut self, map: &'p MapExpr, at: Location) -> Value {
        let sequence = self.evaluate(&map.sequence);
        let Some(elements) = Elements::of(&sequence) else {
            return Value::Error;
        };
        let name = map.binding.name.as_str();
        let len = elements.len();

        self.scoped(&[(name, Value::Error)], |run| {
            let binding = Binding {
                name,
                slot: Slot::Element,
                kind: elements.kind(),
            };
            let compiled = run.compile("map", &map.transformation, &[binding], len);

            let mut frame = Frame::default();
            let mut builder = MapBuilder::with_capacity(len);

            for index in 0..len {
                if run.interrupted(index) {
                    return Value::Error;
                }

                let element = elements.get(index);
                let value = match &compiled {
                    Some(compiled) => {
                        frame.set(Slot::Element, &element);
                        compiled.eval(&frame, run)
                    }
                    None => {
                        run.scopes.bind(name, element);
                        run.evaluate(&map.transformation)
                    }
                };

                if !builder.push(value) {
                    tracing::trace!("map at {} aborted at element {}", at, index);
                    return Value::Error;
                }
            }

            builder.finish()
        })
    }

    fn reduce(&mut self, reduce: &'p ReduceExpr, at: Location) -> Value {
        let sequence = self.evaluate(&reduce.sequence);
        let seed = self.evaluate(&reduce.seed);

        let Some(elements) = Elements::of(&sequence) else {
            return Value::Error;
        };
        if !seed.is_arithmetic() {
            return Value::Error;
        }

        // the accumulator is float from the start whenever any input is,
        // and stays float for the whole loop
        let promote = matches!(seed, Value::Float(_))
            || elements.kind() == Kind::Float
            || reduce.transformation.ty() == Type::Float
            || reduce.accumulator.ty() == Type::Float;
        let mut accumulator = if promote { seed.to_float() } else { seed };

        let prev = reduce.accumulator.name.as_str();
        let curr = reduce.element.name.as_str();
        let len = elements.len();

        let bindings = [(prev, accumulator.clone()), (curr, Value::Error)];
        self.scoped(&bindings, |run| {
            let accumulator_kind = if promote { Kind::Float } else { Kind::Int };
            let slots = [
                Binding {
                    name: curr,
                    slot: Slot::Element,
                    kind: elements.kind(),
                },
                Binding {
                    name: prev,
                    slot: Slot::Accumulator,
                    kind: accumulator_kind,
                },
            ];

            // an int accumulator cannot take a float body result in place
            let compiled = run
                .compile("reduce", &reduce.transformation, &slots, len)
                .filter(|compiled| promote || compiled.kind() == Kind::Int);

            let mut frame = Frame::default();

            for index in 0..len {
                if run.interrupted(index) {
                    return Value::Error;
                }

                let element = elements.get(index);
                let value = match &compiled {
                    Some(compiled) => {
                        frame.set(Slot::Element, &element);
                        frame.set(Slot::Accumulator, &accumulator);
                        compiled.eval(&frame, run)
                    }
                    None => {
                        // bound in this order so `curr` wins a name clash
                        run.scopes.bind(prev, accumulator.clone());
                        run.scopes.bind(curr, element);
                        run.evaluate(&reduce.transformation)
                    }
                };

                accumulator = match value {
                    Value::Int(n) if promote => Value::Float(n as f64),
                    Value::Int(_) | Value::Float(_) => value,
                    _ => {
                        tracing::trace!("reduce at {} aborted at element {}", at, index);
                        return Value::Error;
                    }
                };
            }

            accumulator
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::diagnostics::DiagnosticBag;
    use crate::frontend::parser::parse;

    fn run_with(source: &str, config: InterpreterConfig) -> (String, DiagnosticBag) {
        let mut bag = DiagnosticBag::new();
        let program = parse(source, &config, &mut bag);
        let mut output = String::new();
        Evaluator::new(config).execute(&program, &mut bag, &mut output);
        (output, bag)
    }

    fn run(source: &str) -> (String, DiagnosticBag) {
        run_with(source, InterpreterConfig::default())
    }

    #[test]
    fn test_map_example() {
        let (output, bag) = run("var x = {3, 5}\nvar y = map(x, i -> i*2)\nout y");
        assert_eq!(output, "6, 8, 10\n");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_reduce_example() {
        let (output, bag) = run("var x = {1, 3}\nvar y = reduce(x, 0, x y -> x+y)\nout y");
        assert_eq!(output, "6\n");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_zero_division() {
        let (output, bag) = run("var x = 125 / 0\nout x");
        assert_eq!(output, "");
        assert_eq!(bag.messages(), vec!["zero division"]);
        assert_eq!((bag.items()[0].line, bag.items()[0].column), (1, 13));
    }

    #[test]
    fn test_pow() {
        let (output, _) = run("out 2 ^ 10\nout (-1) ^ 7\nout -1 ^ 8");
        assert_eq!(output, "1024\n-1\n1\n");

        let (output, _) = run("out 0.1 ^ 3");
        let value: f64 = output.trim().parse().unwrap();
        assert!((value - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_negative_exponent() {
        let (output, bag) = run("out 2 ^ -1\nout 1");
        assert_eq!(output, "1\n");
        assert_eq!(bag.messages(), vec!["negative exponent"]);
    }

    #[test]
    fn test_memoised_initializer_reports_once() {
        let (output, bag) = run("var x = 1 / 0\nout x\nout x");
        assert_eq!(output, "");
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_unused_variable_is_never_evaluated() {
        let (_, bag) = run("var x = 1 / 0\nout 2");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_float_promotion_in_map() {
        let (output, _) = run("out map({1, 4}, i -> i / 2.0)");
        assert_eq!(output, "0.5, 1.0, 1.5, 2.0\n");
    }

    #[test]
    fn test_reduce_accumulator_stays_float() {
        let (output, _) = run("out reduce({1, 3}, 0.0, a b -> b)");
        assert_eq!(output, "3.0\n");
    }

    #[test]
    fn test_ranges() {
        let (output, bag) = run("out {2, 2}\nout {3, 2}\nout {-1, 1}");
        assert_eq!(output, "2\n\n-1, 0, 1\n");
        assert!(bag.is_empty());

        let (output, bag) = run("out {1.5, 3}");
        assert_eq!(output, "");
        assert_eq!(bag.messages(), vec!["range bounds must be integers"]);
    }

    #[test]
    fn test_string_range_bounds() {
        let (output, bag) = run("out {\"a\", 3}\nvar s = \"x\"\nout {1, s}\nout 7");
        assert_eq!(output, "7\n");
        assert_eq!(
            bag.messages(),
            vec!["range bounds must be integers", "range bounds must be integers"]
        );
        assert_eq!(bag.items()[0].chained[0].message, "found `string` here");
        assert_eq!((bag.items()[1].line, bag.items()[1].column), (3, 5));
    }

    #[test]
    fn test_range_length_cap() {
        let config = InterpreterConfig::default().with_max_range_len(10);
        let (output, bag) = run_with("out {1, 10}\nout {1, 11}\nout map({1, 11}, i -> i)", config);
        assert_eq!(output, "1, 2, 3, 4, 5, 6, 7, 8, 9, 10\n");
        assert_eq!(
            bag.messages(),
            vec![
                "range of 11 elements is too large",
                "range of 11 elements is too large"
            ]
        );
    }

    #[test]
    fn test_huge_range_is_refused_before_allocating() {
        let (output, bag) = run("out {0, 2000000000}\nout 1");
        assert_eq!(output, "1\n");
        assert_eq!(bag.messages(), vec!["range of 2000000001 elements is too large"]);
    }

    #[test]
    fn test_deep_variable_chain_is_cut_off() {
        let mut source = String::from("var a0 = 0\n");
        for i in 1..300 {
            source.push_str(&format!("var a{} = a{} + 1\n", i, i - 1));
        }
        source.push_str("out a50\nout a299\nout 7");

        let (output, bag) = run(&source);
        assert_eq!(output, "50\n7\n");
        assert_eq!(bag.len(), 1);
        assert!(bag.items()[0].message.starts_with("evaluation is nested too deeply"));
    }

    #[test]
    fn test_error_in_map_aborts_whole_map() {
        let (output, bag) = run("out map({0, 3}, i -> 6 / i)\nout 1");
        assert_eq!(output, "1\n");
        assert_eq!(bag.messages(), vec!["zero division"]);
    }

    #[test]
    fn test_out_string() {
        let (output, bag) = run("print \"hi\"\nout \"hi\"");
        assert_eq!(output, "hi\n");
        assert_eq!(bag.messages(), vec!["strings cannot be printed with 'out'"]);
    }

    #[test]
    fn test_lambda_sees_outer_variables() {
        let (output, _) = run("var k = 10\nout map({1, 2}, i -> i * k)");
        assert_eq!(output, "10, 20\n");
    }

    #[test]
    fn test_nested_lambdas() {
        let (output, bag) = run("out map({1, 3}, i -> reduce(map({1, i}, j -> j), 0, a b -> a + b))");
        assert_eq!(output, "1, 3, 6\n");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_reduce_same_names_element_wins() {
        let (output, _) = run("out reduce({1, 3}, 100, v v -> v)");
        assert_eq!(output, "3\n");
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut bag = DiagnosticBag::new();
        let program = parse("out 1", &InterpreterConfig::default(), &mut bag);

        let mut evaluator = Evaluator::default();
        evaluator.cancellation().cancel();

        let mut output = String::new();
        assert_eq!(
            evaluator.execute(&program, &mut bag, &mut output),
            Outcome::Cancelled
        );
        assert_eq!(output, "");
    }
}
