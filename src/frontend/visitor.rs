use super::ast::{BinaryExpr, Decl, Expr, ExprKind, MapExpr, Program, ReduceExpr, SeqExpr, Stmt};

/// Read-only traversal of a parsed program. Each `visit_*` method defaults to
/// the matching `walk_*` function, which visits children in field order.
pub trait Visitor: Sized {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_statement(&mut self, stmt: &Stmt) {
        walk_statement(self, stmt);
    }

    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_print(&mut self, _text: &str) {}

    fn visit_out(&mut self, expr: &Expr) {
        self.visit_expression(expr);
    }

    fn visit_expression(&mut self, expr: &Expr) {
        walk_expression(self, expr);
    }

    fn visit_binary(&mut self, binary: &BinaryExpr) {
        walk_binary(self, binary);
    }

    fn visit_seq(&mut self, seq: &SeqExpr) {
        walk_seq(self, seq);
    }

    fn visit_map(&mut self, map: &MapExpr) {
        walk_map(self, map);
    }

    fn visit_reduce(&mut self, reduce: &ReduceExpr) {
        walk_reduce(self, reduce);
    }
}

pub fn walk_program<T: Visitor>(vis: &mut T, Program { statements }: &Program) {
    for stmt in statements {
        vis.visit_statement(stmt);
    }
}

pub fn walk_statement<T: Visitor>(vis: &mut T, stmt: &Stmt) {
    match stmt {
        Stmt::Decl(decl) => vis.visit_decl(decl),
        Stmt::Print { text, location: _ } => vis.visit_print(text),
        Stmt::Out { expr, location: _ } => vis.visit_out(expr),
    }
}

pub fn walk_decl<T: Visitor>(vis: &mut T, decl: &Decl) {
    if let Some(initializer) = &decl.initializer {
        vis.visit_expression(initializer);
    }
}

pub fn walk_expression<T: Visitor>(vis: &mut T, expr: &Expr) {
    match &expr.kind {
        ExprKind::IntLiteral { .. }
        | ExprKind::FloatLiteral { .. }
        | ExprKind::StringLiteral(_)
        | ExprKind::Id(_) => {}
        ExprKind::Paren(inner) | ExprKind::Negate(inner) => vis.visit_expression(inner),
        ExprKind::Binary(binary) => vis.visit_binary(binary),
        ExprKind::Seq(seq) => vis.visit_seq(seq),
        ExprKind::Map(map) => vis.visit_map(map),
        ExprKind::Reduce(reduce) => vis.visit_reduce(reduce),
    }
}

pub fn walk_binary<T: Visitor>(vis: &mut T, BinaryExpr { op: _, left, right }: &BinaryExpr) {
    vis.visit_expression(left);
    vis.visit_expression(right);
}

pub fn walk_seq<T: Visitor>(vis: &mut T, SeqExpr { first, last }: &SeqExpr) {
    vis.visit_expression(first);
    vis.visit_expression(last);
}

pub fn walk_map<T: Visitor>(
    vis: &mut T,
    MapExpr {
        sequence,
        binding,
        transformation,
    }: &MapExpr,
) {
    vis.visit_expression(sequence);
    vis.visit_decl(binding);
    vis.visit_expression(transformation);
}

pub fn walk_reduce<T: Visitor>(
    vis: &mut T,
    ReduceExpr {
        sequence,
        seed,
        accumulator,
        element,
        transformation,
    }: &ReduceExpr,
) {
    vis.visit_expression(sequence);
    vis.visit_expression(seed);
    vis.visit_decl(accumulator);
    vis.visit_decl(element);
    vis.visit_expression(transformation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::InterpreterConfig;
    use crate::common::diagnostics::DiagnosticBag;
    use crate::frontend::parser::parse;

    #[derive(Default)]
    struct IdCollector {
        names: Vec<String>,
        decls: Vec<String>,
    }

    impl Visitor for IdCollector {
        fn visit_decl(&mut self, decl: &Decl) {
            self.decls.push(decl.name.clone());
            walk_decl(self, decl);
        }

        fn visit_expression(&mut self, expr: &Expr) {
            if let ExprKind::Id(name) = &expr.kind {
                self.names.push(name.clone());
            }
            walk_expression(self, expr);
        }
    }

    #[test]
    fn test_children_in_field_order() {
        let mut bag = DiagnosticBag::new();
        let program = parse(
            "var x = {1, 4}\nvar s = reduce(x, 0, a b -> a + b)\nout map(x, i -> i * s)",
            &InterpreterConfig::default(),
            &mut bag,
        );
        assert!(bag.is_empty());

        let mut collector = IdCollector::default();
        collector.visit_program(&program);

        assert_eq!(collector.decls, vec!["x", "s", "a", "b", "i"]);
        assert_eq!(collector.names, vec!["x", "a", "b", "x", "i", "s"]);
    }
}
