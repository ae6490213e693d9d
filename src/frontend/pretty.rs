use super::ast::{Decl, Expr, ExprKind, Program, Stmt};
use super::visitor::{Visitor, walk_decl, walk_expression};

/// Renders the tree one node per line, children indented by two spaces.
/// Each line carries the node's type and source position:
///
/// ```text
/// Decl y : seq<int> @1:1
///   Map : seq<int> @1:9
/// ```
pub fn pretty(program: &Program) -> String {
    let mut printer = AstPrinter::default();
    printer.visit_program(program);
    printer.out
}

pub fn pretty_expr(expr: &Expr) -> String {
    let mut printer = AstPrinter::default();
    printer.visit_expression(expr);
    printer.out
}

#[derive(Default)]
struct AstPrinter {
    out: String,
    depth: usize,
}

impl AstPrinter {
    fn line(&mut self, text: std::fmt::Arguments) {
        self.out.push_str(&format!("{}{}\n", "  ".repeat(self.depth), text));
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }
}

impl Visitor for AstPrinter {
    fn visit_statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => self.visit_decl(decl),
            Stmt::Print { text, location } => self.line(format_args!("Print {:?} @{}", text, location)),
            Stmt::Out { expr, location } => {
                self.line(format_args!("Out @{}", location));
                self.nested(|printer| printer.visit_expression(expr));
            }
        }
    }

    fn visit_decl(&mut self, decl: &Decl) {
        let kind = if decl.initializer.is_some() { "Decl" } else { "Binding" };
        self.line(format_args!(
            "{} {} : {} @{}",
            kind,
            decl.name,
            decl.ty(),
            decl.location
        ));
        self.nested(|printer| walk_decl(printer, decl));
    }

    fn visit_expression(&mut self, expr: &Expr) {
        let head = match &expr.kind {
            ExprKind::IntLiteral { text, .. } => format!("Int {}", text),
            ExprKind::FloatLiteral { text, .. } => format!("Float {}", text),
            ExprKind::StringLiteral(text) => format!("String {:?}", text),
            ExprKind::Id(name) => format!("Id {}", name),
            ExprKind::Paren(_) => "Paren".to_string(),
            ExprKind::Negate(_) => "Negate".to_string(),
            ExprKind::Binary(binary) => format!("Binary {}", binary.op.symbol()),
            ExprKind::Seq(_) => "Seq".to_string(),
            ExprKind::Map(_) => "Map".to_string(),
            ExprKind::Reduce(_) => "Reduce".to_string(),
        };

        self.line(format_args!("{} : {} @{}", head, expr.ty(), expr.location));
        self.nested(|printer| walk_expression(printer, expr));
    }
}
