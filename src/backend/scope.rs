use std::collections::HashMap;

use crate::common::config::ScopeMode;
use crate::common::value::Value;
use crate::frontend::ast::Expr;

/// A runtime variable. Top-level declarations start out `Pending` and are
/// evaluated on first read; combinator bindings are always `Ready`.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable<'p> {
    Pending(&'p Expr),
    Forcing(&'p Expr),
    Ready {
        value: Value,
        initializer: Option<&'p Expr>,
    },
}

impl<'p> Variable<'p> {
    pub fn bound(value: Value) -> Self {
        Variable::Ready {
            value,
            initializer: None,
        }
    }

    /// Drops a memoised value so the initializer runs again on next read.
    /// Bindings without an initializer are left alone.
    pub fn forget(&mut self) {
        if let Variable::Ready {
            initializer: Some(initializer),
            ..
        } = *self
        {
            *self = Variable::Pending(initializer);
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable<'p> {
    // transitive tables let lookups continue into the parent
    transitive: bool,
    variables: HashMap<&'p str, Variable<'p>>,
}

impl<'p> SymbolTable<'p> {
    pub fn transitive() -> Self {
        Self {
            transitive: true,
            variables: HashMap::new(),
        }
    }

    pub fn barrier() -> Self {
        Self {
            transitive: false,
            variables: HashMap::new(),
        }
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }
}

/// Innermost-last stack of symbol tables owned by one run.
#[derive(Debug)]
pub struct ScopeChain<'p> {
    tables: Vec<SymbolTable<'p>>,
    mode: ScopeMode,
}

impl<'p> ScopeChain<'p> {
    pub fn new(mode: ScopeMode) -> Self {
        Self {
            tables: vec![SymbolTable::transitive()],
            mode,
        }
    }

    pub fn depth(&self) -> usize {
        self.tables.len()
    }

    pub fn push_barrier(&mut self) {
        self.tables.push(SymbolTable::barrier());
    }

    pub fn pop(&mut self) {
        // the global table is never popped
        if self.tables.len() > 1 {
            self.tables.pop();
        }
    }

    /// Registers a lazily evaluated variable in the innermost table.
    pub fn declare(&mut self, name: &'p str, initializer: &'p Expr) {
        self.set_innermost(name, Variable::Pending(initializer));
    }

    /// Binds (or rebinds) `name` to a ready value in the innermost table.
    pub fn bind(&mut self, name: &'p str, value: Value) {
        self.set_innermost(name, Variable::bound(value));
    }

    fn set_innermost(&mut self, name: &'p str, variable: Variable<'p>) {
        if let Some(table) = self.tables.last_mut() {
            table.variables.insert(name, variable);
        }
    }

    /// Index of the table `name` resolves to. A barrier table stops the
    /// search in isolated mode.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        for (depth, table) in self.tables.iter().enumerate().rev() {
            if table.variables.contains_key(name) {
                return Some(depth);
            }
            if !table.is_transitive() && self.mode == ScopeMode::Isolated {
                return None;
            }
        }
        None
    }

    pub fn get(&self, depth: usize, name: &str) -> Option<&Variable<'p>> {
        self.tables.get(depth)?.variables.get(name)
    }

    pub fn get_mut(&mut self, depth: usize, name: &str) -> Option<&mut Variable<'p>> {
        self.tables.get_mut(depth)?.variables.get_mut(name)
    }

    /// Removes every table above `depth`, so code evaluated next sees the
    /// scope chain as it was where that table's variables were declared.
    pub fn detach_above(&mut self, depth: usize) -> Vec<SymbolTable<'p>> {
        self.tables.split_off((depth + 1).min(self.tables.len()))
    }

    pub fn reattach(&mut self, tables: Vec<SymbolTable<'p>>) {
        self.tables.extend(tables);
    }
}
