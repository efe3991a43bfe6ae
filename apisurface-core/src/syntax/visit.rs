//! Recursive walkers over the lowered tree.
//!
//! Modeled on `syn::visit`: implement [`Visit`], override the hooks you
//! need, and call the matching `walk_*` function to keep descending.
//! Traversal is depth-first in source order and enters class bodies,
//! function bodies and every clause of compound statements.

use super::{Block, ClassDef, Expr, FunctionDef, ParsedModule, Stmt};

pub trait Visit<'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_class_def(&mut self, class: &'ast ClassDef) {
        walk_class_def(self, class);
    }

    fn visit_function_def(&mut self, func: &'ast FunctionDef) {
        walk_function_def(self, func);
    }

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }
}

pub fn walk_module<'ast, V>(v: &mut V, module: &'ast ParsedModule)
where
    V: Visit<'ast> + ?Sized,
{
    for stmt in &module.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V>(v: &mut V, stmt: &'ast Stmt)
where
    V: Visit<'ast> + ?Sized,
{
    match stmt {
        Stmt::ClassDef(class) => v.visit_class_def(class),
        Stmt::FunctionDef(func) => v.visit_function_def(func),
        Stmt::Assign { targets, value } => {
            for target in targets {
                v.visit_expr(target);
            }
            v.visit_expr(value);
        }
        Stmt::AnnAssign {
            target,
            annotation,
            value,
        } => {
            v.visit_expr(target);
            v.visit_expr(annotation);
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Import(_) | Stmt::ImportFrom(_) => {}
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Block(block) => v.visit_block(block),
    }
}

pub fn walk_class_def<'ast, V>(v: &mut V, class: &'ast ClassDef)
where
    V: Visit<'ast> + ?Sized,
{
    for decorator in &class.decorators {
        v.visit_expr(decorator);
    }
    for base in &class.bases {
        v.visit_expr(base);
    }
    for stmt in &class.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_function_def<'ast, V>(v: &mut V, func: &'ast FunctionDef)
where
    V: Visit<'ast> + ?Sized,
{
    for decorator in &func.decorators {
        v.visit_expr(decorator);
    }
    for param in &func.params {
        if let Some(annotation) = &param.annotation {
            v.visit_expr(annotation);
        }
        if let Some(default) = &param.default {
            v.visit_expr(default);
        }
    }
    if let Some(returns) = &func.returns {
        v.visit_expr(returns);
    }
    for stmt in &func.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_block<'ast, V>(v: &mut V, block: &'ast Block)
where
    V: Visit<'ast> + ?Sized,
{
    for expr in &block.exprs {
        v.visit_expr(expr);
    }
    for stmt in &block.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_expr<'ast, V>(v: &mut V, expr: &'ast Expr)
where
    V: Visit<'ast> + ?Sized,
{
    match expr {
        Expr::Name(_) | Expr::Str(_) | Expr::Constant(_) => {}
        Expr::Attribute { value, .. } => v.visit_expr(value),
        Expr::Subscript { value, slice } => {
            v.visit_expr(value);
            v.visit_expr(slice);
        }
        Expr::Union { left, right } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                v.visit_expr(item);
            }
        }
        Expr::Call { func, args, .. } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Await(inner) => v.visit_expr(inner),
        Expr::Other { children, .. } => {
            for child in children {
                v.visit_expr(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    #[derive(Default)]
    struct CallCounter {
        calls: Vec<usize>,
        functions: usize,
    }

    impl<'ast> Visit<'ast> for CallCounter {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if let Expr::Call { line, .. } = expr {
                self.calls.push(*line);
            }
            walk_expr(self, expr);
        }

        fn visit_function_def(&mut self, func: &'ast FunctionDef) {
            self.functions += 1;
            walk_function_def(self, func);
        }
    }

    #[test]
    fn test_walk_reaches_nested_calls() {
        let module = parse_module(
            "class A:\n    def run(self):\n        if x:\n            for i in items():\n                print(f(i))\n        return g()\n",
        )
        .unwrap();

        let mut counter = CallCounter::default();
        walk_module(&mut counter, &module);

        assert_eq!(counter.functions, 1);
        assert_eq!(counter.calls, vec![4, 5, 5, 6]);
    }
}
