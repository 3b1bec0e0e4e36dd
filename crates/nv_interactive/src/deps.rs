//! Free-name collection: which identifiers a statement or expression
//! reads, used to compute the dependency edges `SessionManager` and
//! `IrIncrementalBuilder` key their invalidation on.

use nv_ast::*;
use std::collections::HashSet;

pub fn free_names_in_stmt(stmt: &Stmt, out: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::Lock { value, .. } => free_names_in_expr(value, out),
        StmtKind::Assign { target, value } | StmtKind::CompoundAssign { target, value, .. } => {
            free_names_in_expr(target, out);
            free_names_in_expr(value, out);
        }
        StmtKind::Expr(e) => free_names_in_expr(e, out),
        StmtKind::If { cond, then_branch, elifs, else_branch } => {
            free_names_in_expr(cond, out);
            then_branch.iter().for_each(|s| free_names_in_stmt(s, out));
            for (c, b) in elifs {
                free_names_in_expr(c, out);
                b.iter().for_each(|s| free_names_in_stmt(s, out));
            }
            if let Some(b) = else_branch {
                b.iter().for_each(|s| free_names_in_stmt(s, out));
            }
        }
        StmtKind::While { cond, body } => {
            free_names_in_expr(cond, out);
            body.iter().for_each(|s| free_names_in_stmt(s, out));
        }
        StmtKind::For { iterable, body, else_branch, .. } => {
            free_names_in_expr(iterable, out);
            body.iter().for_each(|s| free_names_in_stmt(s, out));
            if let Some(b) = else_branch {
                b.iter().for_each(|s| free_names_in_stmt(s, out));
            }
        }
        StmtKind::Loop { body } => body.iter().for_each(|s| free_names_in_stmt(s, out)),
        StmtKind::Return(Some(e)) => free_names_in_expr(e, out),
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue | StmtKind::Label(_) => {}
        StmtKind::Def(f) => {
            for stmt in &f.body {
                free_names_in_stmt(stmt, out);
            }
        }
        StmtKind::Import(_) => {}
    }
}

pub fn free_names_in_expr(expr: &Expr, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Identifier(name) => {
            out.insert(name.clone());
        }
        ExprKind::Vector(items) | ExprKind::Array(items) | ExprKind::Tuple(items) => {
            items.iter().for_each(|e| free_names_in_expr(e, out))
        }
        ExprKind::Map(pairs) => {
            for (k, v) in pairs {
                free_names_in_expr(k, out);
                free_names_in_expr(v, out);
            }
        }
        ExprKind::ListComp { element, generators, condition, else_branch } => {
            for gen in generators {
                free_names_in_expr(&gen.source, out);
            }
            free_names_in_expr(element, out);
            if let Some(c) = condition {
                free_names_in_expr(c, out);
            }
            if let Some(e) = else_branch {
                free_names_in_expr(e, out);
            }
        }
        ExprKind::PrefixIncDec { operand, .. } | ExprKind::PostfixIncDec { operand, .. } => {
            free_names_in_expr(operand, out)
        }
        ExprKind::Binary { left, right, .. } => {
            free_names_in_expr(left, out);
            free_names_in_expr(right, out);
        }
        ExprKind::Unary { operand, .. } => free_names_in_expr(operand, out),
        ExprKind::Call { callee, args } => {
            free_names_in_expr(callee, out);
            args.iter().for_each(|a| free_names_in_expr(a, out));
        }
        ExprKind::Index { collection, index } => {
            free_names_in_expr(collection, out);
            free_names_in_expr(index, out);
        }
        ExprKind::Field { object, .. } => free_names_in_expr(object, out),
        ExprKind::Range { start, end, .. } => {
            free_names_in_expr(start, out);
            free_names_in_expr(end, out);
        }
        ExprKind::Match { scrutinee, arms } => {
            free_names_in_expr(scrutinee, out);
            for arm in arms {
                if let Some(g) = &arm.guard {
                    free_names_in_expr(g, out);
                }
                free_names_in_expr(&arm.body, out);
            }
        }
        ExprKind::IfElse { cond, then_branch, else_branch } => {
            free_names_in_expr(cond, out);
            free_names_in_expr(then_branch, out);
            free_names_in_expr(else_branch, out);
        }
        ExprKind::Block(block) => block.iter().for_each(|s| free_names_in_stmt(s, out)),
    }
}
