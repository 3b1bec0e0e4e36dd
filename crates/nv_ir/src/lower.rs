//! Lowers a type-checked narval program into [`crate::ir::IrModule`].
//!
//! `nv_check` reports only the final type of each binding and function, not
//! a fully type-annotated AST, so lowering re-derives each expression's
//! type structurally from those two maps. Anything that can't be resolved
//! this way (a field access, an unresolved match arm) is stamped
//! `Type::Unknown` — the evaluator never consults `IrExpr::ty`, it exists
//! for a future machine-code backend that would need it.

use crate::ir::*;
use nv_ast as ast;
use nv_check::CheckedProgram;
use nv_types::Type;
use std::collections::HashMap;

struct Lowering<'a> {
    binding_types: &'a HashMap<String, Type>,
    function_types: &'a HashMap<String, Type>,
}

/// Lowers a checked program into an [`IrModule`], splitting top-level
/// function definitions out of the statement stream.
pub fn lower_program(checked: &CheckedProgram) -> IrModule {
    let lowering = Lowering {
        binding_types: &checked.binding_types,
        function_types: &checked.function_types,
    };
    let mut module = IrModule::new();
    for stmt in &checked.program.statements {
        match &stmt.kind {
            ast::StmtKind::Def(f) => {
                let ir_fn = lowering.lower_function(f);
                module.functions.insert(ir_fn.name.clone(), ir_fn);
            }
            ast::StmtKind::Import(_) | ast::StmtKind::Label(_) => {}
            _ => module.entry.push(lowering.lower_stmt(stmt)),
        }
    }
    module
}

impl<'a> Lowering<'a> {
    fn lower_function(&self, f: &ast::FunctionDef) -> IrFunction {
        let return_type = self
            .function_types
            .get(&f.name)
            .map(|ty| match ty {
                Type::Function(_, ret) => (**ret).clone(),
                other => other.clone(),
            })
            .unwrap_or(Type::Unknown);
        IrFunction {
            name: f.name.clone(),
            params: f.params.iter().map(|p| p.name.clone()).collect(),
            return_type,
            body: f.body.iter().map(|s| self.lower_stmt(s)).collect(),
        }
    }

    fn lower_block(&self, block: &ast::Block) -> Vec<IrStmt> {
        block.iter().map(|s| self.lower_stmt(s)).collect()
    }

    fn lower_stmt(&self, stmt: &ast::Stmt) -> IrStmt {
        match &stmt.kind {
            ast::StmtKind::Lock { name, value, .. } => IrStmt::Lock {
                name: name.clone(),
                value: self.lower_expr(value),
            },
            ast::StmtKind::Assign { target, value } => IrStmt::Assign {
                target: self.lower_expr(target),
                value: self.lower_expr(value),
            },
            // Compound assignment desugars to `target = target <op> value`.
            ast::StmtKind::CompoundAssign { op, target, value } => {
                let lowered_target = self.lower_expr(target);
                let lowered_value = self.lower_expr(value);
                let binary_op = match op {
                    ast::CompoundOp::Add => IrBinaryOp::Add,
                    ast::CompoundOp::Sub => IrBinaryOp::Sub,
                    ast::CompoundOp::Mul => IrBinaryOp::Mul,
                    ast::CompoundOp::Div => IrBinaryOp::Div,
                    ast::CompoundOp::FloorDiv => IrBinaryOp::FloorDiv,
                    ast::CompoundOp::Pow => IrBinaryOp::Pow,
                    ast::CompoundOp::Mod => IrBinaryOp::Mod,
                };
                let ty = lowered_target.ty.clone();
                IrStmt::Assign {
                    target: lowered_target.clone(),
                    value: IrExpr::new(
                        IrExprKind::Binary {
                            op: binary_op,
                            left: Box::new(lowered_target),
                            right: Box::new(lowered_value),
                        },
                        ty,
                    ),
                }
            }
            ast::StmtKind::Expr(e) => IrStmt::Expr(self.lower_expr(e)),
            ast::StmtKind::If { cond, then_branch, elifs, else_branch } => IrStmt::If {
                cond: self.lower_expr(cond),
                then_branch: self.lower_block(then_branch),
                elifs: elifs.iter().map(|(c, b)| (self.lower_expr(c), self.lower_block(b))).collect(),
                else_branch: else_branch.as_ref().map(|b| self.lower_block(b)),
            },
            ast::StmtKind::While { cond, body } => IrStmt::While {
                cond: self.lower_expr(cond),
                body: self.lower_block(body),
            },
            ast::StmtKind::For { binding, iterable, body, else_branch } => IrStmt::For {
                binding: lower_for_binding(binding),
                iterable: self.lower_expr(iterable),
                body: self.lower_block(body),
                else_branch: else_branch.as_ref().map(|b| self.lower_block(b)),
            },
            ast::StmtKind::Loop { body } => IrStmt::Loop { body: self.lower_block(body) },
            ast::StmtKind::Break => IrStmt::Break,
            ast::StmtKind::Continue => IrStmt::Continue,
            ast::StmtKind::Return(value) => IrStmt::Return(value.as_ref().map(|e| self.lower_expr(e))),
            ast::StmtKind::Def(_) | ast::StmtKind::Import(_) | ast::StmtKind::Label(_) => {
                // Nested defs are not part of narval's surface grammar;
                // reaching here means a block contains a statement
                // `lower_program` already special-cased at the top level.
                IrStmt::Expr(IrExpr::new(IrExprKind::Literal(IrLiteral::Bool(false)), Type::Unit))
            }
        }
    }

    fn lower_expr(&self, expr: &ast::Expr) -> IrExpr {
        match &expr.kind {
            ast::ExprKind::Literal(ast::Literal::Number(n)) => {
                IrExpr::new(IrExprKind::Literal(IrLiteral::Number(*n)), Type::Float)
            }
            ast::ExprKind::Literal(ast::Literal::String(s)) => {
                IrExpr::new(IrExprKind::Literal(IrLiteral::String(s.clone())), Type::String)
            }
            ast::ExprKind::Literal(ast::Literal::Bool(b)) => {
                IrExpr::new(IrExprKind::Literal(IrLiteral::Bool(*b)), Type::Bool)
            }
            ast::ExprKind::Identifier(name) => {
                let ty = self
                    .binding_types
                    .get(name)
                    .or_else(|| self.function_types.get(name))
                    .cloned()
                    .unwrap_or(Type::Unknown);
                IrExpr::new(IrExprKind::Identifier(name.clone()), ty)
            }
            ast::ExprKind::Vector(items) => {
                let lowered: Vec<IrExpr> = items.iter().map(|e| self.lower_expr(e)).collect();
                IrExpr::new(IrExprKind::Vector(lowered), Type::Vector)
            }
            ast::ExprKind::Array(items) => {
                let lowered: Vec<IrExpr> = items.iter().map(|e| self.lower_expr(e)).collect();
                let elem_ty = lowered.first().map(|e| e.ty.clone()).unwrap_or(Type::Unknown);
                IrExpr::new(IrExprKind::Array(lowered), Type::Array(Box::new(elem_ty)))
            }
            ast::ExprKind::Tuple(items) => {
                let lowered: Vec<IrExpr> = items.iter().map(|e| self.lower_expr(e)).collect();
                let tys = lowered.iter().map(|e| e.ty.clone()).collect();
                IrExpr::new(IrExprKind::Tuple(lowered), Type::Tuple(tys))
            }
            ast::ExprKind::Map(pairs) => {
                let lowered: Vec<(IrExpr, IrExpr)> =
                    pairs.iter().map(|(k, v)| (self.lower_expr(k), self.lower_expr(v))).collect();
                let key_ty = lowered.first().map(|(k, _)| k.ty.clone()).unwrap_or(Type::Unknown);
                let value_ty = lowered.first().map(|(_, v)| v.ty.clone()).unwrap_or(Type::Unknown);
                IrExpr::new(IrExprKind::Map(lowered), Type::Map(Box::new(key_ty), Box::new(value_ty)))
            }
            ast::ExprKind::ListComp { element, generators, condition, else_branch } => {
                let lowered_generators = generators
                    .iter()
                    .map(|g| IrComprehensionGenerator {
                        binding: lower_for_binding(&g.binding),
                        source: self.lower_expr(&g.source),
                    })
                    .collect();
                let lowered_element = self.lower_expr(element);
                IrExpr::new(
                    IrExprKind::ListComp {
                        element: Box::new(lowered_element),
                        generators: lowered_generators,
                        condition: condition.as_ref().map(|c| Box::new(self.lower_expr(c))),
                        else_branch: else_branch.as_ref().map(|e| Box::new(self.lower_expr(e))),
                    },
                    Type::Vector,
                )
            }
            ast::ExprKind::PrefixIncDec { op, operand } => {
                let operand = self.lower_expr(operand);
                let ty = operand.ty.clone();
                IrExpr::new(IrExprKind::PrefixIncDec { op: lower_inc_dec_op(op), operand: Box::new(operand) }, ty)
            }
            ast::ExprKind::PostfixIncDec { op, operand } => {
                let operand = self.lower_expr(operand);
                let ty = operand.ty.clone();
                IrExpr::new(IrExprKind::PostfixIncDec { op: lower_inc_dec_op(op), operand: Box::new(operand) }, ty)
            }
            ast::ExprKind::Binary { op, left, right } => {
                let left = self.lower_expr(left);
                let right = self.lower_expr(right);
                let (ir_op, ty) = lower_binary_op(op, &left.ty);
                IrExpr::new(
                    IrExprKind::Binary { op: ir_op, left: Box::new(left), right: Box::new(right) },
                    ty,
                )
            }
            ast::ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                let (ir_op, ty) = match op {
                    ast::UnaryOp::Neg => (IrUnaryOp::Neg, operand.ty.clone()),
                    ast::UnaryOp::Not => (IrUnaryOp::Not, Type::Bool),
                };
                IrExpr::new(IrExprKind::Unary { op: ir_op, operand: Box::new(operand) }, ty)
            }
            ast::ExprKind::Call { callee, args } => {
                // `object.method(args)` surfaces as a call whose callee is a
                // field access; route it to a dedicated method-call node
                // instead of treating `.method` as a value in its own right.
                if let ast::ExprKind::Field { object, name } = &callee.kind {
                    let object = self.lower_expr(object);
                    let args: Vec<IrExpr> = args.iter().map(|a| self.lower_expr(a)).collect();
                    let ty = method_return_type(&object.ty, name);
                    return IrExpr::new(
                        IrExprKind::MethodCall { object: Box::new(object), method: name.clone(), args },
                        ty,
                    );
                }
                let callee = self.lower_expr(callee);
                let ret_ty = match &callee.ty {
                    Type::Function(_, ret) => (**ret).clone(),
                    _ => Type::Unknown,
                };
                let args = args.iter().map(|a| self.lower_expr(a)).collect();
                IrExpr::new(IrExprKind::Call { callee: Box::new(callee), args }, ret_ty)
            }
            ast::ExprKind::Index { collection, index } => {
                let collection = self.lower_expr(collection);
                let index = self.lower_expr(index);
                let ty = match &collection.ty {
                    Type::Array(inner) => (**inner).clone(),
                    Type::Vector => Type::Unknown,
                    Type::Map(_, value) => (**value).clone(),
                    Type::Tuple(_) => Type::Unknown,
                    Type::String => Type::String,
                    _ => Type::Unknown,
                };
                IrExpr::new(IrExprKind::Index { collection: Box::new(collection), index: Box::new(index) }, ty)
            }
            ast::ExprKind::Field { object, name } => {
                // A bare field access with no call syntax is only reachable
                // today via a method reference with no arguments; lower it
                // as a zero-arg method call.
                let object = self.lower_expr(object);
                let ty = method_return_type(&object.ty, name);
                IrExpr::new(IrExprKind::MethodCall { object: Box::new(object), method: name.clone(), args: Vec::new() }, ty)
            }
            ast::ExprKind::Range { start, end, inclusive } => {
                let start = self.lower_expr(start);
                let end = self.lower_expr(end);
                IrExpr::new(
                    IrExprKind::Range { start: Box::new(start), end: Box::new(end), inclusive: *inclusive },
                    Type::Vector,
                )
            }
            ast::ExprKind::Match { scrutinee, arms } => {
                let scrutinee = self.lower_expr(scrutinee);
                let lowered_arms: Vec<IrMatchArm> = arms
                    .iter()
                    .map(|arm| IrMatchArm {
                        pattern: lower_pattern(&arm.pattern),
                        guard: arm.guard.as_ref().map(|g| self.lower_expr(g)),
                        body: self.lower_expr(&arm.body),
                    })
                    .collect();
                let ty = lowered_arms.first().map(|a| a.body.ty.clone()).unwrap_or(Type::Unknown);
                IrExpr::new(IrExprKind::Match { scrutinee: Box::new(scrutinee), arms: lowered_arms }, ty)
            }
            ast::ExprKind::IfElse { cond, then_branch, else_branch } => {
                let cond = self.lower_expr(cond);
                let then_branch = self.lower_expr(then_branch);
                let else_branch = self.lower_expr(else_branch);
                let ty = then_branch.ty.clone();
                IrExpr::new(
                    IrExprKind::IfElse {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                    },
                    ty,
                )
            }
            ast::ExprKind::Block(block) => {
                let mut ir_stmts = Vec::new();
                let mut ty = Type::Unit;
                for (i, stmt) in block.iter().enumerate() {
                    if i + 1 == block.len() {
                        if let ast::StmtKind::Expr(e) = &stmt.kind {
                            let lowered = self.lower_expr(e);
                            ty = lowered.ty.clone();
                            ir_stmts.push(IrStmt::Expr(lowered));
                            continue;
                        }
                    }
                    ir_stmts.push(self.lower_stmt(stmt));
                }
                IrExpr::new(IrExprKind::Block(ir_stmts), ty)
            }
        }
    }
}

fn lower_binary_op(op: &ast::BinaryOp, left_ty: &Type) -> (IrBinaryOp, Type) {
    match op {
        ast::BinaryOp::Add => (IrBinaryOp::Add, left_ty.clone()),
        ast::BinaryOp::Sub => (IrBinaryOp::Sub, left_ty.clone()),
        ast::BinaryOp::Mul => (IrBinaryOp::Mul, left_ty.clone()),
        ast::BinaryOp::Div => (IrBinaryOp::Div, left_ty.clone()),
        ast::BinaryOp::FloorDiv => (IrBinaryOp::FloorDiv, left_ty.clone()),
        ast::BinaryOp::Mod => (IrBinaryOp::Mod, left_ty.clone()),
        ast::BinaryOp::Pow => (IrBinaryOp::Pow, left_ty.clone()),
        ast::BinaryOp::Eq => (IrBinaryOp::Eq, Type::Bool),
        ast::BinaryOp::NotEq => (IrBinaryOp::NotEq, Type::Bool),
        ast::BinaryOp::Lt => (IrBinaryOp::Lt, Type::Bool),
        ast::BinaryOp::Gt => (IrBinaryOp::Gt, Type::Bool),
        ast::BinaryOp::LtEq => (IrBinaryOp::LtEq, Type::Bool),
        ast::BinaryOp::GtEq => (IrBinaryOp::GtEq, Type::Bool),
        ast::BinaryOp::And => (IrBinaryOp::And, Type::Bool),
        ast::BinaryOp::Or => (IrBinaryOp::Or, Type::Bool),
    }
}

fn lower_pattern(pattern: &ast::Pattern) -> IrPattern {
    match pattern {
        ast::Pattern::Wildcard => IrPattern::Wildcard,
        ast::Pattern::Binding(name) => IrPattern::Binding(name.clone()),
        ast::Pattern::Literal(lit) => IrPattern::Literal(lower_literal(lit)),
        ast::Pattern::Range { lo, hi, inclusive } => IrPattern::Range {
            lo: lower_literal(lo),
            hi: lower_literal(hi),
            inclusive: *inclusive,
        },
        ast::Pattern::Or(a, b) => IrPattern::Or(Box::new(lower_pattern(a)), Box::new(lower_pattern(b))),
    }
}

fn lower_for_binding(binding: &ast::ForBinding) -> IrForBinding {
    IrForBinding { first: binding.first.clone(), second: binding.second.clone() }
}

fn lower_inc_dec_op(op: &ast::IncDecOp) -> IrIncDecOp {
    match op {
        ast::IncDecOp::Increment => IrIncDecOp::Increment,
        ast::IncDecOp::Decrement => IrIncDecOp::Decrement,
    }
}

/// The static return type of a built-in string/vector/array method call,
/// mirroring `nv_check::infer_method_call`'s dispatch table.
fn method_return_type(object_ty: &Type, method: &str) -> Type {
    match (object_ty, method) {
        (Type::String, "toUpperCase") | (Type::String, "toLowerCase") | (Type::String, "replace") => Type::String,
        (Type::String, "includes") => Type::Bool,
        (Type::Array(inner), "pop") | (Type::Array(inner), "get") => (**inner).clone(),
        (Type::Vector, "pop") | (Type::Vector, "get") => Type::Unknown,
        (Type::Array(_), "push") | (Type::Array(_), "set") => Type::Unit,
        (Type::Vector, "push") | (Type::Vector, "set") => Type::Unit,
        _ => Type::Unknown,
    }
}

fn lower_literal(lit: &ast::Literal) -> IrLiteral {
    match lit {
        ast::Literal::Number(n) => IrLiteral::Number(*n),
        ast::Literal::String(s) => IrLiteral::String(s.clone()),
        ast::Literal::Bool(b) => IrLiteral::Bool(*b),
    }
}
