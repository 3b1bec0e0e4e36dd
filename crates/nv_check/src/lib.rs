//! # nv_check
//!
//! Bidirectional type checking over the narval AST: infers a type for every
//! expression, checks every statement against its surrounding context, and
//! produces a [`CheckedProgram`] whose `nv_ir` lowering can trust.
//!
//! Checking is fail-fast: the first ill-typed construct stops the pass and
//! is reported with its source position. This matches how the interactive
//! core uses the checker — one fragment at a time, so there is never a
//! batch of independent errors to merge.

use nv_ast::*;
use nv_types::{Type, TypeError, TypeScheme, UnificationTable};
use std::collections::HashMap;

/// A successfully checked program: its statements, annotated with the
/// concrete type of every binding the checker introduced.
#[derive(Debug)]
pub struct CheckedProgram {
    pub program: Program,
    pub binding_types: HashMap<String, Type>,
    pub function_types: HashMap<String, Type>,
}

/// Type bindings visible to a compilation unit before checking starts —
/// populated by `nv_modules` from a module's dependencies so imported
/// names type-check like any other binding.
#[derive(Debug, Default, Clone)]
pub struct Namespace {
    pub values: HashMap<String, TypeScheme>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, scheme: TypeScheme) {
        self.values.insert(name.into(), scheme);
    }
}

struct CheckEnv {
    scopes: Vec<HashMap<String, Type>>,
    binding_types: HashMap<String, Type>,
    functions: HashMap<String, TypeScheme>,
    current_return_type: Option<Type>,
    in_loop: usize,
    table: UnificationTable,
}

impl CheckEnv {
    fn new(namespace: Namespace) -> Self {
        Self {
            scopes: vec![HashMap::new()],
            binding_types: HashMap::new(),
            functions: namespace.values,
            current_return_type: None,
            in_loop: 0,
            table: UnificationTable::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty.clone());
        }
        self.binding_types.insert(name.to_string(), ty);
    }

    fn lookup(&self, name: &str) -> Option<Type> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Some(self.table.resolve(ty));
            }
        }
        None
    }

    fn is_bound_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().map(|s| s.contains_key(name)).unwrap_or(false)
    }

    fn type_expr_to_type(&self, te: &TypeExpr) -> Type {
        match te {
            TypeExpr::Named(name) => named_type(name),
            TypeExpr::List(inner) => Type::Array(Box::new(self.type_expr_to_type(inner))),
            TypeExpr::Function(params, ret) => Type::Function(
                params.iter().map(|p| self.type_expr_to_type(p)).collect(),
                Box::new(self.type_expr_to_type(ret)),
            ),
            TypeExpr::Tuple(items) => {
                Type::Tuple(items.iter().map(|t| self.type_expr_to_type(t)).collect())
            }
        }
    }
}

fn named_type(name: &str) -> Type {
    match name {
        "Int" | "Float" => Type::Float,
        "Bool" => Type::Bool,
        "String" => Type::String,
        "Unit" => Type::Unit,
        "array" => Type::Array(Box::new(Type::Unknown)),
        "vector" => Type::Vector,
        "map" => Type::Map(Box::new(Type::Unknown), Box::new(Type::Unknown)),
        "tuple" => Type::Tuple(Vec::new()),
        _ => Type::Unknown,
    }
}

/// Type-checks `program` under an (optionally empty) namespace of imported
/// bindings, returning the checked program or the first type error found.
pub fn check_program(program: Program, namespace: Namespace) -> Result<CheckedProgram, TypeError> {
    let mut env = CheckEnv::new(namespace);
    preregister_functions(&mut env, &program.statements)?;
    for stmt in &program.statements {
        check_stmt(&mut env, stmt)?;
    }
    let function_types = env
        .functions
        .iter()
        .map(|(name, scheme)| (name.clone(), env.table.zonk(&scheme.body)))
        .collect();
    let binding_types = env
        .binding_types
        .iter()
        .map(|(name, ty)| (name.clone(), env.table.zonk(ty)))
        .collect();
    Ok(CheckedProgram {
        program,
        binding_types,
        function_types,
    })
}

/// Registers every top-level `def` before checking bodies, so forward
/// references and (future) mutual recursion between functions resolve.
fn preregister_functions(env: &mut CheckEnv, statements: &[Stmt]) -> Result<(), TypeError> {
    for stmt in statements {
        if let StmtKind::Def(f) = &stmt.kind {
            let param_types: Vec<Type> = f
                .params
                .iter()
                .map(|p| {
                    p.type_annotation
                        .as_ref()
                        .map(|t| env.type_expr_to_type(t))
                        .unwrap_or_else(|| env.table.fresh())
                })
                .collect();
            let ret_type = f
                .return_type
                .as_ref()
                .map(|t| env.type_expr_to_type(t))
                .unwrap_or_else(|| env.table.fresh());
            let fn_type = Type::Function(param_types, Box::new(ret_type));
            env.functions.insert(f.name.clone(), TypeScheme::monomorphic(fn_type));
        }
    }
    Ok(())
}

fn check_stmt(env: &mut CheckEnv, stmt: &Stmt) -> Result<(), TypeError> {
    match &stmt.kind {
        StmtKind::Lock { name, type_annotation, value } => {
            if env.is_bound_in_current_scope(name) {
                return Err(TypeError::Rebinding { name: name.clone(), position: stmt.position });
            }
            let value_ty = infer_expr(env, value)?;
            let ty = if let Some(annotation) = type_annotation {
                let declared = env.type_expr_to_type(annotation);
                env.table.unify(&declared, &value_ty, stmt.position)?;
                declared
            } else {
                value_ty
            };
            env.bind(name, ty);
            Ok(())
        }
        StmtKind::Assign { target, value } => {
            let target_ty = infer_expr(env, target)?;
            let value_ty = infer_expr(env, value)?;
            env.table.unify(&target_ty, &value_ty, stmt.position)
        }
        StmtKind::CompoundAssign { target, value, .. } => {
            // Every compound-assignment operator (`+=`, `-=`, `*=`, ...) is
            // arithmetic, so both sides must already be numeric.
            let target_ty = infer_expr(env, target)?;
            let value_ty = infer_expr(env, value)?;
            env.table.unify(&target_ty, &Type::Float, stmt.position)?;
            env.table.unify(&target_ty, &value_ty, stmt.position)
        }
        StmtKind::Expr(expr) => infer_expr(env, expr).map(|_| ()),
        StmtKind::If { cond, then_branch, elifs, else_branch } => {
            let cond_ty = infer_expr(env, cond)?;
            env.table.unify(&cond_ty, &Type::Bool, cond.position)?;
            check_block(env, then_branch)?;
            for (c, b) in elifs {
                let c_ty = infer_expr(env, c)?;
                env.table.unify(&c_ty, &Type::Bool, c.position)?;
                check_block(env, b)?;
            }
            if let Some(b) = else_branch {
                check_block(env, b)?;
            }
            Ok(())
        }
        StmtKind::While { cond, body } => {
            let cond_ty = infer_expr(env, cond)?;
            env.table.unify(&cond_ty, &Type::Bool, cond.position)?;
            env.in_loop += 1;
            let result = check_block(env, body);
            env.in_loop -= 1;
            result
        }
        StmtKind::For { binding, iterable, body, else_branch } => {
            let two = binding.second.is_some();
            let (first_ty, second_ty) = for_iterable_types(env, iterable, two)?;
            env.push_scope();
            env.bind(&binding.first, first_ty);
            if let Some(name) = &binding.second {
                env.bind(name, second_ty.expect("two_bindings requested a second type"));
            }
            env.in_loop += 1;
            let result = check_block(env, body);
            env.in_loop -= 1;
            env.pop_scope();
            result?;
            if let Some(else_block) = else_branch {
                check_block(env, else_block)?;
            }
            Ok(())
        }
        StmtKind::Loop { body } => {
            env.in_loop += 1;
            let result = check_block(env, body);
            env.in_loop -= 1;
            result
        }
        StmtKind::Break | StmtKind::Continue => Ok(()),
        StmtKind::Return(value) => {
            let ty = match value {
                Some(expr) => infer_expr(env, expr)?,
                None => Type::Unit,
            };
            if let Some(expected) = env.current_return_type.clone() {
                env.table.unify(&expected, &ty, stmt.position)?;
            }
            Ok(())
        }
        StmtKind::Def(f) => check_function(env, f),
        StmtKind::Import(_) => Ok(()),
        StmtKind::Label(_) => Ok(()),
    }
}

/// Derives the type(s) a `for` header or comprehension generator binds,
/// per the container `iterable` evaluates to. `two_bindings` selects
/// between the single-binding shape (just the element) and the
/// `(index, element)` / `(key, value)` shape two bindings ask for.
fn for_iterable_types(env: &mut CheckEnv, iterable: &Expr, two_bindings: bool) -> Result<(Type, Option<Type>), TypeError> {
    if let ExprKind::Range { start, end, .. } = &iterable.kind {
        let start_ty = infer_expr(env, start)?;
        let end_ty = infer_expr(env, end)?;
        env.table.unify(&start_ty, &Type::Float, start.position)?;
        env.table.unify(&end_ty, &Type::Float, end.position)?;
        return Ok(if two_bindings { (Type::Float, Some(Type::Float)) } else { (Type::Float, None) });
    }
    let iter_ty = infer_expr(env, iterable)?;
    match env.table.resolve(&iter_ty) {
        Type::Array(inner) => {
            let elem = *inner;
            Ok(if two_bindings { (Type::Float, Some(elem)) } else { (elem, None) })
        }
        Type::Vector => {
            let elem = env.table.fresh();
            Ok(if two_bindings { (Type::Float, Some(elem)) } else { (elem, None) })
        }
        Type::String => Ok(if two_bindings { (Type::Float, Some(Type::String)) } else { (Type::String, None) }),
        Type::Tuple(_) => {
            let elem = env.table.fresh();
            Ok(if two_bindings { (Type::Float, Some(elem)) } else { (elem, None) })
        }
        Type::Map(k, v) => {
            if two_bindings {
                Ok((*k, Some(*v)))
            } else {
                Ok((Type::Tuple(vec![*k, *v]), None))
            }
        }
        Type::Unknown => Ok(if two_bindings { (Type::Unknown, Some(Type::Unknown)) } else { (Type::Unknown, None) }),
        other => Err(TypeError::Mismatch {
            expected: Type::Array(Box::new(Type::Unknown)),
            found: other,
            position: iterable.position,
        }),
    }
}

fn check_block(env: &mut CheckEnv, block: &Block) -> Result<(), TypeError> {
    env.push_scope();
    for stmt in block {
        check_stmt(env, stmt)?;
    }
    env.pop_scope();
    Ok(())
}

fn check_function(env: &mut CheckEnv, f: &FunctionDef) -> Result<(), TypeError> {
    let scheme = env.functions.get(&f.name).cloned().unwrap_or_else(|| {
        TypeScheme::monomorphic(Type::Function(
            f.params.iter().map(|_| Type::Unknown).collect(),
            Box::new(Type::Unknown),
        ))
    });
    let (param_types, ret_type) = match &scheme.body {
        Type::Function(params, ret) => (params.clone(), (**ret).clone()),
        _ => (vec![Type::Unknown; f.params.len()], Type::Unknown),
    };

    env.push_scope();
    for (param, ty) in f.params.iter().zip(param_types.iter()) {
        env.bind(&param.name, ty.clone());
        if let Some(default) = &param.default {
            let default_ty = infer_expr(env, default)?;
            env.table.unify(ty, &default_ty, default.position)?;
        }
    }
    let previous_return = env.current_return_type.replace(ret_type);
    for stmt in &f.body {
        check_stmt(env, stmt)?;
    }
    env.current_return_type = previous_return;
    env.pop_scope();
    Ok(())
}

fn infer_expr(env: &mut CheckEnv, expr: &Expr) -> Result<Type, TypeError> {
    match &expr.kind {
        ExprKind::Literal(Literal::Number(_)) => Ok(Type::Float),
        ExprKind::Literal(Literal::String(_)) => Ok(Type::String),
        ExprKind::Literal(Literal::Bool(_)) => Ok(Type::Bool),
        ExprKind::Identifier(name) => {
            if let Some(ty) = env.lookup(name) {
                return Ok(ty);
            }
            if let Some(scheme) = env.functions.get(name).cloned() {
                return Ok(env.table.instantiate(&scheme));
            }
            Err(TypeError::UnboundVariable { name: name.clone(), position: expr.position })
        }
        ExprKind::Vector(items) => {
            for item in items {
                infer_expr(env, item)?;
            }
            Ok(Type::Vector)
        }
        ExprKind::Array(items) => {
            let elem_ty = env.table.fresh();
            for item in items {
                let item_ty = infer_expr(env, item)?;
                env.table.unify(&elem_ty, &item_ty, item.position)?;
            }
            Ok(Type::Array(Box::new(elem_ty)))
        }
        ExprKind::Tuple(items) => {
            let types: Result<Vec<_>, _> = items.iter().map(|i| infer_expr(env, i)).collect();
            Ok(Type::Tuple(types?))
        }
        ExprKind::Map(pairs) => {
            let key_ty = env.table.fresh();
            let val_ty = env.table.fresh();
            for (k, v) in pairs {
                let k_ty = infer_expr(env, k)?;
                env.table.unify(&key_ty, &k_ty, k.position)?;
                let v_ty = infer_expr(env, v)?;
                env.table.unify(&val_ty, &v_ty, v.position)?;
            }
            Ok(Type::Map(Box::new(key_ty), Box::new(val_ty)))
        }
        ExprKind::ListComp { element, generators, condition, else_branch } => {
            env.push_scope();
            for gen in generators {
                let two = gen.binding.second.is_some();
                let (first_ty, second_ty) = for_iterable_types(env, &gen.source, two)?;
                env.bind(&gen.binding.first, first_ty);
                if let Some(name) = &gen.binding.second {
                    env.bind(name, second_ty.expect("two_bindings requested a second type"));
                }
            }
            if let Some(cond) = condition {
                let cond_ty = infer_expr(env, cond)?;
                env.table.unify(&cond_ty, &Type::Bool, cond.position)?;
            }
            let elem_ty = infer_expr(env, element)?;
            if let Some(else_expr) = else_branch {
                let else_ty = infer_expr(env, else_expr)?;
                env.table.unify(&elem_ty, &else_ty, else_expr.position)?;
            }
            env.pop_scope();
            Ok(Type::Vector)
        }
        ExprKind::PrefixIncDec { operand, .. } | ExprKind::PostfixIncDec { operand, .. } => {
            let ty = infer_expr(env, operand)?;
            env.table.unify(&ty, &Type::Float, expr.position)?;
            Ok(ty)
        }
        ExprKind::Binary { op, left, right } => infer_binary(env, op.clone(), left, right, expr.position),
        ExprKind::Unary { op, operand } => {
            let ty = infer_expr(env, operand)?;
            match op {
                UnaryOp::Neg => {
                    env.table.unify(&ty, &Type::Float, expr.position)?;
                    Ok(ty)
                }
                UnaryOp::Not => {
                    env.table.unify(&ty, &Type::Bool, expr.position)?;
                    Ok(Type::Bool)
                }
            }
        }
        ExprKind::Call { callee, args } => {
            if let ExprKind::Field { object, name } = &callee.kind {
                return infer_method_call(env, object, name, args, expr.position);
            }
            let callee_ty = infer_expr(env, callee)?;
            let arg_types: Result<Vec<_>, _> = args.iter().map(|a| infer_expr(env, a)).collect();
            let arg_types = arg_types?;
            let ret_ty = env.table.fresh();
            let expected = Type::Function(arg_types, Box::new(ret_ty.clone()));
            match env.table.resolve(&callee_ty) {
                Type::Function(params, _) if params.len() != args.len() => {
                    Err(TypeError::ArityMismatch { expected: params.len(), found: args.len(), position: expr.position })
                }
                Type::Unknown => Ok(Type::Unknown),
                Type::Function(..) => {
                    env.table.unify(&callee_ty, &expected, expr.position)?;
                    Ok(env.table.resolve(&ret_ty))
                }
                other => Err(TypeError::NotAFunction { found: other, position: callee.position }),
            }
        }
        ExprKind::Index { collection, index } => {
            let coll_ty = infer_expr(env, collection)?;
            let index_ty = infer_expr(env, index)?;
            match env.table.resolve(&coll_ty) {
                Type::Array(inner) => {
                    env.table.unify(&index_ty, &Type::Float, index.position)?;
                    Ok(*inner)
                }
                Type::Vector => {
                    env.table.unify(&index_ty, &Type::Float, index.position)?;
                    Ok(env.table.fresh())
                }
                Type::String => {
                    env.table.unify(&index_ty, &Type::Float, index.position)?;
                    Ok(Type::String)
                }
                Type::Map(k, v) => {
                    env.table.unify(&index_ty, &k, index.position)?;
                    Ok(*v)
                }
                Type::Unknown => Ok(Type::Unknown),
                other => Err(TypeError::Mismatch {
                    expected: Type::Array(Box::new(Type::Unknown)),
                    found: other,
                    position: collection.position,
                }),
            }
        }
        ExprKind::Field { object, .. } => {
            // narval has no user-defined record types yet (see Non-goals);
            // field access is only well-typed through module namespaces,
            // resolved by nv_modules before this point. Method calls on a
            // `Field` go through `infer_method_call` instead, from `Call`.
            infer_expr(env, object)?;
            Ok(Type::Unknown)
        }
        ExprKind::Range { start, end, .. } => {
            let start_ty = infer_expr(env, start)?;
            let end_ty = infer_expr(env, end)?;
            env.table.unify(&start_ty, &Type::Float, start.position)?;
            env.table.unify(&end_ty, &Type::Float, end.position)?;
            Ok(Type::Vector)
        }
        ExprKind::Match { scrutinee, arms } => {
            let scrutinee_ty = infer_expr(env, scrutinee)?;
            let result_ty = env.table.fresh();
            for arm in arms {
                env.push_scope();
                bind_pattern(env, &arm.pattern, &scrutinee_ty)?;
                if let Some(guard) = &arm.guard {
                    let guard_ty = infer_expr(env, guard)?;
                    env.table.unify(&guard_ty, &Type::Bool, guard.position)?;
                }
                let body_ty = infer_expr(env, &arm.body)?;
                env.table.unify(&result_ty, &body_ty, arm.position)?;
                env.pop_scope();
            }
            Ok(env.table.resolve(&result_ty))
        }
        ExprKind::IfElse { cond, then_branch, else_branch } => {
            let cond_ty = infer_expr(env, cond)?;
            env.table.unify(&cond_ty, &Type::Bool, cond.position)?;
            let then_ty = infer_expr(env, then_branch)?;
            let else_ty = infer_expr(env, else_branch)?;
            env.table.unify(&then_ty, &else_ty, expr.position)?;
            Ok(env.table.resolve(&then_ty))
        }
        ExprKind::Block(block) => {
            env.push_scope();
            let mut result = Type::Unit;
            for (i, stmt) in block.iter().enumerate() {
                if i + 1 == block.len() {
                    if let StmtKind::Expr(e) = &stmt.kind {
                        result = infer_expr(env, e)?;
                        continue;
                    }
                }
                check_stmt(env, stmt)?;
            }
            env.pop_scope();
            Ok(result)
        }
    }
}

fn bind_pattern(env: &mut CheckEnv, pattern: &Pattern, scrutinee_ty: &Type) -> Result<(), TypeError> {
    match pattern {
        Pattern::Wildcard => Ok(()),
        Pattern::Binding(name) => {
            env.bind(name, scrutinee_ty.clone());
            Ok(())
        }
        Pattern::Literal(lit) => {
            let lit_ty = literal_type(lit);
            env.table.unify(scrutinee_ty, &lit_ty, Position::start_of_file())
        }
        Pattern::Range { lo, .. } => {
            let lit_ty = literal_type(lo);
            env.table.unify(scrutinee_ty, &lit_ty, Position::start_of_file())
        }
        Pattern::Or(a, b) => {
            bind_pattern(env, a, scrutinee_ty)?;
            bind_pattern(env, b, scrutinee_ty)
        }
    }
}

/// Type-checks `object.method(args)`. narval has no user-defined methods
/// (see Non-goals), so this only recognizes the fixed set of built-in
/// string/vector/array methods `nv_ir` lowers to direct runtime calls.
fn infer_method_call(env: &mut CheckEnv, object: &Expr, method: &str, args: &[Expr], position: nv_base::Position) -> Result<Type, TypeError> {
    let obj_ty = infer_expr(env, object)?;
    let arg_types: Result<Vec<_>, _> = args.iter().map(|a| infer_expr(env, a)).collect();
    let arg_types = arg_types?;
    match (env.table.resolve(&obj_ty), method) {
        (Type::String, "toUpperCase") | (Type::String, "toLowerCase") => {
            expect_arity(&arg_types, 0, position)?;
            Ok(Type::String)
        }
        (Type::String, "replace") => {
            expect_arity(&arg_types, 2, position)?;
            env.table.unify(&arg_types[0], &Type::String, position)?;
            env.table.unify(&arg_types[1], &Type::String, position)?;
            Ok(Type::String)
        }
        (Type::String, "includes") => {
            expect_arity(&arg_types, 1, position)?;
            env.table.unify(&arg_types[0], &Type::String, position)?;
            Ok(Type::Bool)
        }
        (Type::Vector, "push") => {
            expect_arity(&arg_types, 1, position)?;
            Ok(Type::Unit)
        }
        (Type::Vector, "pop") => {
            expect_arity(&arg_types, 0, position)?;
            Ok(env.table.fresh())
        }
        (Type::Vector, "get") => {
            expect_arity(&arg_types, 1, position)?;
            env.table.unify(&arg_types[0], &Type::Float, position)?;
            Ok(env.table.fresh())
        }
        (Type::Vector, "set") => {
            expect_arity(&arg_types, 2, position)?;
            env.table.unify(&arg_types[0], &Type::Float, position)?;
            Ok(Type::Unit)
        }
        (Type::Array(inner), "push") => {
            expect_arity(&arg_types, 1, position)?;
            env.table.unify(&inner, &arg_types[0], position)?;
            Ok(Type::Unit)
        }
        (Type::Array(inner), "pop") => {
            expect_arity(&arg_types, 0, position)?;
            Ok(*inner)
        }
        (Type::Array(inner), "get") => {
            expect_arity(&arg_types, 1, position)?;
            env.table.unify(&arg_types[0], &Type::Float, position)?;
            Ok(*inner)
        }
        (Type::Array(inner), "set") => {
            expect_arity(&arg_types, 2, position)?;
            env.table.unify(&arg_types[0], &Type::Float, position)?;
            env.table.unify(&inner, &arg_types[1], position)?;
            Ok(Type::Unit)
        }
        (Type::Unknown, _) => Ok(Type::Unknown),
        (other, _) => Err(TypeError::Mismatch { expected: Type::String, found: other, position }),
    }
}

fn expect_arity(args: &[Type], n: usize, position: nv_base::Position) -> Result<(), TypeError> {
    if args.len() != n {
        return Err(TypeError::ArityMismatch { expected: n, found: args.len(), position });
    }
    Ok(())
}

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Number(_) => Type::Float,
        Literal::String(_) => Type::String,
        Literal::Bool(_) => Type::Bool,
    }
}

fn infer_binary(env: &mut CheckEnv, op: BinaryOp, left: &Expr, right: &Expr, position: nv_base::Position) -> Result<Type, TypeError> {
    let left_ty = infer_expr(env, left)?;
    let right_ty = infer_expr(env, right)?;
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod | BinaryOp::Pow => {
            env.table.unify(&left_ty, &Type::Float, position)?;
            env.table.unify(&right_ty, &Type::Float, position)?;
            Ok(Type::Float)
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            env.table.unify(&left_ty, &right_ty, position)?;
            Ok(Type::Bool)
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            env.table.unify(&left_ty, &right_ty, position)?;
            Ok(Type::Bool)
        }
        BinaryOp::And | BinaryOp::Or => {
            env.table.unify(&left_ty, &Type::Bool, position)?;
            env.table.unify(&right_ty, &Type::Bool, position)?;
            Ok(Type::Bool)
        }
    }
}

use nv_base::Position;

#[cfg(test)]
mod tests {
    use super::*;
    use nv_lexer::Lexer;
    use nv_parser::Parser;

    fn check(src: &str) -> Result<CheckedProgram, TypeError> {
        let (tokens, imports) = Lexer::new(src, "test.rv").tokenize().unwrap();
        let program = Parser::parse_program(tokens, imports).unwrap();
        check_program(program, Namespace::new())
    }

    #[test]
    fn locks_a_number_as_float() {
        let checked = check("lock x = 1;").unwrap();
        assert_eq!(checked.binding_types["x"], Type::Float);
    }

    #[test]
    fn rejects_rebinding_in_the_same_scope() {
        let err = check("lock x = 1; lock x = 2;").unwrap_err();
        assert!(matches!(err, TypeError::Rebinding { .. }));
    }

    #[test]
    fn rejects_type_mismatch_in_annotated_lock() {
        let err = check("lock x: Bool = 1;").unwrap_err();
        assert!(matches!(err, TypeError::Mismatch { .. }));
    }

    #[test]
    fn if_branches_must_agree_when_used_as_an_expression() {
        let err = check("lock x = if true { 1 } else { false };").unwrap_err();
        assert!(matches!(err, TypeError::Mismatch { .. }));
    }

    #[test]
    fn function_call_checks_argument_types() {
        let program = "def add(a: Int, b: Int) -> Int { return a + b; } lock x = add(1, 2);";
        let checked = check(program).unwrap();
        assert_eq!(checked.binding_types["x"], Type::Float);
    }

    #[test]
    fn unbound_identifier_is_reported() {
        let err = check("lock x = y;").unwrap_err();
        assert!(matches!(err, TypeError::UnboundVariable { .. }));
    }

    #[test]
    fn for_loop_binds_element_type_from_vector() {
        let checked = check("lock total = 0; for i from [1, 2, 3] { total += i; }").unwrap();
        assert_eq!(checked.binding_types["total"], Type::Float);
    }

    #[test]
    fn for_loop_with_two_bindings_over_an_array() {
        let checked = check("lock total = 0; for i, x from {1, 2, 3} { total += i + x; }").unwrap();
        assert_eq!(checked.binding_types["total"], Type::Float);
    }

    #[test]
    fn string_method_call_type_checks() {
        let checked = check("lock s = \"hi\".toUpperCase();").unwrap();
        assert_eq!(checked.binding_types["s"], Type::String);
    }

    #[test]
    fn includes_method_returns_bool() {
        let checked = check("lock b = \"hi\".includes(\"h\");").unwrap();
        assert_eq!(checked.binding_types["b"], Type::Bool);
    }

    #[test]
    fn for_loop_over_map_with_two_bindings() {
        let checked = check("lock total = 0; for k, v from {\"a\": 1} { total += v; }").unwrap();
        assert_eq!(checked.binding_types["total"], Type::Float);
    }

    #[test]
    fn match_pattern_disjunction_matches_either_arm() {
        let checked = check("lock x = match 2 { 1 || 2 => \"small\", _ => \"big\" };").unwrap();
        assert_eq!(checked.binding_types["x"], Type::String);
    }
}
