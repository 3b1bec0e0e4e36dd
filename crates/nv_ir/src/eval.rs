//! A tree-walking evaluator over [`crate::ir::IrModule`].
//!
//! This stands in for the JIT the interactive core calls out to: rather
//! than emitting and linking machine code, `Engine::execute` interprets
//! the lowered IR directly. `nv_interactive::JitExecutionEngine` is built
//! against this same `add_module`/`execute` surface, so swapping in a real
//! code-generating backend later only touches this crate.

use crate::ir::*;
use crate::value::Value;
use nv_base::{Position, Result, SpannedError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

enum Signal {
    Normal,
    Break,
    Continue,
    Return(Value),
}

type Scope = HashMap<String, Value>;

/// Holds every function and global binding committed so far, across
/// however many [`IrModule`]s have been added. Mirrors the incremental
/// nature of a notebook: each cell adds to the same running engine.
#[derive(Default)]
pub struct Engine {
    functions: HashMap<String, Rc<IrFunction>>,
    globals: Rc<RefCell<Scope>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module's functions and runs its entry statements against the
    /// engine's persistent global scope, returning the last entry
    /// expression's value if the module ends in a bare expression
    /// statement (used for `auto_print_last_expr` in the REPL).
    pub fn add_module(&mut self, module: &IrModule) -> Result<Option<Value>> {
        for (name, function) in &module.functions {
            self.functions.insert(name.clone(), Rc::new(function.clone()));
        }
        let mut last = None;
        let mut scopes = vec![self.globals.borrow().clone()];
        for (i, stmt) in module.entry.iter().enumerate() {
            if i + 1 == module.entry.len() {
                if let IrStmt::Expr(expr) = stmt {
                    let value = self.eval_expr(expr, &mut scopes)?;
                    last = Some(value);
                    continue;
                }
            }
            match self.exec_stmt(stmt, &mut scopes)? {
                Signal::Normal => {}
                Signal::Return(_) => break,
                Signal::Break | Signal::Continue => {
                    return Err(SpannedError::new(
                        "break/continue outside of a loop",
                        Position::start_of_file(),
                    ))
                }
            }
        }
        *self.globals.borrow_mut() = scopes.remove(0);
        Ok(last)
    }

    /// Drops a function binding, e.g. when the fragment that defined it is
    /// invalidated. Global variable bindings are untouched: narval has no
    /// "unset", only redefinition.
    pub fn forget_function(&mut self, name: &str) {
        self.functions.remove(name);
    }

    /// Calls a named top-level function with already-evaluated arguments.
    pub fn call_named(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let function = self.functions.get(name).cloned().ok_or_else(|| {
            SpannedError::new(format!("no such function '{}'", name), Position::start_of_file())
        })?;
        self.call_function(&function, args)
    }

    fn call_function(&mut self, function: &IrFunction, args: Vec<Value>) -> Result<Value> {
        let mut scope = self.globals.borrow().clone();
        for (param, arg) in function.params.iter().zip(args.into_iter()) {
            scope.insert(param.clone(), arg);
        }
        let mut scopes = vec![scope];
        for stmt in &function.body {
            match self.exec_stmt(stmt, &mut scopes)? {
                Signal::Normal => {}
                Signal::Return(value) => return Ok(value),
                Signal::Break | Signal::Continue => {
                    return Err(SpannedError::new(
                        "break/continue outside of a loop",
                        Position::start_of_file(),
                    ))
                }
            }
        }
        Ok(Value::Unit)
    }

    fn exec_block(&mut self, body: &[IrStmt], scopes: &mut Vec<Scope>) -> Result<Signal> {
        scopes.push(Scope::new());
        let mut signal = Signal::Normal;
        for stmt in body {
            signal = self.exec_stmt(stmt, scopes)?;
            if !matches!(signal, Signal::Normal) {
                break;
            }
        }
        scopes.pop();
        Ok(signal)
    }

    fn exec_stmt(&mut self, stmt: &IrStmt, scopes: &mut Vec<Scope>) -> Result<Signal> {
        match stmt {
            IrStmt::Lock { name, value } => {
                let v = self.eval_expr(value, scopes)?;
                scopes.last_mut().unwrap().insert(name.clone(), v);
                Ok(Signal::Normal)
            }
            IrStmt::Assign { target, value } => {
                let v = self.eval_expr(value, scopes)?;
                self.assign(target, v, scopes)?;
                Ok(Signal::Normal)
            }
            IrStmt::Expr(expr) => {
                self.eval_expr(expr, scopes)?;
                Ok(Signal::Normal)
            }
            IrStmt::If { cond, then_branch, elifs, else_branch } => {
                if self.eval_expr(cond, scopes)?.is_truthy() {
                    return self.exec_block(then_branch, scopes);
                }
                for (c, b) in elifs {
                    if self.eval_expr(c, scopes)?.is_truthy() {
                        return self.exec_block(b, scopes);
                    }
                }
                if let Some(b) = else_branch {
                    return self.exec_block(b, scopes);
                }
                Ok(Signal::Normal)
            }
            IrStmt::While { cond, body } => {
                while self.eval_expr(cond, scopes)?.is_truthy() {
                    match self.exec_block(body, scopes)? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                Ok(Signal::Normal)
            }
            IrStmt::For { binding, iterable, body, else_branch } => {
                let source = self.eval_expr(iterable, scopes)?;
                let entries = self.iterable_entries(source, binding.second.is_some())?;
                let mut executed = false;
                for (first, second) in entries {
                    executed = true;
                    scopes.push(Scope::new());
                    scopes.last_mut().unwrap().insert(binding.first.clone(), first);
                    if let Some(name) = &binding.second {
                        scopes.last_mut().unwrap().insert(name.clone(), second.expect("two-binding for loop"));
                    }
                    let signal = self.exec_block(body, scopes);
                    scopes.pop();
                    match signal? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                if !executed {
                    if let Some(b) = else_branch {
                        return self.exec_block(b, scopes);
                    }
                }
                Ok(Signal::Normal)
            }
            IrStmt::Loop { body } => loop {
                match self.exec_block(body, scopes)? {
                    Signal::Break => return Ok(Signal::Normal),
                    Signal::Continue | Signal::Normal => {}
                    signal @ Signal::Return(_) => return Ok(signal),
                }
            },
            IrStmt::Break => Ok(Signal::Break),
            IrStmt::Continue => Ok(Signal::Continue),
            IrStmt::Return(value) => {
                let v = match value {
                    Some(e) => self.eval_expr(e, scopes)?,
                    None => Value::Unit,
                };
                Ok(Signal::Return(v))
            }
        }
    }

    /// Splits a container's contents into the (first, second) pairs a
    /// `for` header or comprehension generator binds: with a single
    /// binding, `first` is the element (or, for a map, a `(key, value)`
    /// tuple) and `second` is `None`; with two bindings, `first`/`second`
    /// are (index, element) for a sequence or (key, value) for a map.
    fn iterable_entries(&self, value: Value, two: bool) -> Result<Vec<(Value, Option<Value>)>> {
        match value {
            Value::Vector(items) | Value::Array(items) => {
                let items = items.borrow().clone();
                Ok(if two {
                    items.into_iter().enumerate().map(|(i, v)| (Value::Number(i as f64), Some(v))).collect()
                } else {
                    items.into_iter().map(|v| (v, None)).collect()
                })
            }
            Value::Tuple(items) => Ok(if two {
                items.iter().cloned().enumerate().map(|(i, v)| (Value::Number(i as f64), Some(v))).collect()
            } else {
                items.iter().cloned().map(|v| (v, None)).collect()
            }),
            Value::String(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::String(Rc::new(c.to_string()))).collect();
                Ok(if two {
                    chars.into_iter().enumerate().map(|(i, v)| (Value::Number(i as f64), Some(v))).collect()
                } else {
                    chars.into_iter().map(|v| (v, None)).collect()
                })
            }
            Value::Map(pairs) => {
                let pairs = pairs.borrow().clone();
                Ok(if two {
                    pairs.into_iter().map(|(k, v)| (k, Some(v))).collect()
                } else {
                    pairs.into_iter().map(|(k, v)| (Value::Tuple(Rc::new(vec![k, v])), None)).collect()
                })
            }
            other => Err(SpannedError::new(
                format!("cannot iterate over a {}", other),
                Position::start_of_file(),
            )),
        }
    }

    fn eval_comprehension(
        &mut self,
        element: &IrExpr,
        generators: &[IrComprehensionGenerator],
        condition: &Option<Box<IrExpr>>,
        else_branch: &Option<Box<IrExpr>>,
        depth: usize,
        scopes: &mut Vec<Scope>,
        results: &mut Vec<Value>,
    ) -> Result<()> {
        if depth == generators.len() {
            let keep = match condition {
                Some(c) => self.eval_expr(c, scopes)?.is_truthy(),
                None => true,
            };
            if keep {
                results.push(self.eval_expr(element, scopes)?);
            } else if let Some(else_expr) = else_branch {
                results.push(self.eval_expr(else_expr, scopes)?);
            }
            return Ok(());
        }
        let generator = &generators[depth];
        let source = self.eval_expr(&generator.source, scopes)?;
        let entries = self.iterable_entries(source, generator.binding.second.is_some())?;
        for (first, second) in entries {
            scopes.push(Scope::new());
            scopes.last_mut().unwrap().insert(generator.binding.first.clone(), first);
            if let Some(name) = &generator.binding.second {
                scopes.last_mut().unwrap().insert(name.clone(), second.expect("two-binding generator"));
            }
            let result = self.eval_comprehension(element, generators, condition, else_branch, depth + 1, scopes, results);
            scopes.pop();
            result?;
        }
        Ok(())
    }

    fn eval_method_call(&self, object: Value, method: &str, args: Vec<Value>) -> Result<Value> {
        match (&object, method) {
            (Value::String(s), "toUpperCase") => Ok(Value::String(Rc::new(s.to_uppercase()))),
            (Value::String(s), "toLowerCase") => Ok(Value::String(Rc::new(s.to_lowercase()))),
            (Value::String(s), "replace") => match (args.first(), args.get(1)) {
                (Some(Value::String(from)), Some(Value::String(to))) => {
                    Ok(Value::String(Rc::new(s.replace(from.as_str(), to.as_str()))))
                }
                _ => Err(SpannedError::new("'replace' takes two strings", Position::start_of_file())),
            },
            (Value::String(s), "includes") => match args.first() {
                Some(Value::String(needle)) => Ok(Value::Bool(s.contains(needle.as_str()))),
                _ => Err(SpannedError::new("'includes' takes a string", Position::start_of_file())),
            },
            (Value::Vector(items), "push") | (Value::Array(items), "push") => {
                items.borrow_mut().push(args.into_iter().next().unwrap_or(Value::Unit));
                Ok(Value::Unit)
            }
            (Value::Vector(items), "pop") | (Value::Array(items), "pop") => {
                Ok(items.borrow_mut().pop().unwrap_or(Value::Unit))
            }
            (Value::Vector(items), "get") | (Value::Array(items), "get") => {
                let i = args.first().and_then(Value::as_number).unwrap_or(0.0) as usize;
                Ok(items.borrow().get(i).cloned().unwrap_or(Value::Unit))
            }
            (Value::Vector(items), "set") | (Value::Array(items), "set") => {
                let i = args.first().and_then(Value::as_number).unwrap_or(0.0) as usize;
                let v = args.get(1).cloned().unwrap_or(Value::Unit);
                if let Some(slot) = items.borrow_mut().get_mut(i) {
                    *slot = v;
                }
                Ok(Value::Unit)
            }
            _ => Err(SpannedError::new(format!("no method '{}' on {}", method, object), Position::start_of_file())),
        }
    }

    fn assign(&mut self, target: &IrExpr, value: Value, scopes: &mut [Scope]) -> Result<()> {
        match &target.kind {
            IrExprKind::Identifier(name) => {
                for scope in scopes.iter_mut().rev() {
                    if scope.contains_key(name) {
                        scope.insert(name.clone(), value);
                        return Ok(());
                    }
                }
                Err(SpannedError::new(format!("'{}' is not locked in any scope", name), Position::start_of_file()))
            }
            _ => Err(SpannedError::new("invalid assignment target", Position::start_of_file())),
        }
    }

    fn lookup(&self, name: &str, scopes: &[Scope]) -> Option<Value> {
        scopes.iter().rev().find_map(|s| s.get(name).cloned())
    }

    fn eval_expr(&mut self, expr: &IrExpr, scopes: &mut Vec<Scope>) -> Result<Value> {
        match &expr.kind {
            IrExprKind::Literal(IrLiteral::Number(n)) => Ok(Value::Number(*n)),
            IrExprKind::Literal(IrLiteral::String(s)) => Ok(Value::String(Rc::new(s.clone()))),
            IrExprKind::Literal(IrLiteral::Bool(b)) => Ok(Value::Bool(*b)),
            IrExprKind::Identifier(name) => {
                if let Some(v) = self.lookup(name, scopes) {
                    return Ok(v);
                }
                if let Some(f) = self.functions.get(name) {
                    return Ok(Value::Function(f.clone()));
                }
                Err(SpannedError::new(format!("unbound name '{}'", name), Position::start_of_file()))
            }
            IrExprKind::Vector(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scopes)?);
                }
                Ok(Value::new_vector(values))
            }
            IrExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scopes)?);
                }
                Ok(Value::new_array(values))
            }
            IrExprKind::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scopes)?);
                }
                Ok(Value::Tuple(Rc::new(values)))
            }
            IrExprKind::Map(pairs) => {
                let mut values = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    values.push((self.eval_expr(k, scopes)?, self.eval_expr(v, scopes)?));
                }
                Ok(Value::new_map(values))
            }
            IrExprKind::ListComp { element, generators, condition, else_branch } => {
                let mut results = Vec::new();
                self.eval_comprehension(element, generators, condition, else_branch, 0, scopes, &mut results)?;
                Ok(Value::new_vector(results))
            }
            IrExprKind::PrefixIncDec { op, operand } => {
                let old = self.eval_expr(operand, scopes)?;
                let delta = match op {
                    IrIncDecOp::Increment => 1.0,
                    IrIncDecOp::Decrement => -1.0,
                };
                let n = old
                    .as_number()
                    .ok_or_else(|| SpannedError::new("'++'/'--' require a number", Position::start_of_file()))?;
                let new_value = Value::Number(n + delta);
                self.assign(operand, new_value.clone(), scopes)?;
                Ok(new_value)
            }
            IrExprKind::PostfixIncDec { op, operand } => {
                let old = self.eval_expr(operand, scopes)?;
                let delta = match op {
                    IrIncDecOp::Increment => 1.0,
                    IrIncDecOp::Decrement => -1.0,
                };
                let n = old
                    .as_number()
                    .ok_or_else(|| SpannedError::new("'++'/'--' require a number", Position::start_of_file()))?;
                self.assign(operand, Value::Number(n + delta), scopes)?;
                Ok(old)
            }
            IrExprKind::MethodCall { object, method, args } => {
                let object_value = self.eval_expr(object, scopes)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg, scopes)?);
                }
                self.eval_method_call(object_value, method, arg_values)
            }
            IrExprKind::Binary { op, left, right } => {
                let l = self.eval_expr(left, scopes)?;
                // Short-circuit `and`/`or` without evaluating the right side.
                match op {
                    IrBinaryOp::And if !l.is_truthy() => return Ok(Value::Bool(false)),
                    IrBinaryOp::Or if l.is_truthy() => return Ok(Value::Bool(true)),
                    _ => {}
                }
                let r = self.eval_expr(right, scopes)?;
                eval_binary(op, l, r)
            }
            IrExprKind::Unary { op, operand } => {
                let v = self.eval_expr(operand, scopes)?;
                match op {
                    IrUnaryOp::Neg => Ok(Value::Number(-v.as_number().ok_or_else(|| {
                        SpannedError::new("unary '-' requires a number", Position::start_of_file())
                    })?)),
                    IrUnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                }
            }
            IrExprKind::Call { callee, args } => {
                let callee_value = self.eval_expr(callee, scopes)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg, scopes)?);
                }
                match callee_value {
                    Value::Function(f) => self.call_function(&f, arg_values),
                    other => Err(SpannedError::new(format!("{} is not callable", other), Position::start_of_file())),
                }
            }
            IrExprKind::Index { collection, index } => {
                let coll = self.eval_expr(collection, scopes)?;
                let idx = self.eval_expr(index, scopes)?;
                match (&coll, &idx) {
                    (Value::Vector(items), Value::Number(n)) | (Value::Array(items), Value::Number(n)) => {
                        let i = *n as usize;
                        items.borrow().get(i).cloned().ok_or_else(|| {
                            SpannedError::new(format!("index {} out of bounds", i), Position::start_of_file())
                        })
                    }
                    (Value::Tuple(items), Value::Number(n)) => {
                        let i = *n as usize;
                        items.get(i).cloned().ok_or_else(|| {
                            SpannedError::new(format!("index {} out of bounds", i), Position::start_of_file())
                        })
                    }
                    (Value::String(s), Value::Number(n)) => {
                        let i = *n as usize;
                        s.chars().nth(i).map(|c| Value::String(Rc::new(c.to_string()))).ok_or_else(|| {
                            SpannedError::new(format!("index {} out of bounds", i), Position::start_of_file())
                        })
                    }
                    (Value::Map(pairs), key) => pairs
                        .borrow()
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| SpannedError::new("key not found in map", Position::start_of_file())),
                    _ => Err(SpannedError::new(format!("{} is not indexable", coll), Position::start_of_file())),
                }
            }
            IrExprKind::Range { start, end, inclusive } => {
                let start = self
                    .eval_expr(start, scopes)?
                    .as_number()
                    .ok_or_else(|| SpannedError::new("range bounds must be numbers", Position::start_of_file()))?;
                let end = self
                    .eval_expr(end, scopes)?
                    .as_number()
                    .ok_or_else(|| SpannedError::new("range bounds must be numbers", Position::start_of_file()))?;
                let mut items = Vec::new();
                let mut i = start as i64;
                let last = end as i64;
                while if *inclusive { i <= last } else { i < last } {
                    items.push(Value::Number(i as f64));
                    i += 1;
                }
                Ok(Value::new_vector(items))
            }
            IrExprKind::Match { scrutinee, arms } => {
                let value = self.eval_expr(scrutinee, scopes)?;
                for arm in arms {
                    scopes.push(Scope::new());
                    let matched = bind_if_matches(&arm.pattern, &value, scopes.last_mut().unwrap());
                    let passes_guard = if matched {
                        match &arm.guard {
                            Some(g) => self.eval_expr(g, scopes)?.is_truthy(),
                            None => true,
                        }
                    } else {
                        false
                    };
                    if matched && passes_guard {
                        let result = self.eval_expr(&arm.body, scopes);
                        scopes.pop();
                        return result;
                    }
                    scopes.pop();
                }
                Err(SpannedError::new("no match arm matched the scrutinee", Position::start_of_file()))
            }
            IrExprKind::IfElse { cond, then_branch, else_branch } => {
                if self.eval_expr(cond, scopes)?.is_truthy() {
                    self.eval_expr(then_branch, scopes)
                } else {
                    self.eval_expr(else_branch, scopes)
                }
            }
            IrExprKind::Block(stmts) => {
                scopes.push(Scope::new());
                let mut result = Value::Unit;
                for (i, stmt) in stmts.iter().enumerate() {
                    if i + 1 == stmts.len() {
                        if let IrStmt::Expr(e) = stmt {
                            result = self.eval_expr(e, scopes)?;
                            continue;
                        }
                    }
                    self.exec_stmt(stmt, scopes)?;
                }
                scopes.pop();
                Ok(result)
            }
        }
    }
}

fn bind_if_matches(pattern: &IrPattern, value: &Value, scope: &mut Scope) -> bool {
    match pattern {
        IrPattern::Wildcard => true,
        IrPattern::Binding(name) => {
            scope.insert(name.clone(), value.clone());
            true
        }
        IrPattern::Literal(lit) => literal_matches(lit, value),
        IrPattern::Range { lo, hi, inclusive } => match (lo, hi, value) {
            (IrLiteral::Number(a), IrLiteral::Number(b), Value::Number(n)) => {
                if *inclusive {
                    *a <= *n && *n <= *b
                } else {
                    *a <= *n && *n < *b
                }
            }
            _ => false,
        },
        IrPattern::Or(a, b) => bind_if_matches(a, value, scope) || bind_if_matches(b, value, scope),
    }
}

fn literal_matches(lit: &IrLiteral, value: &Value) -> bool {
    match (lit, value) {
        (IrLiteral::Number(a), Value::Number(b)) => a == b,
        (IrLiteral::String(a), Value::String(b)) => a == b.as_str(),
        (IrLiteral::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn eval_binary(op: &IrBinaryOp, l: Value, r: Value) -> Result<Value> {
    let num = |v: &Value| {
        v.as_number()
            .ok_or_else(|| SpannedError::new(format!("expected a number, found {}", v), Position::start_of_file()))
    };
    match op {
        IrBinaryOp::Add => match (&l, &r) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(Rc::new(format!("{}{}", a, b)))),
            _ => Ok(Value::Number(num(&l)? + num(&r)?)),
        },
        IrBinaryOp::Sub => Ok(Value::Number(num(&l)? - num(&r)?)),
        IrBinaryOp::Mul => Ok(Value::Number(num(&l)? * num(&r)?)),
        IrBinaryOp::Div => Ok(Value::Number(num(&l)? / num(&r)?)),
        IrBinaryOp::FloorDiv => Ok(Value::Number((num(&l)? / num(&r)?).floor())),
        IrBinaryOp::Mod => Ok(Value::Number(num(&l)? % num(&r)?)),
        IrBinaryOp::Pow => Ok(Value::Number(num(&l)?.powf(num(&r)?))),
        IrBinaryOp::Eq => Ok(Value::Bool(l == r)),
        IrBinaryOp::NotEq => Ok(Value::Bool(l != r)),
        IrBinaryOp::Lt => Ok(Value::Bool(num(&l)? < num(&r)?)),
        IrBinaryOp::Gt => Ok(Value::Bool(num(&l)? > num(&r)?)),
        IrBinaryOp::LtEq => Ok(Value::Bool(num(&l)? <= num(&r)?)),
        IrBinaryOp::GtEq => Ok(Value::Bool(num(&l)? >= num(&r)?)),
        IrBinaryOp::And => Ok(Value::Bool(l.is_truthy() && r.is_truthy())),
        IrBinaryOp::Or => Ok(Value::Bool(l.is_truthy() || r.is_truthy())),
    }
}
