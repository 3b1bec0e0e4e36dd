//! # nv_types
//!
//! Hindley-Milner type representation and Robinson unification with an
//! occurs check, used by `nv_check` to infer and verify every narval
//! expression's type before lowering.
//!
//! ```text
//! Type (with Var)  ←  inference pass (nv_check)
//!       │
//!       │  resolve (after inference)
//!       ▼
//! Type (Var → Unknown for anything left unbound)
//! ```

use nv_base::Position;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A type variable allocated during inference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TyVar(pub u32);

/// A nominal type: a named, field-carrying type with an optional base it
/// derives from. narval's surface grammar has no declaration syntax for
/// these yet (no `struct`/`class` keyword), but the type language carries
/// the shape so a future declaration form has somewhere to land.
#[derive(Clone, Debug)]
pub struct CustomType {
    pub id: u32,
    pub name: String,
    pub fields: Vec<(String, Type)>,
    pub base: Option<Rc<CustomType>>,
    pub size_bytes: usize,
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// The narval type language.
#[derive(Clone, PartialEq, Debug)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    Unit,
    /// The type of a failed computation; unifies with anything so an error
    /// already reported for a subexpression doesn't cascade into spurious
    /// mismatches above it.
    Error,
    /// `{a, b, c}` with a single inferred element type.
    Array(Box<Type>),
    /// `[a, b, c]`: heterogeneous; its element type is an unsolved type
    /// variable created fresh at each access rather than carried here.
    Vector,
    /// `(a, b, c)`: a fixed-arity, positionally-typed tuple.
    Tuple(Vec<Type>),
    /// `{k: v, ...}`.
    Map(Box<Type>, Box<Type>),
    Function(Vec<Type>, Box<Type>),
    /// A nominal type with fields, e.g. one produced by a future
    /// declaration form.
    Custom(Rc<CustomType>),
    /// An unbound type variable, present only before/during inference.
    Var(TyVar),
    /// A variable left unresolved after inference; unifies with anything.
    /// Should not reach `nv_ir` — the checker treats it as an error there.
    Unknown,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Bool => write!(f, "Bool"),
            Type::String => write!(f, "String"),
            Type::Unit => write!(f, "Unit"),
            Type::Error => write!(f, "<error>"),
            Type::Array(inner) => write!(f, "Array<{}>", inner),
            Type::Vector => write!(f, "Vector"),
            Type::Tuple(items) => {
                write!(f, "(")?;
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
            Type::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            Type::Function(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Custom(custom) => write!(f, "{}", custom.name),
            Type::Var(v) => write!(f, "t{}", v.0),
            Type::Unknown => write!(f, "?"),
        }
    }
}

/// A type error detected during unification or checking, always anchored
/// to the source position that triggered it.
#[derive(Debug, Clone)]
pub enum TypeError {
    Mismatch { expected: Type, found: Type, position: Position },
    InfiniteType { var: TyVar, ty: Type, position: Position },
    ArityMismatch { expected: usize, found: usize, position: Position },
    NotAFunction { found: Type, position: Position },
    UnboundVariable { name: String, position: Position },
    Rebinding { name: String, position: Position },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch { expected, found, position } => {
                write!(f, "expected {}, found {} at {}", expected, found, position)
            }
            TypeError::InfiniteType { var, ty, position } => {
                write!(f, "infinite type: t{} occurs in {} at {}", var.0, ty, position)
            }
            TypeError::ArityMismatch { expected, found, position } => {
                write!(f, "expected {} arguments, found {} at {}", expected, found, position)
            }
            TypeError::NotAFunction { found, position } => {
                write!(f, "{} is not a function at {}", found, position)
            }
            TypeError::UnboundVariable { name, position } => {
                write!(f, "unbound variable '{}' at {}", name, position)
            }
            TypeError::Rebinding { name, position } => {
                write!(f, "'{}' is already locked in this scope at {}", name, position)
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// A quantified polymorphic type: `forall vars. body`.
#[derive(Clone, Debug)]
pub struct TypeScheme {
    pub vars: Vec<TyVar>,
    pub body: Type,
}

impl TypeScheme {
    /// A scheme with no quantified variables, i.e. a monomorphic type.
    pub fn monomorphic(ty: Type) -> Self {
        Self { vars: Vec::new(), body: ty }
    }
}

/// Union-find table implementing Robinson unification with an occurs check.
pub struct UnificationTable {
    bindings: Vec<Option<Type>>,
}

impl Default for UnificationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UnificationTable {
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    pub fn fresh(&mut self) -> Type {
        Type::Var(self.fresh_var())
    }

    pub fn fresh_var(&mut self) -> TyVar {
        let id = self.bindings.len() as u32;
        self.bindings.push(None);
        TyVar(id)
    }

    /// Replaces each of `scheme`'s quantified variables with a fresh one,
    /// so that two call sites of a generic function never share a binding.
    pub fn instantiate(&mut self, scheme: &TypeScheme) -> Type {
        if scheme.vars.is_empty() {
            return scheme.body.clone();
        }
        let subst: HashMap<TyVar, TyVar> = scheme
            .vars
            .iter()
            .map(|&old| (old, self.fresh_var()))
            .collect();
        self.substitute_vars(&scheme.body, &subst)
    }

    fn substitute_vars(&self, ty: &Type, subst: &HashMap<TyVar, TyVar>) -> Type {
        match ty {
            Type::Var(tv) => match self.find(*tv) {
                Type::Var(rtv) => Type::Var(*subst.get(&rtv).unwrap_or(&rtv)),
                other => self.substitute_vars(&other, subst),
            },
            Type::Array(inner) => Type::Array(Box::new(self.substitute_vars(inner, subst))),
            Type::Tuple(items) => {
                Type::Tuple(items.iter().map(|t| self.substitute_vars(t, subst)).collect())
            }
            Type::Map(k, v) => Type::Map(
                Box::new(self.substitute_vars(k, subst)),
                Box::new(self.substitute_vars(v, subst)),
            ),
            Type::Function(params, ret) => Type::Function(
                params.iter().map(|p| self.substitute_vars(p, subst)).collect(),
                Box::new(self.substitute_vars(ret, subst)),
            ),
            other => other.clone(),
        }
    }

    /// Follows the binding chain for a type variable (iterative, no path
    /// compression — inference runs are short enough not to need it).
    pub fn find(&self, tv: TyVar) -> Type {
        let mut current = tv;
        loop {
            match &self.bindings[current.0 as usize] {
                None => return Type::Var(current),
                Some(Type::Var(next)) => current = *next,
                Some(ty) => return ty.clone(),
            }
        }
    }

    /// Resolves type variables, keeping unbound ones as `Var` (used during
    /// inference, to preserve yet-unconstrained generics).
    pub fn resolve(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(tv) => match self.find(*tv) {
                Type::Var(_) => self.find(*tv),
                other => self.resolve(&other),
            },
            Type::Array(inner) => Type::Array(Box::new(self.resolve(inner))),
            Type::Tuple(items) => Type::Tuple(items.iter().map(|t| self.resolve(t)).collect()),
            Type::Map(k, v) => Type::Map(Box::new(self.resolve(k)), Box::new(self.resolve(v))),
            Type::Function(params, ret) => Type::Function(
                params.iter().map(|p| self.resolve(p)).collect(),
                Box::new(self.resolve(ret)),
            ),
            other => other.clone(),
        }
    }

    /// Fully resolves a type after inference is complete, turning any
    /// variable still unbound into [`Type::Unknown`] — `nv_ir` lowering
    /// rejects `Unknown` wherever it appears, so this is the boundary
    /// where an under-constrained program becomes a checker error.
    pub fn zonk(&self, ty: &Type) -> Type {
        match self.resolve(ty) {
            Type::Var(_) => Type::Unknown,
            Type::Array(inner) => Type::Array(Box::new(self.zonk(&inner))),
            Type::Tuple(items) => Type::Tuple(items.iter().map(|t| self.zonk(t)).collect()),
            Type::Map(k, v) => Type::Map(Box::new(self.zonk(&k)), Box::new(self.zonk(&v))),
            Type::Function(params, ret) => Type::Function(
                params.iter().map(|p| self.zonk(p)).collect(),
                Box::new(self.zonk(&ret)),
            ),
            other => other,
        }
    }

    fn occurs(&self, tv: TyVar, ty: &Type) -> bool {
        match self.resolve(ty) {
            Type::Var(other) => other == tv,
            Type::Array(inner) => self.occurs(tv, &inner),
            Type::Tuple(items) => items.iter().any(|t| self.occurs(tv, t)),
            Type::Map(k, v) => self.occurs(tv, &k) || self.occurs(tv, &v),
            Type::Function(params, ret) => {
                params.iter().any(|p| self.occurs(tv, p)) || self.occurs(tv, &ret)
            }
            _ => false,
        }
    }

    fn bind(&mut self, tv: TyVar, ty: Type, position: Position) -> Result<(), TypeError> {
        if let Type::Var(other) = ty {
            if other == tv {
                return Ok(());
            }
        }
        if self.occurs(tv, &ty) {
            return Err(TypeError::InfiniteType { var: tv, ty, position });
        }
        self.bindings[tv.0 as usize] = Some(ty);
        Ok(())
    }

    /// Robinson unification: makes `a` and `b` equal by binding their free
    /// variables, failing if their shapes can never agree.
    pub fn unify(&mut self, a: &Type, b: &Type, position: Position) -> Result<(), TypeError> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        match (&a, &b) {
            (Type::Var(v), _) => self.bind(*v, b, position),
            (_, Type::Var(v)) => self.bind(*v, a, position),
            (Type::Unknown, _) | (_, Type::Unknown) => Ok(()),
            (Type::Error, _) | (_, Type::Error) => Ok(()),
            (Type::Int, Type::Int)
            | (Type::Float, Type::Float)
            | (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Unit, Type::Unit)
            | (Type::Vector, Type::Vector) => Ok(()),
            (Type::Array(x), Type::Array(y)) => self.unify(x, y, position),
            (Type::Map(k1, v1), Type::Map(k2, v2)) => {
                self.unify(k1, k2, position)?;
                self.unify(v1, v2, position)
            }
            (Type::Tuple(xs), Type::Tuple(ys)) => {
                if xs.len() != ys.len() {
                    return Err(TypeError::ArityMismatch {
                        expected: xs.len(),
                        found: ys.len(),
                        position,
                    });
                }
                for (x, y) in xs.iter().zip(ys.iter()) {
                    self.unify(x, y, position)?;
                }
                Ok(())
            }
            (Type::Custom(x), Type::Custom(y)) if x.id == y.id => Ok(()),
            (Type::Function(ps1, r1), Type::Function(ps2, r2)) => {
                if ps1.len() != ps2.len() {
                    return Err(TypeError::ArityMismatch {
                        expected: ps1.len(),
                        found: ps2.len(),
                        position,
                    });
                }
                for (x, y) in ps1.iter().zip(ps2.iter()) {
                    self.unify(x, y, position)?;
                }
                self.unify(r1, r2, position)
            }
            _ => Err(TypeError::Mismatch {
                expected: a,
                found: b,
                position,
            }),
        }
    }

    /// Generalizes `ty` into a `TypeScheme` by quantifying over every
    /// variable free in `ty` but not in `monomorphic_vars` (the variables
    /// still mentioned by the enclosing environment).
    pub fn generalize(&self, ty: &Type, monomorphic_vars: &[TyVar]) -> TypeScheme {
        let resolved = self.resolve(ty);
        let mut free = Vec::new();
        collect_free_vars(&resolved, &mut free);
        free.retain(|v| !monomorphic_vars.contains(v));
        free.dedup();
        TypeScheme { vars: free, body: resolved }
    }
}

fn collect_free_vars(ty: &Type, out: &mut Vec<TyVar>) {
    match ty {
        Type::Var(v) => out.push(*v),
        Type::Array(inner) => collect_free_vars(inner, out),
        Type::Tuple(items) => {
            for t in items {
                collect_free_vars(t, out);
            }
        }
        Type::Map(k, v) => {
            collect_free_vars(k, out);
            collect_free_vars(v, out);
        }
        Type::Function(params, ret) => {
            for p in params {
                collect_free_vars(p, out);
            }
            collect_free_vars(ret, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::start_of_file()
    }

    #[test]
    fn unifies_identical_ground_types() {
        let mut table = UnificationTable::new();
        assert!(table.unify(&Type::Int, &Type::Int, pos()).is_ok());
    }

    #[test]
    fn rejects_mismatched_ground_types() {
        let mut table = UnificationTable::new();
        assert!(table.unify(&Type::Int, &Type::Bool, pos()).is_err());
    }

    #[test]
    fn binds_a_fresh_variable_to_a_concrete_type() {
        let mut table = UnificationTable::new();
        let v = table.fresh();
        table.unify(&v, &Type::Int, pos()).unwrap();
        assert_eq!(table.zonk(&v), Type::Int);
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let mut table = UnificationTable::new();
        let v = table.fresh_var();
        let array_of_v = Type::Array(Box::new(Type::Var(v)));
        let err = table.unify(&Type::Var(v), &array_of_v, pos()).unwrap_err();
        assert!(matches!(err, TypeError::InfiniteType { .. }));
    }

    #[test]
    fn unresolved_variables_zonk_to_unknown() {
        let mut table = UnificationTable::new();
        let v = table.fresh();
        assert_eq!(table.zonk(&v), Type::Unknown);
    }

    #[test]
    fn instantiate_gives_independent_variables_per_call_site() {
        let mut table = UnificationTable::new();
        let v = table.fresh_var();
        let scheme = TypeScheme {
            vars: vec![v],
            body: Type::Function(vec![Type::Var(v)], Box::new(Type::Var(v))),
        };
        let call1 = table.instantiate(&scheme);
        let call2 = table.instantiate(&scheme);
        table.unify(&call1, &Type::Function(vec![Type::Int], Box::new(Type::Int)), pos()).unwrap();
        table.unify(&call2, &Type::Function(vec![Type::Bool], Box::new(Type::Bool)), pos()).unwrap();
        // call1 and call2 did not unify with each other, so Int and Bool
        // coexist without a conflict.
        assert_eq!(table.zonk(&call1), Type::Function(vec![Type::Int], Box::new(Type::Int)));
        assert_eq!(table.zonk(&call2), Type::Function(vec![Type::Bool], Box::new(Type::Bool)));
    }

    #[test]
    fn generalize_quantifies_only_free_non_monomorphic_vars() {
        let mut table = UnificationTable::new();
        let a = table.fresh_var();
        let b = table.fresh_var();
        let ty = Type::Function(vec![Type::Var(a)], Box::new(Type::Var(b)));
        let scheme = table.generalize(&ty, &[a]);
        assert_eq!(scheme.vars, vec![b]);
    }

    #[test]
    fn function_arity_mismatch_is_reported() {
        let mut table = UnificationTable::new();
        let f1 = Type::Function(vec![Type::Int], Box::new(Type::Unit));
        let f2 = Type::Function(vec![Type::Int, Type::Int], Box::new(Type::Unit));
        let err = table.unify(&f1, &f2, pos()).unwrap_err();
        assert!(matches!(err, TypeError::ArityMismatch { expected: 1, found: 2, .. }));
    }
}
