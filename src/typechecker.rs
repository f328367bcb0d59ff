/// Cflat static type checker.
///
/// Checking runs over two global environments built once per program:
/// Γ maps identifiers to types (externs as bare `fn`, every non-`main`
/// function as `ptr(fn)`, `main` deliberately absent so nothing can name
/// it), and Δ maps struct names to their field tables. Each function is
/// checked against a local copy of Γ extended with its parameters and
/// locals.
///
/// Expression checks yield the expression's type; statement checks yield
/// a "definitely returns" flag used to prove every function returns on
/// all paths. The first diagnostic aborts the whole check.
use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ast::{
    BinaryOp, Exp, Extern, FunCall, FunctionDef, Place, Program, Stmt, StructDef,
};
use crate::render::{exp_to_str, fun_call_to_str, index_str, place_to_str};
use crate::types::{eq, pick_nonnil, Type};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TypeError {
    pub message: String,
}

fn type_error(message: impl Into<String>) -> TypeError {
    TypeError {
        message: message.into(),
    }
}

/// Γ: identifier → type.
pub type Gamma = HashMap<String, Type>;

/// Δ: struct name → (field name → type).
pub type Delta = HashMap<String, HashMap<String, Type>>;

/// Checks a whole program, stopping at the first diagnostic. Traversal
/// order is fixed: duplicate names, the `main` gate, then every struct
/// and every function in declaration order.
pub fn check_program(program: &Program) -> Result<(), TypeError> {
    let mut top_level_names = HashSet::new();
    for s in &program.structs {
        if !top_level_names.insert(s.name.as_str()) {
            return Err(type_error(format!("Duplicate name: {}", s.name)));
        }
    }
    for e in &program.externs {
        if !top_level_names.insert(e.name.as_str()) {
            return Err(type_error(format!("Duplicate name: {}", e.name)));
        }
    }
    for f in &program.functions {
        if f.name != "main" && !top_level_names.insert(f.name.as_str()) {
            return Err(type_error(format!("Duplicate name: {}", f.name)));
        }
    }
    // A struct or extern named `main` still collides with the function.
    if top_level_names.contains("main") && program.functions.iter().any(|f| f.name == "main") {
        return Err(type_error("Duplicate name: main"));
    }

    let gamma = construct_gamma(&program.externs, &program.functions);
    let delta = construct_delta(&program.structs);

    let mut main_found = false;
    for f in &program.functions {
        if f.name == "main" {
            if f.params.is_empty() && eq(&f.rettype, &Type::Int) {
                main_found = true;
            } else {
                return Err(type_error(
                    "function 'main' exists but has wrong type, should be '() -> int'",
                ));
            }
        }
    }
    if !main_found {
        return Err(type_error(
            "no 'main' function with type '() -> int' exists",
        ));
    }

    for s in &program.structs {
        check_struct_def(s)?;
    }
    for f in &program.functions {
        check_function_def(f, &gamma, &delta)?;
    }
    Ok(())
}

/// Builds Γ from externs and function definitions. Externs bind to the
/// bare function type; every function except `main` binds to a pointer
/// to its function type. `main` is omitted so neither calling it through
/// Γ nor taking its address is possible. Duplicates are not detected
/// here; the program check owns that.
pub fn construct_gamma(externs: &[Extern], functions: &[FunctionDef]) -> Gamma {
    let mut gamma = Gamma::new();
    for ext in externs {
        gamma.insert(
            ext.name.clone(),
            Type::Fn(ext.param_types.clone(), Box::new(ext.rettype.clone())),
        );
    }
    for func in functions {
        if func.name != "main" {
            let param_types: Vec<Type> = func.params.iter().map(|p| p.typ.clone()).collect();
            let fn_type = Type::Fn(param_types, Box::new(func.rettype.clone()));
            gamma.insert(func.name.clone(), Type::Ptr(Box::new(fn_type)));
        }
    }
    gamma
}

/// Builds Δ from struct definitions. Later fields silently shadow
/// earlier ones; the per-struct check rejects the duplicate.
pub fn construct_delta(structs: &[StructDef]) -> Delta {
    let mut delta = Delta::new();
    for s in structs {
        let mut fields = HashMap::new();
        for f in &s.fields {
            fields.insert(f.name.clone(), f.typ.clone());
        }
        delta.insert(s.name.clone(), fields);
    }
    delta
}

// ---------------------------------------------------------------------------
// Top-level definitions
// ---------------------------------------------------------------------------

fn check_struct_def(s: &StructDef) -> Result<(), TypeError> {
    if s.fields.is_empty() {
        return Err(type_error(format!("empty struct {}", s.name)));
    }
    let mut field_names = HashSet::new();
    for field in &s.fields {
        if matches!(field.typ, Type::Nil | Type::Struct(_) | Type::Fn(_, _)) {
            return Err(type_error(format!(
                "invalid type {} for struct field {}::{}",
                field.typ.display(),
                s.name,
                field.name
            )));
        }
        if !field_names.insert(field.name.as_str()) {
            return Err(type_error(format!(
                "Duplicate field name '{}' in struct '{}'",
                field.name, s.name
            )));
        }
    }
    Ok(())
}

fn check_function_def(f: &FunctionDef, gamma: &Gamma, delta: &Delta) -> Result<(), TypeError> {
    let mut local_gamma = gamma.clone();
    let mut local_names = HashSet::new();

    // Parameters and locals share one namespace.
    for decl in f.params.iter().chain(f.locals.iter()) {
        if matches!(decl.typ, Type::Nil | Type::Struct(_) | Type::Fn(_, _)) {
            return Err(type_error(format!(
                "invalid type {} for variable {} in function {}",
                decl.typ.display(),
                decl.name,
                f.name
            )));
        }
        if !local_names.insert(decl.name.as_str()) {
            return Err(type_error(format!(
                "Duplicate parameter/local name '{}' in function '{}'",
                decl.name, f.name
            )));
        }
        local_gamma.insert(decl.name.clone(), decl.typ.clone());
    }

    match &f.body {
        Stmt::Stmts(stmts) if stmts.is_empty() => {
            return Err(type_error(format!("function {} has an empty body", f.name)));
        }
        Stmt::Stmts(_) => {}
        _ => {
            return Err(type_error(format!(
                "function {} has an invalid body structure (expected Stmts)",
                f.name
            )));
        }
    }

    let checker = Checker {
        gamma: &local_gamma,
        delta,
    };
    let definitely_returns = checker.check_stmt(&f.body, &f.rettype, false)?;
    if !definitely_returns {
        return Err(type_error(format!(
            "function {} may not execute a return",
            f.name
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Per-node rules
// ---------------------------------------------------------------------------

struct Checker<'a> {
    gamma: &'a Gamma,
    delta: &'a Delta,
}

impl Checker<'_> {
    fn check_place(&self, place: &Place) -> Result<Type, TypeError> {
        match place {
            Place::Id(name) => match self.gamma.get(name) {
                Some(typ) => Ok(typ.clone()),
                None => Err(type_error(format!(
                    "id {} does not exist in this scope",
                    name
                ))),
            },
            Place::Deref(exp) => {
                let typ = self.check_exp(exp)?;
                match typ {
                    Type::Ptr(pointee) => Ok(*pointee),
                    // Quote the dereference itself without wrapping its
                    // operand; the node being reported is the whole `E.*`.
                    other => Err(type_error(format!(
                        "non-pointer type {} for dereference '{}.*'",
                        other.display(),
                        exp_to_str(exp)
                    ))),
                }
            }
            Place::ArrayAccess { array, idx } => {
                let array_type = self.check_exp(array)?;
                let idx_type = self.check_exp(idx)?;
                let rendered = format!("{}[{}]", exp_to_str(array), index_str(idx));
                if !eq(&idx_type, &Type::Int) {
                    return Err(type_error(format!(
                        "non-int index type {} for array access '{}'",
                        idx_type.display(),
                        rendered
                    )));
                }
                match array_type {
                    Type::Array(elem) => Ok(*elem),
                    other => Err(type_error(format!(
                        "non-array type {} for array access '{}'",
                        other.display(),
                        rendered
                    ))),
                }
            }
            Place::FieldAccess { ptr, field } => {
                let base_type = self.check_exp(ptr)?;
                let rendered = place_to_str(place);
                let pointee = match &base_type {
                    Type::Ptr(pointee) => pointee.as_ref(),
                    _ => {
                        return Err(type_error(format!(
                            "<{}> is not a struct pointer type in field access '{}'",
                            base_type.display(),
                            rendered
                        )));
                    }
                };
                let struct_name = match pointee {
                    Type::Struct(name) => name,
                    _ => {
                        return Err(type_error(format!(
                            "pointer type <{}> does not point to a struct in field access '{}'",
                            base_type.display(),
                            rendered
                        )));
                    }
                };
                let fields = self.delta.get(struct_name).ok_or_else(|| {
                    type_error(format!(
                        "non-existent struct type {} in field access '{}'",
                        struct_name, rendered
                    ))
                })?;
                fields.get(field).cloned().ok_or_else(|| {
                    type_error(format!(
                        "non-existent field {}::{} in field access '{}'",
                        struct_name, field, rendered
                    ))
                })
            }
        }
    }

    fn check_exp(&self, exp: &Exp) -> Result<Type, TypeError> {
        match exp {
            Exp::Val(place) => self.check_place(place),
            Exp::Num(n) => {
                if *n >= 0 {
                    Ok(Type::Int)
                } else {
                    Err(type_error(format!("negative number {} is not allowed", n)))
                }
            }
            Exp::Nil => Ok(Type::Nil),
            Exp::Select { guard, tt, ff } => {
                let guard_type = self.check_exp(guard)?;
                if !eq(&guard_type, &Type::Int) {
                    return Err(type_error(format!(
                        "non-int type {} for select guard '{}'",
                        guard_type.display(),
                        exp_to_str(guard)
                    )));
                }
                let tt_type = self.check_exp(tt)?;
                let ff_type = self.check_exp(ff)?;
                if !eq(&tt_type, &ff_type) {
                    return Err(type_error(format!(
                        "incompatible types {} vs {} in select branches '{}' vs '{}'",
                        tt_type.display(),
                        ff_type.display(),
                        exp_to_str(tt),
                        exp_to_str(ff)
                    )));
                }
                Ok(pick_nonnil(tt_type, ff_type))
            }
            Exp::UnOp(_, operand) => {
                let operand_type = self.check_exp(operand)?;
                if !eq(&operand_type, &Type::Int) {
                    return Err(type_error(format!(
                        "non-int operand type {} in unary op '{}'",
                        operand_type.display(),
                        exp_to_str(exp)
                    )));
                }
                Ok(Type::Int)
            }
            Exp::BinOp { op, left, right } => {
                let left_type = self.check_exp(left)?;
                let right_type = self.check_exp(right)?;
                if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
                    if !eq(&left_type, &right_type) {
                        return Err(type_error(format!(
                            "incompatible types {} vs {} in binary op '{}'",
                            left_type.display(),
                            right_type.display(),
                            exp_to_str(exp)
                        )));
                    }
                    for side in [&left_type, &right_type] {
                        if matches!(side, Type::Struct(_) | Type::Fn(_, _)) {
                            return Err(type_error(format!(
                                "invalid type {} used in binary op '{}'",
                                side.display(),
                                exp_to_str(exp)
                            )));
                        }
                    }
                    Ok(Type::Int)
                } else {
                    // Everything else, and/or included, is int × int → int.
                    if !eq(&left_type, &Type::Int) {
                        return Err(type_error(format!(
                            "non-int type {} for left operand of binary op '{}'",
                            left_type.display(),
                            exp_to_str(exp)
                        )));
                    }
                    if !eq(&right_type, &Type::Int) {
                        return Err(type_error(format!(
                            "right operand of binary op '{}' has type {}, should be int",
                            exp_to_str(exp),
                            right_type.display()
                        )));
                    }
                    Ok(Type::Int)
                }
            }
            Exp::NewSingle(typ) => {
                if matches!(typ, Type::Nil | Type::Fn(_, _)) {
                    return Err(type_error(format!(
                        "invalid type used for allocation '{}'",
                        exp_to_str(exp)
                    )));
                }
                if let Type::Struct(name) = typ {
                    if !self.delta.contains_key(name) {
                        return Err(type_error(format!(
                            "allocating non-existent struct type '{}'",
                            exp_to_str(exp)
                        )));
                    }
                }
                Ok(Type::Ptr(Box::new(typ.clone())))
            }
            Exp::NewArray { typ, size } => {
                let size_type = self.check_exp(size)?;
                if !eq(&size_type, &Type::Int) {
                    return Err(type_error(format!(
                        "non-int type {} used for second argument of allocation '{}'",
                        size_type.display(),
                        exp_to_str(exp)
                    )));
                }
                if matches!(typ, Type::Nil | Type::Fn(_, _) | Type::Struct(_)) {
                    return Err(type_error(format!(
                        "invalid type used for first argument of allocation '{}'",
                        exp_to_str(exp)
                    )));
                }
                Ok(Type::Array(Box::new(typ.clone())))
            }
            Exp::Call(fun_call) => self.check_call(fun_call),
        }
    }

    fn check_call(&self, fun_call: &FunCall) -> Result<Type, TypeError> {
        // The `main` gate is syntactic and precedes typing the callee:
        // `main` is absent from Γ, so only a direct reference can name it.
        if let Exp::Val(place) = fun_call.callee.as_ref() {
            if matches!(place.as_ref(), Place::Id(name) if name == "main") {
                return Err(type_error("trying to call 'main'"));
            }
        }

        let callee_type = self.check_exp(&fun_call.callee)?;
        let fn_type = match &callee_type {
            Type::Fn(params, ret) => Some((params, ret)),
            Type::Ptr(pointee) => match pointee.as_ref() {
                Type::Fn(params, ret) => Some((params, ret)),
                _ => None,
            },
            _ => None,
        };
        let Some((param_types, return_type)) = fn_type else {
            return Err(type_error(format!(
                "trying to call type {} as function pointer in call '{}'",
                callee_type.display(),
                fun_call_to_str(fun_call)
            )));
        };

        if fun_call.args.len() != param_types.len() {
            return Err(type_error(format!(
                "incorrect number of arguments ({} vs {}) in call '{}'",
                fun_call.args.len(),
                param_types.len(),
                fun_call_to_str(fun_call)
            )));
        }
        for (arg, param_type) in fun_call.args.iter().zip(param_types.iter()) {
            let arg_type = self.check_exp(arg)?;
            if !eq(&arg_type, param_type) {
                return Err(type_error(format!(
                    "incompatible argument type {} vs parameter type {} for argument '{}' in call '{}'",
                    arg_type.display(),
                    param_type.display(),
                    exp_to_str(arg),
                    fun_call_to_str(fun_call)
                )));
            }
        }
        Ok((**return_type).clone())
    }

    /// Checks a statement; the returned flag is true when every path
    /// through the statement executes a `return`.
    fn check_stmt(&self, stmt: &Stmt, rettype: &Type, in_loop: bool) -> Result<bool, TypeError> {
        match stmt {
            Stmt::Stmts(stmts) => {
                let mut definitely_returns = false;
                // Statements after a definite return are still checked;
                // type errors in dead code are real errors.
                for s in stmts {
                    let returns = self.check_stmt(s, rettype, in_loop)?;
                    definitely_returns = definitely_returns || returns;
                }
                Ok(definitely_returns)
            }
            Stmt::Assign { place, exp } => {
                let lhs_type = self.check_place(place)?;
                let rhs_type = self.check_exp(exp)?;
                let rendered = format!("{} = {}", place_to_str(place), exp_to_str(exp));
                if matches!(lhs_type, Type::Struct(_) | Type::Fn(_, _) | Type::Nil) {
                    return Err(type_error(format!(
                        "invalid type {} for left-hand side of assignment '{}'",
                        lhs_type.display(),
                        rendered
                    )));
                }
                if !eq(&lhs_type, &rhs_type) {
                    return Err(type_error(format!(
                        "incompatible types {} vs {} for assignment '{}'",
                        lhs_type.display(),
                        rhs_type.display(),
                        rendered
                    )));
                }
                Ok(false)
            }
            Stmt::Call(fun_call) => {
                self.check_call(fun_call)?;
                Ok(false)
            }
            Stmt::If { guard, tt, ff } => {
                let guard_type = self.check_exp(guard)?;
                if !eq(&guard_type, &Type::Int) {
                    return Err(type_error(format!(
                        "non-int type {} for if guard '{}'",
                        guard_type.display(),
                        exp_to_str(guard)
                    )));
                }
                let tt_returns = self.check_stmt(tt, rettype, in_loop)?;
                let ff_returns = match ff {
                    Some(ff) => self.check_stmt(ff, rettype, in_loop)?,
                    None => false,
                };
                Ok(tt_returns && ff_returns)
            }
            Stmt::While { guard, body } => {
                let guard_type = self.check_exp(guard)?;
                if !eq(&guard_type, &Type::Int) {
                    return Err(type_error(format!(
                        "non-int type {} for while guard '{}'",
                        guard_type.display(),
                        exp_to_str(guard)
                    )));
                }
                // The body might never run, so the loop itself proves
                // nothing about returning.
                self.check_stmt(body, rettype, true)?;
                Ok(false)
            }
            Stmt::Return(Some(exp)) => {
                let exp_type = self.check_exp(exp)?;
                if !eq(&exp_type, rettype) {
                    return Err(type_error(format!(
                        "incompatible return type {} for 'return {}', should be {}",
                        exp_type.display(),
                        exp_to_str(exp),
                        rettype.display()
                    )));
                }
                Ok(true)
            }
            Stmt::Return(None) => {
                if !eq(rettype, &Type::Int) {
                    return Err(type_error(format!(
                        "missing return expression for non-int function type {}",
                        rettype.display()
                    )));
                }
                Err(type_error(
                    "return statement requires an expression in this function",
                ))
            }
            Stmt::Break => {
                if !in_loop {
                    return Err(type_error("break outside loop"));
                }
                Ok(false)
            }
            Stmt::Continue => {
                if !in_loop {
                    return Err(type_error("continue outside loop"));
                }
                Ok(false)
            }
        }
    }
}
