/// Cflat static type representation.
///
/// Six type shapes and the compatibility relation `eq` used by every
/// typing rule. `eq` treats `nil` as compatible with any pointer or
/// array type, which makes the relation non-transitive on purpose:
/// `ptr(int)` and `ptr(struct(S))` are both eq to `nil` without being
/// eq to each other. Callers must only ever ask single pairwise
/// questions.

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Nil,
    Struct(String),
    Array(Box<Type>),
    Ptr(Box<Type>),
    Fn(Vec<Type>, Box<Type>),
}

/// The type compatibility relation eq(τ₁, τ₂).
///
/// Reflexive and symmetric. Two types are eq iff they are structurally
/// the same type, or one is nil and the other is a pointer or array.
pub fn eq(t1: &Type, t2: &Type) -> bool {
    match (t1, t2) {
        (Type::Nil, Type::Nil | Type::Ptr(_) | Type::Array(_)) => true,
        (Type::Ptr(_) | Type::Array(_), Type::Nil) => true,
        (Type::Nil, _) | (_, Type::Nil) => false,
        (Type::Int, Type::Int) => true,
        (Type::Struct(a), Type::Struct(b)) => a == b,
        (Type::Array(a), Type::Array(b)) => eq(a, b),
        (Type::Ptr(a), Type::Ptr(b)) => eq(a, b),
        (Type::Fn(ps, r), Type::Fn(qs, s)) => {
            ps.len() == qs.len() && ps.iter().zip(qs.iter()).all(|(a, b)| eq(a, b)) && eq(r, s)
        }
        _ => false,
    }
}

/// Returns `t1` unless it is nil, in which case `t2` (which may also be
/// nil). Gives a select expression the more informative branch type.
pub fn pick_nonnil(t1: Type, t2: Type) -> Type {
    if matches!(t1, Type::Nil) {
        t2
    } else {
        t1
    }
}

impl Type {
    /// Canonical printed form used in diagnostics.
    pub fn display(&self) -> String {
        match self {
            Type::Int => "int".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Struct(name) => format!("struct({})", name),
            Type::Array(elem) => format!("array({})", elem.display()),
            Type::Ptr(pointee) => format!("ptr({})", pointee.display()),
            Type::Fn(params, ret) => {
                let ps: Vec<String> = params.iter().map(|p| p.display()).collect();
                format!("({}) -> {}", ps.join(", "), ret.display())
            }
        }
    }
}
