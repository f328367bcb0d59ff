use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// An l-value: a syntactic form denoting a storage location.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Id(String),
    Deref(Box<Exp>),
    ArrayAccess { array: Box<Exp>, idx: Box<Exp> },
    FieldAccess { ptr: Box<Exp>, field: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exp {
    /// A place used in value position. Keeping the wrapper explicit makes
    /// the callee-is-`main` test purely syntactic.
    Val(Box<Place>),
    Num(i64),
    Nil,
    Select {
        guard: Box<Exp>,
        tt: Box<Exp>,
        ff: Box<Exp>,
    },
    UnOp(UnaryOp, Box<Exp>),
    BinOp {
        op: BinaryOp,
        left: Box<Exp>,
        right: Box<Exp>,
    },
    NewSingle(Type),
    NewArray {
        typ: Type,
        size: Box<Exp>,
    },
    Call(Box<FunCall>),
}

/// Shared by `Exp::Call` and `Stmt::Call`; both delegate their typing here.
#[derive(Debug, Clone, PartialEq)]
pub struct FunCall {
    pub callee: Box<Exp>,
    pub args: Vec<Exp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Stmts(Vec<Stmt>),
    Assign {
        place: Place,
        exp: Exp,
    },
    Call(FunCall),
    If {
        guard: Exp,
        tt: Box<Stmt>,
        ff: Option<Box<Stmt>>,
    },
    While {
        guard: Exp,
        body: Box<Stmt>,
    },
    Return(Option<Exp>),
    Break,
    Continue,
}

/// A named, typed declaration (parameter, local, or struct field).
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub typ: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Decl>,
}

/// An externally-provided function known by signature only. Externs are
/// usable as direct function values rather than pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct Extern {
    pub name: String,
    pub param_types: Vec<Type>,
    pub rettype: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Decl>,
    pub rettype: Type,
    pub locals: Vec<Decl>,
    /// Always a `Stmt::Stmts`; the loader wraps the statement list.
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub structs: Vec<StructDef>,
    pub externs: Vec<Extern>,
    pub functions: Vec<FunctionDef>,
}
