/// Tree-document loader: serde_json values → AST.
///
/// The input is a tagged tree: each node is an object whose first key
/// names the variant, with a handful of bare-string shorthands ("Nil",
/// "Break", "Continue") and two implicit wrappers (a place tag in
/// expression position becomes `Val`, a statement array becomes
/// `Stmts`). Everything that goes wrong here is a structural error,
/// reported on a separate channel from type errors.
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ast::{
    BinaryOp, Decl, Exp, Extern, FunCall, FunctionDef, Place, Program, Stmt, StructDef, UnaryOp,
};
use crate::types::Type;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed {kind} node: {detail}")]
    Malformed { kind: &'static str, detail: String },
    #[error("unknown {kind} tag '{tag}'")]
    UnknownTag { kind: &'static str, tag: String },
}

fn malformed(kind: &'static str, detail: impl Into<String>) -> LoadError {
    LoadError::Malformed {
        kind,
        detail: detail.into(),
    }
}

// ---------------------------------------------------------------------------
// Destructuring helpers
// ---------------------------------------------------------------------------

fn expect_object<'a>(
    value: &'a Value,
    kind: &'static str,
) -> Result<&'a Map<String, Value>, LoadError> {
    value
        .as_object()
        .ok_or_else(|| malformed(kind, "expected an object"))
}

/// First key of a non-empty object; the key names the variant.
fn tagged<'a>(value: &'a Value, kind: &'static str) -> Result<(&'a str, &'a Value), LoadError> {
    let obj = expect_object(value, kind)?;
    obj.iter()
        .next()
        .map(|(key, payload)| (key.as_str(), payload))
        .ok_or_else(|| malformed(kind, "expected a non-empty object"))
}

fn get_required<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    kind: &'static str,
) -> Result<&'a Value, LoadError> {
    obj.get(key)
        .ok_or_else(|| malformed(kind, format!("missing required field '{}'", key)))
}

fn expect_array<'a>(value: &'a Value, kind: &'static str) -> Result<&'a Vec<Value>, LoadError> {
    value
        .as_array()
        .ok_or_else(|| malformed(kind, "expected an array"))
}

fn expect_pair<'a>(
    value: &'a Value,
    kind: &'static str,
) -> Result<(&'a Value, &'a Value), LoadError> {
    let arr = expect_array(value, kind)?;
    if arr.len() != 2 {
        return Err(malformed(kind, "expected a 2-element array"));
    }
    Ok((&arr[0], &arr[1]))
}

fn expect_string<'a>(value: &'a Value, kind: &'static str) -> Result<&'a str, LoadError> {
    value
        .as_str()
        .ok_or_else(|| malformed(kind, "expected a string"))
}

// ---------------------------------------------------------------------------
// Node builders
// ---------------------------------------------------------------------------

pub fn load_type(value: &Value) -> Result<Type, LoadError> {
    if let Some(name) = value.as_str() {
        return match name {
            "Int" => Ok(Type::Int),
            "Nil" => Ok(Type::Nil),
            other => Err(LoadError::UnknownTag {
                kind: "type",
                tag: other.to_string(),
            }),
        };
    }

    let obj = expect_object(value, "type")?;
    if let Some(name) = obj.get("Struct") {
        return Ok(Type::Struct(expect_string(name, "Struct type")?.to_string()));
    }
    if let Some(inner) = obj.get("Ptr") {
        return Ok(Type::Ptr(Box::new(load_type(inner)?)));
    }
    if let Some(inner) = obj.get("Array") {
        return Ok(Type::Array(Box::new(load_type(inner)?)));
    }
    if let Some(signature) = obj.get("Fn") {
        let (params, ret) = expect_pair(signature, "Fn type")?;
        let params = expect_array(params, "Fn type parameters")?
            .iter()
            .map(load_type)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Type::Fn(params, Box::new(load_type(ret)?)));
    }
    if let Some(kind) = obj.get("kind") {
        return match expect_string(kind, "type kind")? {
            "Int" => Ok(Type::Int),
            "Nil" => Ok(Type::Nil),
            other => Err(LoadError::UnknownTag {
                kind: "type",
                tag: other.to_string(),
            }),
        };
    }
    Err(malformed("type", "no recognised type tag"))
}

pub fn load_place(value: &Value) -> Result<Place, LoadError> {
    let (tag, payload) = tagged(value, "place")?;
    match tag {
        "Id" => Ok(Place::Id(expect_string(payload, "Id")?.to_string())),
        "Deref" => Ok(Place::Deref(Box::new(load_exp(payload)?))),
        "ArrayAccess" => {
            let obj = expect_object(payload, "ArrayAccess")?;
            Ok(Place::ArrayAccess {
                array: Box::new(load_exp(get_required(obj, "array", "ArrayAccess")?)?),
                idx: Box::new(load_exp(get_required(obj, "idx", "ArrayAccess")?)?),
            })
        }
        "FieldAccess" => {
            let obj = expect_object(payload, "FieldAccess")?;
            Ok(Place::FieldAccess {
                ptr: Box::new(load_exp(get_required(obj, "ptr", "FieldAccess")?)?),
                field: expect_string(get_required(obj, "field", "FieldAccess")?, "FieldAccess")?
                    .to_string(),
            })
        }
        other => Err(LoadError::UnknownTag {
            kind: "place",
            tag: other.to_string(),
        }),
    }
}

pub fn load_exp(value: &Value) -> Result<Exp, LoadError> {
    if value.as_str() == Some("Nil") {
        return Ok(Exp::Nil);
    }

    let (tag, payload) = tagged(value, "expression")?;
    match tag {
        // A bare place tag in expression position is implicitly Val.
        "Id" | "Deref" | "ArrayAccess" | "FieldAccess" => {
            Ok(Exp::Val(Box::new(load_place(value)?)))
        }
        "Num" => {
            let n = payload
                .as_i64()
                .ok_or_else(|| malformed("Num", "expected an integer"))?;
            Ok(Exp::Num(n))
        }
        "Nil" => Ok(Exp::Nil),
        "Select" => {
            let obj = expect_object(payload, "Select")?;
            Ok(Exp::Select {
                guard: Box::new(load_exp(get_required(obj, "guard", "Select")?)?),
                tt: Box::new(load_exp(get_required(obj, "tt", "Select")?)?),
                ff: Box::new(load_exp(get_required(obj, "ff", "Select")?)?),
            })
        }
        "UnOp" => {
            let (op, operand) = expect_pair(payload, "UnOp")?;
            let op = match expect_string(op, "UnOp operator")? {
                "Neg" => UnaryOp::Neg,
                "Not" => UnaryOp::Not,
                other => {
                    return Err(LoadError::UnknownTag {
                        kind: "unary operator",
                        tag: other.to_string(),
                    })
                }
            };
            Ok(Exp::UnOp(op, Box::new(load_exp(operand)?)))
        }
        "BinOp" => {
            let obj = expect_object(payload, "BinOp")?;
            let op = match expect_string(get_required(obj, "op", "BinOp")?, "BinOp operator")? {
                "Add" => BinaryOp::Add,
                "Sub" => BinaryOp::Sub,
                "Mul" => BinaryOp::Mul,
                "Div" => BinaryOp::Div,
                "And" => BinaryOp::And,
                "Or" => BinaryOp::Or,
                "Eq" => BinaryOp::Eq,
                "NotEq" => BinaryOp::NotEq,
                "Lt" => BinaryOp::Lt,
                "Lte" => BinaryOp::Lte,
                "Gt" => BinaryOp::Gt,
                "Gte" => BinaryOp::Gte,
                other => {
                    return Err(LoadError::UnknownTag {
                        kind: "binary operator",
                        tag: other.to_string(),
                    })
                }
            };
            Ok(Exp::BinOp {
                op,
                left: Box::new(load_exp(get_required(obj, "left", "BinOp")?)?),
                right: Box::new(load_exp(get_required(obj, "right", "BinOp")?)?),
            })
        }
        "NewSingle" => Ok(Exp::NewSingle(load_type(payload)?)),
        "NewArray" => {
            let (typ, size) = expect_pair(payload, "NewArray")?;
            Ok(Exp::NewArray {
                typ: load_type(typ)?,
                size: Box::new(load_exp(size)?),
            })
        }
        "Call" => Ok(Exp::Call(Box::new(load_fun_call(payload)?))),
        "Val" => Ok(Exp::Val(Box::new(load_place(payload)?))),
        other => Err(LoadError::UnknownTag {
            kind: "expression",
            tag: other.to_string(),
        }),
    }
}

pub fn load_fun_call(value: &Value) -> Result<FunCall, LoadError> {
    let obj = expect_object(value, "call")?;
    let args = expect_array(get_required(obj, "args", "call")?, "call arguments")?
        .iter()
        .map(load_exp)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FunCall {
        callee: Box::new(load_exp(get_required(obj, "callee", "call")?)?),
        args,
    })
}

pub fn load_stmt(value: &Value) -> Result<Stmt, LoadError> {
    // A bare array is an implicit statement sequence.
    if let Some(items) = value.as_array() {
        let stmts = items.iter().map(load_stmt).collect::<Result<Vec<_>, _>>()?;
        return Ok(Stmt::Stmts(stmts));
    }

    if let Some(tag) = value.as_str() {
        return match tag {
            "Break" => Ok(Stmt::Break),
            "Continue" => Ok(Stmt::Continue),
            other => Err(LoadError::UnknownTag {
                kind: "statement",
                tag: other.to_string(),
            }),
        };
    }

    let (tag, payload) = tagged(value, "statement")?;
    match tag {
        "Assign" => {
            let (place, exp) = expect_pair(payload, "Assign")?;
            Ok(Stmt::Assign {
                place: load_place(place)?,
                exp: load_exp(exp)?,
            })
        }
        "Call" => Ok(Stmt::Call(load_fun_call(payload)?)),
        "If" => {
            let obj = expect_object(payload, "If")?;
            // Absent, null, or an empty array all mean "no else branch".
            let ff = match obj.get("ff") {
                None | Some(Value::Null) => None,
                Some(Value::Array(items)) if items.is_empty() => None,
                Some(other) => Some(Box::new(load_stmt(other)?)),
            };
            Ok(Stmt::If {
                guard: load_exp(get_required(obj, "guard", "If")?)?,
                tt: Box::new(load_stmt(get_required(obj, "tt", "If")?)?),
                ff,
            })
        }
        "While" => {
            let (guard, body) = expect_pair(payload, "While")?;
            Ok(Stmt::While {
                guard: load_exp(guard)?,
                body: Box::new(load_stmt(body)?),
            })
        }
        "Return" => {
            let exp = if payload.is_null() {
                None
            } else {
                Some(load_exp(payload)?)
            };
            Ok(Stmt::Return(exp))
        }
        "Stmts" => {
            let stmts = expect_array(payload, "Stmts")?
                .iter()
                .map(load_stmt)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Stmt::Stmts(stmts))
        }
        other => Err(LoadError::UnknownTag {
            kind: "statement",
            tag: other.to_string(),
        }),
    }
}

pub fn load_decl(value: &Value) -> Result<Decl, LoadError> {
    let obj = expect_object(value, "declaration")?;
    Ok(Decl {
        name: expect_string(get_required(obj, "name", "declaration")?, "declaration")?.to_string(),
        typ: load_type(get_required(obj, "typ", "declaration")?)?,
    })
}

pub fn load_struct_def(value: &Value) -> Result<StructDef, LoadError> {
    let obj = expect_object(value, "struct definition")?;
    let fields = expect_array(
        get_required(obj, "fields", "struct definition")?,
        "struct fields",
    )?
    .iter()
    .map(load_decl)
    .collect::<Result<Vec<_>, _>>()?;
    Ok(StructDef {
        name: expect_string(
            get_required(obj, "name", "struct definition")?,
            "struct definition",
        )?
        .to_string(),
        fields,
    })
}

pub fn load_extern(value: &Value) -> Result<Extern, LoadError> {
    let obj = expect_object(value, "extern declaration")?;
    let name = expect_string(
        get_required(obj, "name", "extern declaration")?,
        "extern declaration",
    )?
    .to_string();
    match load_type(get_required(obj, "typ", "extern declaration")?)? {
        Type::Fn(param_types, rettype) => Ok(Extern {
            name,
            param_types,
            rettype: *rettype,
        }),
        _ => Err(malformed(
            "extern declaration",
            "'typ' must be a function type",
        )),
    }
}

pub fn load_function_def(value: &Value) -> Result<FunctionDef, LoadError> {
    let obj = expect_object(value, "function definition")?;
    let params = expect_array(
        get_required(obj, "prms", "function definition")?,
        "function parameters",
    )?
    .iter()
    .map(load_decl)
    .collect::<Result<Vec<_>, _>>()?;
    let locals = expect_array(
        get_required(obj, "locals", "function definition")?,
        "function locals",
    )?
    .iter()
    .map(load_decl)
    .collect::<Result<Vec<_>, _>>()?;
    // The statement list becomes a single Stmts body.
    let body = expect_array(
        get_required(obj, "stmts", "function definition")?,
        "function body",
    )?
    .iter()
    .map(load_stmt)
    .collect::<Result<Vec<_>, _>>()?;
    Ok(FunctionDef {
        name: expect_string(
            get_required(obj, "name", "function definition")?,
            "function definition",
        )?
        .to_string(),
        params,
        rettype: load_type(get_required(obj, "rettyp", "function definition")?)?,
        locals,
        body: Stmt::Stmts(body),
    })
}

pub fn load_program(value: &Value) -> Result<Program, LoadError> {
    let obj = expect_object(value, "program")?;
    let structs = expect_array(get_required(obj, "structs", "program")?, "program structs")?
        .iter()
        .map(load_struct_def)
        .collect::<Result<Vec<_>, _>>()?;
    let externs = expect_array(get_required(obj, "externs", "program")?, "program externs")?
        .iter()
        .map(load_extern)
        .collect::<Result<Vec<_>, _>>()?;
    let functions = expect_array(
        get_required(obj, "functions", "program")?,
        "program functions",
    )?
    .iter()
    .map(load_function_def)
    .collect::<Result<Vec<_>, _>>()?;
    Ok(Program {
        structs,
        externs,
        functions,
    })
}
