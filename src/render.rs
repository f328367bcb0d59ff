/// Source-form rendering of AST nodes for diagnostics.
///
/// Precedence classes, lowest to highest: select (`?:`), binary ops (one
/// flat class), unary prefix, postfix (`.*`, `[..]`, `.field`, call),
/// atoms. The renderer re-inserts parentheses only where the ambient
/// class would otherwise misread the tree; everything else prints flat.
use crate::ast::{BinaryOp, Exp, FunCall, Place, UnaryOp};

pub fn unary_op_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "not ",
    }
}

pub fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Lte => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Gte => ">=",
    }
}

fn is_low_precedence(exp: &Exp) -> bool {
    matches!(exp, Exp::BinOp { .. } | Exp::Select { .. })
}

/// Re-renders a binary operation with any direct `Select` operand
/// parenthesised. Used where a parent (select guard, allocation size,
/// enclosing binary op) would otherwise swallow the `?:` arms.
fn binop_wrapping_selects(op: BinaryOp, left: &Exp, right: &Exp) -> String {
    let mut left_str = exp_to_str(left);
    let mut right_str = exp_to_str(right);
    if matches!(left, Exp::Select { .. }) {
        left_str = format!("({})", left_str);
    }
    if matches!(right, Exp::Select { .. }) {
        right_str = format!("({})", right_str);
    }
    format!("{} {} {}", left_str, binary_op_str(op), right_str)
}

fn has_select_operand(exp: &Exp) -> Option<(BinaryOp, &Exp, &Exp)> {
    if let Exp::BinOp { op, left, right } = exp {
        if matches!(left.as_ref(), Exp::Select { .. })
            || matches!(right.as_ref(), Exp::Select { .. })
        {
            return Some((*op, left.as_ref(), right.as_ref()));
        }
    }
    None
}

/// Renders an array-access index, parenthesising a `Select` sitting on
/// the right of an index-level binary op (`a[i + (c ? x : y)]`).
pub fn index_str(idx: &Exp) -> String {
    if let Exp::BinOp { op, left, right } = idx {
        if matches!(right.as_ref(), Exp::Select { .. }) {
            return format!(
                "{} {} ({})",
                exp_to_str(left),
                binary_op_str(*op),
                exp_to_str(right)
            );
        }
    }
    exp_to_str(idx)
}

pub fn exp_to_str(exp: &Exp) -> String {
    match exp {
        Exp::Val(place) => place_to_str(place),
        Exp::Num(n) => n.to_string(),
        Exp::Nil => "nil".to_string(),
        Exp::Select { guard, tt, ff } => {
            let guard_str = match has_select_operand(guard) {
                Some((op, left, right)) => binop_wrapping_selects(op, left, right),
                None => exp_to_str(guard),
            };
            let mut tt_str = exp_to_str(tt);
            let mut ff_str = exp_to_str(ff);
            if matches!(tt.as_ref(), Exp::Select { .. }) {
                tt_str = format!("({})", tt_str);
            }
            if matches!(ff.as_ref(), Exp::Select { .. }) {
                ff_str = format!("({})", ff_str);
            }
            format!("{} ? {} : {}", guard_str, tt_str, ff_str)
        }
        Exp::UnOp(op, inner) => {
            let inner_str = exp_to_str(inner);
            if is_low_precedence(inner) {
                format!("{}({})", unary_op_str(*op), inner_str)
            } else {
                format!("{}{}", unary_op_str(*op), inner_str)
            }
        }
        Exp::BinOp { op, left, right } => {
            let left_str = exp_to_str(left);
            // A select hidden inside the right operand's own binary op
            // would re-associate on reparse; restore its parentheses.
            let right_str = match has_select_operand(right) {
                Some((rop, rleft, rright)) => binop_wrapping_selects(rop, rleft, rright),
                None => exp_to_str(right),
            };
            format!("{} {} {}", left_str, binary_op_str(*op), right_str)
        }
        Exp::NewSingle(typ) => format!("new {}", typ.display()),
        Exp::NewArray { typ, size } => {
            let size_str = match has_select_operand(size) {
                Some((op, left, right)) => binop_wrapping_selects(op, left, right),
                None => exp_to_str(size),
            };
            format!("[{}; {}]", typ.display(), size_str)
        }
        Exp::Call(fun_call) => fun_call_to_str(fun_call),
    }
}

pub fn place_to_str(place: &Place) -> String {
    match place {
        Place::Id(name) => name.clone(),
        Place::Deref(exp) => {
            // Parenthesise so the `.*` reads as applying to the whole
            // operand: low-precedence forms, allocations, and wrapped
            // array/field accesses. Chained derefs stay bare (`x.*.*`).
            let wrapped_place_suffix = matches!(
                exp.as_ref(),
                Exp::Val(place)
                    if matches!(
                        place.as_ref(),
                        Place::ArrayAccess { .. } | Place::FieldAccess { .. }
                    )
            );
            let exp_str = exp_to_str(exp);
            if is_low_precedence(exp)
                || wrapped_place_suffix
                || matches!(exp.as_ref(), Exp::NewSingle(_) | Exp::NewArray { .. })
            {
                format!("({}).*", exp_str)
            } else {
                format!("{}.*", exp_str)
            }
        }
        Place::ArrayAccess { array, idx } => {
            let mut array_str = exp_to_str(array);
            if matches!(array.as_ref(), Exp::Select { .. }) {
                array_str = format!("({})", array_str);
            }
            format!("{}[{}]", array_str, index_str(idx))
        }
        Place::FieldAccess { ptr, field } => {
            let mut ptr_str = exp_to_str(ptr);
            if matches!(ptr.as_ref(), Exp::Select { .. }) {
                ptr_str = format!("({})", ptr_str);
            }
            format!("{}.{}", ptr_str, field)
        }
    }
}

pub fn fun_call_to_str(fun_call: &FunCall) -> String {
    let mut callee_str = exp_to_str(&fun_call.callee);
    if is_low_precedence(&fun_call.callee) {
        callee_str = format!("({})", callee_str);
    }
    let args: Vec<String> = fun_call.args.iter().map(exp_to_str).collect();
    format!("{}({})", callee_str, args.join(", "))
}
