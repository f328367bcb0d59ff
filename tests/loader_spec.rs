/// Spec tests for the tree-document loader.
///
/// Malformed documents must fail here, on the structural channel, before
/// the type checker ever runs; the sugar forms (bare strings, implicit
/// Val and Stmts wrappers) must load to the expected trees.
use serde_json::json;

use cflat::ast::{Exp, Place, Stmt};
use cflat::loader::{load_exp, load_program, load_stmt, load_type};
use cflat::types::Type;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[test]
fn simple_types_load_from_bare_strings() {
    assert_eq!(load_type(&json!("Int")).unwrap(), Type::Int);
    assert_eq!(load_type(&json!("Nil")).unwrap(), Type::Nil);
    assert!(load_type(&json!("Bool")).is_err());
}

#[test]
fn simple_types_load_from_kind_objects() {
    assert_eq!(load_type(&json!({"kind": "Int"})).unwrap(), Type::Int);
    assert_eq!(load_type(&json!({"kind": "Nil"})).unwrap(), Type::Nil);
    assert!(load_type(&json!({"kind": "Float"})).is_err());
}

#[test]
fn compound_types_load() {
    assert_eq!(
        load_type(&json!({"Struct": "S"})).unwrap(),
        Type::Struct("S".to_string())
    );
    assert_eq!(
        load_type(&json!({"Ptr": {"Array": "Int"}})).unwrap(),
        Type::Ptr(Box::new(Type::Array(Box::new(Type::Int))))
    );
    assert_eq!(
        load_type(&json!({"Fn": [["Int", {"Ptr": "Int"}], "Int"]})).unwrap(),
        Type::Fn(
            vec![Type::Int, Type::Ptr(Box::new(Type::Int))],
            Box::new(Type::Int)
        )
    );
}

#[test]
fn malformed_fn_types_are_rejected() {
    assert!(load_type(&json!({"Fn": ["Int", "Int"]})).is_err());
    assert!(load_type(&json!({"Fn": [["Int"]]})).is_err());
    assert!(load_type(&json!({"Fn": "Int"})).is_err());
}

// ---------------------------------------------------------------------------
// Expressions and places
// ---------------------------------------------------------------------------

#[test]
fn place_tags_in_expression_position_become_val() {
    let exp = load_exp(&json!({"Id": "x"})).unwrap();
    assert_eq!(exp, Exp::Val(Box::new(Place::Id("x".to_string()))));

    let exp = load_exp(&json!({"Deref": {"Id": "p"}})).unwrap();
    assert_eq!(
        exp,
        Exp::Val(Box::new(Place::Deref(Box::new(Exp::Val(Box::new(
            Place::Id("p".to_string())
        ))))))
    );
}

#[test]
fn explicit_val_wrapping_is_accepted() {
    assert_eq!(
        load_exp(&json!({"Val": {"Id": "x"}})).unwrap(),
        load_exp(&json!({"Id": "x"})).unwrap()
    );
}

#[test]
fn nil_expression_spellings() {
    assert_eq!(load_exp(&json!("Nil")).unwrap(), Exp::Nil);
    assert_eq!(load_exp(&json!({"Nil": null})).unwrap(), Exp::Nil);
}

#[test]
fn negative_numbers_load_unchecked() {
    // The loader takes any integer; rejecting negatives is a typing rule.
    assert_eq!(load_exp(&json!({"Num": -5})).unwrap(), Exp::Num(-5));
}

#[test]
fn num_must_be_an_integer() {
    assert!(load_exp(&json!({"Num": 1.5})).is_err());
    assert!(load_exp(&json!({"Num": "7"})).is_err());
}

#[test]
fn unknown_expression_tags_are_rejected() {
    assert!(load_exp(&json!({"Bogus": 1})).is_err());
    assert!(load_exp(&json!("Break")).is_err());
    assert!(load_exp(&json!(42)).is_err());
}

#[test]
fn unknown_operators_are_rejected() {
    assert!(load_exp(&json!({"UnOp": ["Plus", {"Num": 1}]})).is_err());
    assert!(
        load_exp(&json!({"BinOp": {"op": "Xor", "left": {"Num": 1}, "right": {"Num": 2}}}))
            .is_err()
    );
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[test]
fn bare_string_statements_load() {
    assert_eq!(load_stmt(&json!("Break")).unwrap(), Stmt::Break);
    assert_eq!(load_stmt(&json!("Continue")).unwrap(), Stmt::Continue);
    assert!(load_stmt(&json!("Halt")).is_err());
}

#[test]
fn statement_arrays_become_sequences() {
    let stmt = load_stmt(&json!(["Break", {"Return": null}])).unwrap();
    assert_eq!(stmt, Stmt::Stmts(vec![Stmt::Break, Stmt::Return(None)]));

    let explicit = load_stmt(&json!({"Stmts": ["Break"]})).unwrap();
    assert_eq!(explicit, Stmt::Stmts(vec![Stmt::Break]));
}

#[test]
fn if_else_branch_forms() {
    let absent = load_stmt(&json!({"If": {"guard": {"Num": 1}, "tt": ["Break"]}})).unwrap();
    let null = load_stmt(&json!({"If": {"guard": {"Num": 1}, "tt": ["Break"], "ff": null}}))
        .unwrap();
    let empty = load_stmt(&json!({"If": {"guard": {"Num": 1}, "tt": ["Break"], "ff": []}}))
        .unwrap();
    for stmt in [&absent, &null, &empty] {
        match stmt {
            Stmt::If { ff, .. } => assert!(ff.is_none()),
            other => panic!("expected If, got {:?}", other),
        }
    }

    let present =
        load_stmt(&json!({"If": {"guard": {"Num": 1}, "tt": ["Break"], "ff": ["Continue"]}}))
            .unwrap();
    match present {
        Stmt::If { ff, .. } => assert!(ff.is_some()),
        other => panic!("expected If, got {:?}", other),
    }
}

#[test]
fn return_forms() {
    assert_eq!(load_stmt(&json!({"Return": null})).unwrap(), Stmt::Return(None));
    assert_eq!(
        load_stmt(&json!({"Return": {"Num": 0}})).unwrap(),
        Stmt::Return(Some(Exp::Num(0)))
    );
}

#[test]
fn while_requires_a_guard_body_pair() {
    assert!(load_stmt(&json!({"While": [{"Num": 1}, ["Break"]]})).is_ok());
    assert!(load_stmt(&json!({"While": {"guard": {"Num": 1}}})).is_err());
    assert!(load_stmt(&json!({"While": [{"Num": 1}]})).is_err());
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[test]
fn program_requires_all_three_sections() {
    assert!(load_program(&json!({"structs": [], "externs": []})).is_err());
    assert!(load_program(&json!({"structs": [], "functions": []})).is_err());
    assert!(load_program(&json!([])).is_err());
}

#[test]
fn extern_type_must_be_a_function_type() {
    let doc = json!({
        "structs": [],
        "externs": [{"name": "f", "typ": "Int"}],
        "functions": [],
    });
    assert!(load_program(&doc).is_err());
}

#[test]
fn extern_signature_is_split_into_params_and_return() {
    let doc = json!({
        "structs": [],
        "externs": [{"name": "f", "typ": {"Fn": [["Int"], {"Ptr": "Int"}]}}],
        "functions": [],
    });
    let program = load_program(&doc).unwrap();
    assert_eq!(program.externs[0].param_types, vec![Type::Int]);
    assert_eq!(program.externs[0].rettype, Type::Ptr(Box::new(Type::Int)));
}

#[test]
fn function_statement_list_becomes_one_body() {
    let doc = json!({
        "structs": [],
        "externs": [],
        "functions": [{
            "name": "main",
            "prms": [],
            "rettyp": "Int",
            "locals": [],
            "stmts": [{"Return": {"Num": 0}}],
        }],
    });
    let program = load_program(&doc).unwrap();
    assert_eq!(
        program.functions[0].body,
        Stmt::Stmts(vec![Stmt::Return(Some(Exp::Num(0)))])
    );
}

#[test]
fn function_stmts_must_be_an_array() {
    let doc = json!({
        "structs": [],
        "externs": [],
        "functions": [{
            "name": "main",
            "prms": [],
            "rettyp": "Int",
            "locals": [],
            "stmts": {"Return": {"Num": 0}},
        }],
    });
    assert!(load_program(&doc).is_err());
}

#[test]
fn structurally_invalid_documents_never_reach_the_checker() {
    // A well-formed document with a type error loads fine; the verdict
    // belongs to the checker. A malformed one fails here instead.
    let type_error_doc = json!({
        "structs": [],
        "externs": [],
        "functions": [{
            "name": "main",
            "prms": [],
            "rettyp": "Int",
            "locals": [],
            "stmts": [{"Return": "Nil"}],
        }],
    });
    assert!(load_program(&type_error_doc).is_ok());

    let malformed_doc = json!({
        "structs": [],
        "externs": [],
        "functions": [{"name": "main"}],
    });
    assert!(load_program(&malformed_doc).is_err());
}
