//! The query builtin: literal SQL parsing at the execute site, payload
//! pass-through at the fetch site, schema-backed wildcard expansion.

mod common;

use common::key_names;
use deepkeys_lsp::parser::parse_program;
use deepkeys_lsp::resolve::resolve_variable_at;
use deepkeys_lsp::session::{Limits, Session};
use deepkeys_lsp::sql::StaticSchema;
use deepkeys_lsp::types::{ScalarKind, Shape};
use std::collections::HashMap;

fn users_schema() -> StaticSchema {
    let mut tables = HashMap::new();
    tables.insert(
        "users".to_string(),
        vec!["id".to_string(), "name".to_string(), "email".to_string()],
    );
    StaticSchema::new(tables)
}

#[test]
fn fetch_returns_the_columns_of_the_executed_query() {
    let src = concat!(
        "<?php\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->query('SELECT id, name FROM users');\n",
        "$row = $stmt->fetch();\n",
    );
    assert_eq!(key_names(src, "$row"), ["id", "name"]);
}

#[test]
fn query_columns_are_string_typed() {
    let src = concat!(
        "<?php\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->query('SELECT id, name FROM users');\n",
        "$row = $stmt->fetch();\n",
    );
    let program = parse_program(src);
    let schema = StaticSchema::default();
    let session = Session::new(&program, &schema, Limits::interactive());
    let union = resolve_variable_at(&session, "$row", src.len() as u32);
    for entry in union.map_keys() {
        assert!(entry.value.variants().iter().all(|v| matches!(
            v.shape,
            Shape::Scalar {
                kind: ScalarKind::String,
                ..
            }
        )));
    }
}

#[test]
fn prepare_carries_the_payload_like_query() {
    let src = concat!(
        "<?php\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->prepare('SELECT total, label FROM invoices');\n",
        "$row = $stmt->fetch();\n",
    );
    assert_eq!(key_names(src, "$row"), ["total", "label"]);
}

#[test]
fn wildcard_expands_through_the_schema_in_schema_order() {
    let src = concat!(
        "<?php\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->query('SELECT * FROM users');\n",
        "$row = $stmt->fetch();\n",
    );
    let program = parse_program(src);
    let schema = users_schema();
    let session = Session::new(&program, &schema, Limits::interactive());
    let union = resolve_variable_at(&session, "$row", src.len() as u32);
    let keys: Vec<_> = union.map_keys().filter_map(|e| e.key_text()).collect();
    assert_eq!(keys, ["id", "name", "email"]);
}

#[test]
fn malformed_query_strings_degrade_to_an_empty_row() {
    let src = concat!(
        "<?php\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->query('UPDATE users SET active = 1');\n",
        "$row = $stmt->fetch();\n",
    );
    assert!(key_names(src, "$row").is_empty());
}

#[test]
fn query_string_built_in_a_variable_still_resolves() {
    let src = concat!(
        "<?php\n",
        "$sql = 'SELECT id, status FROM jobs';\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->query($sql);\n",
        "$row = $stmt->fetch();\n",
    );
    assert_eq!(key_names(src, "$row"), ["id", "status"]);
}
