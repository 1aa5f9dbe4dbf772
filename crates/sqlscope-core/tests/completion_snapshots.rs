use insta::assert_json_snapshot;
use sqlscope_core::{completion_items, CompletionRequest, Dialect, Schema, SchemaTable};

fn request_at_cursor(sql: &str, schema: Schema) -> CompletionRequest {
    let marker = sql.find('|').expect("sql must contain cursor marker '|'");
    let cursor_offset = sql[..marker].chars().count();
    let clean_sql = sql.replace('|', "");
    CompletionRequest::new(clean_sql, cursor_offset, schema).with_dialect(Dialect::Duckdb)
}

fn sample_schema() -> Schema {
    Schema {
        tables: vec![
            SchemaTable::new("users", ["id", "name", "email"]),
            SchemaTable::new("documents", ["id", "name", "content"]),
        ],
    }
}

#[test]
fn snap_from_clause_tables() {
    let request = request_at_cursor("SELECT * FROM |", sample_schema());
    let result = completion_items(&request);
    assert_json_snapshot!(result);
}

#[test]
fn snap_partial_table_name() {
    let request = request_at_cursor("SELECT * FROM us|", sample_schema());
    let result = completion_items(&request);
    assert_json_snapshot!(result);
}

#[test]
fn snap_join_on_condition() {
    let request = request_at_cursor(
        "SELECT * FROM users u JOIN documents d ON |",
        sample_schema(),
    );
    let result = completion_items(&request);
    assert_json_snapshot!(result);
}

#[test]
fn snap_qualified_alias() {
    let request = request_at_cursor(
        "SELECT u.| FROM users u JOIN documents d ON u.id = d.id",
        sample_schema(),
    );
    let result = completion_items(&request);
    assert_json_snapshot!(result);
}
