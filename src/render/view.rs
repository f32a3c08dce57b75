//! CREATE VIEW / CREATE MATERIALIZED VIEW assembly around `pg_get_viewdef`
//! output.

use super::quote_ident;

pub fn render_create_view(schema: &str, name: &str, query: &str) -> String {
    format!(
        "CREATE OR REPLACE VIEW {}.{} AS\n{}",
        quote_ident(schema),
        quote_ident(name),
        body(query)
    )
}

// Materialized views have no OR REPLACE form.
pub fn render_create_materialized_view(schema: &str, name: &str, query: &str) -> String {
    format!(
        "CREATE MATERIALIZED VIEW {}.{} AS\n{}",
        quote_ident(schema),
        quote_ident(name),
        body(query)
    )
}

// pg_get_viewdef returns the bare SELECT with a trailing terminator.
fn body(query: &str) -> String {
    query.trim().trim_end_matches(';').trim_end().to_string()
}
