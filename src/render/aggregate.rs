//! CREATE AGGREGATE assembly.
//!
//! `pg_get_functiondef` refuses aggregates, so their statements are
//! reconstructed from the component parts recorded in `pg_aggregate`.

use super::{escape_string, quote_ident};
use crate::catalog::is_system_schema;

/// Component parts of one aggregate, as read from `pg_aggregate` joined to
/// `pg_proc` and `pg_namespace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateParts {
    /// Formatted identity argument types (e.g. "integer, text").
    pub arguments: String,
    /// State transition function (SFUNC).
    pub state_func_schema: String,
    pub state_func: String,
    /// State type (STYPE), already rendered by `format_type`.
    pub state_type: String,
    /// Final function (FINALFUNC), optional.
    pub final_func_schema: Option<String>,
    pub final_func: Option<String>,
    /// Combine function for parallel aggregation (COMBINEFUNC), optional.
    pub combine_func_schema: Option<String>,
    pub combine_func: Option<String>,
    /// Initial state value (INITCOND), optional.
    pub initial_value: Option<String>,
}

/// Build a CREATE AGGREGATE statement from the component parts.
pub fn render_create_aggregate(schema: &str, name: &str, parts: &AggregateParts) -> String {
    let mut options = Vec::new();

    options.push(format!(
        "SFUNC = {}",
        qualified_func(&parts.state_func_schema, &parts.state_func)
    ));
    options.push(format!("STYPE = {}", parts.state_type));

    if let (Some(final_func), Some(final_func_schema)) = (&parts.final_func, &parts.final_func_schema) {
        options.push(format!(
            "FINALFUNC = {}",
            qualified_func(final_func_schema, final_func)
        ));
    }

    if let (Some(combine_func), Some(combine_func_schema)) =
        (&parts.combine_func, &parts.combine_func_schema)
    {
        options.push(format!(
            "COMBINEFUNC = {}",
            qualified_func(combine_func_schema, combine_func)
        ));
    }

    if let Some(initial_value) = &parts.initial_value {
        options.push(format!("INITCOND = {}", escape_string(initial_value)));
    }

    format!(
        "CREATE AGGREGATE {}.{}({}) (\n    {}\n)",
        quote_ident(schema),
        quote_ident(name),
        parts.arguments,
        options.join(",\n    ")
    )
}

// Built-in support functions stay unqualified so the statement reads the way
// it was written.
fn qualified_func(schema: &str, name: &str) -> String {
    if is_system_schema(schema) {
        name.to_string()
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_parts() -> AggregateParts {
        AggregateParts {
            arguments: "numeric".to_string(),
            state_func_schema: "pg_catalog".to_string(),
            state_func: "numeric_add".to_string(),
            state_type: "numeric".to_string(),
            final_func_schema: None,
            final_func: None,
            combine_func_schema: None,
            combine_func: None,
            initial_value: None,
        }
    }

    #[test]
    fn test_render_minimal_aggregate() {
        let sql = render_create_aggregate("app", "my_sum", &minimal_parts());
        assert_eq!(
            sql,
            "CREATE AGGREGATE \"app\".\"my_sum\"(numeric) (\n    SFUNC = numeric_add,\n    STYPE = numeric\n)"
        );
    }

    #[test]
    fn test_render_aggregate_with_all_options() {
        let parts = AggregateParts {
            arguments: "numeric".to_string(),
            state_func_schema: "app".to_string(),
            state_func: "median_transition".to_string(),
            state_type: "numeric[]".to_string(),
            final_func_schema: Some("app".to_string()),
            final_func: Some("median_final".to_string()),
            combine_func_schema: Some("app".to_string()),
            combine_func: Some("median_combine".to_string()),
            initial_value: Some("{}".to_string()),
        };

        let sql = render_create_aggregate("app", "median", &parts);
        assert_eq!(
            sql,
            "CREATE AGGREGATE \"app\".\"median\"(numeric) (\n    SFUNC = \"app\".\"median_transition\",\n    STYPE = numeric[],\n    FINALFUNC = \"app\".\"median_final\",\n    COMBINEFUNC = \"app\".\"median_combine\",\n    INITCOND = '{}'\n)"
        );
    }

    #[test]
    fn test_initcond_is_quoted() {
        let mut parts = minimal_parts();
        parts.initial_value = Some("it's".to_string());

        let sql = render_create_aggregate("app", "my_sum", &parts);
        assert!(sql.contains("INITCOND = 'it''s'"));
    }
}
