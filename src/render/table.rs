//! CREATE TABLE assembly from catalog column and constraint rows.
//!
//! PostgreSQL has no catalog function that reconstructs a whole CREATE TABLE
//! statement, so the statement is reassembled client-side from `pg_attribute`
//! and `pg_constraint` rows.

use super::quote_ident;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub generated: Option<String>,
}

impl ColumnSpec {
    /// Build a column from raw catalog fields. `generated_kind` is
    /// `pg_attribute.attgenerated`: `s` for stored generated columns, empty
    /// otherwise. `expression` then carries either the generation expression
    /// or the column default.
    pub fn from_catalog(
        name: &str,
        data_type: &str,
        not_null: bool,
        generated_kind: &str,
        expression: Option<String>,
    ) -> Self {
        let (generated, default) = if generated_kind == "s" {
            (expression, None)
        } else {
            (None, expression)
        };

        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            not_null,
            default,
            generated,
        }
    }
}

/// A table constraint as reported by `pg_get_constraintdef`, e.g.
/// `PRIMARY KEY (id)` or `CHECK ((price > 0))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSpec {
    pub name: String,
    pub definition: String,
}

/// Render a complete CREATE TABLE statement (without trailing terminator).
pub fn render_create_table(
    schema: &str,
    name: &str,
    columns: &[ColumnSpec],
    constraints: &[ConstraintSpec],
) -> String {
    let mut sql = String::new();
    sql.push_str("CREATE TABLE ");
    sql.push_str(&format!("{}.{}", quote_ident(schema), quote_ident(name)));
    sql.push_str(" (\n");

    let mut entries = Vec::new();

    for column in columns {
        let mut col_def = format!("    {} {}", quote_ident(&column.name), column.data_type);

        // Generation expression must come before default and not null
        if let Some(ref generated) = column.generated {
            col_def.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", generated));
        }

        if let Some(ref default) = column.default {
            col_def.push_str(&format!(" DEFAULT {}", default));
        }

        if column.not_null {
            col_def.push_str(" NOT NULL");
        }

        entries.push(col_def);
    }

    for constraint in constraints {
        entries.push(format!(
            "    CONSTRAINT {} {}",
            quote_ident(&constraint.name),
            constraint.definition
        ));
    }

    sql.push_str(&entries.join(",\n"));
    sql.push_str("\n)");

    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str, not_null: bool) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            data_type: data_type.to_string(),
            not_null,
            default: None,
            generated: None,
        }
    }

    #[test]
    fn test_render_basic_table() {
        let columns = vec![column("id", "integer", true), column("email", "text", true)];

        let sql = render_create_table("public", "users", &columns, &[]);
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"users\" (\n    \"id\" integer NOT NULL,\n    \"email\" text NOT NULL\n)"
        );
    }

    #[test]
    fn test_render_table_with_primary_key() {
        let columns = vec![column("id", "integer", true)];
        let constraints = vec![ConstraintSpec {
            name: "users_pkey".to_string(),
            definition: "PRIMARY KEY (id)".to_string(),
        }];

        let sql = render_create_table("public", "users", &columns, &constraints);
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"users\" (\n    \"id\" integer NOT NULL,\n    CONSTRAINT \"users_pkey\" PRIMARY KEY (id)\n)"
        );
    }

    #[test]
    fn test_render_table_with_defaults_and_nullability() {
        let columns = vec![
            ColumnSpec {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                not_null: true,
                default: Some("nextval('posts_id_seq'::regclass)".to_string()),
                generated: None,
            },
            column("content", "text", false),
            ColumnSpec {
                name: "created_at".to_string(),
                data_type: "timestamp with time zone".to_string(),
                not_null: true,
                default: Some("CURRENT_TIMESTAMP".to_string()),
                generated: None,
            },
        ];

        let sql = render_create_table("public", "posts", &columns, &[]);
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"posts\" (\n    \"id\" integer DEFAULT nextval('posts_id_seq'::regclass) NOT NULL,\n    \"content\" text,\n    \"created_at\" timestamp with time zone DEFAULT CURRENT_TIMESTAMP NOT NULL\n)"
        );
    }

    #[test]
    fn test_render_table_with_generated_column() {
        let columns = vec![
            column("first_name", "text", true),
            column("last_name", "text", true),
            ColumnSpec {
                name: "full_name".to_string(),
                data_type: "text".to_string(),
                not_null: false,
                default: None,
                generated: Some("first_name || ' ' || last_name".to_string()),
            },
        ];

        let sql = render_create_table("public", "users", &columns, &[]);
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"users\" (\n    \"first_name\" text NOT NULL,\n    \"last_name\" text NOT NULL,\n    \"full_name\" text GENERATED ALWAYS AS (first_name || ' ' || last_name) STORED\n)"
        );
    }

    #[test]
    fn test_from_catalog_routes_expression() {
        let generated = ColumnSpec::from_catalog("total", "numeric", false, "s", Some("a + b".to_string()));
        assert_eq!(generated.generated.as_deref(), Some("a + b"));
        assert_eq!(generated.default, None);

        let defaulted = ColumnSpec::from_catalog("count", "integer", true, "", Some("0".to_string()));
        assert_eq!(defaulted.default.as_deref(), Some("0"));
        assert_eq!(defaulted.generated, None);
    }
}
