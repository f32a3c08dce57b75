//! Direct-query catalog backend over a sqlx connection pool.
//!
//! Listings come from `pg_class`/`pg_proc` joined to `pg_namespace`.
//! Definitions come from the documented reconstruction functions where they
//! exist (`pg_get_viewdef`, `pg_get_functiondef`) and are reassembled
//! client-side where they don't (tables, aggregates).

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{Category, ListedObject, SchemaSource};
use crate::render::aggregate::{AggregateParts, render_create_aggregate};
use crate::render::table::{ColumnSpec, ConstraintSpec, render_create_table};
use crate::render::view::{render_create_materialized_view, render_create_view};

pub struct QuerySource {
    pool: PgPool,
}

impl QuerySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_relations(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
        let relkinds = match category {
            Category::Table => "('r', 'p')",
            Category::View => "('v')",
            Category::MaterializedView => "('m')",
            _ => unreachable!("not a relation category"),
        };

        let sql = format!(
            r#"
            SELECT n.nspname AS namespace, c.relname AS name
            FROM pg_class c
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE n.nspname = $1
              AND c.relkind IN {relkinds}
              AND NOT EXISTS (
                  SELECT 1 FROM pg_depend dep
                  WHERE dep.objid = c.oid
                  AND dep.deptype = 'e'
              )
            ORDER BY c.relname
            "#
        );

        let rows = sqlx::query(&sql).bind(schema).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| ListedObject {
                namespace: row.get("namespace"),
                name: row.get("name"),
                signature: None,
            })
            .collect())
    }

    async fn list_functions(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
        let prokind = match category {
            Category::Function => "f",
            Category::Aggregate => "a",
            _ => unreachable!("not a function category"),
        };

        let rows = sqlx::query(
            r#"
            SELECT n.nspname AS namespace,
                   p.proname AS name,
                   pg_catalog.pg_get_function_identity_arguments(p.oid) AS arguments
            FROM pg_proc p
            JOIN pg_namespace n ON p.pronamespace = n.oid
            WHERE n.nspname = $1
              AND p.prokind::text = $2
              AND NOT EXISTS (
                  SELECT 1 FROM pg_depend dep
                  WHERE dep.objid = p.oid
                  AND dep.deptype = 'e'
              )
            ORDER BY p.proname, pg_catalog.pg_get_function_identity_arguments(p.oid)
            "#,
        )
        .bind(schema)
        .bind(prokind)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ListedObject {
                namespace: row.get("namespace"),
                name: row.get("name"),
                signature: Some(row.get("arguments")),
            })
            .collect())
    }

    async fn table_definition(&self, schema: &str, name: &str) -> Result<String> {
        let column_rows = sqlx::query(
            r#"
            SELECT a.attname AS name,
                   pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
                   a.attnotnull AS not_null,
                   a.attgenerated::text AS generated,
                   pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS expression
            FROM pg_attribute a
            JOIN pg_class c ON a.attrelid = c.oid
            JOIN pg_namespace n ON c.relnamespace = n.oid
            LEFT JOIN pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
            WHERE n.nspname = $1
              AND c.relname = $2
              AND c.relkind IN ('r', 'p')
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY a.attnum
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        if column_rows.is_empty() {
            bail!("no columns found in catalog");
        }

        let columns: Vec<ColumnSpec> = column_rows
            .iter()
            .map(|row| {
                ColumnSpec::from_catalog(
                    row.get::<String, _>("name").as_str(),
                    row.get::<String, _>("data_type").as_str(),
                    row.get("not_null"),
                    row.get::<Option<String>, _>("generated").as_deref().unwrap_or(""),
                    row.get("expression"),
                )
            })
            .collect();

        let constraint_rows = sqlx::query(
            r#"
            SELECT con.conname AS name,
                   pg_catalog.pg_get_constraintdef(con.oid) AS definition
            FROM pg_constraint con
            JOIN pg_class c ON con.conrelid = c.oid
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE n.nspname = $1
              AND c.relname = $2
              AND con.contype IN ('p', 'u', 'f', 'c')
            ORDER BY CASE con.contype WHEN 'p' THEN 0 WHEN 'u' THEN 1 WHEN 'f' THEN 2 ELSE 3 END,
                     con.conname
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let constraints: Vec<ConstraintSpec> = constraint_rows
            .iter()
            .map(|row| ConstraintSpec {
                name: row.get("name"),
                definition: row.get("definition"),
            })
            .collect();

        Ok(render_create_table(schema, name, &columns, &constraints))
    }

    async fn view_query(&self, schema: &str, name: &str, relkind: &str) -> Result<String> {
        let definition: Option<String> = sqlx::query_scalar(
            r#"
            SELECT pg_catalog.pg_get_viewdef(c.oid, true)
            FROM pg_class c
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE n.nspname = $1
              AND c.relname = $2
              AND c.relkind::text = $3
            "#,
        )
        .bind(schema)
        .bind(name)
        .bind(relkind)
        .fetch_optional(&self.pool)
        .await?;

        definition.context("no definition found in catalog")
    }

    async fn function_definition(&self, schema: &str, name: &str, signature: &str) -> Result<String> {
        let definition: Option<String> = sqlx::query_scalar(
            r#"
            SELECT pg_catalog.pg_get_functiondef(p.oid)
            FROM pg_proc p
            JOIN pg_namespace n ON p.pronamespace = n.oid
            WHERE n.nspname = $1
              AND p.proname = $2
              AND p.prokind = 'f'
              AND pg_catalog.pg_get_function_identity_arguments(p.oid) = $3
            "#,
        )
        .bind(schema)
        .bind(name)
        .bind(signature)
        .fetch_optional(&self.pool)
        .await?;

        definition.context("no definition found in catalog")
    }

    /// Aggregates are not supported by `pg_get_functiondef`; their parts come
    /// straight from `pg_aggregate`, with the overload matched by resolving
    /// the listed argument types to type OIDs and comparing against
    /// `proargtypes`.
    async fn aggregate_definition(&self, schema: &str, name: &str, signature: &str) -> Result<String> {
        let row = sqlx::query(
            r#"
            SELECT pg_catalog.pg_get_function_identity_arguments(p.oid) AS arguments,
                   tfns.nspname AS state_func_schema,
                   tfunc.proname AS state_func,
                   pg_catalog.format_type(a.aggtranstype, NULL) AS state_type,
                   ffns.nspname AS final_func_schema,
                   ffunc.proname AS final_func,
                   cfns.nspname AS combine_func_schema,
                   cfunc.proname AS combine_func,
                   a.agginitval AS initial_value
            FROM pg_aggregate a
            JOIN pg_proc p ON a.aggfnoid = p.oid
            JOIN pg_namespace n ON p.pronamespace = n.oid
            JOIN pg_proc tfunc ON a.aggtransfn = tfunc.oid
            JOIN pg_namespace tfns ON tfunc.pronamespace = tfns.oid
            LEFT JOIN pg_proc ffunc ON a.aggfinalfn = ffunc.oid AND a.aggfinalfn != 0
            LEFT JOIN pg_namespace ffns ON ffunc.pronamespace = ffns.oid
            LEFT JOIN pg_proc cfunc ON a.aggcombinefn = cfunc.oid AND a.aggcombinefn != 0
            LEFT JOIN pg_namespace cfns ON cfunc.pronamespace = cfns.oid
            WHERE n.nspname = $1
              AND p.proname = $2
              AND string_to_array(p.proargtypes::text, ' ')::oid[] =
                  (SELECT COALESCE(array_agg(t::regtype::oid), '{}')
                     FROM unnest(string_to_array(NULLIF($3::text, ''), ', ')) AS t)
            "#,
        )
        .bind(schema)
        .bind(name)
        .bind(signature)
        .fetch_optional(&self.pool)
        .await?
        .context("no matching aggregate found in catalog")?;

        let parts = AggregateParts {
            arguments: row.get("arguments"),
            state_func_schema: row.get("state_func_schema"),
            state_func: row.get("state_func"),
            state_type: row.get("state_type"),
            final_func_schema: row.get("final_func_schema"),
            final_func: row.get("final_func"),
            combine_func_schema: row.get("combine_func_schema"),
            combine_func: row.get("combine_func"),
            initial_value: row.get("initial_value"),
        };

        Ok(render_create_aggregate(schema, name, &parts))
    }
}

#[async_trait]
impl SchemaSource for QuerySource {
    async fn list_objects(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
        debug!("listing {} in schema {schema}", category.plural());
        match category {
            Category::Table | Category::View | Category::MaterializedView => {
                self.list_relations(schema, category).await
            }
            Category::Function | Category::Aggregate => self.list_functions(schema, category).await,
        }
    }

    async fn fetch_definition(
        &self,
        schema: &str,
        object: &ListedObject,
        category: Category,
    ) -> Result<String> {
        match category {
            Category::Table => self.table_definition(schema, &object.name).await,
            Category::View => {
                let query = self.view_query(schema, &object.name, "v").await?;
                Ok(render_create_view(schema, &object.name, &query))
            }
            Category::MaterializedView => {
                let query = self.view_query(schema, &object.name, "m").await?;
                Ok(render_create_materialized_view(schema, &object.name, &query))
            }
            Category::Function => {
                let signature = object.required_signature()?;
                self.function_definition(schema, &object.name, signature).await
            }
            Category::Aggregate => {
                let signature = object.required_signature()?;
                self.aggregate_definition(schema, &object.name, signature).await
            }
        }
    }
}
