//! Catalog backend that shells out to the `psql` client.
//!
//! Every request is one `psql -c` invocation in unaligned, tuples-only mode.
//! Listings use the describe meta-commands (`\dt`, `\dv`, `\dm`, `\df`) and
//! parse their `|`-separated rows; definition fetches either take the whole
//! stdout as the value (`\sf`, `pg_get_viewdef`) or parse catalog rows into
//! the shared renderers so both backends emit identical DDL.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Category, ListedObject, SchemaSource};
use crate::config::Database;
use crate::render::aggregate::{AggregateParts, render_create_aggregate};
use crate::render::table::{ColumnSpec, ConstraintSpec, render_create_table};
use crate::render::view::{render_create_materialized_view, render_create_view};
use crate::render::{escape_string, quote_ident};

/// Field counts of the unqualified describe commands in unaligned mode. The
/// verbose `+` variants append columns, so rows may be wider but never
/// narrower; the name and namespace positions are stable.
const RELATION_LISTING_FIELDS: usize = 4; // schema | name | type | owner
const FUNCTION_LISTING_FIELDS: usize = 5; // schema | name | result | argument types | kind

pub struct PsqlSource {
    settings: Database,
}

impl PsqlSource {
    pub fn new(settings: Database) -> Self {
        Self { settings }
    }

    async fn exec(&self, command: &str) -> Result<String> {
        debug!("running psql command: {command}");
        let mut cmd = Command::new("psql");
        cmd.arg("-h")
            .arg(&self.settings.host)
            .arg("-p")
            .arg(self.settings.port.to_string())
            .arg("-U")
            .arg(&self.settings.user)
            .arg("-d")
            .arg(&self.settings.dbname)
            .arg("--no-align")
            .arg("--tuples-only")
            .arg("--quiet")
            .arg("-c")
            .arg(command);
        // Keep describe-output labels stable across locales.
        cmd.env("LC_ALL", "C");
        // The secret travels in the child environment, never on the command
        // line where it would leak into the process list.
        if let Some(password) = &self.settings.password {
            cmd.env("PGPASSWORD", password);
        }

        let output = cmd.output().await.context("running psql")?;
        if !output.status.success() {
            bail!(
                "psql exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        String::from_utf8(output.stdout).context("psql produced non-UTF-8 output")
    }

    async fn list_relations(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
        let describe = match category {
            Category::Table => "dt",
            Category::View => "dv",
            Category::MaterializedView => "dm",
            _ => unreachable!("not a relation category"),
        };

        let output = self
            .exec(&format!(r"\{describe} {}.*", quote_ident(schema)))
            .await?;
        let (rows, skipped) = parse_listing(&output, RELATION_LISTING_FIELDS);
        if skipped > 0 {
            warn!("skipped {skipped} malformed rows in {category} listing for schema {schema}");
        }

        Ok(rows
            .into_iter()
            .map(|fields| ListedObject {
                namespace: fields[0].clone(),
                name: fields[1].clone(),
                signature: None,
            })
            .collect())
    }

    async fn list_functions(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
        let output = self.exec(&format!(r"\df {}.*", quote_ident(schema))).await?;
        let (rows, skipped) = parse_listing(&output, FUNCTION_LISTING_FIELDS);
        if skipped > 0 {
            warn!("skipped {skipped} malformed rows in {category} listing for schema {schema}");
        }

        Ok(rows
            .into_iter()
            .filter(|fields| kind_matches(&fields[4], category))
            .map(|fields| ListedObject {
                namespace: fields[0].clone(),
                name: fields[1].clone(),
                signature: Some(fields[3].clone()),
            })
            .collect())
    }

    async fn table_definition(&self, schema: &str, name: &str) -> Result<String> {
        let output = self.exec(&table_columns_sql(schema, name)).await?;
        let mut columns = Vec::new();
        for line in data_lines(&output) {
            // The expression field comes last so defaults may contain the
            // separator.
            let fields: Vec<&str> = line.splitn(5, '|').collect();
            if fields.len() < 5 {
                bail!("malformed column row: {line:?}");
            }
            let expression = (!fields[4].is_empty()).then(|| fields[4].to_string());
            columns.push(ColumnSpec::from_catalog(
                fields[0],
                fields[1],
                fields[2] == "t",
                fields[3],
                expression,
            ));
        }
        if columns.is_empty() {
            bail!("no columns found in catalog");
        }

        let output = self.exec(&table_constraints_sql(schema, name)).await?;
        let mut constraints = Vec::new();
        for line in data_lines(&output) {
            let fields: Vec<&str> = line.splitn(2, '|').collect();
            if fields.len() < 2 {
                bail!("malformed constraint row: {line:?}");
            }
            constraints.push(ConstraintSpec {
                name: fields[0].to_string(),
                definition: fields[1].to_string(),
            });
        }

        Ok(render_create_table(schema, name, &columns, &constraints))
    }

    async fn view_query(&self, schema: &str, name: &str, relkind: &str) -> Result<String> {
        let sql = format!(
            "SELECT pg_catalog.pg_get_viewdef(c.oid, true) \
             FROM pg_class c JOIN pg_namespace n ON c.relnamespace = n.oid \
             WHERE n.nspname = {} AND c.relname = {} AND c.relkind = '{relkind}'",
            escape_string(schema),
            escape_string(name),
        );

        let output = self.exec(&sql).await?;
        let body = output.trim();
        if body.is_empty() {
            bail!("no definition found in catalog");
        }
        Ok(body.to_string())
    }

    async fn function_definition(&self, schema: &str, name: &str, signature: &str) -> Result<String> {
        let command = format!(
            r"\sf {}.{}({signature})",
            quote_ident(schema),
            quote_ident(name)
        );
        let output = self.exec(&command).await?;
        let body = output.trim();
        if body.is_empty() {
            bail!("no definition found in catalog");
        }
        Ok(body.to_string())
    }

    async fn aggregate_definition(&self, schema: &str, name: &str, signature: &str) -> Result<String> {
        let output = self.exec(&aggregate_parts_sql(schema, name, signature)).await?;
        let line = data_lines(&output)
            .next()
            .context("no matching aggregate found in catalog")?;

        let fields: Vec<&str> = line.splitn(9, '|').collect();
        if fields.len() < 9 {
            bail!("malformed aggregate row: {line:?}");
        }
        let optional = |field: &str| (!field.is_empty()).then(|| field.to_string());

        let parts = AggregateParts {
            arguments: fields[0].to_string(),
            state_func_schema: fields[1].to_string(),
            state_func: fields[2].to_string(),
            state_type: fields[3].to_string(),
            final_func_schema: optional(fields[4]),
            final_func: optional(fields[5]),
            combine_func_schema: optional(fields[6]),
            combine_func: optional(fields[7]),
            initial_value: optional(fields[8]),
        };

        Ok(render_create_aggregate(schema, name, &parts))
    }
}

#[async_trait]
impl SchemaSource for PsqlSource {
    async fn list_objects(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
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

/// Split unaligned listing output into rows, dropping blank lines. Rows
/// narrower than `expected_fields` are unusable and are skipped; the caller
/// decides how loudly to report the skip count. Wider rows (the verbose
/// listing variants) are kept as-is.
fn parse_listing(output: &str, expected_fields: usize) -> (Vec<Vec<String>>, usize) {
    let mut rows = Vec::new();
    let mut skipped = 0;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < expected_fields {
            skipped += 1;
            continue;
        }
        rows.push(fields.into_iter().map(str::to_string).collect());
    }

    (rows, skipped)
}

fn data_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().filter(|line| !line.trim().is_empty())
}

// `\df` tags each row with the routine kind; older servers print "normal"
// where current ones print "func".
fn kind_matches(kind: &str, category: Category) -> bool {
    match category {
        Category::Function => matches!(kind, "func" | "normal"),
        Category::Aggregate => kind == "agg",
        _ => false,
    }
}

fn table_columns_sql(schema: &str, name: &str) -> String {
    format!(
        "SELECT a.attname, pg_catalog.format_type(a.atttypid, a.atttypmod), \
                a.attnotnull, a.attgenerated::text, \
                pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) \
         FROM pg_attribute a \
         JOIN pg_class c ON a.attrelid = c.oid \
         JOIN pg_namespace n ON c.relnamespace = n.oid \
         LEFT JOIN pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum \
         WHERE n.nspname = {} AND c.relname = {} \
           AND c.relkind IN ('r', 'p') AND a.attnum > 0 AND NOT a.attisdropped \
         ORDER BY a.attnum",
        escape_string(schema),
        escape_string(name),
    )
}

fn table_constraints_sql(schema: &str, name: &str) -> String {
    format!(
        "SELECT con.conname, pg_catalog.pg_get_constraintdef(con.oid) \
         FROM pg_constraint con \
         JOIN pg_class c ON con.conrelid = c.oid \
         JOIN pg_namespace n ON c.relnamespace = n.oid \
         WHERE n.nspname = {} AND c.relname = {} \
           AND con.contype IN ('p', 'u', 'f', 'c') \
         ORDER BY CASE con.contype WHEN 'p' THEN 0 WHEN 'u' THEN 1 WHEN 'f' THEN 2 ELSE 3 END, \
                  con.conname",
        escape_string(schema),
        escape_string(name),
    )
}

fn aggregate_parts_sql(schema: &str, name: &str, signature: &str) -> String {
    format!(
        "SELECT pg_catalog.pg_get_function_identity_arguments(p.oid), \
                tfns.nspname, tfunc.proname, \
                pg_catalog.format_type(a.aggtranstype, NULL), \
                ffns.nspname, ffunc.proname, \
                cfns.nspname, cfunc.proname, \
                a.agginitval \
         FROM pg_aggregate a \
         JOIN pg_proc p ON a.aggfnoid = p.oid \
         JOIN pg_namespace n ON p.pronamespace = n.oid \
         JOIN pg_proc tfunc ON a.aggtransfn = tfunc.oid \
         JOIN pg_namespace tfns ON tfunc.pronamespace = tfns.oid \
         LEFT JOIN pg_proc ffunc ON a.aggfinalfn = ffunc.oid AND a.aggfinalfn != 0 \
         LEFT JOIN pg_namespace ffns ON ffunc.pronamespace = ffns.oid \
         LEFT JOIN pg_proc cfunc ON a.aggcombinefn = cfunc.oid AND a.aggcombinefn != 0 \
         LEFT JOIN pg_namespace cfns ON cfunc.pronamespace = cfns.oid \
         WHERE n.nspname = {} AND p.proname = {} \
           AND string_to_array(p.proargtypes::text, ' ')::oid[] = \
               (SELECT COALESCE(array_agg(t::regtype::oid), '{{}}') \
                  FROM unnest(string_to_array(NULLIF({}, ''), ', ')) AS t)",
        escape_string(schema),
        escape_string(name),
        escape_string(signature),
    )
}
