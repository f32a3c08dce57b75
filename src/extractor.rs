//! Extraction pipeline: turn the live catalog into the in-memory model.
//!
//! Processing is strictly sequential: schemas one at a time, categories
//! within a schema one at a time, one definition fetch at a time. Any
//! failure aborts the whole run; no partial schema list is ever returned.

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::{debug, info};

use crate::catalog::{DbObject, Schema, is_system_schema};
use crate::source::{Category, ListedObject, SchemaSource};

pub struct Extractor {
    source: Box<dyn SchemaSource>,
}

impl Extractor {
    pub fn new(source: Box<dyn SchemaSource>) -> Self {
        Self { source }
    }

    /// Extract every table, view, materialized view and function in the
    /// requested schemas. Objects are ordered by type and alphabetically by
    /// name within each type.
    pub async fn extract_schemas(&self, schema_names: &[String]) -> Result<Vec<Schema>> {
        let mut schemas = Vec::with_capacity(schema_names.len());
        for name in schema_names {
            let schema = self
                .extract_schema(name)
                .await
                .with_context(|| format!("extracting schema {name}"))?;
            schemas.push(schema);
        }
        Ok(schemas)
    }

    async fn extract_schema(&self, name: &str) -> Result<Schema> {
        info!("Extracting schema {name}");
        let mut objects = Vec::new();

        for category in [Category::Table, Category::View, Category::MaterializedView] {
            let extracted = self
                .extract_category(name, category)
                .await
                .with_context(|| format!("extracting {} from schema {name}", category.plural()))?;
            objects.extend(extracted);
        }

        let functions = self
            .extract_functions(name)
            .await
            .with_context(|| format!("extracting functions from schema {name}"))?;
        objects.extend(functions);

        Ok(Schema {
            name: name.to_string(),
            objects,
        })
    }

    async fn extract_category(&self, schema: &str, category: Category) -> Result<Vec<DbObject>> {
        let listed = self.list_user_objects(schema, category).await?;

        let mut objects = Vec::with_capacity(listed.len());
        for item in listed {
            objects.push(self.fetch_object(schema, item, category).await?);
        }
        Ok(objects)
    }

    /// Regular and aggregate functions come from separate listings; merge
    /// them and sort by name (then signature, so overloads have a stable
    /// order) before fetching, so the function partition stays alphabetical.
    async fn extract_functions(&self, schema: &str) -> Result<Vec<DbObject>> {
        let functions = self.list_user_objects(schema, Category::Function).await?;
        let aggregates = self.list_user_objects(schema, Category::Aggregate).await?;

        let listed = functions
            .into_iter()
            .map(|item| (Category::Function, item))
            .chain(aggregates.into_iter().map(|item| (Category::Aggregate, item)))
            .sorted_by(|a, b| {
                a.1.name
                    .cmp(&b.1.name)
                    .then_with(|| a.1.signature.cmp(&b.1.signature))
            })
            .collect::<Vec<_>>();

        let mut objects = Vec::with_capacity(listed.len());
        for (category, item) in listed {
            objects.push(self.fetch_object(schema, item, category).await?);
        }
        Ok(objects)
    }

    async fn list_user_objects(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>> {
        let mut listed = self
            .source
            .list_objects(schema, category)
            .await
            .with_context(|| format!("listing {} in schema {schema}", category.plural()))?;

        // System namespaces are filtered here, after every backend, so the
        // exclusion holds even when a caller asks for one by name.
        let before = listed.len();
        listed.retain(|item| !is_system_schema(&item.namespace));
        if listed.len() < before {
            debug!(
                "dropped {} system catalog objects from {} listing",
                before - listed.len(),
                category
            );
        }

        Ok(listed)
    }

    async fn fetch_object(
        &self,
        schema: &str,
        item: ListedObject,
        category: Category,
    ) -> Result<DbObject> {
        let definition = self
            .source
            .fetch_definition(schema, &item, category)
            .await
            .with_context(|| format!("reading definition of {category} {item}"))?;

        Ok(DbObject {
            schema: schema.to_string(),
            name: item.name,
            object_type: category.object_type(),
            definition,
            depends: Vec::new(),
        })
    }
}
