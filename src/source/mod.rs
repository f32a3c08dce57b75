//! Catalog access backends.
//!
//! Two interchangeable implementations sit behind [`SchemaSource`]: a direct
//! query backend over a sqlx connection pool, and one that shells out to the
//! `psql` client and parses its unaligned output. The extraction pipeline
//! only depends on the trait, never on a backend's quirks.

pub mod psql;
pub mod query;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;

use crate::catalog::ObjectType;

/// The catalog listing a request targets. Regular and aggregate functions
/// are listed and fetched through different paths even though both export as
/// [`ObjectType::Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Table,
    View,
    MaterializedView,
    Function,
    Aggregate,
}

impl Category {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Category::Table => ObjectType::Table,
            Category::View => ObjectType::View,
            Category::MaterializedView => ObjectType::MaterializedView,
            Category::Function | Category::Aggregate => ObjectType::Function,
        }
    }

    /// Plural form used in error context.
    pub fn plural(&self) -> &'static str {
        match self {
            Category::Table => "tables",
            Category::View => "views",
            Category::MaterializedView => "materialized views",
            Category::Function => "functions",
            Category::Aggregate => "aggregate functions",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Table => "table",
            Category::View => "view",
            Category::MaterializedView => "materialized view",
            Category::Function => "function",
            Category::Aggregate => "aggregate function",
        };
        f.write_str(label)
    }
}

/// One row of a listing: an object name together with its owning namespace
/// and, for functions and aggregates, the identity argument types that
/// distinguish it from overloads sharing the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub namespace: String,
    pub name: String,
    pub signature: Option<String>,
}

impl ListedObject {
    /// The argument-type signature, which listings always capture for
    /// functions and aggregates.
    pub fn required_signature(&self) -> Result<&str> {
        self.signature
            .as_deref()
            .context("listing did not capture argument types")
    }
}

impl fmt::Display for ListedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(signature) => write!(f, "{}.{}({})", self.namespace, self.name, signature),
            None => write!(f, "{}.{}", self.namespace, self.name),
        }
    }
}

/// The capability the extraction pipeline needs from a catalog backend.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Enumerate candidate objects of one category in one schema,
    /// alphabetically by name, each with its owning namespace.
    async fn list_objects(&self, schema: &str, category: Category) -> Result<Vec<ListedObject>>;

    /// Reconstruct complete, re-runnable DDL for one listed object. For
    /// functions and aggregates the listing signature selects the exact
    /// overload.
    async fn fetch_definition(
        &self,
        schema: &str,
        object: &ListedObject,
        category: Category,
    ) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_maps_to_object_type() {
        assert_eq!(Category::Table.object_type(), ObjectType::Table);
        assert_eq!(Category::Function.object_type(), ObjectType::Function);
        assert_eq!(Category::Aggregate.object_type(), ObjectType::Function);
    }

    #[test]
    fn test_listed_object_display() {
        let table = ListedObject {
            namespace: "app".to_string(),
            name: "users".to_string(),
            signature: None,
        };
        assert_eq!(table.to_string(), "app.users");

        let func = ListedObject {
            namespace: "app".to_string(),
            name: "add_user".to_string(),
            signature: Some("text, integer".to_string()),
        };
        assert_eq!(func.to_string(), "app.add_user(text, integer)");
    }
}
