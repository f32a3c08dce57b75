//! In-memory model of extracted database objects.
//!
//! Everything here is built once by the extractor and then only read; no
//! value is mutated after construction. The only durable representation of
//! the model is the exported file tree.

use std::fmt;

/// The kinds of objects that are extracted and exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Table,
    View,
    MaterializedView,
    Function,
}

impl ObjectType {
    /// All object types, in export order.
    pub const ALL: [ObjectType; 4] = [
        ObjectType::Table,
        ObjectType::View,
        ObjectType::MaterializedView,
        ObjectType::Function,
    ];

    /// Stable string form, used for directory names and file headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "table",
            ObjectType::View => "view",
            ObjectType::MaterializedView => "materialized_view",
            ObjectType::Function => "function",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted database object.
///
/// `name` is the unqualified identifier and is not unique on its own:
/// overloaded functions share a name and differ only in their argument
/// types.
#[derive(Debug, Clone)]
pub struct DbObject {
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    /// Complete DDL text sufficient to recreate the object.
    pub definition: String,
    /// Names of objects this one depends on. Nothing populates this today;
    /// it is reserved for dependency-ordered export.
    pub depends: Vec<String>,
}

/// A schema and its objects, ordered by type (tables, views, materialized
/// views, functions) and alphabetically by name within each type.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub objects: Vec<DbObject>,
}

/// True for namespaces that hold engine-internal objects. These never appear
/// in extraction output, even when a caller asks for one by name.
pub fn is_system_schema(schema: &str) -> bool {
    matches!(schema, "pg_catalog" | "information_schema" | "pg_toast")
        || schema.starts_with("pg_temp_")
}
