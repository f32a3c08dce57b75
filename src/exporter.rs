//! Write extracted schemas to a directory tree.
//!
//! Layout: `<base>/<schema>/<object type>/<name>.sql`. Existing files are
//! overwritten; files for objects that no longer exist in the database are
//! left in place. Overloaded functions collapse onto one file per base name
//! and the last overload written wins, an accepted limitation of the
//! name-keyed layout.

use anyhow::{Context, Result};
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::{DbObject, ObjectType, Schema};

pub struct Exporter {
    base_dir: PathBuf,
}

impl Exporter {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Write one file per object. Any directory or write failure aborts the
    /// whole export; files already written stay on disk.
    pub fn export(&self, schemas: &[Schema]) -> Result<()> {
        for schema in schemas {
            self.export_schema(schema)
                .with_context(|| format!("exporting schema {}", schema.name))?;
        }
        Ok(())
    }

    fn export_schema(&self, schema: &Schema) -> Result<()> {
        info!(
            "Writing schema {} ({} objects)",
            schema.name,
            schema.objects.len()
        );
        let schema_dir = self.base_dir.join(&schema.name);
        fs::create_dir_all(&schema_dir)
            .with_context(|| format!("creating directory {}", schema_dir.display()))?;

        let by_type = schema.objects.iter().into_group_map_by(|object| object.object_type);

        for object_type in ObjectType::ALL {
            let Some(objects) = by_type.get(&object_type) else {
                continue;
            };

            let type_dir = schema_dir.join(object_type.as_str());
            fs::create_dir_all(&type_dir)
                .with_context(|| format!("creating directory {}", type_dir.display()))?;

            for object in objects {
                self.export_object(&type_dir, object).with_context(|| {
                    format!("writing {} {}.{}", object.object_type, object.schema, object.name)
                })?;
            }
        }

        Ok(())
    }

    fn export_object(&self, type_dir: &Path, object: &DbObject) -> Result<()> {
        let path = type_dir.join(format!("{}.sql", object.name));

        let mut content = format!(
            "-- Object: {}.{}\n-- Type: {}\n\n",
            object.schema, object.name, object.object_type
        );
        content.push_str(&normalize_definition(&object.definition));

        fs::write(&path, content).with_context(|| format!("writing file {}", path.display()))?;
        Ok(())
    }
}

/// Trim surrounding whitespace and collapse any run of trailing terminators
/// so the exported statement ends in exactly one.
fn normalize_definition(definition: &str) -> String {
    let mut body = definition.trim();
    while let Some(stripped) = body.strip_suffix(';') {
        body = stripped.trim_end();
    }
    format!("{body};\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CREATE TABLE t (id integer)", "CREATE TABLE t (id integer);\n")]
    #[case("CREATE TABLE t (id integer);", "CREATE TABLE t (id integer);\n")]
    #[case("  SELECT 1;\n\n", "SELECT 1;\n")]
    #[case("SELECT 1;; ;\n", "SELECT 1;\n")]
    #[case("SELECT ';';", "SELECT ';';\n")]
    fn test_normalize_definition(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_definition(input), expected);
    }
}
