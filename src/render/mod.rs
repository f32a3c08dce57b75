//! Shared DDL text assembly.
//!
//! Both catalog backends feed typed parts through these functions, so the
//! same catalog state yields byte-identical definitions regardless of the
//! backend in use.

pub mod aggregate;
pub mod table;
pub mod view;

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
