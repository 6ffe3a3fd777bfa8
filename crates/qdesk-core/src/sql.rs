//! SQL text for the statements the workbench issues
//!
//! Identifiers are quoted with backticks and string literals with single
//! quotes, matching the MariaDB/MySQL dialect spoken by the endpoint.

use crate::TableRef;

/// Lists every database visible to the connection
pub const SHOW_DATABASES: &str = "SHOW DATABASES";

/// Quote an identifier, doubling embedded backticks
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal, escaping backslashes and doubling single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// `schema`.`table`
pub fn qualified(table: &TableRef) -> String {
    format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.table))
}

pub fn show_tables(schema: &str) -> String {
    format!("SHOW TABLES FROM {};", quote_ident(schema))
}

/// Column name and type for one table, in ordinal order
pub fn list_columns(table: &TableRef) -> String {
    format!(
        "SELECT COLUMN_NAME, COLUMN_TYPE FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} ORDER BY ORDINAL_POSITION;",
        quote_literal(&table.schema),
        quote_literal(&table.table)
    )
}

pub fn select_all(table: &TableRef) -> String {
    format!("SELECT * FROM {};", qualified(table))
}

pub fn describe(table: &TableRef) -> String {
    format!("DESCRIBE {};", qualified(table))
}
