//! Core types for qdesk

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{QdeskError, Result};

/// A single result set returned by the endpoint
///
/// The endpoint names the two halves `fields`/`data`; the flat form uses
/// `columns`/`rows`. Both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names, in result order
    #[serde(default, alias = "fields")]
    pub columns: Vec<String>,

    /// Row data, one inner vector per row
    #[serde(default, alias = "data")]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    /// Create a result set from columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    /// Create an empty result set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every non-null cell rendered as text, row-major.
    ///
    /// Used for single-column listings such as `SHOW DATABASES`.
    pub fn flat_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .flatten()
            .filter_map(cell_text)
            .collect()
    }

    /// The first two cells of every row as `(name, detail)`.
    ///
    /// Rows whose first cell is null or missing are skipped.
    pub fn name_detail_pairs(&self) -> Vec<(String, Option<String>)> {
        self.rows
            .iter()
            .filter_map(|row| {
                let name = row.first().and_then(cell_text)?;
                let detail = row.get(1).and_then(cell_text);
                Some((name, detail))
            })
            .collect()
    }
}

fn cell_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Shared, immutable result set handed out to readers
pub type SharedResultSet = Arc<ResultSet>;

/// All result sets produced by one query request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResults {
    #[serde(default)]
    pub results: Vec<ResultSet>,
}

impl QueryResults {
    pub fn new(results: Vec<ResultSet>) -> Self {
        Self { results }
    }

    /// Take the first result set; an empty response is an error
    pub fn into_first(self) -> Result<ResultSet> {
        self.results
            .into_iter()
            .next()
            .ok_or_else(|| QdeskError::InvalidResponse("response carried no result sets".into()))
    }
}

/// Reference to a table as `schema.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse a dotted table id (`db.table`).
    ///
    /// The split happens at the first dot, so schema names must not contain
    /// one. Table names may.
    pub fn parse(table_id: &str) -> Result<Self> {
        match table_id.split_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {
                Ok(Self::new(schema, table))
            }
            _ => Err(QdeskError::InvalidNode(format!(
                "'{}' is not a schema-qualified table id",
                table_id
            ))),
        }
    }

    /// The dotted id used as the schema tree key
    pub fn id(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A candidate connection target advertised by the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    /// Target name, used as the connection target
    pub id: String,

    /// Resource type (e.g. "servers", "services")
    #[serde(rename = "type")]
    pub kind: String,
}

impl TargetRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}
