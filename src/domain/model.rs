use serde::{Deserialize, Serialize};

/// One scenario's raw query dump, exactly as read from disk.
#[derive(Debug, Clone)]
pub struct QueryExport {
    pub scenario: String,
    pub raw: Vec<u8>,
}

/// A table block as it appears in the concatenated export: the sentinel name
/// row, then a header row, then data rows until the next sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBlock {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based line of the sentinel row within the export.
    pub line: u64,
}

/// A normalized wide table: one column per model year.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Long-format table, one row per year. Diff tables reuse this shape.
/// Every row holds exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LongTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub tables: Vec<LongTable>,
    pub diffs: Vec<LongTable>,
}
