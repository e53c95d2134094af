//! Workbook loading and the in-memory table snapshots served by every handler.
//!
//! The source is a JSON export of the tracking spreadsheet: one key per sheet,
//! each sheet a 2-D array of cells whose first row holds the column labels.
//! Loading never fails the process; an unreadable workbook or sheet yields an
//! empty [`Table`].

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

pub const USERS_SHEET: &str = "Users";
pub const SUBMISSIONS_SHEET: &str = "Form Responses 1";

/// Column labels of the two sheets, as they appear after trimming
pub mod columns {
    pub const EMAIL: &str = "Email";
    pub const ROLE: &str = "Role";
    pub const NAME: &str = "Name";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const TASK_TYPE: &str = "Task Type";
    pub const REJECTED: &str = "Is this rejected (Slice / Miner)";
    pub const CHANGED: &str = "Is this Changed (Slice / Miner)";
    pub const MISTAKE_REASON: &str = "In you opinion, What is the reason for reviewer mistake?";
    pub const QC_ALIGNED: &str = "Are The Qc And the reviewer allign on the same answer";
    pub const LEADER_NAME: &str = "Leader Name";
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read workbook {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse workbook: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("sheet {0:?} not found in workbook")]
    MissingSheet(String),
}

/// A sheet with normalized labels; every row is as wide as `columns`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from raw sheet cells, first row being the header.
    pub fn from_cells(mut cells: Vec<Vec<Value>>) -> Self {
        if cells.is_empty() {
            return Self::default();
        }
        let header = cells.remove(0);
        Self::new(header, cells)
    }

    pub fn new(header: Vec<Value>, rows: Vec<Vec<Value>>) -> Self {
        let columns = normalize_header(header);
        let width = columns.len();

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut row: Vec<Value> = row.into_iter().take(width).map(normalize_cell).collect();
                row.resize(width, Value::Null);
                row
            })
            // blank spreadsheet lines
            .filter(|row| row.iter().any(|v| !v.is_null()))
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |cells| RowRef { table: self, cells })
    }

    /// Copy of the table keeping only rows matching `keep`
    pub fn filter<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| keep(row))
            .map(|row| row.cells.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Rows whose `column` is exactly `value` (case-sensitive)
    pub fn rows_where_eq(&self, column: &str, value: &str) -> Table {
        self.filter(|row| row.text(column).as_deref() == Some(value))
    }

    /// One JSON object per row with every column present; blanks are null
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows().map(|row| row.to_record()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    cells: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Non-null cell under `column`
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let idx = self.table.column_index(column)?;
        self.cells.get(idx).filter(|v| !v.is_null())
    }

    /// Cell rendered as text; numbers and booleans are stringified
    pub fn text(&self, column: &str) -> Option<Cow<'a, str>> {
        self.get(column).map(cell_text)
    }

    pub fn to_record(&self) -> Map<String, Value> {
        self.table
            .columns
            .iter()
            .cloned()
            .zip(self.cells.iter().cloned())
            .collect()
    }
}

pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

fn normalize_header(header: Vec<Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            let label = match &cell {
                Value::Null => String::new(),
                other => cell_text(other).trim().to_string(),
            };
            let label = if label.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                label
            };

            let mut unique = label.clone();
            let mut n = 1;
            while !seen.insert(unique.clone()) {
                unique = format!("{}.{}", label, n);
                n += 1;
            }
            unique
        })
        .collect()
}

fn normalize_cell(cell: Value) -> Value {
    match cell {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        other => other,
    }
}

type Workbook = HashMap<String, Vec<Vec<Value>>>;

fn read_workbook(path: &Path) -> Result<Workbook, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

fn read_sheet(path: &Path, sheet: &str) -> Result<Table, LoadError> {
    let mut workbook = read_workbook(path)?;
    let cells = workbook
        .remove(sheet)
        .ok_or_else(|| LoadError::MissingSheet(sheet.to_string()))?;
    Ok(Table::from_cells(cells))
}

fn load_sheet_or_empty(path: &Path, sheet: &str) -> Table {
    match read_sheet(path, sheet) {
        Ok(table) => {
            tracing::info!("Loaded sheet {:?}: {} rows", sheet, table.len());
            table
        }
        Err(e) => {
            tracing::error!("Error loading sheet {:?}: {}", sheet, e);
            Table::default()
        }
    }
}

pub fn load_users(path: &Path) -> Table {
    load_sheet_or_empty(path, USERS_SHEET)
}

pub fn load_submissions(path: &Path) -> Table {
    load_sheet_or_empty(path, SUBMISSIONS_SHEET)
}

/// Both sheets, loaded together
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: Table,
    pub submissions: Table,
}

impl Dataset {
    pub fn load(path: &Path) -> Self {
        Self {
            users: load_users(path),
            submissions: load_submissions(path),
        }
    }
}

/// Owner of the loaded tables. Readers take an `Arc` snapshot; a reload
/// swaps the whole dataset at once.
pub struct Datastore {
    path: Option<PathBuf>,
    snapshot: RwLock<Arc<Dataset>>,
}

impl Datastore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dataset = Dataset::load(&path);
        Self {
            path: Some(path),
            snapshot: RwLock::new(Arc::new(dataset)),
        }
    }

    /// A store over fixed tables with nothing to reload from
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            path: None,
            snapshot: RwLock::new(Arc::new(dataset)),
        }
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        let guard = self.snapshot.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read the workbook and publish the new tables
    pub fn reload(&self) -> Arc<Dataset> {
        let Some(path) = &self.path else {
            return self.snapshot();
        };

        let dataset = Arc::new(Dataset::load(path));
        let mut guard = self.snapshot.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::clone(&dataset);
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_workbook(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tracker-{}-{}-{}.json",
            name,
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_header_labels_are_trimmed() {
        let table = Table::from_cells(vec![
            vec![json!("  Email "), json!("Role\t")],
            vec![json!("a@x.io"), json!("admin")],
        ]);
        assert_eq!(table.columns(), &["Email".to_string(), "Role".to_string()]);
    }

    #[test]
    fn test_short_rows_and_blank_cells_become_null() {
        let table = Table::from_cells(vec![
            vec![json!("Name"), json!("Task Type"), json!("Leader Name")],
            vec![json!("Alice"), json!("   ")],
        ]);
        let records = table.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 3);
        assert_eq!(records[0]["Task Type"], Value::Null);
        assert_eq!(records[0]["Leader Name"], Value::Null);
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let table = Table::from_cells(vec![
            vec![json!("Name")],
            vec![json!("")],
            vec![],
            vec![json!("Bob")],
        ]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_and_empty_labels() {
        let table = Table::from_cells(vec![vec![json!("A"), json!("A"), Value::Null]]);
        assert_eq!(table.columns(), &["A", "A.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_text_stringifies_numbers() {
        let table = Table::from_cells(vec![vec![json!("Name")], vec![json!(116268)]]);
        let row = table.rows().next().unwrap();
        assert_eq!(row.text("Name").as_deref(), Some("116268"));
        assert!(row.text("Missing").is_none());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dataset = Dataset::load(Path::new("/definitely/not/here.json"));
        assert!(dataset.users.is_empty());
        assert!(dataset.submissions.is_empty());
    }

    #[test]
    fn test_malformed_workbook_loads_empty() {
        let path = temp_workbook("bad", "{ not json");
        assert!(load_users(&path).is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_sheet_only_empties_that_sheet() {
        let path = temp_workbook("partial", r#"{"Users": [["Email", "Role"], ["a@x.io", "admin"]]}"#);
        let dataset = Dataset::load(&path);
        assert_eq!(dataset.users.len(), 1);
        assert!(dataset.submissions.is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let path = temp_workbook("reload", r#"{"Users": [["Email", "Role"], ["a@x.io", "admin"]]}"#);
        let store = Datastore::open(&path);
        let before = store.snapshot();
        assert_eq!(before.users.len(), 1);

        std::fs::write(
            &path,
            r#"{"Users": [["Email", "Role"], ["a@x.io", "admin"], ["b@x.io", "member"]]}"#,
        )
        .unwrap();
        store.reload();

        assert_eq!(store.snapshot().users.len(), 2);
        // earlier readers keep their snapshot
        assert_eq!(before.users.len(), 1);
        std::fs::remove_file(path).ok();
    }
}
