use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::format::{FieldKind, format_cell};

/// Raw cell content, as handed over by a cache loader. One kind per column
/// does not force one variant per column: a Hash column may carry bytes in
/// one record and null in the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    // Rank used to order values of different variants. Null is the extreme:
    // it compares below every non-null value, no matter the column.
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Bytes(_) => 3,
            Value::Str(_) => 4,
        }
    }

    /// Natural ordering of raw values, total so that sorting never panics on
    /// a heterogeneous column.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// Generic stringification used for export. Kind-specific display rules do
// not apply here; export targets machine readers, not eyeballs.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Name and display kind of one column, shared by all records.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A fully decoded cache file: column structure plus record data. Built
/// wholesale by a loader and swapped wholesale into a TableModel; never
/// patched cell by cell.
#[derive(Debug, Clone)]
pub struct Table {
    pub descriptors: Vec<FieldDescriptor>,
    pub rows: Vec<Vec<Value>>,
    pub source_name: String,
    pub structure_name: String,
    pub build: i64,
}

/// Presentation model over the active Table. Owns the table exclusively;
/// the view reaches row and column data only through these queries.
#[derive(Debug, Default)]
pub struct TableModel {
    table: Option<Table>,
}

impl TableModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.descriptors.len())
    }

    pub fn row_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.rows.len())
    }

    pub fn header_label(&self, column: usize) -> String {
        self.table
            .as_ref()
            .and_then(|t| t.descriptors.get(column))
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    /// Formatted display value for one cell. Out-of-range indices yield an
    /// empty string; views probe boundary indices all the time and must
    /// never be answered with a panic.
    pub fn cell_value(&self, row: usize, column: usize) -> String {
        let Some(table) = &self.table else {
            return String::new();
        };
        let Some(descriptor) = table.descriptors.get(column) else {
            return String::new();
        };
        let Some(value) = table.rows.get(row).and_then(|r| r.get(column)) else {
            return String::new();
        };
        format_cell(value, descriptor.kind).unwrap_or_default()
    }

    /// Replace the active table wholesale. A single assignment, so an
    /// observer sees either the old table or the new one, never old rows
    /// against new descriptors.
    pub fn set_file(&mut self, table: Table) {
        debug!(
            "Loaded {}: {} columns, {} rows, build {}",
            table.source_name,
            table.descriptors.len(),
            table.rows.len(),
            table.build
        );
        self.table = Some(table);
    }

    /// One-line load summary for the status bar. Derived fresh on each call,
    /// not retained as state.
    pub fn status_summary(&self) -> String {
        match &self.table {
            Some(t) => format!(
                "{} rows - Using {} build {}",
                t.rows.len(),
                t.structure_name,
                t.build
            ),
            None => "0 rows - no file loaded".to_string(),
        }
    }

    pub fn build(&self) -> Option<i64> {
        self.table.as_ref().map(|t| t.build)
    }

    /// Reorder rows by the raw value in `column`. Stable: rows comparing
    /// equal on that column keep their previous relative order. Ascending
    /// means non-decreasing. Out-of-range columns are ignored.
    pub fn sort(&mut self, column: usize, ascending: bool) {
        let Some(table) = &mut self.table else {
            return;
        };
        if column >= table.descriptors.len() {
            debug!("Ignoring sort on unknown column {column}");
            return;
        }
        let null = Value::Null;
        table.rows.sort_by(|a, b| {
            let va = a.get(column).unwrap_or(&null);
            let vb = b.get(column).unwrap_or(&null);
            if ascending {
                va.natural_cmp(vb)
            } else {
                vb.natural_cmp(va)
            }
        });
    }

    /// Pre-format row data for export: every cell stringified generically.
    pub fn raw_rows(&self) -> Vec<Vec<String>> {
        self.table.as_ref().map_or_else(Vec::new, |t| {
            t.rows
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect()
        })
    }
}
