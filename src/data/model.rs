use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StatValue – a single cell of the per-game table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell, typed per column at load time.
///
/// `untagged` so JSON snapshots hold plain numbers / strings / nulls. The
/// variant order matters for deserialization: integers are tried first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

// -- Manual Eq/Ord so we can put StatValue in BTreeSet --
// Equality, ordering and hashing all compare floats by `total_cmp` bits.

impl PartialEq for StatValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for StatValue {}

impl PartialOrd for StatValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StatValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use StatValue::*;
        fn discriminant(v: &StatValue) -> u8 {
            match v {
                Missing => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for StatValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            StatValue::Text(s) => s.hash(state),
            StatValue::Integer(i) => i.hash(state),
            StatValue::Float(f) => f.to_bits().hash(state),
            StatValue::Missing => {}
        }
    }
}

/// Display form used by the table view.
impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Text(s) => write!(f, "{s}"),
            StatValue::Integer(i) => write!(f, "{i}"),
            StatValue::Float(v) => write!(f, "{v:.3}"),
            StatValue::Missing => Ok(()),
        }
    }
}

impl StatValue {
    /// Interpret the value as an `f64` (numeric cells only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Float(v) => Some(*v),
            StatValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, StatValue::Integer(_) | StatValue::Float(_))
    }

    /// Text written to CSV. Floats keep their decimal point (`25.0`, not
    /// `25`) so a re-read infers the same column type and value.
    pub fn to_field(&self) -> String {
        match self {
            StatValue::Float(v) => format!("{v:?}"),
            other => other.to_string(),
        }
    }

    /// The zero a missing cell is replaced with, given its column kind.
    pub fn zero(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Integer => StatValue::Integer(0),
            ColumnKind::Float => StatValue::Float(0.0),
            ColumnKind::Text => StatValue::Text("0".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Column typing
// ---------------------------------------------------------------------------

/// Storage kind inferred for a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Infer the kind from raw cell text. Empty cells do not vote.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = ColumnKind::Integer;
        for cell in cells {
            if cell.is_empty() {
                continue;
            }
            match kind {
                ColumnKind::Integer if cell.parse::<i64>().is_ok() => {}
                ColumnKind::Integer | ColumnKind::Float if cell.parse::<f64>().is_ok() => {
                    kind = ColumnKind::Float;
                }
                _ => return ColumnKind::Text,
            }
        }
        kind
    }

    /// Parse one cell under this kind; empty text becomes the kind's zero.
    pub fn parse_cell(self, cell: &str) -> StatValue {
        if cell.is_empty() {
            return StatValue::zero(self);
        }
        match self {
            ColumnKind::Integer => cell
                .parse()
                .map(StatValue::Integer)
                .unwrap_or_else(|_| StatValue::Text(cell.to_string())),
            ColumnKind::Float => cell
                .parse()
                .map(StatValue::Float)
                .unwrap_or_else(|_| StatValue::Text(cell.to_string())),
            ColumnKind::Text => StatValue::Text(cell.to_string()),
        }
    }
}

/// Build typed rows from raw string rows: infer each column, then fill
/// empty cells with that column's zero.
pub fn typed_rows(width: usize, raw: &[Vec<String>]) -> Vec<Vec<StatValue>> {
    let kinds: Vec<ColumnKind> = (0..width)
        .map(|c| ColumnKind::infer(raw.iter().map(|r| r.get(c).map_or("", String::as_str))))
        .collect();
    typed_rows_as(&kinds, raw)
}

/// Build typed rows under known column kinds.
pub fn typed_rows_as(kinds: &[ColumnKind], raw: &[Vec<String>]) -> Vec<Vec<StatValue>> {
    raw.iter()
        .map(|r| {
            kinds
                .iter()
                .enumerate()
                .map(|(c, kind)| kind.parse_cell(r.get(c).map_or("", String::as_str)))
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PlayerStatsTable – one season of per-game averages
// ---------------------------------------------------------------------------

/// Row-oriented table: one row per player/team/season, columns in page order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatsTable {
    /// Column names in source order.
    pub columns: Vec<String>,
    /// Rows, each exactly `columns.len()` wide.
    pub rows: Vec<Vec<StatValue>>,
    /// For each column the sorted set of unique values.
    unique_values: BTreeMap<String, BTreeSet<StatValue>>,
}

impl PlayerStatsTable {
    /// Build the table and its column indices. Ragged rows are padded with
    /// [`StatValue::Missing`] or truncated to the header width.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<StatValue>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, StatValue::Missing);
        }

        let mut unique_values: BTreeMap<String, BTreeSet<StatValue>> = BTreeMap::new();
        for (c, name) in columns.iter().enumerate() {
            let set = unique_values.entry(name.clone()).or_default();
            for row in &rows {
                set.insert(row[c].clone());
            }
        }

        PlayerStatsTable {
            columns,
            rows,
            unique_values,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First column present among `names`.
    pub fn find_column<'a>(&self, names: &[&'a str]) -> Option<&'a str> {
        names.iter().copied().find(|n| self.column_index(n).is_some())
    }

    /// Sorted distinct values of a column.
    pub fn unique_values(&self, column: &str) -> Option<&BTreeSet<StatValue>> {
        self.unique_values.get(column)
    }

    /// Storage kind of each column as it is held now: text if any cell is
    /// text, float if any cell is a float, integer otherwise.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.width())
            .map(|c| {
                let cells = || self.rows.iter().map(|r| &r[c]);
                if cells().any(|v| matches!(v, StatValue::Text(_))) {
                    ColumnKind::Text
                } else if cells().any(|v| matches!(v, StatValue::Float(_))) {
                    ColumnKind::Float
                } else {
                    ColumnKind::Integer
                }
            })
            .collect()
    }

    /// Indices of columns whose every cell is numeric.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.width())
            .filter(|&c| !self.rows.is_empty() && self.rows.iter().all(|r| r[c].is_numeric()))
            .collect()
    }

    /// Column as `f64`; non-numeric cells map to NaN.
    pub fn column_f64(&self, column: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r[column].as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Drop a column by name. Returns whether it was present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.unique_values.remove(name);
        true
    }

    /// A new table holding only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> PlayerStatsTable {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        PlayerStatsTable::new(self.columns.clone(), rows)
    }
}
