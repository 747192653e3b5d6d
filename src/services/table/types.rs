use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::utils::{classify_cells, unique_column_name};

pub const SAMPLE_SIZE: usize = 3;
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numerical,
    Categorical,
    Other,
}

// A single value of an uploaded sheet. `NaN` never appears inside
// `Number`; use `Cell::number` to build numeric cells.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
    Other(String),
}

impl Cell {
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Cell::Null
        } else {
            Cell::Number(value)
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

// -0.0 and 0.0 must land in the same duplicate bucket
fn number_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Number(a), Cell::Number(b)) => number_bits(*a) == number_bits(*b),
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Boolean(a), Cell::Boolean(b)) => a == b,
            (Cell::Other(a), Cell::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Null => {}
            Cell::Number(v) => number_bits(*v).hash(state),
            Cell::Text(s) | Cell::Other(s) => s.hash(state),
            Cell::Boolean(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) | Cell::Other(s) => write!(f, "{}", s),
            Cell::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        let (kind, cells) = classify_cells(cells);
        Self {
            name: name.into(),
            kind,
            cells,
        }
    }

    #[cfg(test)]
    pub fn with_kind(name: impl Into<String>, kind: ColumnKind, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_null()).count()
    }

    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().filter_map(Cell::as_number)
    }

    pub fn samples(&self) -> SmallVec<[String; SAMPLE_SIZE]> {
        self.cells
            .iter()
            .take(SAMPLE_SIZE)
            .map(|c| c.to_string())
            .collect()
    }

    fn estimated_size(&self) -> usize {
        let heap: usize = self
            .cells
            .iter()
            .map(|c| match c {
                Cell::Text(s) | Cell::Other(s) => s.len(),
                _ => 0,
            })
            .sum();
        self.name.len() + self.cells.len() * std::mem::size_of::<Cell>() + heap
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TableError {
    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("column '{name}' has {found} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        found: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        let expected = columns.first().map_or(0, Column::len);
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(TableError::DuplicateColumn(column.name().to_string()));
            }
            if column.len() != expected {
                return Err(TableError::RaggedColumn {
                    name: column.name().to_string(),
                    found: column.len(),
                    expected,
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn from_rows(headers: &[String], rows: Vec<Vec<Cell>>) -> Self {
        let mut buckets: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for row in rows {
            let mut row = row.into_iter();
            for bucket in buckets.iter_mut() {
                bucket.push(row.next().unwrap_or(Cell::Null));
            }
        }
        Self::from_column_cells(headers, buckets)
    }

    pub fn from_column_cells(headers: &[String], columns: Vec<Vec<Cell>>) -> Self {
        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut existing_names = HashSet::new();
        let columns = headers
            .iter()
            .enumerate()
            .zip(columns)
            .map(|((idx, name), mut cells)| {
                cells.resize(height, Cell::Null);
                Column::new(unique_column_name(name, idx, &mut existing_names), cells)
            })
            .collect();
        Self { columns }
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind() == kind)
            .map(Column::name)
            .collect()
    }

    pub fn row(&self, idx: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[idx]).collect()
    }

    pub fn null_count(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }

    pub fn duplicate_mask(&self) -> Vec<bool> {
        let mut seen = HashSet::with_capacity(self.height());
        (0..self.height()).map(|idx| !seen.insert(self.row(idx))).collect()
    }

    pub fn estimated_size(&self) -> usize {
        self.columns.iter().map(Column::estimated_size).sum()
    }

    pub fn retain_rows(&self, keep: &[bool]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                kind: column.kind,
                cells: column
                    .cells
                    .iter()
                    .zip(keep)
                    .filter(|(_, keep)| **keep)
                    .map(|(cell, _)| cell.clone())
                    .collect(),
            })
            .collect();
        Table { columns }
    }

    pub fn fill_nulls(&mut self, column_idx: usize, value: &Cell) -> usize {
        let Some(column) = self.columns.get_mut(column_idx) else {
            return 0;
        };
        let mut filled = 0;
        for cell in column.cells.iter_mut().filter(|c| c.is_null()) {
            *cell = value.clone();
            filled += 1;
        }
        filled
    }

    pub fn head(&self, n: usize) -> Vec<Vec<String>> {
        (0..self.height().min(n))
            .map(|idx| self.row(idx).into_iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rejects_ragged_columns() {
        let result = Table::new(vec![
            Column::new("a", vec![Cell::number(1.0), Cell::number(2.0)]),
            Column::new("b", vec![Cell::number(1.0)]),
        ]);
        assert!(matches!(result, Err(TableError::RaggedColumn { .. })));
    }

    #[test]
    fn test_table_rejects_duplicate_names() {
        let result = Table::new(vec![
            Column::new("a", vec![Cell::number(1.0)]),
            Column::new("a", vec![Cell::number(2.0)]),
        ]);
        assert_eq!(result, Err(TableError::DuplicateColumn("a".to_string())));
    }

    #[test]
    fn test_from_rows_pads_and_renames() {
        let headers = vec!["x".to_string(), "x".to_string(), "".to_string()];
        let table = Table::from_rows(
            &headers,
            vec![vec![Cell::number(1.0), Cell::text("a")], vec![]],
        );
        let names: Vec<&str> = table.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["x", "x.1", "Unnamed: 2"]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.null_count(), 4);
    }

    #[test]
    fn test_nan_is_null_and_zero_signs_match() {
        assert!(Cell::number(f64::NAN).is_null());
        assert_eq!(Cell::number(0.0), Cell::number(-0.0));
    }

    #[test]
    fn test_duplicate_mask_marks_later_copies() {
        let table = Table::new(vec![
            Column::new("x", vec![Cell::number(1.0), Cell::number(1.0), Cell::number(3.0)]),
            Column::new("y", vec![Cell::number(2.0), Cell::number(2.0), Cell::number(4.0)]),
        ])
        .unwrap();
        assert_eq!(table.duplicate_mask(), vec![false, true, false]);
    }

    #[test]
    fn test_head_renders_nulls_as_blank() {
        let table = Table::new(vec![Column::new(
            "age",
            vec![Cell::number(25.0), Cell::Null],
        )])
        .unwrap();
        assert_eq!(table.head(PREVIEW_ROWS), vec![vec!["25"], vec![""]]);
    }
}
