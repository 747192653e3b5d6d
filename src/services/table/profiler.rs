use rayon::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashSet;

use super::types::*;
use super::utils::{mean, median, mode, quantile, sorted, std_dev};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub row_count: usize,
    pub column_count: usize,
    pub null_count: usize,
    pub duplicate_count: usize,
    pub memory_bytes: usize,
    pub kind_count: usize,
}

impl TableStats {
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / 1024.0 / 1024.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    pub null_count: usize,
    pub unique_count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TableProfiler;

impl TableProfiler {
    pub fn profile(&self, table: &Table) -> TableStats {
        let start = std::time::Instant::now();

        let null_count: usize = table
            .columns()
            .par_iter()
            .map(Column::null_count)
            .sum();
        let duplicate_count = table.duplicate_mask().into_iter().filter(|d| *d).count();
        let kinds: HashSet<ColumnKind> = table.columns().iter().map(Column::kind).collect();

        let stats = TableStats {
            row_count: table.height(),
            column_count: table.width(),
            null_count,
            duplicate_count,
            memory_bytes: table.estimated_size(),
            kind_count: kinds.len(),
        };
        tracing::debug!(
            "Profiled {} rows x {} columns in {:?}",
            stats.row_count,
            stats.column_count,
            start.elapsed()
        );
        stats
    }

    pub fn describe(&self, table: &Table) -> Vec<ColumnSummary> {
        table
            .columns()
            .par_iter()
            .filter(|c| c.kind() == ColumnKind::Numerical)
            .map(|column| {
                let values = sorted(column.numbers());
                ColumnSummary {
                    name: column.name().to_string(),
                    count: values.len(),
                    mean: mean(&values),
                    std: std_dev(&values),
                    min: values.first().copied(),
                    q1: quantile(&values, 0.25),
                    median: quantile(&values, 0.5),
                    q3: quantile(&values, 0.75),
                    max: values.last().copied(),
                }
            })
            .collect()
    }

    pub fn profile_columns(&self, table: &Table) -> Vec<ColumnProfile> {
        table
            .columns()
            .par_iter()
            .map(|column| self.analyze_column(column))
            .collect()
    }

    fn analyze_column(&self, column: &Column) -> ColumnProfile {
        let (null_count, seen_values) = column
            .cells()
            .par_iter()
            .fold(
                || (0usize, HashSet::new()),
                |(mut nulls, mut seen), cell| {
                    if cell.is_null() {
                        nulls += 1;
                    } else {
                        seen.insert(cell);
                    }
                    (nulls, seen)
                },
            )
            .reduce(
                || (0usize, HashSet::new()),
                |a, b| {
                    let mut combined_set = a.1;
                    combined_set.extend(b.1);
                    (a.0 + b.0, combined_set)
                },
            );

        let (mean, median) = match column.kind() {
            ColumnKind::Numerical => {
                let values: Vec<f64> = column.numbers().collect();
                (mean(&values), median(values.into_iter()))
            }
            _ => (None, None),
        };

        ColumnProfile {
            name: column.name().to_string(),
            kind: column.kind(),
            sample_values: column.samples(),
            null_count,
            unique_count: seen_values.len(),
            mean,
            median,
            mode: mode(column.cells()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::new(vec![
            Column::new("age", vec![Cell::number(25.0), Cell::Null, Cell::number(35.0), Cell::number(25.0)]),
            Column::new("city", vec![Cell::text("NY"), Cell::text("NY"), Cell::text("LA"), Cell::text("NY")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_profile_counts() {
        let stats = TableProfiler.profile(&people());
        assert_eq!(stats.row_count, 4);
        assert_eq!(stats.column_count, 2);
        assert_eq!(stats.null_count, 1);
        assert_eq!(stats.duplicate_count, 1);
        assert_eq!(stats.kind_count, 2);
        assert!(stats.memory_bytes > 0);
    }

    #[test]
    fn test_profile_empty_table() {
        let table = Table::new(vec![
            Column::with_kind("a", ColumnKind::Numerical, vec![]),
            Column::with_kind("b", ColumnKind::Numerical, vec![]),
        ])
        .unwrap();
        let stats = TableProfiler.profile(&table);
        assert_eq!(stats.row_count, 0);
        assert_eq!(stats.column_count, 2);
        assert_eq!(stats.null_count, 0);
        assert_eq!(stats.duplicate_count, 0);

        let summary = TableProfiler.describe(&table);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].count, 0);
        assert_eq!(summary[0].mean, None);
    }

    #[test]
    fn test_profile_zero_columns() {
        let stats = TableProfiler.profile(&Table::default());
        assert_eq!(stats.row_count, 0);
        assert_eq!(stats.column_count, 0);
        assert_eq!(stats.kind_count, 0);
    }

    #[test]
    fn test_duplicate_count_ignores_row_order() {
        let shuffled = Table::new(vec![
            Column::new("age", vec![Cell::number(25.0), Cell::number(35.0), Cell::number(25.0), Cell::Null]),
            Column::new("city", vec![Cell::text("NY"), Cell::text("LA"), Cell::text("NY"), Cell::text("NY")]),
        ])
        .unwrap();
        assert_eq!(
            TableProfiler.profile(&shuffled).duplicate_count,
            TableProfiler.profile(&people()).duplicate_count
        );
    }

    #[test]
    fn test_describe_skips_categorical() {
        let summary = TableProfiler.describe(&people());
        assert_eq!(summary.len(), 1);
        let age = &summary[0];
        assert_eq!(age.name, "age");
        assert_eq!(age.count, 3);
        assert_eq!(age.min, Some(25.0));
        assert_eq!(age.median, Some(25.0));
        assert_eq!(age.max, Some(35.0));
        assert!((age.mean.unwrap() - 85.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_column_profiles() {
        let profiles = TableProfiler.profile_columns(&people());
        let city = &profiles[1];
        assert_eq!(city.kind, ColumnKind::Categorical);
        assert_eq!(city.unique_count, 2);
        assert_eq!(city.mode, Some(Cell::text("NY")));
        assert_eq!(city.mean, None);
        assert_eq!(profiles[0].null_count, 1);
        assert_eq!(profiles[0].median, Some(25.0));
    }
}
