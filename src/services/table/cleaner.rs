use serde::{Deserialize, Serialize};

use super::types::*;
use super::utils::{mean, median, mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericalStrategy {
    #[default]
    Drop,
    Mean,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalStrategy {
    #[default]
    Drop,
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPolicy {
    pub numerical: NumericalStrategy,
    pub categorical: CategoricalStrategy,
    pub drop_duplicates: bool,
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self {
            numerical: NumericalStrategy::Drop,
            categorical: CategoricalStrategy::Drop,
            drop_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub nulls_before: usize,
    pub nulls_after: usize,
    pub duplicates_removed: usize,
    pub rows_dropped_for_nulls: usize,
    pub cells_filled: usize,
    pub unfilled_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub table: Table,
    pub changed: bool,
    pub summary: CleanSummary,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TableCleaner;

impl TableCleaner {
    pub fn clean(&self, table: &Table, policy: &CleaningPolicy) -> CleanOutcome {
        tracing::info!(
            "Cleaning {} rows with policy {:?}",
            table.height(),
            policy
        );
        let mut summary = CleanSummary {
            rows_before: table.height(),
            nulls_before: table.null_count(),
            ..Default::default()
        };
        let mut current = table.clone();

        if policy.drop_duplicates {
            let mask = current.duplicate_mask();
            summary.duplicates_removed = mask.iter().filter(|d| **d).count();
            if summary.duplicates_removed > 0 {
                let keep: Vec<bool> = mask.iter().map(|d| !d).collect();
                current = current.retain_rows(&keep);
                tracing::debug!("Removed {} duplicate rows", summary.duplicates_removed);
            }
        }

        let numerical = column_indices(&current, ColumnKind::Numerical);
        let categorical = column_indices(&current, ColumnKind::Categorical);

        let numerical_nulls = has_nulls(&current, &numerical);
        if numerical_nulls {
            match policy.numerical {
                NumericalStrategy::Drop => {
                    current = drop_null_rows(&current, &numerical, &mut summary);
                }
                NumericalStrategy::Mean => {
                    fill_nulls(&mut current, &numerical, &mut summary, |column| {
                        let values: Vec<f64> = column.numbers().collect();
                        mean(&values).map(Cell::Number)
                    });
                }
                NumericalStrategy::Median => {
                    fill_nulls(&mut current, &numerical, &mut summary, |column| {
                        median(column.numbers()).map(Cell::Number)
                    });
                }
            }
        }

        let categorical_nulls = has_nulls(&current, &categorical);
        if categorical_nulls {
            match policy.categorical {
                CategoricalStrategy::Drop => {
                    current = drop_null_rows(&current, &categorical, &mut summary);
                }
                CategoricalStrategy::Mode => {
                    fill_nulls(&mut current, &categorical, &mut summary, |column| {
                        mode(column.cells())
                    });
                }
            }
        }

        summary.rows_after = current.height();
        summary.nulls_after = current.null_count();
        // a step counts as a change once its column set held a null, even if
        // an all-null column could not be filled
        let changed = summary.duplicates_removed > 0 || numerical_nulls || categorical_nulls;

        tracing::info!(
            "Cleaning finished: {} -> {} rows, {} -> {} nulls",
            summary.rows_before,
            summary.rows_after,
            summary.nulls_before,
            summary.nulls_after
        );

        CleanOutcome {
            table: current,
            changed,
            summary,
        }
    }
}

fn column_indices(table: &Table, kind: ColumnKind) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind() == kind)
        .map(|(idx, _)| idx)
        .collect()
}

fn has_nulls(table: &Table, indices: &[usize]) -> bool {
    indices
        .iter()
        .any(|&idx| table.columns()[idx].null_count() > 0)
}

// A row goes if any of the given columns is null in it.
fn drop_null_rows(table: &Table, indices: &[usize], summary: &mut CleanSummary) -> Table {
    let columns = table.columns();
    let keep: Vec<bool> = (0..table.height())
        .map(|row| indices.iter().all(|&idx| !columns[idx].cells()[row].is_null()))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    summary.rows_dropped_for_nulls += dropped;
    tracing::debug!("Dropped {} rows holding nulls", dropped);
    table.retain_rows(&keep)
}

fn fill_nulls<F>(table: &mut Table, indices: &[usize], summary: &mut CleanSummary, aggregate: F)
where
    F: Fn(&Column) -> Option<Cell>,
{
    for &idx in indices {
        let column = &table.columns()[idx];
        if column.null_count() == 0 {
            continue;
        }
        match aggregate(column) {
            Some(value) => summary.cells_filled += table.fill_nulls(idx, &value),
            None => {
                let name = column.name().to_string();
                tracing::warn!("Column '{}' has no values to aggregate, leaving nulls in place", name);
                summary.unfilled_columns.push(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(
        numerical: NumericalStrategy,
        categorical: CategoricalStrategy,
        drop_duplicates: bool,
    ) -> CleaningPolicy {
        CleaningPolicy {
            numerical,
            categorical,
            drop_duplicates,
        }
    }

    #[test]
    fn test_mean_fill_leaves_clean_categoricals() {
        let table = Table::new(vec![
            Column::new("age", vec![Cell::number(25.0), Cell::Null, Cell::number(35.0)]),
            Column::new("city", vec![Cell::text("NY"), Cell::text("NY"), Cell::text("LA")]),
        ])
        .unwrap();

        let outcome = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Mean, CategoricalStrategy::Mode, false),
        );

        assert!(outcome.changed);
        assert_eq!(
            outcome.table.column("age").unwrap().cells(),
            &[Cell::number(25.0), Cell::number(30.0), Cell::number(35.0)]
        );
        assert_eq!(outcome.table.column("city"), table.column("city"));
        assert_eq!(outcome.summary.cells_filled, 1);
        assert_eq!(outcome.summary.nulls_after, 0);
    }

    #[test]
    fn test_drop_duplicates_keeps_distinct_rows() {
        let table = Table::new(vec![
            Column::new("x", vec![Cell::number(1.0), Cell::number(1.0), Cell::number(3.0)]),
            Column::new("y", vec![Cell::number(2.0), Cell::number(2.0), Cell::number(4.0)]),
        ])
        .unwrap();
        let policy = CleaningPolicy::default();

        let outcome = TableCleaner.clean(&table, &policy);
        assert_eq!(outcome.table.height(), 2);
        assert_eq!(outcome.summary.duplicates_removed, 1);
        assert!(outcome.changed);

        let again = TableCleaner.clean(&outcome.table, &policy);
        assert!(!again.changed);
        assert_eq!(again.table, outcome.table);
    }

    #[test]
    fn test_numerical_drop_is_joint() {
        let table = Table::new(vec![
            Column::new("a", vec![Cell::number(1.0), Cell::Null, Cell::number(3.0), Cell::number(4.0)]),
            Column::new("b", vec![Cell::number(1.0), Cell::number(2.0), Cell::Null, Cell::number(4.0)]),
        ])
        .unwrap();

        let outcome = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Drop, CategoricalStrategy::Mode, false),
        );
        assert_eq!(
            outcome.table.column("a").unwrap().cells(),
            &[Cell::number(1.0), Cell::number(4.0)]
        );
        assert_eq!(outcome.summary.rows_dropped_for_nulls, 2);
    }

    #[test]
    fn test_categorical_drop_cascades_after_mean() {
        let table = Table::new(vec![
            Column::new("score", vec![Cell::Null, Cell::number(2.0), Cell::number(4.0)]),
            Column::new("team", vec![Cell::text("red"), Cell::Null, Cell::text("blue")]),
        ])
        .unwrap();

        let outcome = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Mean, CategoricalStrategy::Drop, true),
        );
        // mean is taken before the categorical drop: (2 + 4) / 2
        assert_eq!(
            outcome.table.column("score").unwrap().cells(),
            &[Cell::number(3.0), Cell::number(4.0)]
        );
        assert_eq!(
            outcome.table.column("team").unwrap().cells(),
            &[Cell::text("red"), Cell::text("blue")]
        );
    }

    #[test]
    fn test_median_and_mode_fill() {
        let table = Table::new(vec![
            Column::new("n", vec![Cell::number(1.0), Cell::number(10.0), Cell::number(2.0), Cell::Null]),
            Column::new("c", vec![Cell::text("b"), Cell::text("a"), Cell::Null, Cell::text("a")]),
        ])
        .unwrap();

        let outcome = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Median, CategoricalStrategy::Mode, false),
        );
        assert_eq!(outcome.table.column("n").unwrap().cells()[3], Cell::number(2.0));
        assert_eq!(outcome.table.column("c").unwrap().cells()[2], Cell::text("a"));
        assert_eq!(outcome.summary.cells_filled, 2);
    }

    #[test]
    fn test_all_null_column_stays_null() {
        let table = Table::new(vec![
            Column::with_kind("empty", ColumnKind::Numerical, vec![Cell::Null, Cell::Null]),
            Column::new("label", vec![Cell::text("a"), Cell::text("b")]),
        ])
        .unwrap();

        let outcome = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Mean, CategoricalStrategy::Mode, false),
        );
        assert_eq!(outcome.table.null_count(), 2);
        assert_eq!(outcome.summary.unfilled_columns, vec!["empty".to_string()]);
        assert_eq!(outcome.summary.cells_filled, 0);
        assert!(outcome.changed);
    }

    #[test]
    fn test_fill_values_are_taken_after_dedupe() {
        let table = Table::new(vec![
            Column::new("x", vec![Cell::number(1.0), Cell::number(1.0), Cell::Null, Cell::number(4.0)]),
            Column::new("g", vec![Cell::text("p"), Cell::text("p"), Cell::text("q"), Cell::text("r")]),
        ])
        .unwrap();

        let mean = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Mean, CategoricalStrategy::Drop, true),
        );
        assert_eq!(
            mean.table.column("x").unwrap().cells(),
            &[Cell::number(1.0), Cell::number(2.5), Cell::number(4.0)]
        );

        let median = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Median, CategoricalStrategy::Drop, true),
        );
        assert_eq!(median.table.column("x").unwrap().cells()[1], Cell::number(2.5));

        // without dedupe the repeated 1 pulls the mean down
        let kept = TableCleaner.clean(
            &table,
            &policy(NumericalStrategy::Mean, CategoricalStrategy::Drop, false),
        );
        assert_eq!(kept.table.column("x").unwrap().cells()[2], Cell::number(2.0));
    }

    #[test]
    fn test_other_columns_are_untouched() {
        let table = Table::new(vec![
            Column::new("flag", vec![Cell::Boolean(true), Cell::Null]),
            Column::new("v", vec![Cell::number(1.0), Cell::number(2.0)]),
        ])
        .unwrap();
        assert_eq!(table.column("flag").unwrap().kind(), ColumnKind::Other);

        let outcome = TableCleaner.clean(&table, &CleaningPolicy::default());
        assert_eq!(outcome.table, table);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_clean_preserves_row_order_and_never_adds_nulls() {
        let table = Table::new(vec![
            Column::new("id", vec![Cell::number(5.0), Cell::number(3.0), Cell::Null, Cell::number(1.0), Cell::number(3.0)]),
            Column::new("tag", vec![Cell::text("e"), Cell::text("c"), Cell::text("x"), Cell::Null, Cell::text("c")]),
        ])
        .unwrap();

        let outcome = TableCleaner.clean(&table, &CleaningPolicy::default());
        assert_eq!(
            outcome.table.column("id").unwrap().cells(),
            &[Cell::number(5.0), Cell::number(3.0)]
        );
        assert!(outcome.summary.nulls_after <= outcome.summary.nulls_before);
        assert_eq!(table.height(), 5);
    }
}
