use std::collections::{HashMap, HashSet};

use super::types::{Cell, ColumnKind};

pub fn unique_column_name(name: &str, idx: usize, existing_names: &mut HashSet<String>) -> String {
    let base_name = match name.trim() {
        "" => format!("Unnamed: {}", idx),
        trimmed => trimmed.to_string(),
    };

    let mut cleaned = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}.{}", base_name, counter);
        counter += 1;
    }

    cleaned
}

pub fn classify_cells(cells: Vec<Cell>) -> (ColumnKind, Vec<Cell>) {
    let (text_count, other_count) = cells.iter().fold((0, 0), |(text, other), cell| match cell {
        Cell::Text(_) => (text + 1, other),
        Cell::Boolean(_) | Cell::Other(_) => (text, other + 1),
        Cell::Null | Cell::Number(_) => (text, other),
    });

    if text_count > 0 {
        let cells = cells
            .into_iter()
            .map(|cell| match cell {
                Cell::Null | Cell::Text(_) => cell,
                other => Cell::Text(other.to_string()),
            })
            .collect();
        (ColumnKind::Categorical, cells)
    } else if other_count == 0 {
        (ColumnKind::Numerical, cells)
    } else {
        (ColumnKind::Other, cells)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

// Quantile with linear interpolation between closest ranks.
// `sorted` must be ascending.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values
}

pub fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    quantile(&sorted(values), 0.5)
}

// Most frequent non-null value; ties go to the value seen first.
pub fn mode(cells: &[Cell]) -> Option<Cell> {
    let mut counts: HashMap<&Cell, (usize, usize)> = HashMap::new();
    for (position, cell) in cells.iter().enumerate().filter(|(_, c)| !c.is_null()) {
        counts.entry(cell).or_insert((0, position)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(cell, _)| cell.clone())
}

pub fn value_counts(cells: &[Cell]) -> Vec<(&Cell, usize)> {
    let mut order: Vec<(&Cell, usize)> = Vec::new();
    let mut index: HashMap<&Cell, usize> = HashMap::new();
    for cell in cells.iter().filter(|c| !c.is_null()) {
        match index.get(cell) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                index.insert(cell, order.len());
                order.push((cell, 1));
            }
        }
    }
    order
}
