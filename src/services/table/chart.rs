use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

use super::types::*;
use super::utils::{quantile, sorted, value_counts};

pub const HISTOGRAM_BINS: usize = 30;
const WHISKER_RANGE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    InteractiveCharts,
    BoxPlot,
    Histogram,
    ScatterPlot,
    BarChart,
    LineChart,
    PieChart,
}

impl ChartType {
    #[cfg(test)]
    pub const ALL: [ChartType; 7] = [
        ChartType::InteractiveCharts,
        ChartType::BoxPlot,
        ChartType::Histogram,
        ChartType::ScatterPlot,
        ChartType::BarChart,
        ChartType::LineChart,
        ChartType::PieChart,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChartType::InteractiveCharts => "Interactive Charts",
            ChartType::BoxPlot => "Box Plot",
            ChartType::Histogram => "Histogram",
            ChartType::ScatterPlot => "Scatter Plot",
            ChartType::BarChart => "Bar Chart",
            ChartType::LineChart => "Line Chart",
            ChartType::PieChart => "Pie Chart",
        }
    }

    fn max_selections(&self) -> usize {
        match self {
            ChartType::BoxPlot | ChartType::Histogram | ChartType::PieChart => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub chart: ChartType,
    #[serde(default)]
    pub columns: SmallVec<[String; 2]>,
    #[serde(default)]
    pub distribution: Option<String>,
}

impl ChartRequest {
    pub fn new(chart: ChartType) -> Self {
        Self {
            chart,
            columns: SmallVec::new(),
            distribution: None,
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    fn selection(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreconditionError {
    #[error("{chart} needs at least {required} {kind:?} column(s), found {found}")]
    NotEnoughColumns {
        chart: ChartType,
        kind: ColumnKind,
        required: usize,
        found: usize,
    },
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("{chart} needs a {expected:?} column, '{column}' is {actual:?}")]
    WrongKind {
        chart: ChartType,
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },
    #[error("{chart} takes at most {max} column(s), got {given}")]
    TooManyColumns {
        chart: ChartType,
        max: usize,
        given: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointChart {
    pub title: String,
    pub x: String,
    pub y: String,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramChart {
    pub title: String,
    pub column: String,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotChart {
    pub title: String,
    pub column: String,
    pub summary: Option<BoxSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x: String,
    pub y: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
    pub percent: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub title: String,
    pub column: String,
    pub slices: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSpec {
    InteractiveCharts {
        scatter: Option<PointChart>,
        histogram: HistogramChart,
    },
    BoxPlot(BoxPlotChart),
    Histogram(HistogramChart),
    ScatterPlot(PointChart),
    BarChart(BarChart),
    LineChart(PointChart),
    PieChart(PieChart),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChartRenderer;

impl ChartRenderer {
    pub fn render(&self, table: &Table, request: &ChartRequest) -> Result<ChartSpec, PreconditionError> {
        let chart = request.chart;
        if request.columns.len() > chart.max_selections() {
            return Err(PreconditionError::TooManyColumns {
                chart,
                max: chart.max_selections(),
                given: request.columns.len(),
            });
        }
        tracing::info!("Rendering {} over {} rows", chart, table.height());

        let spec = match chart {
            ChartType::InteractiveCharts => {
                let numerical = eligible(table, chart, ColumnKind::Numerical, 1)?;
                let scatter = if numerical.len() >= 2 {
                    let (x, y) = pick_pair(chart, table, request, &numerical)?;
                    Some(point_chart(format!("{} vs {}", y.name(), x.name()), x, y))
                } else if !request.columns.is_empty() {
                    return Err(PreconditionError::NotEnoughColumns {
                        chart,
                        kind: ColumnKind::Numerical,
                        required: 2,
                        found: numerical.len(),
                    });
                } else {
                    None
                };
                let column = pick(
                    chart,
                    table,
                    request.distribution.as_deref(),
                    ColumnKind::Numerical,
                    &numerical,
                    0,
                )?;
                ChartSpec::InteractiveCharts {
                    scatter,
                    histogram: histogram(format!("Dist of {}", column.name()), column),
                }
            }
            ChartType::BoxPlot => {
                let numerical = eligible(table, chart, ColumnKind::Numerical, 1)?;
                let column = pick(chart, table, request.selection(0), ColumnKind::Numerical, &numerical, 0)?;
                ChartSpec::BoxPlot(box_plot(column))
            }
            ChartType::Histogram => {
                let numerical = eligible(table, chart, ColumnKind::Numerical, 1)?;
                let column = pick(chart, table, request.selection(0), ColumnKind::Numerical, &numerical, 0)?;
                ChartSpec::Histogram(histogram(format!("Histogram of {}", column.name()), column))
            }
            ChartType::ScatterPlot => {
                let numerical = eligible(table, chart, ColumnKind::Numerical, 2)?;
                let (x, y) = pick_pair(chart, table, request, &numerical)?;
                ChartSpec::ScatterPlot(point_chart(
                    format!("Scatter: {} vs {}", x.name(), y.name()),
                    x,
                    y,
                ))
            }
            ChartType::BarChart => {
                let categorical = eligible(table, chart, ColumnKind::Categorical, 1)?;
                let numerical = eligible(table, chart, ColumnKind::Numerical, 1)?;
                let x = pick(chart, table, request.selection(0), ColumnKind::Categorical, &categorical, 0)?;
                let y = pick(chart, table, request.selection(1), ColumnKind::Numerical, &numerical, 0)?;
                ChartSpec::BarChart(bar_chart(x, y))
            }
            ChartType::LineChart => {
                let numerical = eligible(table, chart, ColumnKind::Numerical, 2)?;
                let (x, y) = pick_pair(chart, table, request, &numerical)?;
                ChartSpec::LineChart(point_chart(
                    format!("Line: {} vs {}", x.name(), y.name()),
                    x,
                    y,
                ))
            }
            ChartType::PieChart => {
                let categorical = eligible(table, chart, ColumnKind::Categorical, 1)?;
                let column = pick(chart, table, request.selection(0), ColumnKind::Categorical, &categorical, 0)?;
                ChartSpec::PieChart(pie_chart(column))
            }
        };
        Ok(spec)
    }
}

fn eligible(
    table: &Table,
    chart: ChartType,
    kind: ColumnKind,
    required: usize,
) -> Result<Vec<&Column>, PreconditionError> {
    let columns: Vec<&Column> = table.columns().iter().filter(|c| c.kind() == kind).collect();
    if columns.len() < required {
        return Err(PreconditionError::NotEnoughColumns {
            chart,
            kind,
            required,
            found: columns.len(),
        });
    }
    Ok(columns)
}

fn pick<'a>(
    chart: ChartType,
    table: &'a Table,
    requested: Option<&str>,
    kind: ColumnKind,
    candidates: &[&'a Column],
    default_idx: usize,
) -> Result<&'a Column, PreconditionError> {
    match requested {
        Some(name) => {
            let column = table
                .column(name)
                .ok_or_else(|| PreconditionError::UnknownColumn(name.to_string()))?;
            if column.kind() != kind {
                return Err(PreconditionError::WrongKind {
                    chart,
                    column: name.to_string(),
                    expected: kind,
                    actual: column.kind(),
                });
            }
            Ok(column)
        }
        None => candidates
            .get(default_idx)
            .or_else(|| candidates.first())
            .copied()
            .ok_or(PreconditionError::NotEnoughColumns {
                chart,
                kind,
                required: 1,
                found: 0,
            }),
    }
}

fn pick_pair<'a>(
    chart: ChartType,
    table: &'a Table,
    request: &ChartRequest,
    numerical: &[&'a Column],
) -> Result<(&'a Column, &'a Column), PreconditionError> {
    let x = pick(chart, table, request.selection(0), ColumnKind::Numerical, numerical, 0)?;
    let y = pick(chart, table, request.selection(1), ColumnKind::Numerical, numerical, 1)?;
    Ok((x, y))
}

// Rows where both cells are numbers, in row order.
fn point_chart(title: String, x: &Column, y: &Column) -> PointChart {
    let points = x
        .cells()
        .iter()
        .zip(y.cells())
        .filter_map(|(a, b)| Some([a.as_number()?, b.as_number()?]))
        .collect();
    PointChart {
        title,
        x: x.name().to_string(),
        y: y.name().to_string(),
        points,
    }
}

// Equal-width bins over `[min, max]`, the last bin closed on the right.
fn histogram(title: String, column: &Column) -> HistogramChart {
    let values: Vec<f64> = column.numbers().collect();
    let (lower, upper) = match (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) {
        (Some(min), Some(max)) if min == max => (min - 0.5, max + 0.5),
        (Some(min), Some(max)) => (min, max),
        _ => (0.0, 1.0),
    };
    let width = (upper - lower) / HISTOGRAM_BINS as f64;

    let mut counts = [0usize; HISTOGRAM_BINS];
    for value in &values {
        let idx = ((value - lower) / width).floor() as usize;
        counts[idx.min(HISTOGRAM_BINS - 1)] += 1;
    }

    let bins = counts
        .iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            lower: lower + idx as f64 * width,
            upper: if idx + 1 == HISTOGRAM_BINS {
                upper
            } else {
                lower + (idx + 1) as f64 * width
            },
            count: *count,
        })
        .collect();

    HistogramChart {
        title,
        column: column.name().to_string(),
        bins,
    }
}

fn box_plot(column: &Column) -> BoxPlotChart {
    let values = sorted(column.numbers());
    let summary = match (
        quantile(&values, 0.25),
        quantile(&values, 0.5),
        quantile(&values, 0.75),
    ) {
        (Some(q1), Some(median), Some(q3)) => {
            let iqr = q3 - q1;
            let low_limit = q1 - WHISKER_RANGE * iqr;
            let high_limit = q3 + WHISKER_RANGE * iqr;
            let (inside, outliers): (Vec<f64>, Vec<f64>) = values
                .iter()
                .copied()
                .partition(|v| *v >= low_limit && *v <= high_limit);
            Some(BoxSummary {
                count: values.len(),
                q1,
                median,
                q3,
                whisker_low: inside.first().copied().unwrap_or(q1),
                whisker_high: inside.last().copied().unwrap_or(q3),
                outliers,
            })
        }
        _ => None,
    };
    BoxPlotChart {
        title: format!("Box Plot of {}", column.name()),
        column: column.name().to_string(),
        summary,
    }
}

fn bar_chart(x: &Column, y: &Column) -> BarChart {
    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<&Cell, usize> = HashMap::new();
    for (label, value) in x.cells().iter().zip(y.cells()) {
        let Some(value) = value.as_number() else {
            continue;
        };
        if label.is_null() {
            continue;
        }
        let slot = *index.entry(label).or_insert_with(|| {
            groups.push((label.to_string(), 0.0, 0));
            groups.len() - 1
        });
        groups[slot].1 += value;
        groups[slot].2 += 1;
    }

    BarChart {
        title: format!("Mean of {} by {}", y.name(), x.name()),
        x: x.name().to_string(),
        y: y.name().to_string(),
        bars: groups
            .into_iter()
            .map(|(label, sum, count)| Bar {
                label,
                value: sum / count as f64,
            })
            .collect(),
    }
}

// Value counts, largest first; equal counts keep first-appearance order.
fn pie_chart(column: &Column) -> PieChart {
    let mut counts = value_counts(column.cells());
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let total: usize = counts.iter().map(|(_, count)| count).sum();

    let slices = counts
        .into_iter()
        .map(|(cell, count)| {
            let percent = round_one_decimal(count as f64 * 100.0 / total as f64);
            PieSlice {
                label: cell.to_string(),
                count,
                percent,
                display: format!("{:.1}%", percent),
            }
        })
        .collect();

    PieChart {
        title: format!("Share of {}", column.name()),
        column: column.name().to_string(),
        slices,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
