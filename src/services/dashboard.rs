use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::services::session::SessionDataStore;
use crate::services::table::{
    ChartRenderer, ChartRequest, ChartSpec, CleanSummary, CleaningPolicy, ColumnProfile,
    ColumnSummary, PreconditionError, Table, TableCleaner, TableProfiler, TableStats,
    PREVIEW_ROWS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Cleaning,
    Visualization,
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Panel::Cleaning => write!(f, "cleaning"),
            Panel::Visualization => write!(f, "visualization"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DashboardError {
    #[error("No data found! Please upload a file first.")]
    NoDataset,
    #[error("The {0} panel is closed")]
    PanelClosed(Panel),
    #[error("The uploaded file is empty or could not be read")]
    EmptyUpload,
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

#[derive(Debug, Clone)]
pub enum Command {
    Upload(Table),
    OpenCleaning,
    CloseCleaning,
    Clean(CleaningPolicy),
    ShowVisualization,
    HideVisualization,
    Ask(String),
    Clear,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetOverview {
    pub preview: Vec<Vec<String>>,
    pub columns: Vec<String>,
    pub stats: TableStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub changed: bool,
    pub summary: CleanSummary,
    pub overview: DatasetOverview,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub stats: TableStats,
    pub columns: Vec<ColumnProfile>,
    pub summary: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Previewed(DatasetOverview),
    PanelChanged { panel: Panel, open: bool },
    Cleaned(CleanReport),
    Answered { question: String, answer: String },
    Cleared,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardController {
    profiler: TableProfiler,
    cleaner: TableCleaner,
    renderer: ChartRenderer,
}

impl DashboardController {
    pub fn apply(
        &self,
        state: &SessionDataStore,
        command: Command,
    ) -> Result<(SessionDataStore, Outcome), DashboardError> {
        let mut next = state.clone();
        let outcome = match command {
            Command::Upload(table) => {
                if table.is_empty() {
                    return Err(DashboardError::EmptyUpload);
                }
                let table = Arc::new(table);
                let overview = self.overview_of(&table);
                info!(
                    "Loaded dataset: {} rows x {} columns, {:.2} MB",
                    overview.stats.row_count,
                    overview.stats.column_count,
                    overview.stats.memory_mb()
                );
                next.set_original(Arc::clone(&table));
                next.set_current(table);
                Outcome::Previewed(overview)
            }
            Command::OpenCleaning => {
                require_dataset(state)?;
                next.show_cleaning();
                Outcome::PanelChanged {
                    panel: Panel::Cleaning,
                    open: true,
                }
            }
            Command::CloseCleaning => {
                next.hide_cleaning();
                Outcome::PanelChanged {
                    panel: Panel::Cleaning,
                    open: false,
                }
            }
            Command::Clean(policy) => {
                let current = require_dataset(state)?;
                if !state.cleaning_panel_open() {
                    return Err(DashboardError::PanelClosed(Panel::Cleaning));
                }

                let start = Instant::now();
                let result = self.cleaner.clean(current, &policy);
                info!(
                    "Cleaned dataset in {:?}: {} -> {} rows, changed: {}",
                    start.elapsed(),
                    result.summary.rows_before,
                    result.summary.rows_after,
                    result.changed
                );

                if result.changed {
                    next.set_current(Arc::new(result.table));
                }
                let overview = match next.current() {
                    Some(table) => self.overview_of(table),
                    None => return Err(DashboardError::NoDataset),
                };
                Outcome::Cleaned(CleanReport {
                    changed: result.changed,
                    summary: result.summary,
                    overview,
                })
            }
            Command::ShowVisualization => {
                require_dataset(state)?;
                next.show_visualization();
                Outcome::PanelChanged {
                    panel: Panel::Visualization,
                    open: true,
                }
            }
            Command::HideVisualization => {
                next.hide_visualization();
                Outcome::PanelChanged {
                    panel: Panel::Visualization,
                    open: false,
                }
            }
            Command::Ask(question) => {
                require_dataset(state)?;
                let question = question.trim().to_string();
                let answer = format!("AI is analyzing: '{}' (Feature coming soon...)", question);
                next.set_data_question(question.clone());
                Outcome::Answered { question, answer }
            }
            // the dataset stays; only the question and panels reset
            Command::Clear => {
                next.clear_data_question();
                next.hide_cleaning();
                next.hide_visualization();
                Outcome::Cleared
            }
        };

        debug!("Session moved {:?} -> {:?}", state.phase(), next.phase());
        Ok((next, outcome))
    }

    pub fn render(
        &self,
        state: &SessionDataStore,
        request: &ChartRequest,
    ) -> Result<ChartSpec, DashboardError> {
        let current = require_dataset(state)?;
        if !state.visualization_panel_open() {
            return Err(DashboardError::PanelClosed(Panel::Visualization));
        }
        let start = Instant::now();
        let spec = self.renderer.render(current, request)?;
        info!("Rendered {} in {:?}", request.chart, start.elapsed());
        Ok(spec)
    }

    pub fn overview(&self, state: &SessionDataStore) -> Result<DatasetOverview, DashboardError> {
        require_dataset(state).map(|table| self.overview_of(table))
    }

    pub fn stats(&self, state: &SessionDataStore) -> Result<StatsReport, DashboardError> {
        let table = require_dataset(state)?;
        Ok(StatsReport {
            stats: self.profiler.profile(table),
            columns: self.profiler.profile_columns(table),
            summary: self.profiler.describe(table),
        })
    }

    fn overview_of(&self, table: &Table) -> DatasetOverview {
        DatasetOverview {
            preview: table.head(PREVIEW_ROWS),
            columns: table
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            stats: self.profiler.profile(table),
        }
    }
}

fn require_dataset(state: &SessionDataStore) -> Result<&Table, DashboardError> {
    state
        .current()
        .map(|table| table.as_ref())
        .ok_or(DashboardError::NoDataset)
}
