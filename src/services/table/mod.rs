pub mod chart;
pub mod cleaner;
pub mod profiler;
pub mod types;
pub mod utils;

pub use chart::{ChartRenderer, ChartRequest, ChartSpec, ChartType, PreconditionError};
pub use cleaner::{
    CategoricalStrategy, CleanSummary, CleaningPolicy, NumericalStrategy, TableCleaner,
};
pub use profiler::{ColumnProfile, ColumnSummary, TableProfiler, TableStats};
pub use types::{Cell, Column, ColumnKind, Table, PREVIEW_ROWS};
