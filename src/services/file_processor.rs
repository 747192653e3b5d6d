use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use polars::prelude::*;
use std::io::Cursor;

use crate::services::table::{Cell, Table};

// Markers read as missing, matching what spreadsheet exports commonly emit.
const NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Failed to open Excel file: {0}")]
    Workbook(String),
    #[error("Failed to parse delimited file: {0}")]
    Delimited(String),
    #[error("The uploaded file is empty or could not be read")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Xlsx,
    Tsv,
}

impl UploadFormat {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".csv") {
            UploadFormat::Csv
        } else if lower.ends_with(".xlsx") {
            UploadFormat::Xlsx
        } else {
            UploadFormat::Tsv
        }
    }
}

pub fn decode_upload(filename: &str, file_data: Bytes) -> Result<Table, DecodeError> {
    let start = std::time::Instant::now();
    let format = UploadFormat::from_filename(filename);
    tracing::info!(
        "Decoding {} as {:?}, size: {}KB",
        filename,
        format,
        file_data.len() / 1024
    );

    let table = match format {
        UploadFormat::Csv => read_delimited(file_data, b',')?,
        UploadFormat::Tsv => read_delimited(file_data, b'\t')?,
        UploadFormat::Xlsx => read_workbook(file_data)?,
    };

    if table.is_empty() {
        tracing::warn!("Upload {} produced an empty table", filename);
        return Err(DecodeError::Empty);
    }

    tracing::info!(
        "Decoded {} rows x {} columns in {:?}",
        table.height(),
        table.width(),
        start.elapsed()
    );
    Ok(table)
}

fn read_delimited(file_data: Bytes, separator: u8) -> Result<Table, DecodeError> {
    let df = CsvReader::new(Cursor::new(file_data.to_vec()))
        .has_header(true)
        .with_separator(separator)
        .with_null_values(Some(NullValues::AllColumns(
            NULL_MARKERS.iter().map(|marker| marker.to_string()).collect(),
        )))
        // scan every row so a late text value widens the column instead of failing
        .infer_schema(None)
        .finish()
        .map_err(|e| {
            tracing::error!("Failed to parse delimited file: {}", e);
            DecodeError::Delimited(e.to_string())
        })?;

    tracing::debug!("DataFrame shape: {} rows x {} columns", df.height(), df.width());
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns = df
        .get_columns()
        .iter()
        .map(series_cells)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DecodeError::Delimited(e.to_string()))?;

    Ok(Table::from_column_cells(&headers, columns))
}

fn series_cells(series: &Series) -> PolarsResult<Vec<Cell>> {
    let cells = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|value| value.map_or(Cell::Null, Cell::text))
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|value| value.map_or(Cell::Null, Cell::Boolean))
            .collect(),
        dtype if dtype.is_numeric() => {
            let floats = series.cast(&DataType::Float64)?;
            let cells = floats
                .f64()?
                .into_iter()
                .map(|value| value.map_or(Cell::Null, Cell::number))
                .collect();
            cells
        }
        _ => {
            let text = series.cast(&DataType::String)?;
            let cells = text
                .str()?
                .into_iter()
                .map(|value| value.map_or(Cell::Null, |s| Cell::Other(s.to_string())))
                .collect();
            cells
        }
    };
    Ok(cells)
}

// Only the first worksheet is read; its first row is the header.
fn read_workbook(file_data: Bytes) -> Result<Table, DecodeError> {
    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e: calamine::XlsxError| {
        tracing::error!("Failed to open Excel file: {}", e);
        DecodeError::Workbook(e.to_string())
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);
    let sheet_name = sheet_names.first().ok_or(DecodeError::Empty)?;

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| DecodeError::Workbook(e.to_string()))?;
    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();

    Ok(rows_to_table(&rows))
}

fn rows_to_table(rows: &[Vec<Data>]) -> Table {
    let Some((header, body)) = rows.split_first() else {
        return Table::default();
    };
    let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let rows = body
        .iter()
        .map(|row| row.iter().map(data_cell).collect())
        .collect();
    Table::from_rows(&headers, rows)
}

fn data_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Null,
        Data::Int(i) => Cell::number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::String(s) if s.is_empty() => Cell::Null,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::Boolean(*b),
        other => Cell::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::table::ColumnKind;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(UploadFormat::from_filename("sales.csv"), UploadFormat::Csv);
        assert_eq!(UploadFormat::from_filename("Sales.XLSX"), UploadFormat::Xlsx);
        assert_eq!(UploadFormat::from_filename("notes.txt"), UploadFormat::Tsv);
    }

    #[test]
    fn test_decode_csv_classifies_columns() {
        let data = Bytes::from_static(b"age,city\n25,NY\n,NY\n35,LA\n");
        let table = decode_upload("people.csv", data).unwrap();

        assert_eq!(table.height(), 3);
        let age = table.column("age").unwrap();
        assert_eq!(age.kind(), ColumnKind::Numerical);
        assert_eq!(age.cells(), &[Cell::number(25.0), Cell::Null, Cell::number(35.0)]);
        assert_eq!(table.column("city").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_decode_falls_back_to_tabs() {
        let data = Bytes::from_static(b"x\ty\n1.5\ta\n2.5\tb\n");
        let table = decode_upload("export.txt", data).unwrap();
        assert_eq!(table.width(), 2);
        assert_eq!(table.column("x").unwrap().cells()[1], Cell::number(2.5));
    }

    #[test]
    fn test_decode_widens_column_with_late_text() {
        let mut csv = String::from("id,group\n");
        for i in 0..150 {
            csv.push_str(&format!("{},a\n", i));
        }
        csv.push_str("12A,b\n");

        let table = decode_upload("late.csv", Bytes::from(csv)).unwrap();
        assert_eq!(table.height(), 151);
        let id = table.column("id").unwrap();
        assert_eq!(id.kind(), ColumnKind::Categorical);
        assert_eq!(id.cells()[150], Cell::text("12A"));
    }

    #[test]
    fn test_decode_reads_missing_markers_as_null() {
        let data = Bytes::from_static(b"age,city\n25,NY\nNA,NY\n35,N/A\n");
        let table = decode_upload("people.csv", data).unwrap();

        let age = table.column("age").unwrap();
        assert_eq!(age.kind(), ColumnKind::Numerical);
        assert_eq!(age.cells(), &[Cell::number(25.0), Cell::Null, Cell::number(35.0)]);
        assert_eq!(table.column("city").unwrap().cells()[2], Cell::Null);
    }

    #[test]
    fn test_decode_workbook_file() {
        let data = Bytes::from_static(include_bytes!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/scores.xlsx"
        )));
        let table = decode_upload("scores.xlsx", data).unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.column("name").unwrap().kind(), ColumnKind::Categorical);
        let score = table.column("score").unwrap();
        assert_eq!(score.kind(), ColumnKind::Numerical);
        assert_eq!(score.cells(), &[Cell::number(91.5), Cell::number(78.0), Cell::Null]);
        assert_eq!(table.column("passed").unwrap().cells()[1], Cell::Boolean(false));
    }

    #[test]
    fn test_decode_rejects_empty_uploads() {
        assert!(decode_upload("empty.csv", Bytes::new()).is_err());
        assert!(matches!(
            decode_upload("header.csv", Bytes::from_static(b"a,b\n")),
            Err(DecodeError::Empty) | Err(DecodeError::Delimited(_))
        ));
    }

    #[test]
    fn test_decode_rejects_broken_workbook() {
        let result = decode_upload("broken.xlsx", Bytes::from_static(b"not a zip"));
        assert!(matches!(result, Err(DecodeError::Workbook(_))));
    }

    #[test]
    fn test_workbook_rows_to_table() {
        let rows = vec![
            vec![Data::String("score".to_string()), Data::String("passed".to_string()), Data::Empty],
            vec![Data::Int(3), Data::Bool(true), Data::String("x".to_string())],
            vec![Data::Float(4.5), Data::Empty],
        ];
        let table = rows_to_table(&rows);

        assert_eq!(table.height(), 2);
        assert_eq!(table.column("score").unwrap().kind(), ColumnKind::Numerical);
        assert_eq!(table.column("passed").unwrap().kind(), ColumnKind::Other);
        let unnamed = table.column("Unnamed: 2").unwrap();
        assert_eq!(unnamed.cells(), &[Cell::text("x"), Cell::Null]);
    }
}
