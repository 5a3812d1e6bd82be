use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use tracing::debug;

use crate::model::{Cell, Columns, LayoutConfig, SurveyTable};

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("unsupported file type {0:?}; expected .xlsx, .xlsm, .xlsb, .xls, .ods or .csv")]
    UnsupportedFormat(String),
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("could not read csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("sheet has no header row")]
    NoHeader,
    #[error("missing column {0:?} in header row")]
    MissingColumn(String),
    #[error("row {row}, column {column:?}: expected a number, found {value:?}")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, SheetError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SheetFormat::Workbook),
            "csv" => Ok(SheetFormat::Csv),
            _ => Err(SheetError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::parse(s),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Read the survey table from an uploaded file. The reader is picked by
/// extension; the first worksheet of a workbook is used.
pub fn read_table(
    bytes: &[u8],
    file_name: &str,
    config: &LayoutConfig,
) -> Result<SurveyTable, SheetError> {
    let grid = match SheetFormat::from_file_name(file_name)? {
        SheetFormat::Workbook => workbook_grid(bytes)?,
        SheetFormat::Csv => csv_grid(bytes)?,
    };
    debug!(file = file_name, rows = grid.len(), "sheet read");
    table_from_grid(&grid, &config.columns, &config.mode_names())
}

fn workbook_grid(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

// Dutch exports tend to use ';' so that ',' stays free for decimals.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |d: u8| first_line.iter().filter(|b| **b == d).count();
    if count(b';') > count(b',') { b';' } else { b',' }
}

// "1,5" is a number in a ';' file; "0,5-1 km" stays a label.
fn decimal_comma(text: String) -> Cell {
    match text.replace(',', ".").parse::<f64>() {
        Ok(v) => Cell::Number(v),
        Err(_) => Cell::Text(text),
    }
}

fn csv_grid(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, SheetError> {
    let delimiter = sniff_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|field| match Cell::parse(field) {
                    Cell::Text(t) if delimiter == b';' => decimal_comma(t),
                    cell => cell,
                })
                .collect(),
        );
    }
    Ok(grid)
}

fn display_name(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => Some(s.clone()),
        Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", *v as i64)),
        Cell::Number(v) => Some(v.to_string()),
    }
}

fn number(cell: &Cell, row: usize, column: &str) -> Result<Option<f64>, SheetError> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(v) => Ok(Some(*v)),
        Cell::Text(s) => Err(SheetError::NotNumeric {
            row,
            column: column.to_string(),
            value: s.clone(),
        }),
    }
}

/// Pull the category and mode columns out of a header-first grid. Rows stay
/// in sheet order so category and sub-split rows line up by position.
pub fn table_from_grid(
    grid: &[Vec<Cell>],
    columns: &Columns,
    modes: &[String],
) -> Result<SurveyTable, SheetError> {
    let (header, rows) = grid.split_first().ok_or(SheetError::NoHeader)?;
    let find = |name: &str| {
        header
            .iter()
            .position(|c| c.as_text().map(str::trim) == Some(name))
            .ok_or_else(|| SheetError::MissingColumn(name.to_string()))
    };
    let category_col = find(&columns.category)?;
    let total_col = find(&columns.total)?;
    let mode_cols = modes
        .iter()
        .map(|m| find(m))
        .collect::<Result<Vec<_>, _>>()?;

    let empty = Cell::Empty;
    let mut table = SurveyTable {
        modes: modes.to_vec(),
        ..Default::default()
    };
    for (i, row) in rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        // 1-based sheet row, header included, for error messages.
        let sheet_row = i + 2;
        let at = |col: usize| row.get(col).unwrap_or(&empty);
        let name = display_name(at(category_col));
        if name.is_none() {
            table.push_row(None, None, vec![0.0; modes.len()]);
            continue;
        }
        let total = number(at(total_col), sheet_row, &columns.total)?;
        let mut split = Vec::with_capacity(modes.len());
        for (mode, col) in modes.iter().zip(&mode_cols) {
            split.push(number(at(*col), sheet_row, mode)?.unwrap_or(0.0));
        }
        table.push_row(name, total, split);
    }
    Ok(table)
}
