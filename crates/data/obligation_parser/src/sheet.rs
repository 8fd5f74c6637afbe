use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;
use models::{PipelineError, Result};

/// A single spreadsheet cell, reduced to what ingestion cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Trims surrounding whitespace; whitespace-only text becomes `Empty`.
    pub fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::text(s),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            other => Cell::text(&other.to_string()),
        }
    }
}

/// Rows of one sheet exactly as they appear in the source, header included.
///
/// Row `n` of the source (1-based) is `rows()[n - 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Opens the first sheet of a workbook (`.xlsx`, `.xlsm`, `.xls`, `.ods`) or a `.csv` file.
pub fn open_sheet<P: AsRef<Path>>(path: P) -> Result<Sheet> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let sheet = match extension.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        other => {
            return Err(PipelineError::Source(format!(
                "unsupported file type '{other}' for {} (expected .xlsx, .xls, .ods or .csv)",
                path.display()
            )))
        }
    };

    tracing::debug!("Read {} rows from {}", sheet.len(), path.display());
    Ok(sheet)
}

fn read_workbook(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::Source(format!("cannot open {}: {e}", path.display())))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| PipelineError::Source(format!("{} has no sheets", path.display())))?;

    let range = workbook.worksheet_range(first).map_err(|e| {
        PipelineError::Source(format!(
            "cannot read sheet '{first}' in {}: {e}",
            path.display()
        ))
    })?;

    Ok(sheet_from_range(&range))
}

/// calamine trims leading empty rows/columns off a range; put them back so
/// row numbers match what the user sees in their spreadsheet.
pub(crate) fn sheet_from_range(range: &Range<Data>) -> Sheet {
    let Some((start_row, start_col)) = range.start() else {
        return Sheet::default();
    };

    let mut rows: Vec<Vec<Cell>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }

    Sheet::from_rows(rows)
}

fn read_csv(path: &Path) -> Result<Sheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::Source(format!("cannot open {}: {e}", path.display())))?;

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            PipelineError::Source(format!(
                "cannot read row {} of {}: {e}",
                rows.len() + 1,
                path.display()
            ))
        })?;

        // The reader skips empty lines; pad them back in so row n stays line n.
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 1);
        while rows.len() + 1 < line {
            rows.push(Vec::new());
        }
        rows.push(record.iter().map(Cell::text).collect());
    }

    Ok(Sheet::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cell_text_trims_and_blanks() {
        assert_eq!(Cell::text("  Card A "), Cell::Text("Card A".to_string()));
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert!(Cell::text("\t").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_cell_from_calamine_data() {
        assert_eq!(Cell::from(&Data::Int(15)), Cell::Number(15.0));
        assert_eq!(Cell::from(&Data::Float(0.0599)), Cell::Number(0.0599));
        assert_eq!(Cell::from(&Data::String(" x ".into())), Cell::Text("x".into()));
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn test_read_csv_keeps_blank_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Description,Type,Payment").unwrap();
        writeln!(file, "Card A,credit-card,150").unwrap();
        writeln!(file, ",,").unwrap();
        writeln!(file, "Loan B,loan,300").unwrap();

        let sheet = open_sheet(file.path()).unwrap();
        assert_eq!(sheet.len(), 4);
        assert!(sheet.rows()[2].iter().all(Cell::is_blank));
        assert_eq!(sheet.rows()[3][0], Cell::Text("Loan B".into()));
    }

    #[test]
    fn test_read_csv_pads_empty_lines() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "Description,Type,Payment\nCard A,credit-card,150\n\nLoan B,loan,300\n").unwrap();

        let sheet = open_sheet(file.path()).unwrap();
        assert_eq!(sheet.len(), 4);
        assert!(sheet.rows()[2].is_empty());
        assert_eq!(sheet.rows()[3][0], Cell::Text("Loan B".into()));
    }

    #[test]
    fn test_sheet_from_range_restores_trimmed_offset() {
        // Header in C3, data in C4 and C5; calamine starts the range at (2, 1).
        let mut range = Range::new((2, 1), (4, 3));
        range.set_value((2, 1), Data::String("Description".into()));
        range.set_value((2, 2), Data::String("Type".into()));
        range.set_value((2, 3), Data::String("Payment".into()));
        range.set_value((3, 1), Data::String("Card A".into()));
        range.set_value((3, 2), Data::String("credit-card".into()));
        range.set_value((3, 3), Data::Float(150.0));
        range.set_value((4, 2), Data::String("loan".into()));
        range.set_value((4, 3), Data::Float(50.0));

        let sheet = sheet_from_range(&range);

        assert_eq!(sheet.len(), 5);
        assert!(sheet.rows()[0].is_empty());
        assert!(sheet.rows()[1].is_empty());
        assert_eq!(sheet.rows()[2][0], Cell::Empty);
        assert_eq!(sheet.rows()[2][1], Cell::Text("Description".into()));
        assert_eq!(sheet.rows()[3][0], Cell::Empty);
        assert_eq!(sheet.rows()[3][1], Cell::Text("Card A".into()));
        assert_eq!(sheet.rows()[3][3], Cell::Number(150.0));
    }

    #[test]
    fn test_empty_range_is_empty_sheet() {
        let range: Range<Data> = Range::empty();
        assert!(sheet_from_range(&range).is_empty());
    }

    #[test]
    fn test_open_missing_file_is_source_error() {
        let err = open_sheet("/no/such/obligations.xlsx").unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));
    }

    #[test]
    fn test_open_unknown_extension_is_source_error() {
        let err = open_sheet("obligations.txt").unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));
        assert!(err.to_string().contains("unsupported"));
    }
}
