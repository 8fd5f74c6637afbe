pub mod sheet;

pub use crate::sheet::{open_sheet, Cell, Sheet};

use std::path::Path;

use models::{ColumnLayout, Field, Obligation, PipelineError, Result};

/// Reads the first sheet of `path` and turns every data row into an [`Obligation`].
pub fn parse_file<P: AsRef<Path>>(path: P, layout: &ColumnLayout) -> Result<Vec<Obligation>> {
    let path = path.as_ref();
    let sheet = open_sheet(path)?;
    let obligations = ingest(&sheet, layout)?;
    tracing::info!(
        "Ingested {} obligation(s) from {}",
        obligations.len(),
        path.display()
    );
    Ok(obligations)
}

/// Validates the rows of `sheet` against `layout`, preserving row order.
///
/// The first non-blank row is the header and is never read. Rows made only of
/// blank cells are padding and skipped; every other row must carry a
/// description, a type and a monthly payment.
pub fn ingest(sheet: &Sheet, layout: &ColumnLayout) -> Result<Vec<Obligation>> {
    if sheet.len() < 2 {
        return Err(PipelineError::Source(format!(
            "expected a header row and at least one obligation row, found {} row(s)",
            sheet.len()
        )));
    }

    let mut out = Vec::new();
    let mut rows = sheet
        .rows()
        .iter()
        .enumerate()
        .skip_while(|(_, cells)| cells.iter().all(Cell::is_blank));
    let _header = rows.next();

    for (idx, cells) in rows {
        let row = RowReader {
            cells,
            number: idx + 1,
            layout,
        };

        if cells.iter().all(Cell::is_blank) {
            tracing::trace!("Skipping blank row {}", row.number);
            continue;
        }

        let description = row.required_text(Field::Description)?;
        let kind = row.required_text(Field::Kind)?;
        row.require_present(Field::MonthlyPayment)?;

        out.push(Obligation {
            id: out.len() + 1,
            source_row: row.number,
            description,
            kind,
            institution: row.optional_text(Field::Institution),
            remaining_balance: row.amount(Field::RemainingBalance)?,
            interest_rate: row.interest_rate()?,
            monthly_payment: row.amount(Field::MonthlyPayment)?.unwrap_or_default(),
            day_of_month: row.day_of_month()?,
        });
    }

    if out.is_empty() {
        return Err(PipelineError::Source(
            "sheet contains only blank rows below the header".to_string(),
        ));
    }

    Ok(out)
}

struct RowReader<'a> {
    cells: &'a [Cell],
    number: usize,
    layout: &'a ColumnLayout,
}

impl RowReader<'_> {
    /// `None` when the layout has no such column or the row is too short.
    fn cell(&self, field: Field) -> Option<&Cell> {
        self.layout
            .column_of(field)
            .and_then(|col| self.cells.get(col))
            .filter(|cell| !cell.is_blank())
    }

    fn require_present(&self, field: Field) -> Result<&Cell> {
        self.cell(field)
            .ok_or_else(|| PipelineError::missing(self.number, field))
    }

    fn required_text(&self, field: Field) -> Result<String> {
        Ok(cell_text(self.require_present(field)?))
    }

    fn optional_text(&self, field: Field) -> Option<String> {
        self.cell(field).map(cell_text)
    }

    fn decimal(&self, field: Field, expected: &'static str) -> Result<Option<f64>> {
        let Some(cell) = self.cell(field) else {
            return Ok(None);
        };

        let value = match cell {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_decimal(s),
            Cell::Empty => None,
        };

        match value {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(PipelineError::Parse {
                row: self.number,
                field,
                value: cell_text(cell),
                expected,
            }),
        }
    }

    fn amount(&self, field: Field) -> Result<Option<f64>> {
        let value = self.decimal(field, "decimal amount")?;
        if let Some(v) = value {
            if v < 0.0 {
                return Err(self.invalid(field, format!("must not be negative (got {v})")));
            }
        }
        Ok(value)
    }

    fn interest_rate(&self) -> Result<Option<f64>> {
        let field = Field::InterestRate;
        let value = self.decimal(field, "decimal rate")?;
        if let Some(v) = value {
            if !(0.0..=100.0).contains(&v) {
                return Err(self.invalid(field, format!("must be between 0 and 100 (got {v})")));
            }
        }
        Ok(value)
    }

    fn day_of_month(&self) -> Result<Option<u32>> {
        let field = Field::DayOfMonth;
        let Some(day) = self.decimal(field, "whole day number")? else {
            return Ok(None);
        };

        if day.fract() != 0.0 {
            return Err(PipelineError::Parse {
                row: self.number,
                field,
                value: day.to_string(),
                expected: "whole day number",
            });
        }
        if !(1.0..=31.0).contains(&day) {
            return Err(self.invalid(field, format!("must be between 1 and 31 (got {day})")));
        }
        Ok(Some(day as u32))
    }

    fn invalid(&self, field: Field, reason: String) -> PipelineError {
        PipelineError::Validation {
            row: self.number,
            field,
            reason,
        }
    }
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => n.to_string(),
        Cell::Empty => String::new(),
    }
}

/// Accepts `1,250.50` and `$300` as well as plain decimals.
fn parse_decimal(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
