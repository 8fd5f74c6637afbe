pub mod error;

pub use crate::error::{PipelineError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_GOAL: &str =
	"Pay off debt as quickly and efficiently as possible while not straining my monthly budget.";
pub const DEFAULT_MODEL: &str = "qwen3:0.6b";
pub const DEFAULT_PERSONA: &str = "You are a personal finance advisor helping one person organise their recurring obligations.";

// Obligation fields, in spreadsheet column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
	Description,
	#[serde(rename = "type")]
	Kind,
	Institution,
	RemainingBalance,
	InterestRate,
	MonthlyPayment,
	DayOfMonth,
}

impl Field {
	pub const ALL: [Field; 7] = [
		Field::Description,
		Field::Kind,
		Field::Institution,
		Field::RemainingBalance,
		Field::InterestRate,
		Field::MonthlyPayment,
		Field::DayOfMonth,
	];

	/// Stable label used both in error messages and in the serialized record.
	pub fn label(self) -> &'static str {
		match self {
			Field::Description => "description",
			Field::Kind => "type",
			Field::Institution => "institution",
			Field::RemainingBalance => "remaining_balance",
			Field::InterestRate => "interest_rate",
			Field::MonthlyPayment => "monthly_payment",
			Field::DayOfMonth => "day_of_month",
		}
	}

	pub fn is_required(self) -> bool {
		matches!(self, Field::Description | Field::Kind | Field::MonthlyPayment)
	}
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// One recurring financial commitment read from a spreadsheet row.
///
/// Optional numeric fields stay `None` when the cell was blank, so an explicit
/// zero in the sheet is never confused with a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
	/// 1-based position in the ingested collection.
	pub id: usize,
	/// 1-based spreadsheet row the record came from.
	pub source_row: usize,
	pub description: String,
	pub kind: String,
	pub institution: Option<String>,
	pub remaining_balance: Option<f64>,
	/// Percentage in `[0,100]` once normalized; may still be a fraction straight out of the sheet.
	pub interest_rate: Option<f64>,
	pub monthly_payment: f64,
	pub day_of_month: Option<u32>,
}

/// Maps spreadsheet columns to obligation fields.
///
/// Built from an ordered list of fields: the n-th entry describes column n.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
	columns: Vec<Field>,
}

impl ColumnLayout {
	pub fn new(columns: Vec<Field>) -> Result<Self> {
		for required in Field::ALL.iter().copied().filter(|f| f.is_required()) {
			if !columns.contains(&required) {
				return Err(PipelineError::Config(format!(
					"column layout is missing required column '{required}'"
				)));
			}
		}
		for (idx, field) in columns.iter().enumerate() {
			if columns[..idx].contains(field) {
				return Err(PipelineError::Config(format!(
					"column layout lists '{field}' more than once"
				)));
			}
		}
		Ok(Self { columns })
	}

	/// description, type, institution, remaining_balance, interest_rate, monthly_payment, day_of_month
	pub fn full() -> Self {
		Self {
			columns: Field::ALL.to_vec(),
		}
	}

	/// description, type, monthly_payment
	pub fn minimal() -> Self {
		Self {
			columns: vec![Field::Description, Field::Kind, Field::MonthlyPayment],
		}
	}

	pub fn column_of(&self, field: Field) -> Option<usize> {
		self.columns.iter().position(|f| *f == field)
	}
}

impl Default for ColumnLayout {
	fn default() -> Self {
		Self::full()
	}
}

// Settings models
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdvisorSettings {
	pub persona: String,
	pub guidelines: Vec<String>,
	pub columns: Vec<Field>,
	pub default_goal: String,
	pub default_model: String,
	pub output_dir: String,
}

impl AdvisorSettings {
	pub fn column_layout(&self) -> Result<ColumnLayout> {
		ColumnLayout::new(self.columns.clone())
	}
}

impl Default for AdvisorSettings {
	fn default() -> Self {
		Self {
			persona: DEFAULT_PERSONA.to_string(),
			guidelines: default_guidelines(),
			columns: Field::ALL.to_vec(),
			default_goal: DEFAULT_GOAL.to_string(),
			default_model: DEFAULT_MODEL.to_string(),
			output_dir: ".".to_string(),
		}
	}
}

pub fn default_guidelines() -> Vec<String> {
	[
		"Treat every monthly_payment as the minimum payment due, not the full amount that can be paid.",
		"Never count the same payment twice across different steps of the plan.",
		"Only loans and credit cards belong in the action plan; leave bills and other expenses out of it.",
		"If no leisure or entertainment line item exists, assume a discretionary allowance of 5-10% of income.",
		"Do all arithmetic yourself and state the resulting amounts; the reader must not have to calculate anything.",
		"Do not list multiple competing strategies; return only the single most efficient plan.",
	]
	.iter()
	.map(|s| s.to_string())
	.collect()
}
