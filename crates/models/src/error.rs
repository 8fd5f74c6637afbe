use std::fmt;

use thiserror::Error;

use crate::Field;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Every failure is terminal to a run; nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
	#[error("Source error: {0}")]
	Source(String),

	#[error("Validation error at row {row}: {field} {reason}")]
	Validation {
		row: usize,
		field: Field,
		reason: String,
	},

	#[error("Parse error at row {row}: {field} value '{value}' is not a valid {expected}")]
	Parse {
		row: usize,
		field: Field,
		value: String,
		expected: &'static str,
	},

	#[error("Generation error: {0}")]
	Generation(String),

	#[error("IO error on {target}: {source}")]
	Io {
		target: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid configuration: {0}")]
	Config(String),
}

impl PipelineError {
	pub fn missing(row: usize, field: Field) -> Self {
		PipelineError::Validation {
			row,
			field,
			reason: "is required but blank".to_string(),
		}
	}

	pub fn io(target: impl fmt::Display, source: std::io::Error) -> Self {
		PipelineError::Io {
			target: target.to_string(),
			source,
		}
	}
}
