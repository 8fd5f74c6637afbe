//! Turns a spreadsheet of recurring obligations into a written repayment plan.
//!
//! The flow is linear: ingest rows, normalize them, build one prompt, stream the
//! model's reply to the console, then write the cleaned reply to a Markdown file.

pub mod collector;
pub mod output;
pub mod pipeline;
pub mod prompt;

pub use crate::collector::{collect_response, run_exchange, ResponseBuffer};
pub use crate::output::{render_artifact, OutputWriter, ReasoningFilter};
pub use crate::pipeline::{run, RunParameters};
pub use crate::prompt::{Goal, Income, PromptSynthesizer};
