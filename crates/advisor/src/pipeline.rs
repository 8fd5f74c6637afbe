use std::io::Write;
use std::path::PathBuf;

use ai_client::TextGenerator;
use data_normalization::normalize_obligations;
use models::{AdvisorSettings, Result};

use crate::collector::run_exchange;
use crate::output::OutputWriter;
use crate::prompt::{Goal, Income, PromptSynthesizer};

/// Plain values gathered by the command line before a run starts.
#[derive(Debug, Clone)]
pub struct RunParameters {
    pub income: Income,
    pub goal: Goal,
    pub model: String,
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub exclude_reasoning: bool,
}

/// Ingests the source and builds the instruction for the model.
pub fn build_prompt(params: &RunParameters, settings: &AdvisorSettings) -> Result<String> {
    let synthesizer = PromptSynthesizer::from_settings(settings)?;
    let layout = settings.column_layout()?;

    let obligations = obligation_parser::parse_file(&params.source_path, &layout)?;
    let canonical = normalize_obligations(&obligations);

    let prompt = synthesizer.synthesize(params.income, &canonical.payload(), &params.goal);
    tracing::debug!(
        "Prompt built from {} obligation(s), {} bytes",
        canonical.len(),
        prompt.len()
    );
    Ok(prompt)
}

/// Runs the whole pipeline once and returns the absolute path of the artifact.
///
/// The reply is mirrored to `sink` while it streams in. Any failure aborts the
/// run before the artifact is created.
pub fn run<W>(
    params: &RunParameters,
    settings: &AdvisorSettings,
    backend: &dyn TextGenerator,
    sink: &mut W,
) -> Result<PathBuf>
where
    W: Write + ?Sized,
{
    let writer = OutputWriter::new(&params.output_dir, params.exclude_reasoning)?;
    let prompt = build_prompt(params, settings)?;

    let reply = run_exchange(backend, &params.model, &prompt, sink)?;

    writer.write(&params.goal, reply)
}
