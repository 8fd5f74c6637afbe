use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use advisor::RunParameters;
use ai_client::{OllamaClient, OllamaClientConfig, PullProgress};
use cli::{determine_goal, determine_income};

/// Turns a spreadsheet of recurring obligations into a repayment plan written by a local model.
#[derive(Debug, Parser)]
#[command(name = "debt_advisor", author, version, about, long_about = None)]
struct Args {
    /// Monthly income after taxes & deductions (asked interactively when omitted)
    #[arg(long)]
    income: Option<String>,

    /// Financial goal to get advice for (asked interactively when omitted)
    #[arg(long)]
    goal: Option<String>,

    /// Path to the obligations spreadsheet (.xlsx, .xls, .ods or .csv)
    #[arg(long = "data", default_value = "./obligations.xlsx")]
    data_path: PathBuf,

    /// Ollama model to use (defaults to the settings value)
    #[arg(long)]
    llm: Option<String>,

    /// Directory the advice file is written to (defaults to the settings value)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Leave the model's <think> reasoning out of the written file
    #[arg(long)]
    exclude_reasoning: bool,

    /// Path to settings.json (optional; built-in defaults otherwise)
    #[arg(short = 's', long = "settings")]
    settings_path: Option<PathBuf>,

    /// List the models installed in Ollama and exit
    #[arg(long)]
    list_models: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init("debt_advisor=info,advisor=info,ai_client=info,obligation_parser=info");

    let args = Args::parse();
    let settings = settings_loader::load_settings_with_fallback(args.settings_path.as_ref())?;

    let client = OllamaClient::new(OllamaClientConfig::from_env())?;
    if !client.is_available() {
        bail!(
            "Ollama is not reachable at {}. Start it with `ollama serve` and try again.",
            client.base_url()
        );
    }

    if args.list_models {
        for name in client.list_models()? {
            println!("{name}");
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    let income = determine_income(args.income.as_deref(), &mut input, &mut stdout)?;
    let goal = determine_goal(
        args.goal.as_deref(),
        &settings.default_goal,
        &mut input,
        &mut stdout,
    )?;

    let model = args
        .llm
        .clone()
        .unwrap_or_else(|| settings.default_model.clone());
    ensure_model(&client, &model)?;

    let params = RunParameters {
        income,
        goal,
        model,
        source_path: args.data_path.clone(),
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.output_dir)),
        exclude_reasoning: args.exclude_reasoning,
    };

    println!();
    let written = advisor::run(&params, &settings, &client, &mut stdout)
        .with_context(|| format!("Advice run for {} failed", params.source_path.display()))?;

    println!("\n✅ Advice written to: {}", written.display());
    Ok(())
}

/// Installs `model` when the server does not have it yet.
fn ensure_model(client: &OllamaClient, model: &str) -> Result<()> {
    if client.has_model(model)? {
        tracing::debug!("Model {model} already installed");
        return Ok(());
    }

    println!("📥 Installing model {model}");
    let mut last_status = String::new();
    client.pull_model(model, |progress: &PullProgress| {
        match progress.percent() {
            Some(pct) => print!("\r  • {} {:>5.1}%", progress.status, pct),
            None if progress.status != last_status => print!("\n  • {}", progress.status),
            None => {}
        }
        last_status = progress.status.clone();
        let _ = io::stdout().flush();
    })?;
    println!("\n✓ Model {model} installed");
    Ok(())
}
