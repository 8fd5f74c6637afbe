use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use data_normalization::normalize_obligations;
use obligation_parser::parse_file;

fn main() -> Result<()> {
    // Usage:
    //   obligation_parser obligations.xlsx [settings.json]
    //
    // Prints the obligations exactly as they will be embedded in the prompt,
    // one canonical record per line.

    logger::init("obligation_parser=info");

    let args: Vec<String> = env::args().skip(1).collect();

    let Some(data_path) = args.first() else {
        println!("❌ Usage: obligation_parser <obligations.xlsx|.csv> [settings.json]");
        return Ok(());
    };

    let settings_path = args.get(1).map(PathBuf::from);
    let settings = settings_loader::load_settings_with_fallback(settings_path.as_ref())?;
    let layout = settings.column_layout()?;

    println!("📖 Parsing {}", data_path);
    let obligations =
        parse_file(data_path, &layout).with_context(|| format!("Failed parsing {}", data_path))?;

    let canonical = normalize_obligations(&obligations);
    for record in &canonical.records {
        println!("{}", record);
    }

    println!("\n📊 Summary:");
    println!("✓ Obligations: {}", obligations.len());
    println!(
        "✓ With interest rate: {}",
        obligations.iter().filter(|o| o.interest_rate.is_some()).count()
    );

    Ok(())
}
