//! Interactive input for the `debt_advisor` binary.
//!
//! Income and goal come from flags when given; otherwise the user is asked on
//! the terminal. Reader and writer are generic so the prompts can be driven
//! from tests.

use std::io::{BufRead, Write};

use advisor::{Goal, Income};
use anyhow::{anyhow, Context, Result};

/// Parses an income such as `$2,500.00`.
pub fn parse_income(raw: &str) -> Result<Income> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();

    let amount: f64 = cleaned
        .parse()
        .map_err(|_| anyhow!("'{}' is not a valid monthly income", raw.trim()))?;

    Ok(Income::new(amount)?)
}

/// Uses `flag` when present, otherwise asks for the monthly income.
pub fn determine_income<R, W>(flag: Option<&str>, input: &mut R, out: &mut W) -> Result<Income>
where
    R: BufRead,
    W: Write,
{
    if let Some(raw) = flag {
        return parse_income(raw);
    }

    writeln!(out, "What is your monthly income (after taxes & deductions)?")?;
    out.flush()?;

    let answer = read_answer(input).context("Error reading income response")?;
    parse_income(&answer)
}

/// Uses `flag` when present, otherwise asks for a goal; an empty answer keeps `default_goal`.
pub fn determine_goal<R, W>(
    flag: Option<&str>,
    default_goal: &str,
    input: &mut R,
    out: &mut W,
) -> Result<Goal>
where
    R: BufRead,
    W: Write,
{
    if let Some(goal) = flag {
        return Ok(Goal::new(goal)?);
    }

    writeln!(
        out,
        "What is your financial goal? (If you like the default option, then just press enter.)"
    )?;
    writeln!(out, "Default: {default_goal}")?;
    out.flush()?;

    let answer = read_answer(input).context("Error reading goal response")?;
    if answer.trim().is_empty() {
        return Ok(Goal::new(default_goal)?);
    }
    Ok(Goal::new(&answer)?)
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
