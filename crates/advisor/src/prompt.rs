use std::fmt;

use models::{AdvisorSettings, PipelineError, Result};

/// Joins guideline clauses into a bulleted list.
pub const GUIDELINE_SEPARATOR: &str = "\n- ";

/// Monthly income after taxes and deductions. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Income(f64);

impl Income {
    pub fn new(amount: f64) -> Result<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PipelineError::Config(format!(
                "income must be a finite, non-negative amount (got {amount})"
            )));
        }
        Ok(Self(amount))
    }

    pub fn amount(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Income {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// What the user wants the plan to achieve. Never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal(String);

impl Goal {
    pub fn new(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::Config("goal must not be empty".to_string()));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the single instruction sent to the model.
///
/// Guideline clauses are fixed at construction and never change afterwards.
#[derive(Debug, Clone)]
pub struct PromptSynthesizer {
    persona: String,
    guidelines: Vec<String>,
}

impl PromptSynthesizer {
    pub fn new(persona: impl Into<String>, guidelines: Vec<String>) -> Result<Self> {
        let guidelines: Vec<String> = guidelines
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        if guidelines.is_empty() {
            return Err(PipelineError::Config(
                "at least one guideline clause is required".to_string(),
            ));
        }

        Ok(Self {
            persona: persona.into().trim().to_string(),
            guidelines,
        })
    }

    pub fn from_settings(settings: &AdvisorSettings) -> Result<Self> {
        Self::new(settings.persona.clone(), settings.guidelines.clone())
    }

    pub fn guidelines(&self) -> &[String] {
        &self.guidelines
    }

    /// persona, income, obligations, goal, guidelines; in that order.
    pub fn synthesize(&self, income: Income, obligations: &str, goal: &Goal) -> String {
        let mut prompt = String::new();

        if !self.persona.is_empty() {
            prompt.push_str(&self.persona);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "I make {income} a month after taxes and deductions.\n\n"
        ));
        prompt.push_str(&format!(
            "My financial obligations, one JSON object per obligation, are:\n{obligations}\n\n"
        ));
        prompt.push_str(&format!("My goal is: {goal}\n\n"));
        prompt.push_str("How can I most efficiently accomplish my goal? Follow these guidelines:");
        prompt.push_str(GUIDELINE_SEPARATOR);
        prompt.push_str(&self.guidelines.join(GUIDELINE_SEPARATOR));

        prompt
    }
}
