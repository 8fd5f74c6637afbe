use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ai_client::{THINK_CLOSE, THINK_OPEN};
use chrono::{DateTime, Local};
use models::{PipelineError, Result};
use regex::Regex;

use crate::collector::ResponseBuffer;
use crate::prompt::Goal;

pub const REASONING_BEGIN_LABEL: &str = "Begin reasoning";
pub const REASONING_END_LABEL: &str = "End reasoning";

const MAX_NAME_ATTEMPTS: usize = 100;

/// Removes or labels `<think>...</think>` segments in a model reply.
///
/// Segments do not nest. An opening marker that is never closed runs to the
/// end of the reply; a closing marker without an opener is dropped. Text
/// outside the segments is left as the model wrote it.
#[derive(Debug, Clone)]
pub struct ReasoningFilter {
    block: Regex,
    line_block: Regex,
    spaced_block: Regex,
    stray_close: Regex,
}

impl ReasoningFilter {
    pub fn new() -> Result<Self> {
        let open = regex::escape(THINK_OPEN);
        let close = regex::escape(THINK_CLOSE);

        Ok(Self {
            block: compile(&format!(r"(?s){open}(.*?)(?:{close}|\z)"))?,
            // A segment opening its own line takes the blank lines after it along.
            line_block: compile(&format!(
                r"(?ms)^[ \t]*{open}.*?(?:{close}|\z)[ \t]*(?:\r?\n)*"
            ))?,
            spaced_block: compile(&format!(
                r"(?s)[ \t]*(?:\r?\n[ \t]*)*{open}(.*?)(?:{close}|\z)[ \t]*(?:\r?\n)*"
            ))?,
            stray_close: compile(&close)?,
        })
    }

    fn has_markers(&self, text: &str) -> bool {
        self.block.is_match(text) || self.stray_close.is_match(text)
    }

    /// Drops every reasoning segment; one that fills its own lines goes with
    /// the blank lines right after it.
    pub fn strip(&self, text: &str) -> String {
        if !self.has_markers(text) {
            return text.to_string();
        }

        let ends_in_segment = self
            .block
            .find_iter(text)
            .last()
            .is_some_and(|m| text[m.end()..].trim().is_empty());

        let without = self.line_block.replace_all(text, "");
        let without = self.block.replace_all(&without, "");
        let without = self.stray_close.replace_all(&without, "");

        if ends_in_segment {
            without.trim_end().to_string()
        } else {
            without.into_owned()
        }
    }

    /// Replaces the raw markers with readable section delimiters.
    pub fn annotate(&self, text: &str) -> String {
        if !self.has_markers(text) {
            return text.to_string();
        }

        let labelled = self.spaced_block.replace_all(text, |caps: &regex::Captures| {
            let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let (at_start, at_end) = caps
                .get(0)
                .map(|m| (m.start() == 0, m.end() == text.len()))
                .unwrap_or_default();
            format!(
                "{}---\n\n*{REASONING_BEGIN_LABEL}*\n\n{inner}\n\n*{REASONING_END_LABEL}*\n\n---{}",
                if at_start { "" } else { "\n\n" },
                if at_end { "" } else { "\n\n" },
            )
        });
        self.stray_close.replace_all(&labelled, "").into_owned()
    }

    pub fn process(&self, text: &str, exclude_reasoning: bool) -> String {
        if exclude_reasoning {
            self.strip(text)
        } else {
            self.annotate(text)
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| PipelineError::Config(format!("invalid pattern '{pattern}': {e}")))
}

/// Markdown artifact: bold goal line, blank line, reply body.
pub fn render_artifact(goal: &Goal, body: &str) -> String {
    format!("**Goal:** {goal}\n\n{body}\n")
}

/// Writes the processed reply into a new timestamped file in `dir`.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    exclude_reasoning: bool,
    filter: ReasoningFilter,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>, exclude_reasoning: bool) -> Result<Self> {
        Ok(Self {
            dir: dir.into(),
            exclude_reasoning,
            filter: ReasoningFilter::new()?,
        })
    }

    /// Returns the absolute path of the written artifact.
    pub fn write(&self, goal: &Goal, reply: ResponseBuffer) -> Result<PathBuf> {
        self.write_at(goal, reply, Local::now())
    }

    pub fn write_at(
        &self,
        goal: &Goal,
        reply: ResponseBuffer,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf> {
        let body = self.filter.process(reply.as_str(), self.exclude_reasoning);
        let document = render_artifact(goal, &body);

        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::io(self.dir.display(), e))?;

        let stem = format!("advice_{}", timestamp.format("%Y%m%d_%H%M%S_%3f"));
        let (path, mut file) = create_unique(&self.dir, &stem)?;

        if let Err(e) = file.write_all(document.as_bytes()).and_then(|_| file.sync_all()) {
            drop(file);
            // No half-written artifacts.
            let _ = fs::remove_file(&path);
            return Err(PipelineError::io(path.display(), e));
        }

        let absolute = fs::canonicalize(&path).map_err(|e| PipelineError::io(path.display(), e))?;
        tracing::info!("Advice written to {}", absolute.display());
        Ok(absolute)
    }
}

/// `stem.md`, then `stem_1.md`, `stem_2.md`, ... until one does not exist yet.
fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.md")
        } else {
            format!("{stem}_{attempt}.md")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(PipelineError::io(path.display(), e)),
        }
    }

    Err(PipelineError::io(
        dir.join(format!("{stem}.md")).display(),
        std::io::Error::new(ErrorKind::AlreadyExists, "no free artifact name left"),
    ))
}
