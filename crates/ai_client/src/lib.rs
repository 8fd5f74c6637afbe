use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Opening marker wrapped around reasoning text the server reports separately.
pub const THINK_OPEN: &str = "<think>";
/// Closing marker matching [`THINK_OPEN`].
pub const THINK_CLOSE: &str = "</think>";

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for talking to a local Ollama server.
///
/// This crate intentionally only supports Ollama's local HTTP API.
/// It refuses to run if the configured base URL is not local.
#[derive(Debug, Clone)]
pub struct OllamaClientConfig {
    pub base_url: String,
}

impl OllamaClientConfig {
    /// Loads config from env vars:
    /// - `OLLAMA_BASE_URL` (default: `http://localhost:11434`)
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        Self { base_url }
    }
}

/// Ordered text chunks of one generation, ending at the first error or at completion.
pub type ChunkStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// Anything that turns a prompt into a stream of text chunks.
pub trait TextGenerator {
    fn generate_stream(&self, model: &str, prompt: &str) -> Result<ChunkStream<'_>>;
}

/// Minimal Ollama client (blocking HTTP).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: Url,
}

impl OllamaClient {
    pub fn new(config: OllamaClientConfig) -> Result<Self> {
        let base_url = validate_local_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Generation and model downloads can legitimately take minutes.
        let http = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// True when the server answers its root endpoint.
    pub fn is_available(&self) -> bool {
        let response = self
            .http
            .get(self.base_url.clone())
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send();

        match response {
            Ok(r) => r.status().is_success(),
            Err(err) => {
                tracing::debug!("Ollama health check failed: {err}");
                false
            }
        }
    }

    /// Names of the models installed on the server.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let endpoint = self.endpoint("api/tags")?;

        let response = self
            .http
            .get(endpoint.clone())
            .send()
            .with_context(|| format!("GET {endpoint} failed"))?;

        let tags: TagsResponse = check_status(response, &endpoint)?
            .json()
            .with_context(|| format!("Failed to parse JSON response from {endpoint}"))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// `llama3.2` matches an installed `llama3.2:latest`.
    pub fn has_model(&self, model: &str) -> Result<bool> {
        let installed = self.list_models()?;
        Ok(installed.iter().any(|name| model_names_match(name, model)))
    }

    /// Downloads `model`, reporting each progress line to `on_progress`.
    pub fn pull_model<F>(&self, model: &str, on_progress: F) -> Result<()>
    where
        F: FnMut(&PullProgress),
    {
        let endpoint = self.endpoint("api/pull")?;
        let request = PullRequest {
            model: model.to_string(),
            stream: true,
        };

        let response = self
            .http
            .post(endpoint.clone())
            .json(&request)
            .send()
            .with_context(|| format!("POST {endpoint} failed"))?;
        let response = check_status(response, &endpoint)?;

        read_pull_progress(BufReader::new(response), model, on_progress)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Failed to build Ollama /{path} URL"))
    }
}

impl TextGenerator for OllamaClient {
    fn generate_stream(&self, model: &str, prompt: &str) -> Result<ChunkStream<'_>> {
        let endpoint = self.endpoint("api/generate")?;
        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: true,
        };

        tracing::debug!("POST {endpoint} (model {model}, {} prompt bytes)", prompt.len());

        let response = self
            .http
            .post(endpoint.clone())
            .json(&request)
            .send()
            .with_context(|| format!("POST {endpoint} failed"))?;
        let response = check_status(response, &endpoint)?;

        Ok(Box::new(GenerateStream::new(BufReader::new(response))))
    }
}

/// Parses Ollama's newline-delimited JSON generation stream into text chunks.
///
/// Reasoning that the server reports in the separate `thinking` field is wrapped
/// in [`THINK_OPEN`]/[`THINK_CLOSE`] so downstream consumers see a single text.
pub struct GenerateStream<R> {
    lines: Lines<R>,
    in_thinking: bool,
    finished: bool,
}

impl<R: BufRead> GenerateStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            in_thinking: false,
            finished: false,
        }
    }

    fn fail(&mut self, err: anyhow::Error) -> Option<Result<String>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for GenerateStream<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    return self.fail(anyhow::Error::new(err).context("Reading generation stream"))
                }
                None => {
                    return self.fail(anyhow!(
                        "Generation stream ended before the model reported completion"
                    ))
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let chunk: GenerateChunk = match serde_json::from_str(trimmed) {
                Ok(chunk) => chunk,
                Err(err) => {
                    return self.fail(
                        anyhow::Error::new(err)
                            .context(format!("Invalid generation stream line: {trimmed}")),
                    )
                }
            };

            if let Some(error) = chunk.error {
                return self.fail(anyhow!("Ollama reported an error: {error}"));
            }

            let mut text = String::new();
            if let Some(thinking) = chunk.thinking.filter(|t| !t.is_empty()) {
                if !self.in_thinking {
                    text.push_str(THINK_OPEN);
                    self.in_thinking = true;
                }
                text.push_str(&thinking);
            }
            if self.in_thinking && (!chunk.response.is_empty() || chunk.done) {
                text.push_str(THINK_CLOSE);
                self.in_thinking = false;
            }
            text.push_str(&chunk.response);

            if chunk.done {
                self.finished = true;
            }
            if !text.is_empty() {
                return Some(Ok(text));
            }
        }

        None
    }
}

fn check_status(response: Response, endpoint: &Url) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // Ollama puts the reason in a JSON body: {"error": "..."}
    let body = response.text().unwrap_or_default();
    let reason = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);

    Err(anyhow!("{endpoint} returned {status}: {}", reason.trim()))
}

fn model_names_match(installed: &str, wanted: &str) -> bool {
    if installed == wanted {
        return true;
    }
    !wanted.contains(':') && installed.strip_suffix(":latest") == Some(wanted)
}

fn validate_local_base_url(base_url: &str) -> Result<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid OLLAMA_BASE_URL: {base_url}"))?;

    match url.scheme() {
        "http" => {}
        other => {
            return Err(anyhow!(
                "Unsupported scheme '{other}' for OLLAMA_BASE_URL (use http://localhost:11434)"
            ))
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("OLLAMA_BASE_URL is missing a host"))?;

    let is_local = host.eq_ignore_ascii_case("localhost")
        || host == "127.0.0.1"
        || host == "::1"
        || host == "[::1]";

    if !is_local {
        return Err(anyhow!(
            "Refusing non-local OLLAMA_BASE_URL host '{host}'. This project only uses local Ollama (use http://localhost:11434)."
        ));
    }

    // Url::join drops the last path segment unless it ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PullRequest {
    model: String,
    stream: bool,
}

/// One line of `/api/pull` progress.
#[derive(Debug, Clone, Deserialize)]
pub struct PullProgress {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PullProgress {
    pub fn percent(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => Some(done as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Feeds every NDJSON progress line to `on_progress`; an `error` line ends the pull.
fn read_pull_progress<R, F>(reader: R, model: &str, mut on_progress: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&PullProgress),
{
    for line in reader.lines() {
        let line = line.context("Reading pull progress stream")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let progress: PullProgress = serde_json::from_str(line)
            .with_context(|| format!("Invalid pull progress line: {line}"))?;

        if let Some(error) = &progress.error {
            return Err(anyhow!("Installing model '{model}' failed: {error}"));
        }
        on_progress(&progress);
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}
