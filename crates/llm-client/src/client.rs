use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{Backend, LlmConfig};
use crate::cache::ResponseCache;
use crate::{LlmError, Result};

// ─── TextModel ────────────────────────────────────────────────────────────

/// Anything that turns a prompt into text.
///
/// The pipeline depends on this rather than on [`LlmClient`] directly so it
/// can be driven by canned responses in tests.
pub trait TextModel {
    fn generate(&self, prompt: &str, backend: Backend) -> Result<String>;
}

// ─── LlmClient ────────────────────────────────────────────────────────────

/// Blocking client with a read-through [`ResponseCache`].
pub struct LlmClient {
    http: Client,
    cache: ResponseCache,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        LlmClient {
            http: Client::new(),
            cache: ResponseCache::new(config.cache_dir.clone()),
            config,
        }
    }

    /// Answer `prompt` with `backend`, consulting the cache first.
    ///
    /// A miss issues exactly one HTTP request. Only a non-empty successful
    /// response is written back to the cache.
    pub fn query(&self, prompt: &str, backend: Backend) -> Result<String> {
        if let Some(hit) = self.cache.get(prompt, backend.as_str()) {
            tracing::info!(%backend, "using cached response");
            return Ok(hit);
        }

        tracing::info!(%backend, "calling model API");
        let text = match backend {
            Backend::Perplexity => self.call_perplexity(prompt)?,
            Backend::Gemini => self.call_gemini(prompt)?,
        };
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse(backend.as_str()));
        }

        if let Err(e) = self.cache.put(prompt, backend.as_str(), &text) {
            tracing::warn!(%backend, error = %e, "failed to write response cache");
        }
        Ok(text)
    }

    fn call_perplexity(&self, prompt: &str) -> Result<String> {
        const NAME: &str = "perplexity";
        let cfg = &self.config.perplexity;
        let key = self
            .config
            .api_key(Backend::Perplexity)
            .ok_or(LlmError::MissingApiKey(NAME))?;

        let url = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
        let body = json!({
            "model": cfg.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": cfg.max_tokens,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .map_err(|source| LlmError::Request {
                backend: NAME,
                source,
            })?;
        let raw = read_ok_body(NAME, response)?;

        let parsed: ChatCompletion =
            serde_json::from_str(&raw).map_err(|e| LlmError::MalformedResponse {
                backend: NAME,
                detail: e.to_string(),
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse {
                backend: NAME,
                detail: "no choices[0].message.content".into(),
            })
    }

    fn call_gemini(&self, prompt: &str) -> Result<String> {
        const NAME: &str = "gemini";
        let cfg = &self.config.gemini;
        let key = self
            .config
            .api_key(Backend::Gemini)
            .ok_or(LlmError::MissingApiKey(NAME))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            cfg.base_url.trim_end_matches('/'),
            cfg.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .map_err(|source| LlmError::Request {
                backend: NAME,
                source,
            })?;
        let raw = read_ok_body(NAME, response)?;

        let parsed: GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::MalformedResponse {
                backend: NAME,
                detail: e.to_string(),
            })?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse {
                backend: NAME,
                detail: "no candidates".into(),
            })?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        Ok(text)
    }
}

impl TextModel for LlmClient {
    fn generate(&self, prompt: &str, backend: Backend) -> Result<String> {
        self.query(prompt, backend)
    }
}

fn read_ok_body(backend: &'static str, response: reqwest::blocking::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|source| LlmError::Request { backend, source })?;
    if status != StatusCode::OK {
        return Err(LlmError::Status {
            backend,
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

// ─── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

// ─── Tests ────────────────────────────────────────────────────────────────
