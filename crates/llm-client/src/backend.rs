use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─── Backend ──────────────────────────────────────────────────────────────

/// The text-generation service a prompt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Perplexity,
    Gemini,
}

impl Backend {
    pub fn all() -> &'static [Backend] {
        &[Backend::Perplexity, Backend::Gemini]
    }

    /// Stable identifier, also used as the cache namespace.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Perplexity => "perplexity",
            Backend::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perplexity" => Ok(Backend::Perplexity),
            "gemini" => Ok(Backend::Gemini),
            other => {
                let names: Vec<&str> = Backend::all().iter().map(|b| b.as_str()).collect();
                Err(format!(
                    "unknown backend '{other}' (expected one of: {})",
                    names.join(", ")
                ))
            }
        }
    }
}

// ─── Configuration ────────────────────────────────────────────────────────

pub const DEFAULT_PERPLEXITY_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_PERPLEXITY_MODEL: &str = "sonar";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

pub const DEFAULT_CACHE_DIR: &str = "cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerplexityConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_PERPLEXITY_URL.to_string(),
            model: DEFAULT_PERPLEXITY_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// Everything [`crate::LlmClient`] needs: per-backend endpoints and keys,
/// plus where cached responses live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub cache_dir: PathBuf,
    pub perplexity: PerplexityConfig,
    pub gemini: GeminiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            perplexity: PerplexityConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn api_key(&self, backend: Backend) -> Option<&str> {
        let key = match backend {
            Backend::Perplexity => self.perplexity.api_key.as_deref(),
            Backend::Gemini => self.gemini.api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_backends() {
        assert_eq!("perplexity".parse::<Backend>().unwrap(), Backend::Perplexity);
        assert_eq!("Gemini".parse::<Backend>().unwrap(), Backend::Gemini);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = "gpt".parse::<Backend>().unwrap_err();
        assert!(err.contains("unknown backend 'gpt'"));
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for b in Backend::all() {
            assert_eq!(b.to_string().parse::<Backend>().unwrap(), *b);
        }
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = LlmConfig::default();
        cfg.gemini.api_key = Some("   ".into());
        assert_eq!(cfg.api_key(Backend::Gemini), None);
        cfg.gemini.api_key = Some("k".into());
        assert_eq!(cfg.api_key(Backend::Gemini), Some("k"));
    }
}
