//! `llm-client`: blocking text generation against Perplexity and Gemini,
//! with an on-disk response cache.
//!
//! ```text
//! LlmClient::query(prompt, backend)
//!     │
//!     ├─ ResponseCache::get     hit → return cached text
//!     │
//!     ▼ miss
//! POST /chat/completions         (perplexity)
//! POST /v1beta/models/…:generateContent   (gemini)
//!     │
//!     ▼
//! ResponseCache::put → text
//! ```
//!
//! Failures are never retried. [`TextModel`] is the seam callers depend on.

pub mod backend;
pub mod cache;
pub mod client;
pub mod error;

pub use backend::{Backend, GeminiConfig, LlmConfig, PerplexityConfig};
pub use cache::ResponseCache;
pub use client::{LlmClient, TextModel};
pub use error::LlmError;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LlmError>;
