use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::Result;

// ─── ResponseCache ────────────────────────────────────────────────────────

/// Content-addressed store for raw model responses.
///
/// Each unique (prompt, model) pair maps to one file under the cache
/// directory, named `<model>_<sha256>.json`. The file holds the response
/// text encoded as a JSON string. Entries never expire; deleting the file
/// is the only way to force a fresh call.
///
/// ```rust,ignore
/// let cache = ResponseCache::new("cache");
/// if let Some(hit) = cache.get(prompt, "perplexity") {
///     return Ok(hit);
/// }
/// let text = call_backend(prompt)?;
/// cache.put(prompt, "perplexity", &text)?;
/// ```
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// the first `put`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ResponseCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the cached response for `(prompt, model)`, or `None` on a miss.
    ///
    /// An entry that cannot be read or decoded counts as a miss.
    pub fn get(&self, prompt: &str, model: &str) -> Option<String> {
        let path = self.path(prompt, model);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry");
                return None;
            }
        };
        match serde_json::from_str::<String>(&raw) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache entry");
                None
            }
        }
    }

    /// Store `response` for `(prompt, model)`, replacing any previous entry.
    pub fn put(&self, prompt: &str, model: &str, response: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec(response)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.persist(self.path(prompt, model)).map_err(|e| e.error)?;
        Ok(())
    }

    fn path(&self, prompt: &str, model: &str) -> PathBuf {
        self.dir
            .join(format!("{model}_{}.json", cache_key(prompt, model)))
    }
}

/// Deterministic hex digest of `(prompt, model)`.
pub fn cache_key(prompt: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (ResponseCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path().join("cache"));
        (cache, dir)
    }

    #[test]
    fn get_returns_none_when_empty() {
        let (cache, _dir) = cache();
        assert_eq!(cache.get("hello", "perplexity"), None);
    }

    #[test]
    fn put_then_get_returns_response() {
        let (cache, _dir) = cache();
        cache.put("hello", "perplexity", "[{\"a\": 1}]").unwrap();
        assert_eq!(
            cache.get("hello", "perplexity"),
            Some("[{\"a\": 1}]".to_string())
        );
    }

    #[test]
    fn model_is_part_of_the_key() {
        let (cache, _dir) = cache();
        cache.put("hello", "perplexity", "from perplexity").unwrap();
        assert_eq!(cache.get("hello", "gemini"), None);
        assert_ne!(cache_key("hello", "perplexity"), cache_key("hello", "gemini"));
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(cache_key("p", "m"), cache_key("p", "m"));
        assert_eq!(cache_key("p", "m").len(), 64);
    }

    #[test]
    fn creates_dir_on_first_put() {
        let (cache, _dir) = cache();
        assert!(!cache.dir().exists());
        cache.put("p", "gemini", "text").unwrap();
        assert!(cache.dir().exists());
        let files: Vec<_> = std::fs::read_dir(cache.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let (cache, _dir) = cache();
        cache.put("p", "gemini", "old").unwrap();
        cache.put("p", "gemini", "new").unwrap();
        assert_eq!(cache.get("p", "gemini"), Some("new".into()));
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let (cache, _dir) = cache();
        cache.put("p", "gemini", "text").unwrap();
        std::fs::write(cache.path("p", "gemini"), "not json").unwrap();
        assert_eq!(cache.get("p", "gemini"), None);
    }
}
