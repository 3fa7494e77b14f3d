use crate::error::{ReqflowError, Result};
use crate::paths;
use llm_client::{Backend, LlmConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

pub const DEFAULT_PARENT_ISSUE_TYPE: &str = "10005";
pub const DEFAULT_SUBTASK_ISSUE_TYPE: &str = "10007";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub project_key: String,
    pub parent_issue_type: String,
    pub subtask_issue_type: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            project_key: String::new(),
            parent_issue_type: DEFAULT_PARENT_ISSUE_TYPE.to_string(),
            subtask_issue_type: DEFAULT_SUBTASK_ISSUE_TYPE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

pub const DEFAULT_PRODUCT_REQUEST: &str = "Generate a flight tracking application in ReactJS/Java";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub backend: Backend,
    pub product_request: String,
    pub requirement_count: u32,
    pub test_case_count: u32,
    /// Pause between successive tracker creations.
    pub issue_delay_ms: u64,
    /// Where raw responses, parsed JSON and the run report are written.
    pub out_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            product_request: DEFAULT_PRODUCT_REQUEST.to_string(),
            requirement_count: 5,
            test_case_count: 3,
            issue_delay_ms: 1000,
            out_dir: PathBuf::from("."),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Everything a run needs, built once at startup and handed to the clients
/// and the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load `reqflow.yaml` from `root`, or defaults if the file is absent.
    ///
    /// Secrets are never read from or written to the file; they come from
    /// the environment.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        // 1. Tracker settings are all required
        let t = &self.tracker;
        for (name, value) in [
            ("tracker base URL (JIRA_URL)", &t.base_url),
            ("tracker email (JIRA_EMAIL)", &t.email),
            ("tracker API token (JIRA_API_TOKEN)", &t.api_token),
            ("tracker project key (JIRA_PROJECT_KEY)", &t.project_key),
            ("parent issue type", &t.parent_issue_type),
            ("subtask issue type", &t.subtask_issue_type),
        ] {
            if value.trim().is_empty() {
                error(format!("{name} is not set"));
            }
        }

        // 2. The selected backend needs its key
        let backend = self.pipeline.backend;
        if self.llm.api_key(backend).is_none() {
            let var = match backend {
                Backend::Perplexity => "PERPLEXITY_API_KEY",
                Backend::Gemini => "GEMINI_API_KEY",
            };
            error(format!("backend '{backend}' is selected but {var} is not set"));
        }

        // 3. Counts
        if self.pipeline.requirement_count == 0 {
            error("requirement count must be at least 1".to_string());
        }
        if self.pipeline.product_request.trim().is_empty() {
            error("product request is empty".to_string());
        }

        if self.pipeline.test_case_count == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "test case count is 0; requirements will be filed without tests"
                    .to_string(),
            });
        }

        // 4. URLs should carry a scheme
        if !t.base_url.is_empty() && !t.base_url.starts_with("http") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("tracker base URL '{}' has no http(s) scheme", t.base_url),
            });
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }

    /// Fail with every error-level finding joined into one message.
    /// Warnings are returned for the caller to report.
    pub fn require_valid(&self) -> Result<Vec<ConfigWarning>> {
        let (errors, warnings): (Vec<_>, Vec<_>) = self
            .validate()
            .into_iter()
            .partition(|w| w.level == WarnLevel::Error);
        if errors.is_empty() {
            return Ok(warnings);
        }
        let messages: Vec<String> = errors.into_iter().map(|w| w.message).collect();
        Err(ReqflowError::Config(messages.join("; ")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn complete() -> Config {
        let mut cfg = Config::default();
        cfg.tracker.base_url = "https://example.atlassian.net".into();
        cfg.tracker.email = "qa@example.com".into();
        cfg.tracker.api_token = "token".into();
        cfg.tracker.project_key = "FLT".into();
        cfg.llm.perplexity.api_key = Some("pplx".into());
        cfg
    }

    #[test]
    fn defaults_match_tool_conventions() {
        let cfg = Config::default();
        assert_eq!(cfg.tracker.parent_issue_type, "10005");
        assert_eq!(cfg.tracker.subtask_issue_type, "10007");
        assert_eq!(cfg.pipeline.backend, Backend::Perplexity);
        assert_eq!(cfg.pipeline.requirement_count, 5);
        assert_eq!(cfg.pipeline.test_case_count, 3);
        assert_eq!(cfg.pipeline.issue_delay_ms, 1000);
    }

    #[test]
    fn complete_config_has_no_warnings() {
        assert!(complete().validate().is_empty());
    }

    #[test]
    fn missing_tracker_settings_are_errors() {
        let warnings = Config::default().validate();
        assert!(Config::has_errors(&warnings));
        assert!(warnings.iter().any(|w| w.message.contains("JIRA_URL")));
        assert!(warnings.iter().any(|w| w.message.contains("JIRA_API_TOKEN")));
    }

    #[test]
    fn selected_backend_without_key_is_an_error() {
        let mut cfg = complete();
        cfg.pipeline.backend = Backend::Gemini;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("GEMINI_API_KEY")));
    }

    #[test]
    fn require_valid_joins_error_messages() {
        let mut cfg = complete();
        cfg.tracker.email.clear();
        cfg.pipeline.requirement_count = 0;
        let err = cfg.require_valid().unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("invalid configuration:"));
        assert!(msg.contains("JIRA_EMAIL"));
        assert!(msg.contains("requirement count"));
    }

    #[test]
    fn require_valid_passes_warnings_through() {
        let mut cfg = complete();
        cfg.pipeline.test_case_count = 0;
        let warnings = cfg.require_valid().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn zero_test_cases_is_only_a_warning() {
        let mut cfg = complete();
        cfg.pipeline.test_case_count = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }

    #[test]
    fn load_without_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.pipeline.requirement_count, 5);
    }

    #[test]
    fn save_never_writes_secrets() {
        let dir = TempDir::new().unwrap();
        complete().save(dir.path()).unwrap();
        let yaml = std::fs::read_to_string(paths::config_path(dir.path())).unwrap();
        assert!(yaml.contains("project_key: FLT"));
        assert!(!yaml.contains("api_token"));
        assert!(!yaml.contains("api_key"));
        assert!(!yaml.contains("pplx"));

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.tracker.project_key, "FLT");
        assert!(loaded.tracker.api_token.is_empty());
        assert_eq!(loaded.llm.perplexity.api_key, None);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            paths::config_path(dir.path()),
            "tracker:\n  project_key: QA\npipeline:\n  backend: gemini\n  test_case_count: 2\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.tracker.project_key, "QA");
        assert_eq!(cfg.tracker.parent_issue_type, "10005");
        assert_eq!(cfg.pipeline.backend, Backend::Gemini);
        assert_eq!(cfg.pipeline.test_case_count, 2);
        assert_eq!(cfg.pipeline.requirement_count, 5);
    }
}
