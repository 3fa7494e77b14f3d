use anyhow::Context;
use llm_client::Backend;
use reqflow_core::config::Config;
use std::path::{Path, PathBuf};

/// Settings that can come from flags, the environment (or `.env`), or
/// `reqflow.yaml`, in that order of precedence.
#[derive(clap::Args, Debug, Default)]
pub struct Settings {
    /// Jira base URL, e.g. https://acme.atlassian.net
    #[arg(long, global = true, env = "JIRA_URL")]
    pub jira_url: Option<String>,

    /// Jira account email
    #[arg(long, global = true, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    /// Jira API token
    #[arg(long, global = true, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub jira_api_token: Option<String>,

    /// Jira project key issues are filed under
    #[arg(long, global = true, env = "JIRA_PROJECT_KEY")]
    pub jira_project_key: Option<String>,

    /// Issue type id for requirements
    #[arg(long, global = true, env = "JIRA_PARENT_ISSUE_TYPE")]
    pub parent_issue_type: Option<String>,

    /// Issue type id for test-case subtasks
    #[arg(long, global = true, env = "JIRA_SUBTASK_ISSUE_TYPE")]
    pub subtask_issue_type: Option<String>,

    /// Model backend: perplexity or gemini
    #[arg(long, global = true, env = "REQFLOW_BACKEND")]
    pub backend: Option<Backend>,

    #[arg(long, global = true, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub perplexity_api_key: Option<String>,

    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, global = true, env = "PERPLEXITY_MODEL")]
    pub perplexity_model: Option<String>,

    #[arg(long, global = true, env = "GEMINI_MODEL")]
    pub gemini_model: Option<String>,

    #[arg(long, global = true, env = "PERPLEXITY_BASE_URL", hide = true)]
    pub perplexity_base_url: Option<String>,

    #[arg(long, global = true, env = "GEMINI_BASE_URL", hide = true)]
    pub gemini_base_url: Option<String>,

    /// Directory holding cached model responses
    #[arg(long, global = true, env = "REQFLOW_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory run artifacts are written to
    #[arg(long, global = true, env = "REQFLOW_OUT_DIR")]
    pub out_dir: Option<PathBuf>,
}

impl Settings {
    /// Load `reqflow.yaml` from `root` and lay the flag/env values over it.
    pub fn into_config(self, root: &Path) -> anyhow::Result<Config> {
        let mut cfg = Config::load(root).context("failed to load reqflow.yaml")?;
        self.apply(&mut cfg);
        Ok(cfg)
    }

    fn apply(self, cfg: &mut Config) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        let t = &mut cfg.tracker;
        set(&mut t.base_url, self.jira_url);
        set(&mut t.email, self.jira_email);
        set(&mut t.api_token, self.jira_api_token);
        set(&mut t.project_key, self.jira_project_key);
        set(&mut t.parent_issue_type, self.parent_issue_type);
        set(&mut t.subtask_issue_type, self.subtask_issue_type);

        let llm = &mut cfg.llm;
        if self.perplexity_api_key.is_some() {
            llm.perplexity.api_key = self.perplexity_api_key;
        }
        if self.gemini_api_key.is_some() {
            llm.gemini.api_key = self.gemini_api_key;
        }
        set(&mut llm.perplexity.model, self.perplexity_model);
        set(&mut llm.gemini.model, self.gemini_model);
        set(&mut llm.perplexity.base_url, self.perplexity_base_url);
        set(&mut llm.gemini.base_url, self.gemini_base_url);
        set(&mut llm.cache_dir, self.cache_dir);

        set(&mut cfg.pipeline.backend, self.backend);
        set(&mut cfg.pipeline.out_dir, self.out_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let mut cfg = Config::default();
        cfg.tracker.project_key = "FROM_FILE".into();
        cfg.tracker.email = "file@example.com".into();

        Settings {
            jira_project_key: Some("FLT".into()),
            backend: Some(Backend::Gemini),
            gemini_api_key: Some("g".into()),
            ..Default::default()
        }
        .apply(&mut cfg);

        assert_eq!(cfg.tracker.project_key, "FLT");
        assert_eq!(cfg.tracker.email, "file@example.com");
        assert_eq!(cfg.pipeline.backend, Backend::Gemini);
        assert_eq!(cfg.llm.gemini.api_key.as_deref(), Some("g"));
        assert_eq!(cfg.llm.perplexity.api_key, None);
    }
}
