use crate::config::TrackerConfig;
use crate::error::{ReqflowError, Result};
use crate::types::IssueKey;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

/// The three tracker operations the pipeline needs.
pub trait IssueTracker {
    /// Verify credentials and reachability. Returns the authenticated
    /// user's display name.
    fn check_connection(&self) -> Result<String>;

    fn create_parent(&self, title: &str, description: &str) -> Result<IssueKey>;

    fn create_child(&self, parent: &IssueKey, title: &str, description: &str)
        -> Result<IssueKey>;
}

// ---------------------------------------------------------------------------
// JiraClient
// ---------------------------------------------------------------------------

/// Jira Cloud REST v3 client. One blocking request per call, no retries.
pub struct JiraClient {
    http: Client,
    base_url: String,
    authorization: String,
    project_key: String,
    parent_issue_type: String,
    subtask_issue_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    display_name: Option<String>,
    email_address: Option<String>,
    account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

impl JiraClient {
    pub fn new(config: &TrackerConfig) -> Self {
        let credentials = format!("{}:{}", config.email, config.api_token);
        JiraClient {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", BASE64.encode(credentials)),
            project_key: config.project_key.clone(),
            parent_issue_type: config.parent_issue_type.clone(),
            subtask_issue_type: config.subtask_issue_type.clone(),
        }
    }

    fn request(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| ReqflowError::ConnectionFailed(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ReqflowError::ConnectionFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(ReqflowError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn create_issue(&self, fields: Value) -> Result<IssueKey> {
        let payload = json!({ "fields": fields });
        tracing::debug!(body = %payload, "jira create issue");

        let url = format!("{}/rest/api/3/issue", self.base_url);
        let body = self.request(self.http.post(url).json(&payload))?;
        let created: CreatedIssue = serde_json::from_str(&body).map_err(|e| {
            ReqflowError::ParseFailed(format!("tracker response has no issue key: {e}"))
        })?;
        Ok(IssueKey::new(created.key))
    }
}

impl IssueTracker for JiraClient {
    fn check_connection(&self) -> Result<String> {
        let url = format!("{}/rest/api/3/myself", self.base_url);
        let body = match self.request(self.http.get(url)) {
            Ok(body) => body,
            Err(ReqflowError::RemoteRejected { status, body }) => {
                return Err(ReqflowError::ConnectionFailed(format!(
                    "HTTP {status}: {body}"
                )))
            }
            Err(e) => return Err(e),
        };
        let me: Myself = serde_json::from_str(&body)
            .map_err(|e| ReqflowError::ConnectionFailed(format!("unexpected response: {e}")))?;
        let name = me
            .display_name
            .or(me.email_address)
            .or(me.account_id)
            .unwrap_or_else(|| "unknown user".to_string());
        tracing::info!(user = %name, "connected to Jira");
        Ok(name)
    }

    fn create_parent(&self, title: &str, description: &str) -> Result<IssueKey> {
        let key = self.create_issue(json!({
            "project": { "key": self.project_key },
            "summary": title,
            "description": adf_document(description),
            "issuetype": { "id": self.parent_issue_type },
        }))?;
        tracing::info!(%key, title, "created requirement");
        Ok(key)
    }

    fn create_child(
        &self,
        parent: &IssueKey,
        title: &str,
        description: &str,
    ) -> Result<IssueKey> {
        let key = self.create_issue(json!({
            "project": { "key": self.project_key },
            "parent": { "key": parent.as_str() },
            "summary": format!("Test: {title}"),
            "description": adf_document(description),
            "issuetype": { "id": self.subtask_issue_type },
        }))?;
        tracing::info!(%key, %parent, title, "created test case");
        Ok(key)
    }
}

/// Wrap plain text in a single-paragraph Atlassian Document Format body.
pub fn adf_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }]
        }]
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
