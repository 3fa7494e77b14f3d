use chrono::{DateTime, Utc};
use llm_client::Backend;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// IssueKey
// ---------------------------------------------------------------------------

/// Tracker-assigned issue identifier, e.g. `FLT-12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    pub fn new(key: impl Into<String>) -> Self {
        IssueKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Requirement
// ---------------------------------------------------------------------------

/// A requirement as drafted by the model. Every field is mandatory; a
/// missing or null field fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
}

impl Requirement {
    /// Issue body: the description followed by a bulleted criteria list.
    pub fn issue_description(&self) -> String {
        let mut out = format!("{}\n\nAcceptance Criteria:\n", self.description);
        for ac in &self.acceptance_criteria {
            out.push_str("- ");
            out.push_str(ac);
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// RequirementIssue
// ---------------------------------------------------------------------------

/// A requirement after it was filed. `description` is the rendered issue
/// body, which is also what the test-case prompt is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementIssue {
    pub key: IssueKey,
    pub title: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// TestCase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub title: String,
    #[serde(deserialize_with = "deserialize_steps")]
    pub steps: Vec<String>,
    pub expected_result: String,
}

impl TestCase {
    pub fn issue_description(&self) -> String {
        format!(
            "Steps:\n{}\n\nExpected Result:\n{}",
            self.steps.join("\n"),
            self.expected_result
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSteps {
    List(Vec<Value>),
    Text(String),
}

/// Accept `steps` either as a list or as one block of text.
///
/// Lists keep their string items in order; bare numbers are step indices
/// the model emitted as separate elements and are dropped. Text is split
/// into its non-empty lines.
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let steps = match RawSteps::deserialize(deserializer)? {
        RawSteps::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(_) | Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        RawSteps::Text(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    };
    Ok(steps)
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// What a single requirement issue ended up with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementOutcome {
    pub key: IssueKey,
    pub title: String,
    #[serde(default)]
    pub test_cases: Vec<IssueKey>,
    #[serde(default)]
    pub failed_test_cases: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub backend: Backend,
    pub product_request: String,
    pub requirements: Vec<RequirementOutcome>,
    /// Titles of drafted requirements the tracker refused.
    #[serde(default)]
    pub rejected_requirements: Vec<String>,
}

impl RunReport {
    pub fn test_case_count(&self) -> usize {
        self.requirements.iter().map(|r| r.test_cases.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
