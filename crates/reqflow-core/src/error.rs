use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReqflowError {
    #[error("cannot reach issue tracker: {0}")]
    ConnectionFailed(String),

    #[error("could not parse model output: {0}")]
    ParseFailed(String),

    #[error("issue tracker rejected the request (HTTP {status}): {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("no requirement issues were created")]
    NoIssuesCreated,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Llm(#[from] llm_client::LlmError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReqflowError>;
