use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for the {0} backend")]
    MissingApiKey(&'static str),

    #[error("request to {backend} failed: {source}")]
    Request {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("unexpected {backend} response shape: {detail}")]
    MalformedResponse {
        backend: &'static str,
        detail: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
