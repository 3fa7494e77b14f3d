pub mod config;
pub mod error;
pub mod io;
pub mod jira;
pub mod paths;
pub mod pipeline;
pub mod prompts;
pub mod repair;
pub mod types;

pub use error::{ReqflowError, Result};
