use crate::output::print_json;
use reqflow_core::config::Config;
use reqflow_core::jira::{IssueTracker, JiraClient};

pub fn run(config: &Config, json: bool) -> anyhow::Result<()> {
    let user = JiraClient::new(&config.tracker).check_connection()?;

    if json {
        print_json(&serde_json::json!({
            "connected": true,
            "user": user,
            "base_url": config.tracker.base_url,
        }))?;
    } else {
        println!("Connected to Jira as {user}.");
    }
    Ok(())
}
