use crate::output::{print_json, print_table};
use anyhow::Context;
use llm_client::LlmClient;
use reqflow_core::config::Config;
use reqflow_core::jira::JiraClient;
use reqflow_core::pipeline::Pipeline;
use reqflow_core::types::RunReport;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// High-level product request the requirements are drafted from
    #[arg(long, env = "REQFLOW_REQUEST")]
    pub request: Option<String>,

    /// Number of requirements to draft
    #[arg(long)]
    pub requirements: Option<u32>,

    /// Number of test cases to draft per requirement
    #[arg(long)]
    pub test_cases: Option<u32>,

    /// Pause between tracker creations, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(mut config: Config, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let p = &mut config.pipeline;
    if let Some(request) = args.request {
        p.product_request = request;
    }
    if let Some(n) = args.requirements {
        p.requirement_count = n;
    }
    if let Some(n) = args.test_cases {
        p.test_case_count = n;
    }
    if let Some(ms) = args.delay_ms {
        p.issue_delay_ms = ms;
    }

    for w in config.require_valid()? {
        tracing::warn!("{}", w.message);
    }

    let model = LlmClient::new(config.llm.clone());
    let tracker = JiraClient::new(&config.tracker);
    let report = Pipeline::new(&model, &tracker, &config.pipeline)
        .run()
        .context("run aborted")?;

    if json {
        print_json(&report)?;
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let rows: Vec<[String; 4]> = report
        .requirements
        .iter()
        .map(|r| {
            let status = match &r.skipped {
                Some(reason) => format!("skipped: {reason}"),
                None if r.failed_test_cases > 0 => {
                    format!("{} test case(s) rejected", r.failed_test_cases)
                }
                None => "ok".to_string(),
            };
            [
                r.key.to_string(),
                r.title.clone(),
                r.test_cases.len().to_string(),
                status,
            ]
        })
        .collect();
    print_table(["KEY", "REQUIREMENT", "TESTS", "STATUS"], &rows);

    for title in &report.rejected_requirements {
        println!("not filed: {title}");
    }
    println!(
        "\nFiled {} requirement(s) and {} test case(s).",
        report.requirements.len(),
        report.test_case_count()
    );
}
