use crate::config::PipelineConfig;
use crate::error::{ReqflowError, Result};
use crate::io;
use crate::jira::IssueTracker;
use crate::paths;
use crate::prompts;
use crate::repair;
use crate::types::{
    Requirement, RequirementIssue, RequirementOutcome, RunReport, TestCase,
};
use chrono::Utc;
use llm_client::TextModel;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drives one run, strictly in order:
///
/// ```text
/// check connection → draft requirements → persist → file requirements
///     → per requirement: draft tests → repair + persist → file subtasks
/// ```
///
/// A failed connection check, an unparseable requirements draft, or zero
/// filed requirements end the run with an error. Everything per
/// requirement is skipped and logged instead.
pub struct Pipeline<'a, M: TextModel, T: IssueTracker> {
    model: &'a M,
    tracker: &'a T,
    config: &'a PipelineConfig,
    delay: Duration,
}

impl<'a, M: TextModel, T: IssueTracker> Pipeline<'a, M, T> {
    pub fn new(model: &'a M, tracker: &'a T, config: &'a PipelineConfig) -> Self {
        Pipeline {
            model,
            tracker,
            config,
            delay: Duration::from_millis(config.issue_delay_ms),
        }
    }

    pub fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();

        self.tracker.check_connection()?;

        let requirements = self.generate_requirements()?;
        tracing::info!(count = requirements.len(), "generated requirements");

        let mut creations = 0usize;
        let (issues, rejected) = self.create_requirement_issues(&requirements, &mut creations);
        if issues.is_empty() {
            return Err(ReqflowError::NoIssuesCreated);
        }

        let mut outcomes = Vec::with_capacity(issues.len());
        for issue in &issues {
            outcomes.push(self.process_requirement(issue, &mut creations));
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            backend: self.config.backend,
            product_request: self.config.product_request.clone(),
            requirements: outcomes,
            rejected_requirements: rejected,
        };
        io::write_json(&paths::run_report_path(&self.config.out_dir), &report)?;
        tracing::info!(
            requirements = report.requirements.len(),
            test_cases = report.test_case_count(),
            "run complete"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Requirements
    // -----------------------------------------------------------------------

    fn generate_requirements(&self) -> Result<Vec<Requirement>> {
        let out = &self.config.out_dir;
        let prompt =
            prompts::requirements_prompt(&self.config.product_request, self.config.requirement_count);

        tracing::info!(backend = %self.config.backend, "generating requirements");
        let raw = match self.model.generate(&prompt, self.config.backend) {
            Ok(raw) => raw,
            Err(e) => {
                io::atomic_write(&paths::requirements_raw_path(out), format!("Error: {e}").as_bytes())?;
                return Err(e.into());
            }
        };
        io::atomic_write(&paths::requirements_raw_path(out), raw.as_bytes())?;

        let requirements: Vec<Requirement> = repair::parse_items(&raw).map_err(|e| {
            tracing::error!(
                raw = %paths::requirements_raw_path(out).display(),
                "requirements response is not usable; see the raw file"
            );
            e
        })?;
        io::write_json(&paths::requirements_path(out), &requirements)?;
        Ok(requirements)
    }

    fn create_requirement_issues(
        &self,
        requirements: &[Requirement],
        creations: &mut usize,
    ) -> (Vec<RequirementIssue>, Vec<String>) {
        let mut issues = Vec::new();
        let mut rejected = Vec::new();

        for req in requirements {
            let description = req.issue_description();
            self.pace(creations);
            match self.tracker.create_parent(&req.title, &description) {
                Ok(key) => issues.push(RequirementIssue {
                    key,
                    title: req.title.clone(),
                    description,
                }),
                Err(e) => {
                    tracing::warn!(title = %req.title, error = %e, "failed to create requirement");
                    rejected.push(req.title.clone());
                }
            }
        }
        (issues, rejected)
    }

    // -----------------------------------------------------------------------
    // Test cases
    // -----------------------------------------------------------------------

    fn process_requirement(
        &self,
        issue: &RequirementIssue,
        creations: &mut usize,
    ) -> RequirementOutcome {
        let mut outcome = RequirementOutcome {
            key: issue.key.clone(),
            title: issue.title.clone(),
            test_cases: Vec::new(),
            failed_test_cases: 0,
            skipped: None,
        };

        if self.config.test_case_count == 0 {
            return outcome;
        }

        tracing::info!(key = %issue.key, title = %issue.title, "generating test cases");
        let cases = match self.generate_test_cases(issue) {
            Ok(cases) => cases,
            Err(e) => {
                tracing::warn!(key = %issue.key, error = %e, "skipping requirement");
                outcome.skipped = Some(e.to_string());
                return outcome;
            }
        };
        tracing::info!(key = %issue.key, count = cases.len(), "generated test cases");

        for case in &cases {
            self.pace(creations);
            match self
                .tracker
                .create_child(&issue.key, &case.title, &case.issue_description())
            {
                Ok(key) => outcome.test_cases.push(key),
                Err(e) => {
                    tracing::warn!(parent = %issue.key, title = %case.title, error = %e, "failed to create test case");
                    outcome.failed_test_cases += 1;
                }
            }
        }
        outcome
    }

    /// Draft, persist and parse the test cases for one requirement.
    fn generate_test_cases(&self, issue: &RequirementIssue) -> Result<Vec<TestCase>> {
        let out = &self.config.out_dir;
        let raw_path = paths::test_cases_raw_path(out, &issue.key);
        let prompt = prompts::test_cases_prompt(issue, self.config.test_case_count);

        let raw = match self.model.generate(&prompt, self.config.backend) {
            Ok(raw) => raw,
            Err(e) => {
                io::atomic_write(&raw_path, format!("Error: {e}").as_bytes())?;
                return Err(e.into());
            }
        };
        io::atomic_write(&raw_path, raw.as_bytes())?;

        let cases: Vec<TestCase> = repair::parse_items(&raw)?;
        io::write_json(&paths::test_cases_path(out, &issue.key), &cases)?;
        Ok(cases)
    }

    /// Sleep before every tracker creation except the first.
    fn pace(&self, creations: &mut usize) {
        if *creations > 0 && !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        *creations += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
