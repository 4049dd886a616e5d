//! Main test runner that plans scenarios and runs them in isolated browsers

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Failure, FailureKind, PlaywrightConfig, PlaywrightHandle, StepResult};
use crate::spec::TestSpec;
use crate::storage::StoredTodos;
use crate::suite::{Filter, PlannedScenario, Suite};
use crate::target::{wait_for_target, ProbeConfig};
use crate::todomvc;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// `"<group> > <name>"`
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub failure: Option<Failure>,
    /// Counts from the storage snapshot taken when the scenario ended
    pub stored: Option<StoredTodos>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(
        suite: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        skipped: usize,
        results: Vec<TestResult>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            suite: suite.to_string(),
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            skipped,
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The built-in TodoMVC suite plus any YAML scenarios
    pub fn load_suite(&self) -> E2eResult<Suite> {
        let suite = todomvc::suite();
        match &self.config.specs_dir {
            Some(dir) => {
                let specs = TestSpec::load_all(dir)?;
                info!("Loaded {} YAML scenario(s) from {}", specs.len(), dir.display());
                Ok(suite.with_specs(specs))
            }
            None => Ok(suite),
        }
    }

    /// Planned scenarios that pass the filter, and how many were skipped
    pub fn plan(&self, suite: &Suite) -> (Vec<PlannedScenario>, usize) {
        let planned = suite.plan();
        let total = planned.len();
        let selected: Vec<_> = planned
            .into_iter()
            .filter(|s| self.config.filter.accepts(s))
            .collect();
        let skipped = total - selected.len();
        (selected, skipped)
    }

    /// Run the built-in suite
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let suite = self.load_suite()?;
        self.run_suite(&suite).await
    }

    /// Run every selected scenario of `suite`
    pub async fn run_suite(&self, suite: &Suite) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let (selected, skipped) = self.plan(suite);

        if selected.is_empty() {
            warn!("No scenarios selected ({} skipped)", skipped);
            return Ok(TestSuiteResult::from_results(
                &suite.name,
                started_at,
                0,
                skipped,
                Vec::new(),
            ));
        }

        let base_url = self.config.playwright.base_url.clone();
        wait_for_target(&base_url, &self.config.probe).await?;

        let playwright = PlaywrightHandle::new(self.config.playwright.clone())?;
        let workers = self.config.workers.max(1);

        info!(
            "Running {} scenario(s) against {} with {} worker(s)...",
            selected.len(),
            base_url,
            workers
        );

        let count = selected.len();
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for (index, scenario) in selected.into_iter().enumerate() {
            let playwright = playwright.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, run_planned(&playwright, &scenario).await)
            });
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; count];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| E2eError::Playwright(format!("scenario task failed: {}", e)))?;
            slots[index] = Some(result);
        }
        let results: Vec<TestResult> = slots.into_iter().flatten().collect();

        let duration_ms = start.elapsed().as_millis() as u64;
        let summary =
            TestSuiteResult::from_results(&suite.name, started_at, duration_ms, skipped, results);

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.duration_ms
        );

        Ok(summary)
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let output_dir = &self.config.playwright.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one scenario; failures are captured in the result
async fn run_planned(playwright: &PlaywrightHandle, scenario: &PlannedScenario) -> TestResult {
    let start = Instant::now();
    debug!("Running test: {}", scenario.id);

    let (steps, failure, stored) = match playwright.run_scenario(scenario).await {
        Ok(outcome) => {
            let stored = outcome.storage.as_deref().and_then(|raw| {
                StoredTodos::from_raw(raw)
                    .map_err(|e| warn!("[{}] {}", scenario.id, e))
                    .ok()
            });
            (outcome.steps, outcome.failure, stored)
        }
        Err(e) => {
            let failure = Failure {
                kind: FailureKind::Error,
                message: e.to_string(),
                step_index: None,
                step_name: None,
                screenshot: None,
            };
            (Vec::new(), Some(failure), None)
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    match &failure {
        None => info!("✓ {} ({} ms)", scenario.id, duration_ms),
        Some(f) => error!(
            "✗ {} - {:?} at {}: {}",
            scenario.id,
            f.kind,
            f.step_name.as_deref().unwrap_or("<scenario>"),
            f.message
        ),
    }

    TestResult {
        name: scenario.id.clone(),
        success: failure.is_none(),
        duration_ms,
        steps,
        failure,
        stored,
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub probe: ProbeConfig,

    /// Extra YAML scenarios
    pub specs_dir: Option<PathBuf>,

    pub filter: Filter,

    /// Scenarios run concurrently, each in its own browser
    pub workers: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            probe: ProbeConfig::default(),
            specs_dir: None,
            filter: Filter::default(),
            workers: default_workers(),
        }
    }
}

/// Half the available cores, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}
