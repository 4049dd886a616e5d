//! Playwright browser automation
//!
//! Each planned scenario becomes one Node.js script driving
//! `@playwright/test`. The script runs every step in order inside a fresh
//! browser context and reports progress on stdout as one JSON event per
//! line, which `EventParser` folds back into a [`ScenarioOutcome`] while
//! the script is still running.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::js_string;
use crate::spec::{TestStep, Viewport};
use crate::storage::{count_predicate, TODO_STORAGE_KEY};
use crate::suite::{PlannedScenario, PlannedStep, StepPhase};
use crate::todomvc::DEFAULT_BASE_URL;

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI pattern"));

/// Playwright browser handle
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub phase: StepPhase,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An expectation never held within its timeout
    Assertion,
    /// The page failed to load or reload
    Navigation,
    /// An action or storage wait ran out of time
    Timeout,
    Error,
}

/// Why a scenario failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub step_index: Option<usize>,
    pub step_name: Option<String>,
    pub screenshot: Option<PathBuf>,
}

/// Everything a finished scenario script reported
#[derive(Debug, Clone, Default)]
pub struct ScenarioOutcome {
    pub steps: Vec<StepResult>,
    /// Raw `localStorage` value at the end of the run, if the key existed
    pub storage: Option<String>,
    pub failure: Option<Failure>,
}

impl ScenarioOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

/// One line of script output
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ScriptEvent {
    Start {
        index: usize,
    },
    Step {
        index: usize,
        phase: StepPhase,
        name: String,
        duration_ms: u64,
    },
    Log {
        message: String,
    },
    Storage {
        #[allow(dead_code)]
        key: String,
        value: Option<String>,
    },
    StepFailed {
        index: Option<usize>,
        kind: FailureKind,
        message: String,
    },
    Passed,
    Failed {
        index: Option<usize>,
        kind: FailureKind,
        message: String,
        screenshot: Option<PathBuf>,
    },
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config)?;

        std::fs::create_dir_all(config.screenshot_dir())?;

        Ok(Self { config })
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Check that node can resolve `@playwright/test`
    fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let mut cmd = Command::new(&config.node_binary);
        cmd.args(["-e", "require.resolve('@playwright/test')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(node_path) = config.node_path() {
            cmd.env("NODE_PATH", node_path);
        }

        match cmd.status() {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Resolve a step URL against the base URL
    fn resolve_url(&self, url: Option<&str>) -> String {
        match url {
            None => self.config.base_url.clone(),
            Some(url) if url.contains("://") => url.to_string(),
            Some(path) => format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
        }
    }

    fn screenshot_path(&self, scenario: &PlannedScenario) -> PathBuf {
        self.config
            .screenshot_dir()
            .join(format!("{}.png", slug(&scenario.id)))
    }

    /// Build the Playwright script for a planned scenario
    pub fn build_script(&self, scenario: &PlannedScenario) -> String {
        let viewport = scenario.viewport.unwrap_or(self.config.viewport);
        let action_timeout = self
            .config
            .action_timeout
            .map(|t| format!("\n  context.setDefaultTimeout({});", t.as_millis()))
            .unwrap_or_default();
        let screenshot = self.screenshot_path(scenario);

        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"// {id}
const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');

const emit = (event) => console.log(JSON.stringify(event));

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});{action_timeout}
  const page = await context.newPage();
  const expectOptions = {{ timeout: {expect_timeout} }};
  const storageKey = {storage_key};
  const snapshot = async () => {{
    try {{
      return await page.evaluate((key) => window.localStorage.getItem(key), storageKey);
    }} catch (_) {{
      return null;
    }}
  }};
  let current = null;
  let failure = null;
  const step = async (index, phase, name, body) => {{
    current = index;
    emit({{ event: 'start', index }});
    const started = Date.now();
    await body();
    emit({{ event: 'step', index, phase, name, duration_ms: Date.now() - started }});
  }};
  const fail = async (error) => {{
    const kind = error && error.name === 'TimeoutError'
      ? 'timeout'
      : (error && error.matcherResult ? 'assertion' : 'error');
    const message = String((error && error.message) || error);
    emit({{ event: 'step_failed', index: current, kind, message }});
    if (failure === null) {{
      let screenshot = null;
      try {{
        await page.screenshot({{ path: {screenshot}, fullPage: true }});
        screenshot = {screenshot};
      }} catch (_) {{}}
      failure = {{ index: current, kind, message, screenshot }};
    }}
  }};

  try {{
    try {{
"#,
            id = scenario.id.replace('\n', " "),
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = viewport.width,
            height = viewport.height,
            action_timeout = action_timeout,
            expect_timeout = self.config.expect_timeout.as_millis(),
            storage_key = js_string(&self.config.storage_key),
            screenshot = js_string(&screenshot.to_string_lossy()),
        ));

        let (after_each, body): (Vec<_>, Vec<_>) = scenario
            .steps
            .iter()
            .enumerate()
            .partition(|(_, planned)| planned.phase == StepPhase::AfterEach);

        for (index, planned) in body {
            script.push_str(&self.step_call(index, planned));
        }

        // After-each hooks run even when the body failed
        script.push_str(
            r#"    } catch (error) {
      await fail(error);
    }
    try {
"#,
        );

        for (index, planned) in after_each {
            script.push_str(&self.step_call(index, planned));
        }

        // Footer
        script.push_str(
            r#"    } catch (error) {
      await fail(error);
    }
    emit({ event: 'storage', key: storageKey, value: await snapshot() });
    if (failure === null) {
      emit({ event: 'passed' });
    } else {
      emit({ event: 'failed', ...failure });
      process.exitCode = 1;
    }
  } finally {
    await browser.close();
  }
})().catch((error) => {
  console.error(error);
  process.exit(2);
});
"#,
        );

        script
    }

    fn step_call(&self, index: usize, planned: &PlannedStep) -> String {
        format!(
            "      await step({}, {}, {}, async () => {{\n        {}\n      }});\n",
            index,
            js_string(phase_name(planned.phase)),
            js_string(&planned.step.name()),
            self.step_to_js(&planned.step),
        )
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &TestStep) -> String {
        match step {
            TestStep::Goto { url } => {
                format!(
                    "await page.goto({});",
                    js_string(&self.resolve_url(url.as_deref()))
                )
            }
            TestStep::Reload => "await page.reload();".to_string(),
            TestStep::Fill { target, value } => {
                format!("await {}.fill({});", target.to_js(), js_string(value))
            }
            TestStep::Press { target, key } => {
                format!("await {}.press({});", target.to_js(), js_string(key))
            }
            TestStep::Click { target } => format!("await {}.click();", target.to_js()),
            TestStep::Check { target } => format!("await {}.check();", target.to_js()),
            TestStep::Uncheck { target } => format!("await {}.uncheck();", target.to_js()),
            TestStep::ExpectText { target, text } => format!(
                "await expect({}).toHaveText({}, expectOptions);",
                target.to_js(),
                js_string(text)
            ),
            TestStep::ExpectTexts { target, texts } => format!(
                "await expect({}).toHaveText({}, expectOptions);",
                target.to_js(),
                js_array(texts)
            ),
            TestStep::ExpectTextMatches { target, pattern } => format!(
                "await expect({}).toHaveText(new RegExp({}), expectOptions);",
                target.to_js(),
                js_string(pattern)
            ),
            TestStep::ExpectContainsText { target, text } => format!(
                "await expect({}).toContainText({}, expectOptions);",
                target.to_js(),
                js_string(text)
            ),
            TestStep::ExpectClasses { target, classes } => format!(
                "await expect({}).toHaveClass({}, expectOptions);",
                target.to_js(),
                js_array(classes)
            ),
            TestStep::ExpectCount { target, count } => format!(
                "await expect({}).toHaveCount({}, expectOptions);",
                target.to_js(),
                count
            ),
            TestStep::ExpectVisible { target } => {
                format!("await expect({}).toBeVisible(expectOptions);", target.to_js())
            }
            TestStep::ExpectHidden { target } => {
                format!("await expect({}).toBeHidden(expectOptions);", target.to_js())
            }
            TestStep::ExpectEmpty { target } => {
                format!("await expect({}).toBeEmpty(expectOptions);", target.to_js())
            }
            TestStep::ExpectChecked { target, checked } => format!(
                "await expect({}).toBeChecked({{ ...expectOptions, checked: {} }});",
                target.to_js(),
                checked
            ),
            TestStep::StoredTodoCount { key, expected } => format!(
                "await page.waitForFunction({}, {}, expectOptions);",
                count_predicate(key, false),
                expected
            ),
            TestStep::StoredCompletedCount { key, expected } => format!(
                "await page.waitForFunction({}, {}, expectOptions);",
                count_predicate(key, true),
                expected
            ),
            TestStep::Log { message } => {
                format!("emit({{ event: 'log', message: {} }});", js_string(message))
            }
        }
    }

    /// Run one planned scenario in its own browser
    ///
    /// Events are read as they arrive, so a scenario that runs past
    /// `scenario_timeout` still reports the steps it finished and the step
    /// it was stuck in.
    pub async fn run_scenario(&self, scenario: &PlannedScenario) -> E2eResult<ScenarioOutcome> {
        let script = self.build_script(scenario);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running Playwright script for '{}': {}", scenario.id, script_path.display());

        let mut cmd = TokioCommand::new(&self.config.node_binary);
        cmd.arg(&script_path)
            .current_dir(temp_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = self.config.node_path() {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("script stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| E2eError::Playwright("script stderr not captured".to_string()))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut parser = EventParser::new(scenario);
        let mut lines = BufReader::new(stdout).lines();
        let read = async {
            while let Some(line) = lines.next_line().await? {
                parser.feed(&line);
            }
            child.wait().await
        };
        let finished = tokio::time::timeout(self.config.scenario_timeout, read).await;

        let status = match finished {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "'{}' exceeded {} ms, killing the browser",
                    scenario.id,
                    self.config.scenario_timeout.as_millis()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill script for '{}': {}", scenario.id, e);
                }
                return Ok(parser.timed_out(self.config.scenario_timeout));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        match parser.finish() {
            Some(outcome) => {
                if !stderr.trim().is_empty() {
                    debug!("stderr from '{}': {}", scenario.id, stderr.trim());
                }
                Ok(outcome)
            }
            None => Err(E2eError::Playwright(format!(
                "Script for '{}' exited with {} without a result\nstderr: {}",
                scenario.id, status, stderr
            ))),
        }
    }
}

/// Folds the script's stdout, one line at a time, into a [`ScenarioOutcome`]
pub(crate) struct EventParser<'a> {
    scenario: &'a PlannedScenario,
    outcome: ScenarioOutcome,
    /// Step that started and has not reported back yet
    running: Option<usize>,
    finished: bool,
}

impl<'a> EventParser<'a> {
    pub(crate) fn new(scenario: &'a PlannedScenario) -> Self {
        Self {
            scenario,
            outcome: ScenarioOutcome::default(),
            running: None,
            finished: false,
        }
    }

    /// Apply one line of output; anything that isn't an event is ignored
    pub(crate) fn feed(&mut self, line: &str) {
        let line = line.trim();
        if !line.starts_with('{') {
            return;
        }
        let event = match serde_json::from_str::<ScriptEvent>(line) {
            Ok(event) => event,
            Err(e) => {
                debug!("Ignoring script output line ({}): {}", e, line);
                return;
            }
        };

        let id = &self.scenario.id;
        match event {
            ScriptEvent::Start { index } => self.running = Some(index),
            ScriptEvent::Step {
                index,
                phase,
                name,
                duration_ms,
            } => {
                debug!("[{}] step {} ok: {} ({} ms)", id, index, name, duration_ms);
                self.running = None;
                self.outcome.steps.push(StepResult {
                    success: true,
                    step_name: name,
                    phase,
                    duration_ms,
                    error: None,
                });
            }
            ScriptEvent::Log { message } => info!("[TEST LOG] {}", message),
            ScriptEvent::Storage { value, .. } => self.outcome.storage = value,
            ScriptEvent::StepFailed {
                index,
                kind,
                message,
            } => {
                self.running = None;
                self.record_failure(index, kind, strip_ansi(&message));
            }
            ScriptEvent::Passed => self.finished = true,
            ScriptEvent::Failed {
                index,
                kind,
                message,
                screenshot,
            } => {
                let planned = index.and_then(|i| self.scenario.steps.get(i));
                self.outcome.failure = Some(Failure {
                    kind: classify(planned, kind),
                    message: strip_ansi(&message),
                    step_index: index,
                    step_name: planned.map(|p| p.step.name()),
                    screenshot,
                });
                self.finished = true;
            }
        }
    }

    /// The outcome once the script reported a verdict
    pub(crate) fn finish(self) -> Option<ScenarioOutcome> {
        self.finished.then_some(self.outcome)
    }

    /// The outcome of a script killed after `limit`, blaming the running step
    pub(crate) fn timed_out(mut self, limit: Duration) -> ScenarioOutcome {
        let message = format!("Scenario exceeded {} ms", limit.as_millis());
        self.record_failure(self.running, FailureKind::Timeout, message);
        self.outcome
    }

    /// Add a failed step; the first failure becomes the scenario's
    fn record_failure(&mut self, index: Option<usize>, kind: FailureKind, message: String) {
        let planned = index.and_then(|i| self.scenario.steps.get(i));
        let kind = classify(planned, kind);
        match planned {
            Some(planned) => self.outcome.steps.push(StepResult {
                success: false,
                step_name: planned.step.name(),
                phase: planned.phase,
                duration_ms: 0,
                error: Some(message.clone()),
            }),
            None => warn!("Failure in '{}' outside any step", self.scenario.id),
        }
        if self.outcome.failure.is_none() {
            self.outcome.failure = Some(Failure {
                kind,
                message,
                step_index: index,
                step_name: planned.map(|p| p.step.name()),
                screenshot: None,
            });
        }
    }
}

/// Failures while loading a page are navigation failures
fn classify(planned: Option<&PlannedStep>, kind: FailureKind) -> FailureKind {
    match planned.map(|p| &p.step) {
        Some(TestStep::Goto { .. } | TestStep::Reload) if kind != FailureKind::Assertion => {
            FailureKind::Navigation
        }
        _ => kind,
    }
}

/// Remove terminal colour codes from Playwright messages
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

fn phase_name(phase: StepPhase) -> &'static str {
    match phase {
        StepPhase::BeforeEach => "before_each",
        StepPhase::Test => "test",
        StepPhase::AfterEach => "after_each",
    }
}

fn js_array(items: &[String]) -> String {
    let items: Vec<String> = items.iter().map(|s| js_string(s)).collect();
    format!("[{}]", items.join(", "))
}

fn slug(id: &str) -> String {
    let mut slug = String::with_capacity(id.len());
    for c in id.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,

    /// Default timeout for actions; Playwright's own default when `None`
    pub action_timeout: Option<Duration>,

    /// Timeout for each `expect` and storage wait
    pub expect_timeout: Duration,

    /// Wall-clock limit for a whole scenario process; kept above
    /// Playwright's own 30 s navigation and action timeouts
    pub scenario_timeout: Duration,

    /// `localStorage` key snapshotted at the end of each scenario
    pub storage_key: String,

    pub output_dir: PathBuf,
    pub node_binary: PathBuf,

    /// `node_modules` containing `@playwright/test`
    pub node_modules: PathBuf,
}

impl PlaywrightConfig {
    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    fn node_path(&self) -> Option<PathBuf> {
        absolute(&self.node_modules)
    }
}

fn absolute(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            action_timeout: None,
            expect_timeout: Duration::from_secs(5),
            scenario_timeout: Duration::from_secs(60),
            storage_key: TODO_STORAGE_KEY.to_string(),
            output_dir: PathBuf::from("test-results"),
            node_binary: PathBuf::from("node"),
            node_modules: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../node_modules")),
        }
    }
}
