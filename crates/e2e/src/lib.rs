//! TodoMVC E2E Test Suite
//!
//! This crate drives the TodoMVC demo application through Playwright:
//! - Describes scenarios as typed steps (actions, `expect` assertions and
//!   `localStorage` checks) grouped with before-each / after-each hooks
//! - Generates one Playwright script per scenario and runs it with `node`
//! - Runs scenarios concurrently, each in its own browser
//! - Collects step timings, failures and storage snapshots into a JSON report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── load_suite() -> Suite   (todomvc + YAML specs)       │
//! │    ├── plan(suite) -> [PlannedScenario]  (hooks inlined)    │
//! │    ├── wait_for_target(base_url)                            │
//! │    └── run_suite() -> TestSuiteResult                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightHandle                                           │
//! │    ├── build_script(scenario) -> JS                         │
//! │    └── run_scenario(scenario) -> ScenarioOutcome            │
//! │          stdout: {"event": start | step | step_failed |     │
//! │                   log | storage | passed | failed}          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod error;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod spec;
pub mod storage;
pub mod suite;
pub mod target;
pub mod todomvc;

pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use runner::{RunnerConfig, TestRunner};
pub use spec::{TestSpec, TestStep};
pub use suite::{Group, Scenario, Suite};
