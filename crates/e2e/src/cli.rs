//! Command line of the `e2e` test binary
//!
//! `cargo test` forwards libtest flags (`--nocapture`, `--test-threads=1`,
//! name filters) to harness-less tests as well. Those are dropped before
//! parsing so they can't hide `--live` or the other options.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::playwright::{Browser, PlaywrightConfig};
use crate::runner::{default_workers, RunnerConfig};
use crate::suite::Filter;
use crate::target::ProbeConfig;
use crate::todomvc::DEFAULT_BASE_URL;

/// libtest flags that take no value
const LIBTEST_FLAGS: &[&str] = &[
    "--nocapture",
    "--show-output",
    "--quiet",
    "-q",
    "--exact",
    "--ignored",
    "--include-ignored",
    "--list",
    "--bench",
    "--test",
    "--force-run-in-process",
    "--report-time",
    "--ensure-time",
];

/// libtest options followed by a value
const LIBTEST_OPTIONS: &[&str] = &[
    "--test-threads",
    "--color",
    "--format",
    "--skip",
    "--logfile",
    "--shuffle-seed",
    "-Z",
];

/// Our options that take a value, so their values aren't mistaken for filters
const VALUE_OPTIONS: &[&str] = &[
    "--base-url",
    "--browser",
    "-w",
    "--workers",
    "-g",
    "--grep",
    "-t",
    "--tag",
    "-s",
    "--specs",
    "-o",
    "--output",
    "--expect-timeout-ms",
    "--action-timeout-ms",
    "--scenario-timeout-ms",
    "--node-modules",
];

#[derive(Parser, Debug)]
#[command(name = "todomvc-e2e")]
#[command(about = "E2E test runner for the TodoMVC demo")]
pub struct Args {
    /// Launch browsers and run the scenarios
    #[arg(long, env = "TODOMVC_E2E")]
    pub live: bool,

    /// Base URL of the application under test
    #[arg(long, env = "TODOMVC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Browser to use
    #[arg(long, env = "TODOMVC_BROWSER", value_enum, default_value_t = Browser::Chromium)]
    pub browser: Browser,

    /// Show the browser window
    #[arg(long, env = "TODOMVC_HEADED")]
    pub headed: bool,

    /// Scenarios run at the same time (0 = half the cores)
    #[arg(short, long, env = "TODOMVC_WORKERS", default_value = "0")]
    pub workers: usize,

    /// Run only scenarios whose "<group> > <name>" contains this text
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Directory of extra YAML scenarios
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Output directory for results and failure screenshots
    #[arg(short, long, default_value = "test-results")]
    pub output: PathBuf,

    /// Timeout for each assertion and storage wait
    #[arg(long, default_value = "5000")]
    pub expect_timeout_ms: u64,

    /// Timeout for individual actions (0 = Playwright default)
    #[arg(long, default_value = "0")]
    pub action_timeout_ms: u64,

    /// Wall-clock limit per scenario
    #[arg(long, default_value = "60000")]
    pub scenario_timeout_ms: u64,

    /// Skip the reachability check of the base URL
    #[arg(long)]
    pub no_probe: bool,

    /// node_modules directory providing @playwright/test
    #[arg(long, env = "TODOMVC_NODE_MODULES")]
    pub node_modules: Option<PathBuf>,
}

impl Args {
    /// Parse the process arguments, exiting with status 2 on bad input
    pub fn from_env() -> Self {
        Self::parse_args(std::env::args()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args` (program name first) after dropping libtest flags
    pub fn parse_args<I>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        Self::try_parse_from(strip_libtest_args(args))
    }

    pub fn runner_config(&self) -> RunnerConfig {
        let mut playwright = PlaywrightConfig {
            base_url: self.base_url.clone(),
            browser: self.browser,
            headless: !self.headed,
            action_timeout: (self.action_timeout_ms > 0)
                .then(|| Duration::from_millis(self.action_timeout_ms)),
            expect_timeout: Duration::from_millis(self.expect_timeout_ms),
            scenario_timeout: Duration::from_millis(self.scenario_timeout_ms),
            output_dir: self.output.clone(),
            ..Default::default()
        };
        if let Some(node_modules) = &self.node_modules {
            playwright.node_modules = node_modules.clone();
        }

        RunnerConfig {
            playwright,
            probe: ProbeConfig {
                enabled: !self.no_probe,
                ..Default::default()
            },
            specs_dir: self.specs.clone(),
            filter: Filter {
                grep: self.grep.clone(),
                tag: self.tag.clone(),
            },
            workers: if self.workers == 0 {
                default_workers()
            } else {
                self.workers
            },
        }
    }
}

/// Drop libtest flags and test-name filters, keeping the program name
pub fn strip_libtest_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut kept: Vec<String> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let name = arg.split('=').next().unwrap_or_default();

        if LIBTEST_FLAGS.contains(&arg.as_str()) {
            continue;
        }
        if LIBTEST_OPTIONS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if LIBTEST_OPTIONS.contains(&name) || arg.starts_with("-Z") {
            continue;
        }
        if VALUE_OPTIONS.contains(&arg.as_str()) {
            kept.push(arg);
            kept.extend(args.next());
            continue;
        }
        if arg.starts_with('-') {
            kept.push(arg);
        }
        // Anything else is a libtest name filter
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("e2e")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test_case(&["--live", "--nocapture"] ; "nocapture after")]
    #[test_case(&["--nocapture", "--live"] ; "nocapture before")]
    #[test_case(&["--test-threads", "1", "--live"] ; "separate value")]
    #[test_case(&["--test-threads=1", "--live", "-q"] ; "inline value")]
    #[test_case(&["--live", "some_filter", "--exact"] ; "name filter")]
    #[test_case(&["-Zunstable-options", "--live", "--format", "json"] ; "unstable options")]
    fn libtest_flags_do_not_hide_live(args: &[&str]) {
        let args = Args::parse_args(argv(args)).unwrap();
        assert!(args.live);
    }

    #[test]
    fn keeps_values_of_our_options() {
        let stripped = strip_libtest_args(argv(&[
            "--nocapture",
            "--grep",
            "persistence",
            "-t",
            "smoke",
            "filter",
        ]));
        assert_eq!(stripped, argv(&["--grep", "persistence", "-t", "smoke"]));
    }

    #[test]
    fn unknown_flags_are_errors() {
        let err = Args::parse_args(argv(&["--live", "--no-such-flag"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn builds_runner_config() {
        let args = Args::parse_args(argv(&[
            "--nocapture",
            "--base-url",
            "http://localhost:4173/todomvc",
            "--browser",
            "webkit",
            "--headed",
            "-w",
            "3",
            "--grep",
            "counter",
            "--action-timeout-ms",
            "1500",
            "--no-probe",
        ]))
        .unwrap();
        let config = args.runner_config();

        assert_eq!(config.playwright.base_url, "http://localhost:4173/todomvc");
        assert_eq!(config.playwright.browser, Browser::Webkit);
        assert!(!config.playwright.headless);
        assert_eq!(config.playwright.action_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.playwright.scenario_timeout, Duration::from_secs(60));
        assert_eq!(config.workers, 3);
        assert_eq!(config.filter.grep.as_deref(), Some("counter"));
        assert!(!config.probe.enabled);
    }

    #[test]
    fn zero_workers_means_default() {
        let config = Args::parse_args(argv(&["-w", "0"])).unwrap().runner_config();
        assert_eq!(config.workers, default_workers());
    }
}
