//! Test steps and declarative YAML scenarios

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::storage::TODO_STORAGE_KEY;

/// `RegExp` syntax the `regex` crate doesn't support
static JS_ONLY_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\?<?[=!]|\\[1-9]").expect("valid syntax pattern"));

/// A scenario specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Group the scenario is reported under
    #[serde(default)]
    pub group: Option<String>,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport override for the browser
    #[serde(default)]
    pub viewport: Option<Viewport>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL; relative URLs resolve against the base URL
    Goto {
        #[serde(default)]
        url: Option<String>,
    },

    /// Reload the current page
    Reload,

    /// Fill an input field
    Fill { target: Locator, value: String },

    /// Press a key while the target is focused
    Press { target: Locator, key: String },

    /// Click an element
    Click { target: Locator },

    /// Check a checkbox
    Check { target: Locator },

    /// Uncheck a checkbox
    Uncheck { target: Locator },

    /// Element text equals `text`
    ExpectText { target: Locator, text: String },

    /// Matched elements have exactly these texts, in order
    ExpectTexts { target: Locator, texts: Vec<String> },

    /// Element text matches a regular expression
    ///
    /// The pattern runs in the browser as a JavaScript `RegExp`. Patterns
    /// using lookaround or backreferences are passed through unchecked.
    ExpectTextMatches { target: Locator, pattern: String },

    /// Element text contains `text`
    ExpectContainsText { target: Locator, text: String },

    /// Matched elements have exactly these class attributes, in order
    ExpectClasses {
        target: Locator,
        classes: Vec<String>,
    },

    /// Number of matched elements
    ExpectCount { target: Locator, count: usize },

    ExpectVisible { target: Locator },

    ExpectHidden { target: Locator },

    /// Input has no value
    ExpectEmpty { target: Locator },

    ExpectChecked {
        target: Locator,
        #[serde(default = "default_checked")]
        checked: bool,
    },

    /// Stored todo list has `expected` entries
    StoredTodoCount {
        #[serde(default = "default_storage_key")]
        key: String,
        expected: usize,
    },

    /// Stored todo list has `expected` completed entries
    StoredCompletedCount {
        #[serde(default = "default_storage_key")]
        key: String,
        expected: usize,
    },

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_checked() -> bool {
    true
}

fn default_storage_key() -> String {
    TODO_STORAGE_KEY.to_string()
}

impl TestStep {
    pub fn goto() -> Self {
        TestStep::Goto { url: None }
    }

    pub fn fill(target: &Locator, value: impl Into<String>) -> Self {
        TestStep::Fill {
            target: target.clone(),
            value: value.into(),
        }
    }

    pub fn press(target: &Locator, key: impl Into<String>) -> Self {
        TestStep::Press {
            target: target.clone(),
            key: key.into(),
        }
    }

    pub fn click(target: &Locator) -> Self {
        TestStep::Click {
            target: target.clone(),
        }
    }

    pub fn check(target: &Locator) -> Self {
        TestStep::Check {
            target: target.clone(),
        }
    }

    pub fn uncheck(target: &Locator) -> Self {
        TestStep::Uncheck {
            target: target.clone(),
        }
    }

    pub fn expect_text(target: &Locator, text: impl Into<String>) -> Self {
        TestStep::ExpectText {
            target: target.clone(),
            text: text.into(),
        }
    }

    pub fn expect_texts<S: AsRef<str>>(target: &Locator, texts: &[S]) -> Self {
        TestStep::ExpectTexts {
            target: target.clone(),
            texts: texts.iter().map(|t| t.as_ref().to_string()).collect(),
        }
    }

    pub fn expect_text_matches(target: &Locator, pattern: impl Into<String>) -> Self {
        TestStep::ExpectTextMatches {
            target: target.clone(),
            pattern: pattern.into(),
        }
    }

    pub fn expect_contains_text(target: &Locator, text: impl Into<String>) -> Self {
        TestStep::ExpectContainsText {
            target: target.clone(),
            text: text.into(),
        }
    }

    pub fn expect_classes<S: AsRef<str>>(target: &Locator, classes: &[S]) -> Self {
        TestStep::ExpectClasses {
            target: target.clone(),
            classes: classes.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    pub fn expect_count(target: &Locator, count: usize) -> Self {
        TestStep::ExpectCount {
            target: target.clone(),
            count,
        }
    }

    pub fn expect_visible(target: &Locator) -> Self {
        TestStep::ExpectVisible {
            target: target.clone(),
        }
    }

    pub fn expect_hidden(target: &Locator) -> Self {
        TestStep::ExpectHidden {
            target: target.clone(),
        }
    }

    pub fn expect_empty(target: &Locator) -> Self {
        TestStep::ExpectEmpty {
            target: target.clone(),
        }
    }

    pub fn expect_checked(target: &Locator) -> Self {
        TestStep::ExpectChecked {
            target: target.clone(),
            checked: true,
        }
    }

    /// Short name used in logs and reports
    pub fn name(&self) -> String {
        match self {
            TestStep::Goto { url: None } => "goto".to_string(),
            TestStep::Goto { url: Some(url) } => format!("goto:{}", url),
            TestStep::Reload => "reload".to_string(),
            TestStep::Fill { target, .. } => format!("fill:{}", target),
            TestStep::Press { target, key } => format!("press:{}:{}", target, key),
            TestStep::Click { target } => format!("click:{}", target),
            TestStep::Check { target } => format!("check:{}", target),
            TestStep::Uncheck { target } => format!("uncheck:{}", target),
            TestStep::ExpectText { target, .. } => format!("expect_text:{}", target),
            TestStep::ExpectTexts { target, .. } => format!("expect_texts:{}", target),
            TestStep::ExpectTextMatches { target, pattern } => {
                format!("expect_text_matches:{}:/{}/", target, pattern)
            }
            TestStep::ExpectContainsText { target, .. } => {
                format!("expect_contains_text:{}", target)
            }
            TestStep::ExpectClasses { target, .. } => format!("expect_classes:{}", target),
            TestStep::ExpectCount { target, count } => {
                format!("expect_count:{}:{}", target, count)
            }
            TestStep::ExpectVisible { target } => format!("expect_visible:{}", target),
            TestStep::ExpectHidden { target } => format!("expect_hidden:{}", target),
            TestStep::ExpectEmpty { target } => format!("expect_empty:{}", target),
            TestStep::ExpectChecked { target, checked } => {
                format!("expect_checked:{}:{}", target, checked)
            }
            TestStep::StoredTodoCount { expected, .. } => format!("stored_todos:{}", expected),
            TestStep::StoredCompletedCount { expected, .. } => {
                format!("stored_completed:{}", expected)
            }
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }

    /// Reject steps Playwright would only fail on at run time
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TestStep::ExpectTextMatches { pattern, .. } if !JS_ONLY_SYNTAX.is_match(pattern) => {
                Regex::new(pattern)
                    .map(|_| ())
                    .map_err(|e| format!("invalid pattern /{}/: {}", pattern, e))
            }
            TestStep::Fill { value, .. } if value.contains('\n') => {
                Err("fill value must be a single line".to_string())
            }
            TestStep::Press { key, .. } if key.trim().is_empty() => {
                Err("key must not be empty".to_string())
            }
            TestStep::StoredTodoCount { key, .. } | TestStep::StoredCompletedCount { key, .. }
                if key.is_empty() =>
            {
                Err("storage key must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        for path in paths {
            specs.push(Self::from_file(&path)?);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("'{}' has no steps", self.name)));
        }
        for step in &self.steps {
            step.validate().map_err(|reason| E2eError::InvalidStep {
                scenario: self.name.clone(),
                step: step.name(),
                reason,
            })?;
        }
        Ok(())
    }
}
