//! Reading the todo list the application persists in `localStorage`
//!
//! The application owns the format; the suite only counts entries. Counting
//! happens twice: in the browser, as a `waitForFunction` predicate that
//! Playwright polls until it holds, and in Rust, over the raw snapshot the
//! script reports when a scenario ends.

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::locator::js_string;
use crate::spec::TestStep;

/// `localStorage` key the TodoMVC React app writes its list to
pub const TODO_STORAGE_KEY: &str = "react-todos";

/// One persisted todo entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Counts derived from a storage snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTodos {
    pub total: usize,
    pub completed: usize,
}

/// Parse the raw `localStorage` value
pub fn parse_todos(raw: &str) -> E2eResult<Vec<TodoRecord>> {
    serde_json::from_str(raw).map_err(|e| E2eError::Storage(e.to_string()))
}

impl StoredTodos {
    pub fn from_raw(raw: &str) -> E2eResult<Self> {
        let todos = parse_todos(raw)?;
        Ok(Self {
            total: todos.len(),
            completed: todos.iter().filter(|t| t.completed).count(),
        })
    }
}

/// Wait until the stored list holds `expected` items
pub fn check_number_of_todos_in_local_storage(expected: usize) -> TestStep {
    TestStep::StoredTodoCount {
        key: TODO_STORAGE_KEY.to_string(),
        expected,
    }
}

/// Wait until the stored list holds `expected` completed items
pub fn check_number_of_completed_todos_in_local_storage(expected: usize) -> TestStep {
    TestStep::StoredCompletedCount {
        key: TODO_STORAGE_KEY.to_string(),
        expected,
    }
}

/// Browser-side predicate for `page.waitForFunction`, taking `[key, expected]`
pub(crate) fn count_predicate(key: &str, completed_only: bool) -> String {
    let list = format!("JSON.parse(localStorage[{}] || '[]')", js_string(key));
    let list = if completed_only {
        format!("{}.filter((todo) => todo.completed)", list)
    } else {
        list
    };
    format!("(e) => {}.length === e", list)
}
