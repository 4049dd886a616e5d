//! Typed Playwright locators
//!
//! A [`Locator`] describes how to find elements on the page and renders to
//! the equivalent Playwright locator expression. Locators are lazy on the
//! Playwright side, so the same value can be reused before and after a
//! reload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element locator, mirroring Playwright's `getBy*` family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Input by placeholder text
    Placeholder { text: String },

    /// Element by `data-testid`
    TestId { id: String },

    /// Form control by its label (or `aria-label`)
    Label { text: String },

    /// Element by ARIA role and optional accessible name
    Role {
        role: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// Element by visible text
    Text { text: String },

    /// Raw CSS selector
    Css { selector: String },

    /// The n-th (zero-based) match of another locator
    Nth { of: Box<Locator>, index: usize },

    /// The first match of another locator
    First { of: Box<Locator> },

    /// `child` resolved inside `parent`
    Within {
        parent: Box<Locator>,
        child: Box<Locator>,
    },
}

impl Locator {
    pub fn placeholder(text: impl Into<String>) -> Self {
        Locator::Placeholder { text: text.into() }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId { id: id.into() }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Locator::Label { text: text.into() }
    }

    pub fn role(role: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: None,
        }
    }

    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text { text: text.into() }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn nth(self, index: usize) -> Self {
        Locator::Nth {
            of: Box::new(self),
            index,
        }
    }

    pub fn first(self) -> Self {
        Locator::First { of: Box::new(self) }
    }

    /// Narrow the search to descendants of `self`
    pub fn locate(self, child: Locator) -> Self {
        Locator::Within {
            parent: Box::new(self),
            child: Box::new(child),
        }
    }

    /// Render as a Playwright expression rooted at `page`
    pub fn to_js(&self) -> String {
        self.render("page")
    }

    fn render(&self, root: &str) -> String {
        match self {
            Locator::Placeholder { text } => {
                format!("{}.getByPlaceholder({})", root, js_string(text))
            }
            Locator::TestId { id } => format!("{}.getByTestId({})", root, js_string(id)),
            Locator::Label { text } => format!("{}.getByLabel({})", root, js_string(text)),
            Locator::Role { role, name: None } => {
                format!("{}.getByRole({})", root, js_string(role))
            }
            Locator::Role {
                role,
                name: Some(name),
            } => format!(
                "{}.getByRole({}, {{ name: {} }})",
                root,
                js_string(role),
                js_string(name)
            ),
            Locator::Text { text } => format!("{}.getByText({})", root, js_string(text)),
            Locator::Css { selector } => format!("{}.locator({})", root, js_string(selector)),
            Locator::Nth { of, index } => format!("{}.nth({})", of.render(root), index),
            Locator::First { of } => format!("{}.first()", of.render(root)),
            Locator::Within { parent, child } => child.render(&parent.render(root)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Placeholder { text } => write!(f, "placeholder={}", text),
            Locator::TestId { id } => write!(f, "test_id={}", id),
            Locator::Label { text } => write!(f, "label={}", text),
            Locator::Role { role, name: None } => write!(f, "role={}", role),
            Locator::Role {
                role,
                name: Some(name),
            } => write!(f, "role={}[{}]", role, name),
            Locator::Text { text } => write!(f, "text={}", text),
            Locator::Css { selector } => write!(f, "css={}", selector),
            Locator::Nth { of, index } => write!(f, "{} >> nth={}", of, index),
            Locator::First { of } => write!(f, "{} >> first", of),
            Locator::Within { parent, child } => write!(f, "{} >> {}", parent, child),
        }
    }
}

/// Quote a string as a JavaScript literal
pub(crate) fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Locator::placeholder("What needs to be done?"), r#"page.getByPlaceholder("What needs to be done?")"# ; "placeholder")]
    #[test_case(Locator::test_id("todo-title"), r#"page.getByTestId("todo-title")"# ; "test id")]
    #[test_case(Locator::label("Mark all as complete"), r#"page.getByLabel("Mark all as complete")"# ; "label")]
    #[test_case(Locator::role_named("button", "Clear completed"), r#"page.getByRole("button", { name: "Clear completed" })"# ; "named role")]
    #[test_case(Locator::css(".todo-list li .toggle").first(), r#"page.locator(".todo-list li .toggle").first()"# ; "first css")]
    #[test_case(Locator::test_id("todo-item").nth(1).locate(Locator::role("checkbox")), r#"page.getByTestId("todo-item").nth(1).getByRole("checkbox")"# ; "chained")]
    fn renders_playwright_expression(locator: Locator, expected: &str) {
        assert_eq!(locator.to_js(), expected);
    }

    #[test]
    fn quotes_are_escaped() {
        let locator = Locator::text(r#"say "hi"; alert('x')"#);
        assert_eq!(
            locator.to_js(),
            r#"page.getByText("say \"hi\"; alert('x')")"#
        );
    }

    #[test]
    fn display_is_compact() {
        let locator = Locator::test_id("todo-item").nth(0).locate(Locator::role("checkbox"));
        assert_eq!(locator.to_string(), "test_id=todo-item >> nth=0 >> role=checkbox");
    }

    #[test]
    fn parses_from_yaml() {
        let yaml = r#"
by: within
parent:
  by: nth
  index: 1
  of:
    by: test_id
    id: todo-item
child:
  by: role
  role: checkbox
"#;
        let locator: Locator = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            locator,
            Locator::test_id("todo-item").nth(1).locate(Locator::role("checkbox"))
        );
    }
}
