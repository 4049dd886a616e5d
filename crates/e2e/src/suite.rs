//! Scenario grouping, hooks and planning
//!
//! A [`Suite`] mirrors the usual describe/test layout: suite-wide
//! before-each steps, then groups with their own before-each and
//! after-each hooks. [`Suite::plan`] flattens every hook into each scenario
//! so a scenario can run on its own, in its own browser.

use serde::{Deserialize, Serialize};

use crate::spec::{TestSpec, TestStep, Viewport};

/// Group name used for YAML scenarios that don't name one
pub const DEFAULT_SPEC_GROUP: &str = "Specs";

#[derive(Debug, Clone, Default)]
pub struct Suite {
    pub name: String,
    pub before_each: Vec<TestStep>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Default)]
pub struct Group {
    pub name: String,
    pub before_each: Vec<TestStep>,
    pub after_each: Vec<TestStep>,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub viewport: Option<Viewport>,
    pub steps: Vec<TestStep>,
}

/// Where a step came from once hooks are flattened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    BeforeEach,
    Test,
    AfterEach,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub phase: StepPhase,
    pub step: TestStep,
}

/// A scenario with all of its hooks inlined
#[derive(Debug, Clone)]
pub struct PlannedScenario {
    /// `"<group> > <name>"`
    pub id: String,
    pub group: String,
    pub name: String,
    pub tags: Vec<String>,
    pub viewport: Option<Viewport>,
    pub steps: Vec<PlannedStep>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn before_each(mut self, steps: Vec<TestStep>) -> Self {
        self.before_each = steps;
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Append YAML scenarios, creating groups as needed
    pub fn with_specs(mut self, specs: Vec<TestSpec>) -> Self {
        for spec in specs {
            let group_name = spec
                .group
                .clone()
                .unwrap_or_else(|| DEFAULT_SPEC_GROUP.to_string());
            let scenario = Scenario {
                name: spec.name,
                tags: spec.tags,
                viewport: spec.viewport,
                steps: spec.steps,
            };
            match self.groups.iter_mut().find(|g| g.name == group_name) {
                Some(group) => group.scenarios.push(scenario),
                None => self.groups.push(Group::new(group_name).scenario(scenario)),
            }
        }
        self
    }

    pub fn scenario_count(&self) -> usize {
        self.groups.iter().map(|g| g.scenarios.len()).sum()
    }

    /// Flatten hooks into every scenario, in declaration order
    pub fn plan(&self) -> Vec<PlannedScenario> {
        let mut planned = Vec::with_capacity(self.scenario_count());

        for group in &self.groups {
            for scenario in &group.scenarios {
                let before = self.before_each.iter().chain(&group.before_each);
                let mut steps: Vec<PlannedStep> = before
                    .map(|step| PlannedStep {
                        phase: StepPhase::BeforeEach,
                        step: step.clone(),
                    })
                    .collect();
                steps.extend(scenario.steps.iter().map(|step| PlannedStep {
                    phase: StepPhase::Test,
                    step: step.clone(),
                }));
                steps.extend(group.after_each.iter().map(|step| PlannedStep {
                    phase: StepPhase::AfterEach,
                    step: step.clone(),
                }));

                planned.push(PlannedScenario {
                    id: format!("{} > {}", group.name, scenario.name),
                    group: group.name.clone(),
                    name: scenario.name.clone(),
                    tags: scenario.tags.clone(),
                    viewport: scenario.viewport,
                    steps,
                });
            }
        }

        planned
    }
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn before_each(mut self, steps: Vec<TestStep>) -> Self {
        self.before_each = steps;
        self
    }

    pub fn after_each(mut self, steps: Vec<TestStep>) -> Self {
        self.after_each = steps;
        self
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<TestStep>) -> Self {
        Self {
            name: name.into(),
            steps,
            ..Default::default()
        }
    }
}

impl PlannedScenario {
    /// Case-insensitive substring match against the scenario id
    pub fn matches_grep(&self, pattern: &str) -> bool {
        self.id.to_lowercase().contains(&pattern.to_lowercase())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Scenario selection applied to a plan
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub grep: Option<String>,
    pub tag: Option<String>,
}

impl Filter {
    pub fn accepts(&self, scenario: &PlannedScenario) -> bool {
        let grep_ok = self
            .grep
            .as_deref()
            .map_or(true, |pattern| scenario.matches_grep(pattern));
        let tag_ok = self.tag.as_deref().map_or(true, |tag| scenario.has_tag(tag));
        grep_ok && tag_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(message: &str) -> TestStep {
        TestStep::Log {
            message: message.to_string(),
        }
    }

    fn sample() -> Suite {
        Suite::new("sample")
            .before_each(vec![TestStep::goto()])
            .group(
                Group::new("Alpha")
                    .before_each(vec![log("setup")])
                    .after_each(vec![log("teardown")])
                    .scenario(Scenario::new("first", vec![log("body-1")]))
                    .scenario(Scenario::new("second", vec![log("body-2")])),
            )
            .group(Group::new("Beta").scenario(Scenario::new("third", vec![TestStep::Reload])))
    }

    #[test]
    fn plan_inlines_hooks_in_order() {
        let plan = sample().plan();
        assert_eq!(plan.len(), 3);

        let first = &plan[0];
        assert_eq!(first.id, "Alpha > first");
        let phases: Vec<_> = first.steps.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            [
                StepPhase::BeforeEach,
                StepPhase::BeforeEach,
                StepPhase::Test,
                StepPhase::AfterEach
            ]
        );
        assert_eq!(first.steps[0].step, TestStep::goto());
        assert_eq!(first.steps[1].step, log("setup"));
        assert_eq!(first.steps[3].step, log("teardown"));
    }

    #[test]
    fn group_hooks_do_not_leak() {
        let plan = sample().plan();
        let third = &plan[2];
        assert_eq!(third.id, "Beta > third");
        assert_eq!(third.steps.len(), 2);
        assert_eq!(third.steps[1].step, TestStep::Reload);
    }

    #[test]
    fn specs_join_named_or_default_group() {
        let spec = |name: &str, group: Option<&str>| TestSpec {
            name: name.to_string(),
            description: String::new(),
            group: group.map(String::from),
            tags: vec!["yaml".to_string()],
            viewport: None,
            steps: vec![TestStep::Reload],
        };
        let suite = sample().with_specs(vec![spec("extra", Some("Beta")), spec("loose", None)]);

        assert_eq!(suite.scenario_count(), 5);
        assert_eq!(suite.groups[1].scenarios.len(), 2);
        assert_eq!(suite.groups[2].name, DEFAULT_SPEC_GROUP);
    }

    #[test]
    fn filter_by_grep_and_tag() {
        let mut plan = sample().plan();
        plan[1].tags.push("smoke".to_string());

        let grep = Filter {
            grep: Some("alpha".to_string()),
            tag: None,
        };
        assert_eq!(plan.iter().filter(|s| grep.accepts(s)).count(), 2);

        let both = Filter {
            grep: Some("ALPHA".to_string()),
            tag: Some("smoke".to_string()),
        };
        let selected: Vec<_> = plan.iter().filter(|s| both.accepts(s)).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "second");

        assert!(plan.iter().all(|s| Filter::default().accepts(s)));
    }
}
