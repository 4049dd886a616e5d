use todomvc_e2e::storage::{
    check_number_of_completed_todos_in_local_storage, check_number_of_todos_in_local_storage,
};
use todomvc_e2e::suite::{PlannedScenario, StepPhase};
use todomvc_e2e::todomvc::{self, TODO_ITEMS};
use todomvc_e2e::{Locator, TestStep};

fn scenario(id: &str) -> PlannedScenario {
    todomvc::suite()
        .plan()
        .into_iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| panic!("missing scenario {id}"))
}

fn body(scenario: &PlannedScenario) -> Vec<TestStep> {
    scenario
        .steps
        .iter()
        .filter(|s| s.phase == StepPhase::Test)
        .map(|s| s.step.clone())
        .collect()
}

fn phase(scenario: &PlannedScenario, phase: StepPhase) -> Vec<TestStep> {
    scenario
        .steps
        .iter()
        .filter(|s| s.phase == phase)
        .map(|s| s.step.clone())
        .collect()
}

fn new_todo() -> Locator {
    Locator::placeholder("What needs to be done?")
}

fn submit(item: &str) -> [TestStep; 2] {
    [
        TestStep::fill(&new_todo(), item),
        TestStep::press(&new_todo(), "Enter"),
    ]
}

/// Position of `needle` in `haystack`, searching from `from`
fn find_from(haystack: &[TestStep], needle: &TestStep, from: usize) -> usize {
    haystack[from..]
        .iter()
        .position(|s| s == needle)
        .map(|p| p + from)
        .unwrap_or_else(|| panic!("step {} not found after {}", needle.name(), from))
}

#[test]
fn every_scenario_starts_on_the_app() {
    for scenario in todomvc::suite().plan() {
        assert_eq!(scenario.steps[0].step, TestStep::goto(), "{}", scenario.id);
        assert_eq!(scenario.steps[0].phase, StepPhase::BeforeEach);
    }
}

#[test]
fn adding_items_lists_them_and_clears_input() {
    let titles = Locator::test_id("todo-title");

    let add = body(&scenario("New Todo > should allow me to add todo items"));
    let mut expected = submit(TODO_ITEMS[0]).to_vec();
    expected.push(TestStep::expect_texts(&titles, &[TODO_ITEMS[0]]));
    expected.push(TestStep::expect_empty(&new_todo()));
    expected.extend(submit(TODO_ITEMS[1]));
    expected.push(TestStep::expect_texts(&titles, &[TODO_ITEMS[0], TODO_ITEMS[1]]));
    expected.push(TestStep::expect_empty(&new_todo()));
    expected.push(check_number_of_todos_in_local_storage(2));
    assert_eq!(add, expected);

    // Every submission is followed by an empty-input check
    let presses = add.iter().filter(|s| matches!(s, TestStep::Press { .. })).count();
    let empties = add
        .iter()
        .filter(|s| **s == TestStep::expect_empty(&new_todo()))
        .count();
    assert_eq!(presses, 2);
    assert_eq!(empties, presses);

    let clear = body(&scenario(
        "New Todo > should clear text input field when an item is added",
    ));
    assert_eq!(clear[2], TestStep::expect_empty(&new_todo()));
    assert_eq!(clear[3], check_number_of_todos_in_local_storage(1));
}

#[test]
fn counter_reads_three_items_left() {
    let counter = Locator::test_id("todo-count");
    let steps = body(&scenario(
        "New Todo > should append new items to the bottom of the list",
    ));

    assert!(steps.contains(&TestStep::expect_text(&counter, "3 items left")));
    assert!(steps.contains(&TestStep::expect_contains_text(&counter, "3")));
    assert!(steps.contains(&TestStep::expect_text_matches(&counter, "3")));
    assert!(steps.contains(&TestStep::expect_visible(&Locator::text("3 items left"))));
    assert!(steps.contains(&TestStep::expect_texts(&Locator::test_id("todo-title"), &TODO_ITEMS)));
    assert_eq!(steps.last(), Some(&check_number_of_todos_in_local_storage(3)));
}

#[test]
fn mark_all_completes_and_restores_every_item() {
    let items = Locator::test_id("todo-item");
    let toggle = Locator::label("Mark all as complete");

    let mark = scenario("Mark all as completed > should allow me to mark all items as completed");
    let before = phase(&mark, StepPhase::BeforeEach);
    assert_eq!(before.len(), 1 + 6 + 1);
    assert_eq!(before.last(), Some(&check_number_of_todos_in_local_storage(3)));
    assert_eq!(
        phase(&mark, StepPhase::AfterEach),
        vec![check_number_of_todos_in_local_storage(3)]
    );
    assert_eq!(
        body(&mark),
        vec![
            TestStep::check(&toggle),
            TestStep::expect_classes(&items, &["completed", "completed", "completed"]),
            check_number_of_completed_todos_in_local_storage(3),
        ]
    );

    let restore = body(&scenario(
        "Mark all as completed > should allow me to clear the complete state of all items",
    ));
    assert_eq!(
        restore,
        vec![
            TestStep::check(&toggle),
            TestStep::uncheck(&toggle),
            TestStep::expect_classes(&items, &["", "", ""]),
        ]
    );
}

#[test]
fn clear_completed_keeps_remaining_items_in_order() {
    let items = Locator::test_id("todo-item");
    let button = Locator::role_named("button", "Clear completed");

    let steps = body(&scenario(
        "Clear completed button > should remove completed items when clicked",
    ));
    assert_eq!(
        steps,
        vec![
            TestStep::check(&items.clone().nth(1).locate(Locator::role("checkbox"))),
            TestStep::click(&button),
            TestStep::expect_count(&items, 2),
            TestStep::expect_texts(&items, &[TODO_ITEMS[0], TODO_ITEMS[2]]),
            check_number_of_todos_in_local_storage(2),
        ]
    );
}

#[test]
fn clear_completed_button_visibility() {
    let button = Locator::role_named("button", "Clear completed");
    let first_toggle = Locator::css(".todo-list li .toggle").first();

    let shown = body(&scenario("Clear completed button > should display the correct text"));
    assert_eq!(
        shown,
        vec![TestStep::check(&first_toggle), TestStep::expect_visible(&button)]
    );

    let hidden = body(&scenario(
        "Clear completed button > should be hidden when there are no items that are completed",
    ));
    assert_eq!(
        hidden,
        vec![
            TestStep::expect_hidden(&button),
            TestStep::check(&first_toggle),
            TestStep::click(&button),
            TestStep::expect_hidden(&button),
        ]
    );
}

#[test]
fn persistence_checks_identical_state_around_reload() {
    let items = Locator::test_id("todo-item");
    let first_check = items.clone().nth(0).locate(Locator::role("checkbox"));
    let steps = body(&scenario("Persistence > should persist its data"));

    let verify = [
        TestStep::expect_texts(&items, &[TODO_ITEMS[0], TODO_ITEMS[1]]),
        TestStep::expect_checked(&first_check),
        TestStep::expect_classes(&items, &["completed", ""]),
    ];

    let checked = find_from(&steps, &TestStep::check(&first_check), 0);
    let before = find_from(&steps, &verify[0], checked);
    assert_eq!(steps[before..before + 3], verify);

    let stored = find_from(&steps, &check_number_of_completed_todos_in_local_storage(1), before);
    let reload = find_from(&steps, &TestStep::Reload, stored);
    assert_eq!(steps[reload + 1..], verify);
}

#[test]
fn storage_checks_are_named_by_expected_count() {
    let names: Vec<_> = todomvc::suite()
        .plan()
        .iter()
        .flat_map(|s| s.steps.iter())
        .filter(|s| matches!(s.step, TestStep::StoredTodoCount { .. } | TestStep::StoredCompletedCount { .. }))
        .map(|s| s.step.name())
        .collect();
    assert!(names.iter().any(|n| n == "stored_todos:3"));
    assert!(names.iter().any(|n| n == "stored_completed:1"));
}
