//! Scenarios for the TodoMVC demo application

use crate::locator::Locator;
use crate::spec::TestStep;
use crate::storage::{
    check_number_of_completed_todos_in_local_storage, check_number_of_todos_in_local_storage,
};
use crate::suite::{Group, Scenario, Suite};

/// Public demo the suite runs against by default
pub const DEFAULT_BASE_URL: &str = "https://demo.playwright.dev/todomvc";

pub const TODO_ITEMS: [&str; 3] = [
    "buy some cheese",
    "feed the cat",
    "book a doctors appointment",
];

fn new_todo() -> Locator {
    Locator::placeholder("What needs to be done?")
}

fn todo_titles() -> Locator {
    Locator::test_id("todo-title")
}

fn todo_items() -> Locator {
    Locator::test_id("todo-item")
}

fn todo_count() -> Locator {
    Locator::test_id("todo-count")
}

fn toggle_all() -> Locator {
    Locator::label("Mark all as complete")
}

fn first_toggle() -> Locator {
    Locator::css(".todo-list li .toggle").first()
}

fn clear_completed() -> Locator {
    Locator::role_named("button", "Clear completed")
}

fn item_checkbox(index: usize) -> Locator {
    todo_items().nth(index).locate(Locator::role("checkbox"))
}

/// Type `item` into the new-todo input and submit it
fn add_todo(item: &str) -> Vec<TestStep> {
    let input = new_todo();
    vec![TestStep::fill(&input, item), TestStep::press(&input, "Enter")]
}

/// Add every entry of [`TODO_ITEMS`]
pub fn create_default_todos() -> Vec<TestStep> {
    TODO_ITEMS.iter().flat_map(|item| add_todo(item)).collect()
}

/// The full TodoMVC suite
pub fn suite() -> Suite {
    Suite::new("TodoMVC")
        .before_each(vec![TestStep::goto()])
        .group(new_todo_group())
        .group(mark_all_group())
        .group(counter_group())
        .group(clear_completed_group())
        .group(persistence_group())
}

fn new_todo_group() -> Group {
    let add_items = {
        let mut steps = add_todo(TODO_ITEMS[0]);
        steps.push(TestStep::expect_texts(&todo_titles(), &TODO_ITEMS[..1]));
        steps.push(TestStep::expect_empty(&new_todo()));
        steps.extend(add_todo(TODO_ITEMS[1]));
        steps.push(TestStep::expect_texts(&todo_titles(), &TODO_ITEMS[..2]));
        steps.push(TestStep::expect_empty(&new_todo()));
        steps.push(check_number_of_todos_in_local_storage(2));
        steps
    };

    let clears_input = {
        let mut steps = add_todo(TODO_ITEMS[0]);
        steps.push(TestStep::expect_empty(&new_todo()));
        steps.push(check_number_of_todos_in_local_storage(1));
        steps
    };

    let appends_to_bottom = {
        let counter = todo_count();
        let mut steps = create_default_todos();
        steps.extend([
            TestStep::expect_visible(&Locator::text("3 items left")),
            TestStep::expect_text(&counter, "3 items left"),
            TestStep::expect_contains_text(&counter, "3"),
            TestStep::expect_text_matches(&counter, "3"),
            TestStep::expect_texts(&todo_titles(), &TODO_ITEMS),
            check_number_of_todos_in_local_storage(3),
        ]);
        steps
    };

    Group::new("New Todo")
        .scenario(Scenario::new("should allow me to add todo items", add_items))
        .scenario(Scenario::new(
            "should clear text input field when an item is added",
            clears_input,
        ))
        .scenario(Scenario::new(
            "should append new items to the bottom of the list",
            appends_to_bottom,
        ))
}

fn mark_all_group() -> Group {
    let toggle = toggle_all();

    let mut setup = create_default_todos();
    setup.push(check_number_of_todos_in_local_storage(3));

    Group::new("Mark all as completed")
        .before_each(setup)
        .after_each(vec![check_number_of_todos_in_local_storage(3)])
        .scenario(Scenario::new(
            "should allow me to mark all items as completed",
            vec![
                TestStep::check(&toggle),
                TestStep::expect_classes(&todo_items(), &["completed", "completed", "completed"]),
                check_number_of_completed_todos_in_local_storage(3),
            ],
        ))
        .scenario(Scenario::new(
            "should allow me to clear the complete state of all items",
            vec![
                TestStep::check(&toggle),
                TestStep::uncheck(&toggle),
                TestStep::expect_classes(&todo_items(), &["", "", ""]),
            ],
        ))
}

fn counter_group() -> Group {
    let counter = todo_count();

    let mut steps = add_todo(TODO_ITEMS[0]);
    steps.push(TestStep::expect_contains_text(&counter, "1"));
    steps.extend(add_todo(TODO_ITEMS[1]));
    steps.push(TestStep::expect_contains_text(&counter, "2"));
    steps.push(check_number_of_todos_in_local_storage(2));

    Group::new("Counter").scenario(Scenario::new(
        "should display the current number of todo items",
        steps,
    ))
}

fn clear_completed_group() -> Group {
    let button = clear_completed();

    Group::new("Clear completed button")
        .before_each(create_default_todos())
        .scenario(Scenario::new(
            "should display the correct text",
            vec![
                TestStep::check(&first_toggle()),
                TestStep::expect_visible(&button),
            ],
        ))
        .scenario(Scenario::new(
            "should remove completed items when clicked",
            vec![
                TestStep::check(&item_checkbox(1)),
                TestStep::click(&button),
                TestStep::expect_count(&todo_items(), 2),
                TestStep::expect_texts(&todo_items(), &[TODO_ITEMS[0], TODO_ITEMS[2]]),
                check_number_of_todos_in_local_storage(2),
            ],
        ))
        .scenario(Scenario::new(
            "should be hidden when there are no items that are completed",
            vec![
                TestStep::expect_hidden(&button),
                TestStep::check(&first_toggle()),
                TestStep::click(&button),
                TestStep::expect_hidden(&button),
            ],
        ))
}

fn persistence_group() -> Group {
    let items = todo_items();
    let first_check = item_checkbox(0);

    let verify = || {
        vec![
            TestStep::expect_texts(&items, &TODO_ITEMS[..2]),
            TestStep::expect_checked(&first_check),
            TestStep::expect_classes(&items, &["completed", ""]),
        ]
    };

    let mut steps: Vec<TestStep> = TODO_ITEMS[..2].iter().flat_map(|item| add_todo(item)).collect();
    steps.push(TestStep::check(&first_check));
    steps.extend(verify());
    steps.push(check_number_of_completed_todos_in_local_storage(1));
    steps.push(TestStep::Reload);
    steps.extend(verify());

    Group::new("Persistence").scenario(Scenario::new("should persist its data", steps))
}
