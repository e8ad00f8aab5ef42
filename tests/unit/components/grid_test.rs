use pretty_assertions::assert_eq;
use serde_json::json;

use crate::test_utils::{
    assertions::StateAssertions,
    fixtures::{logs_schema, rows, users_rows, users_schema},
    ComponentTestHarness, EventBuilder,
};
use schema_grid::{
    action::Action,
    components::grid::Grid,
    config::Config,
    engine::{FetchOutcome, FetchRequest},
    mode::Mode,
};

fn harness() -> ComponentTestHarness<Grid> {
    let config = Config::embedded().unwrap();
    ComponentTestHarness::new(Grid::new(config.clone())).unwrap().with_config(config).unwrap()
}

/// Loads the fixture schemas and opens `table`, returning the fetch the grid asked for.
fn open(harness: &mut ComponentTestHarness<Grid>, table: &str) -> FetchRequest {
    harness.update(Action::SchemasLoaded(Ok(vec![users_schema(), logs_schema()]))).unwrap();
    match harness.update(Action::OpenTable(table.to_string())).unwrap() {
        Some(Action::FetchRows(request)) => request,
        other => panic!("expected a fetch, got {other:?}"),
    }
}

#[test]
fn test_open_table_requests_first_page() {
    let mut harness = harness();
    let request = open(&mut harness, "users");

    assert_eq!(request.query.table_name, "users");
    assert_eq!(request.query.page, 0);
    assert_eq!(request.limit, 20);
    harness.component.assert_table("users");
}

#[test]
fn test_initial_table_opens_once_schemas_arrive() {
    let mut grid = Grid::new(Config::embedded().unwrap()).with_initial_table(Some("logs".to_string()));

    let action = grid_update(&mut grid, Action::SchemasLoaded(Ok(vec![users_schema(), logs_schema()])));
    assert!(matches!(action, Some(Action::FetchRows(ref request)) if request.query.table_name == "logs"));
    assert_eq!(grid.tables[grid.selected_table_index], "logs");
}

fn grid_update(grid: &mut Grid, action: Action) -> Option<Action> {
    schema_grid::components::Component::update(grid, action).unwrap()
}

#[test]
fn test_late_rows_from_a_replaced_query_are_dropped() {
    let mut harness = harness();
    let first = open(&mut harness, "users");

    // Sort on the name column while the first page is still loading.
    harness.update(Action::ColumnRight).unwrap();
    let Some(Action::FetchRows(second)) = harness.update(Action::ToggleSort).unwrap() else {
        panic!("sorting should fetch");
    };
    assert!(second.epoch > first.epoch);

    let sorted = rows(json!([{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]));
    harness.update(Action::RowsLoaded(FetchOutcome::new(&second, Ok(sorted.clone())))).unwrap();
    harness.update(Action::RowsLoaded(FetchOutcome::new(&first, Ok(users_rows())))).unwrap();

    assert_eq!(harness.component.orchestrator.rows(), sorted.as_slice());
}

#[test]
fn test_filter_mode_collects_text_then_fetches() {
    let mut harness = harness();
    let request = open(&mut harness, "users");
    harness.update(Action::RowsLoaded(FetchOutcome::new(&request, Ok(users_rows())))).unwrap();

    let action = harness.update(Action::StartFilter).unwrap();
    assert_eq!(action, Some(Action::EnterMode(Mode::Filter)));

    for key in EventBuilder::new().keys("bobx").backspace().build() {
        harness.send_key_event(key).unwrap();
    }
    assert_eq!(harness.component.filter_input, "bob");

    let enter = EventBuilder::new().enter().build()[0];
    let Some(Action::FetchRows(request)) = harness.send_key_event(enter).unwrap() else {
        panic!("applying a filter should fetch");
    };
    assert_eq!(request.query.filter_text.as_deref(), Some("bob"));
    assert_eq!(request.query.page, 0);
    assert_eq!(harness.drain_actions(), vec![Action::EnterMode(Mode::Browse)]);
    harness.component.assert_mode(Mode::Browse);
}

#[test]
fn test_escape_leaves_filter_untouched() {
    let mut harness = harness();
    open(&mut harness, "users");
    harness.update(Action::StartFilter).unwrap();

    for key in EventBuilder::new().keys("zzz").esc().build() {
        harness.send_key_event(key).unwrap();
    }

    harness.component.assert_mode(Mode::Browse);
    assert_eq!(harness.component.orchestrator.query().filter_text, None);
}

#[test]
fn test_boolean_field_cycles_with_space() {
    let mut harness = harness();
    let request = open(&mut harness, "users");
    harness.update(Action::RowsLoaded(FetchOutcome::new(&request, Ok(users_rows())))).unwrap();
    harness.update(Action::CreateRow).unwrap();

    // id, name, active
    for key in EventBuilder::new().tab().tab().key(' ').key('x').build() {
        harness.send_key_event(key).unwrap();
    }

    let enter = EventBuilder::new().enter().build()[0];
    let Some(Action::Mutate(request)) = harness.send_key_event(enter).unwrap() else {
        panic!("a valid form should submit");
    };
    assert_eq!(
        request.kind,
        schema_grid::engine::MutationKind::Create {
            values: serde_json::from_value(json!({"active": true})).unwrap()
        }
    );
}

#[test]
fn test_edit_focus_skips_the_key_column() {
    let mut harness = harness();
    let request = open(&mut harness, "users");
    harness.update(Action::RowsLoaded(FetchOutcome::new(&request, Ok(users_rows())))).unwrap();

    assert_eq!(harness.update(Action::EditRow).unwrap(), Some(Action::EnterMode(Mode::Dialog)));
    assert_eq!(harness.component.dialog_focus, 1);

    for key in EventBuilder::new().tab().tab().build() {
        harness.send_key_event(key).unwrap();
    }
    assert_eq!(harness.component.dialog_focus, 1, "focus wraps past the locked id field");
}

#[test]
fn test_keyless_table_refuses_edit_and_delete() {
    let mut harness = harness();
    let request = open(&mut harness, "logs");
    harness.update(Action::RowsLoaded(FetchOutcome::new(&request, Ok(crate::test_utils::fixtures::logs_rows())))).unwrap();

    assert_eq!(harness.update(Action::EditRow).unwrap(), None);
    harness.component.assert_notice("no primary key");
    assert_eq!(harness.update(Action::DeleteRow).unwrap(), None);
    harness.component.assert_mode(Mode::Browse);
}

#[test]
fn test_confirm_no_cancels_delete() {
    let mut harness = harness();
    let request = open(&mut harness, "users");
    harness.update(Action::RowsLoaded(FetchOutcome::new(&request, Ok(users_rows())))).unwrap();

    assert_eq!(harness.update(Action::DeleteRow).unwrap(), Some(Action::EnterMode(Mode::Confirm)));
    let n = EventBuilder::new().key('n').build()[0];
    assert_eq!(harness.send_key_event(n).unwrap(), Some(Action::EnterMode(Mode::Browse)));
    assert_eq!(harness.component.orchestrator.delete_state(), &schema_grid::engine::DeleteState::Idle);
}

#[test]
fn test_row_cursor_wraps() {
    let mut harness = harness();
    let request = open(&mut harness, "users");
    harness.update(Action::RowsLoaded(FetchOutcome::new(&request, Ok(users_rows())))).unwrap();

    harness.update(Action::RowMoveUp).unwrap();
    assert_eq!(harness.component.selected_row_index, 1);
    harness.update(Action::RowMoveDown).unwrap();
    assert_eq!(harness.component.selected_row_index, 0);
}

#[test]
fn test_schema_failure_is_shown_in_table_list() {
    let mut harness = harness();
    harness
        .update(Action::SchemasLoaded(Err(schema_grid::error::GatewayError::Network("connection refused".into()))))
        .unwrap();

    assert_eq!(harness.component.schema_error.as_deref(), Some("connection refused"));
    let screen = harness.render().unwrap();
    assert!(screen.contains("refused"), "{screen}");
}
