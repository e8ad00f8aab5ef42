use pretty_assertions::assert_eq;
use serde_json::json;

use crate::test_utils::{
    assertions::{RenderAssertions, StateAssertions},
    fixtures::{logs_rows, logs_schema, products_rows, products_schema, users_rows, users_schema},
    EventBuilder, FakeGateway, Session,
};
use schema_grid::{
    engine::{EditValue, SortDirection},
    error::GatewayError,
    mode::Mode,
};

fn backend() -> FakeGateway {
    FakeGateway::new()
        .with_table(users_schema(), users_rows())
        .with_table(logs_schema(), logs_rows())
        .with_table(products_schema(), products_rows())
}

#[tokio::test]
async fn test_sort_then_create_refreshes_sorted_page() {
    let mut session = Session::start(backend()).await;
    session.open("users").await;
    session.grid().assert_row_count(2);

    session.type_keys(EventBuilder::new().keys("ls").build()).await;
    let query = session.grid().orchestrator.query().clone();
    assert_eq!(query.page, 0);
    assert_eq!(query.sort.as_ref().map(|s| (s.column.as_str(), s.direction)), Some(("name", SortDirection::Ascending)));
    let (sent, _) = session.gateway.last_list().unwrap();
    assert_eq!(
        (sent.table_name.as_str(), sent.page, sent.sort.as_ref().map(|s| (s.column.as_str(), s.direction))),
        ("users", 0, Some(("name", SortDirection::Ascending)))
    );
    assert_eq!(session.column("name"), vec![json!("Alice"), json!("Bob")]);

    session.type_keys(EventBuilder::new().key('c').build()).await;
    assert_eq!(session.mode, Mode::Dialog);

    let lists_before = session.gateway.list_count();
    session.type_keys(EventBuilder::new().down().keys("Ann").down().key(' ').enter().build()).await;

    assert_eq!(session.mode, Mode::Browse);
    assert_eq!(session.gateway.list_count(), lists_before + 1, "a create refetches exactly once");
    assert_eq!(session.column("name"), vec![json!("Alice"), json!("Ann"), json!("Bob")]);
    assert_eq!(session.column("id"), vec![json!(1), json!(3), json!(2)]);
    assert_eq!(session.column("active"), vec![json!(null), json!(true), json!(true)]);
    session.grid().assert_notice("Row created in users");
}

#[tokio::test]
async fn test_edit_keeps_key_and_sends_changes() {
    let mut session = Session::start(backend()).await;
    session.open("users").await;

    session.type_keys(EventBuilder::new().key('e').build()).await;
    assert_eq!(session.mode, Mode::Dialog);
    let buffer = session.grid().orchestrator.dialog().buffer().cloned().unwrap();
    assert_eq!(buffer.get("name"), Some(&EditValue::Text("Bob".to_string())));
    assert_eq!(buffer.get("active"), Some(&EditValue::Flag(Some(true))));

    session.type_keys(EventBuilder::new().backspace().backspace().backspace().keys("Rob").enter().build()).await;

    assert_eq!(session.mode, Mode::Browse);
    assert_eq!(session.column("name"), vec![json!("Rob"), json!("Alice")]);
    assert_eq!(session.column("id"), vec![json!(2), json!(1)]);
    session.grid().assert_notice("updated");
}

#[tokio::test]
async fn test_delete_after_confirmation() {
    let mut session = Session::start(backend()).await;
    session.open("users").await;

    session.type_keys(EventBuilder::new().keys("jd").build()).await;
    assert_eq!(session.mode, Mode::Confirm);
    session.screen().assert_contains("Delete users where id = 1?");

    session.type_keys(EventBuilder::new().key('y').build()).await;

    assert_eq!(session.mode, Mode::Browse);
    assert_eq!(session.gateway.stored("users").len(), 1);
    assert_eq!(session.column("name"), vec![json!("Bob")]);
    session.grid().assert_notice("Deleted row 1");
}

#[tokio::test]
async fn test_rejected_create_keeps_dialog_and_input() {
    let mut session = Session::start(backend()).await;
    session.open("users").await;
    session.type_keys(EventBuilder::new().key('c').down().keys("Ann").build()).await;

    let lists_before = session.gateway.list_count();
    session.gateway.fail_next(GatewayError::Backend("duplicate key value violates unique constraint".to_string()));
    session.type_keys(EventBuilder::new().enter().build()).await;

    assert_eq!(session.mode, Mode::Dialog);
    assert_eq!(session.gateway.list_count(), lists_before, "a failed create must not refetch");
    let dialog = session.grid().orchestrator.dialog().clone();
    assert_eq!(dialog.pending_error(), Some("duplicate key value violates unique constraint"));
    assert_eq!(dialog.buffer().and_then(|b| b.get("name")), Some(&EditValue::Text("Ann".to_string())));
    session.screen().assert_contains("duplicate key");

    session.type_keys(EventBuilder::new().esc().build()).await;
    assert_eq!(session.mode, Mode::Browse);
    assert_eq!(session.gateway.stored("users").len(), 2);
}

#[tokio::test]
async fn test_invalid_integer_blocks_submit() {
    let mut session = Session::start(backend()).await;
    session.open("products").await;
    let lists_before = session.gateway.list_count();

    // sku, price, stock
    session.type_keys(EventBuilder::new().key('c').tab().tab().keys("abc").enter().build()).await;

    assert_eq!(session.mode, Mode::Dialog);
    assert!(session.grid().orchestrator.dialog().field_error("stock").is_some());
    assert_eq!(session.gateway.stored("products").len(), 3);
    assert_eq!(session.gateway.list_count(), lists_before);
    session.screen().assert_contains("not an integer");
}

#[tokio::test]
async fn test_keyless_table_is_read_only() {
    let mut session = Session::start(backend()).await;
    session.open("logs").await;

    let screen = session.screen();
    screen.assert_contains("inspect");
    screen.assert_not_contains("delete");

    session.type_keys(EventBuilder::new().key('e').build()).await;
    assert_eq!(session.mode, Mode::Browse);
    session.grid().assert_notice("no primary key");

    session.type_keys(EventBuilder::new().key('d').build()).await;
    assert_eq!(session.mode, Mode::Browse);

    session.type_keys(EventBuilder::new().key('i').build()).await;
    assert_eq!(session.mode, Mode::Inspect);
    session.screen().assert_contains("\"message\": \"boot\"");

    session.type_keys(EventBuilder::new().esc().build()).await;
    assert_eq!(session.mode, Mode::Browse);
}

fn stored_product(session: &Session, sku: &str) -> serde_json::Map<String, serde_json::Value> {
    session.gateway.stored("products").into_iter().find(|row| row.get("sku") == Some(&json!(sku))).unwrap()
}

#[tokio::test]
async fn test_edit_sends_only_changed_fields() {
    let mut session = Session::start(backend()).await;
    session.open("products").await;

    // B-2 has no weight; focus starts on price, stock is next.
    session.type_keys(EventBuilder::new().keys("je").tab().backspace().key('5').enter().build()).await;

    assert_eq!(session.mode, Mode::Browse);
    let (pk, values) = session.gateway.last_update().unwrap();
    assert_eq!(pk, json!("B-2"));
    assert_eq!(serde_json::Value::Object(values), json!({"stock": 5}));
    let product = stored_product(&session, "B-2");
    assert_eq!(product.get("weight"), Some(&json!(null)));
    assert_eq!(product.get("price"), Some(&json!(2.0)));
}

#[tokio::test]
async fn test_edit_clearing_a_number_stores_null() {
    let mut session = Session::start(backend()).await;
    session.open("products").await;

    // A-1 weight is "1.250"; focus starts on price, weight is two fields on.
    session.type_keys(EventBuilder::new().key('e').tab().tab().build()).await;
    session.type_keys(EventBuilder::new().backspace().backspace().backspace().backspace().backspace().enter().build()).await;

    assert_eq!(session.mode, Mode::Browse);
    let (_, values) = session.gateway.last_update().unwrap();
    assert_eq!(serde_json::Value::Object(values), json!({"weight": null}));
    assert_eq!(stored_product(&session, "A-1").get("weight"), Some(&json!(null)));
}
