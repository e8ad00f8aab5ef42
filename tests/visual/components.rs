use insta::assert_snapshot;

use crate::test_utils::{
    assertions::RenderAssertions,
    fixtures::{products_rows, products_schema, users_rows, users_schema},
    EventBuilder, FakeGateway, Session,
};

async fn products_session() -> Session {
    let gateway = FakeGateway::new()
        .with_table(products_schema(), products_rows())
        .with_table(users_schema(), users_rows());
    let mut session = Session::start(gateway).await;
    session.open("products").await;
    session.harness.component.last_refreshed = None;
    session
}

#[tokio::test]
async fn test_status_line() {
    let mut session = products_session().await;
    let screen = session.screen();

    assert_snapshot!(screen.last().unwrap(), @"products │ page 1 │ 3 rows");
}

#[tokio::test]
async fn test_cells_follow_column_types() {
    let mut session = products_session().await;
    let screen = session.screen();

    screen.assert_contains("Price");
    screen.assert_contains("12.25");
    screen.assert_contains("2.0");
    screen.assert_contains("1.250");
    screen.assert_contains("NULL");
    screen.assert_contains("inspect edit delete");
}

#[tokio::test]
async fn test_sorted_header_shows_direction() {
    let mut session = products_session().await;
    session.type_keys(EventBuilder::new().key('l').key('s').build()).await;
    session.screen().assert_contains("Price ▲");

    session.type_keys(EventBuilder::new().key('s').build()).await;
    session.screen().assert_contains("Price ▼");
}

#[tokio::test]
async fn test_edit_dialog_marks_key_read_only() {
    let mut session = products_session().await;
    session.type_keys(EventBuilder::new().key('e').build()).await;

    let screen = session.screen();
    screen.assert_contains("Edit products \"A-1\"");
    screen.assert_contains("Sku: A-1");
    screen.assert_contains("(key)");
    screen.assert_contains("Stock: 3");
}

#[tokio::test]
async fn test_help_popup() {
    let mut session = products_session().await;
    session.type_keys(EventBuilder::new().key('?').build()).await;
    session.screen().assert_contains("Help - Press ? to close");

    session.type_keys(EventBuilder::new().esc().build()).await;
    session.screen().assert_not_contains("Help - Press ? to close");
}
