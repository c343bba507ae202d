use serde_json::json;
use tokio::net::TcpListener;

use smart_crud::config::ClientConfig;
use smart_crud::controller::panel::{DeleteOutcome, FetchOutcome, PanelMode, SubmitOutcome};
use smart_crud::credentials::TokenStore;
use smart_crud::server::{serve_on, AppState};
use smart_crud::services::{InMemoryTransport, Method, ResourceStore};
use smart_crud::templates::panel_template::PanelBody;
use smart_crud::{CrudPanel, FieldDescriptor, Item, ItemId, PanelProps, RequestClient};

fn sku_props() -> PanelProps {
    PanelProps::new(
        "Products",
        "/products",
        vec![FieldDescriptor::new("sku", "SKU")],
    )
}

async fn spawn_server(store: ResourceStore, token: Option<&str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(store, token.map(str::to_string));
    tokio::spawn(serve_on(listener, state, std::future::pending()));
    format!("http://{addr}/api")
}

#[tokio::test]
async fn edit_then_submit_updates_and_refetches() {
    let transport = InMemoryTransport::new();
    transport.seed("products", vec![Item::new().with("id", 1).with("sku", "A1")]);
    let mut panel = CrudPanel::new(transport.clone(), sku_props());

    panel.mount().await.unwrap();
    assert_eq!(transport.calls()[0].method, Method::Get);
    assert_eq!(transport.calls()[0].path, "/products");

    match panel.view().body {
        PanelBody::Table { rows, .. } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].cells, vec!["A1"]);
        }
        other => panic!("expected table, got {other:?}"),
    }

    panel.edit_row(0).unwrap();
    assert_eq!(panel.draft(), &Item::new().with("id", 1).with("sku", "A1"));
    assert_eq!(panel.mode(), PanelMode::Editing(ItemId::from(1)));

    panel.change_field("sku", "B2");
    transport.clear_calls();
    let outcome = panel.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Updated(ItemId::from(1)));

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, Method::Put);
    assert_eq!(calls[0].path, "/products/1");
    assert_eq!(
        serde_json::to_string(calls[0].body.as_ref().unwrap()).unwrap(),
        r#"{"id":1,"sku":"B2"}"#
    );
    assert_eq!(calls[1].method, Method::Get);
    assert_eq!(panel.items()[0].display("sku"), "B2");
}

#[tokio::test]
async fn confirmed_delete_is_followed_by_one_refetch() {
    let transport = InMemoryTransport::new();
    transport.seed(
        "products",
        vec![
            Item::new().with("id", 7).with("sku", "A7"),
            Item::new().with("id", 8).with("sku", "A8"),
        ],
    );
    let mut panel = CrudPanel::new(transport.clone(), sku_props());
    panel.mount().await.unwrap();
    transport.clear_calls();

    let outcome = panel.delete(&ItemId::from(7), &|_: &str| true).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!((calls[0].method, calls[0].path.as_str()), (Method::Delete, "/products/7"));
    assert_eq!((calls[1].method, calls[1].path.as_str()), (Method::Get, "/products"));
    assert_eq!(panel.items().len(), 1);
}

#[tokio::test]
async fn http_round_trip_through_request_client() {
    let store = ResourceStore::new();
    store.seed("products", vec![Item::new().with("id", 1).with("sku", "A1")]);
    let base = spawn_server(store.clone(), Some("jwt-123")).await;

    let tokens = TokenStore::with_token("jwt-123");
    let client = RequestClient::new(&ClientConfig::new(&base), tokens).unwrap();
    let mut panel = CrudPanel::new(client, sku_props());

    assert_eq!(panel.mount().await.unwrap(), FetchOutcome::Applied(1));

    panel.change_field("sku", "C3");
    assert_eq!(panel.submit().await.unwrap(), SubmitOutcome::Created);
    assert_eq!(panel.items().len(), 2);

    panel.edit_row(0).unwrap();
    panel.change_field("sku", "B2");
    panel.submit().await.unwrap();
    assert_eq!(store.list("products")[0].display("sku"), "B2");

    let outcome = panel.delete_row(1, &|_: &str| true).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(panel.items().len(), 1);
    assert_eq!(
        serde_json::to_value(store.list("products")).unwrap(),
        json!([{"id": 1, "sku": "B2"}])
    );
}

#[tokio::test]
async fn missing_token_surfaces_401_and_keeps_state() {
    let store = ResourceStore::new();
    store.seed("products", vec![Item::new().with("id", 1).with("sku", "A1")]);
    let base = spawn_server(store, Some("jwt-123")).await;

    let tokens = TokenStore::new();
    let client = RequestClient::new(&ClientConfig::new(&base), tokens.clone()).unwrap();
    let mut panel = CrudPanel::new(client, sku_props());

    let err = panel.mount().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(panel.items().is_empty());
    assert!(!panel.is_loading());

    tokens.set("jwt-123");
    assert_eq!(panel.refresh().await.unwrap(), FetchOutcome::Applied(1));
}
