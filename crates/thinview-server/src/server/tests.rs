use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use super::*;
use crate::request::Endpoint;
use crate::test_utils::RecordingTransport;

fn config() -> ServerConfig {
    ServerConfig::new(Url::parse("http://localhost:8086/services/mobile").unwrap())
}

fn start(
    transport: RecordingTransport,
    config: ServerConfig,
) -> (Server<RecordingTransport>, UnboundedReceiver<ClientEvent>) {
    let store: SharedStore = Arc::new(Mutex::new(ContentStore::default()));
    Server::new(transport, store, config)
}

fn tagged(tag: &str) -> Request {
    Request::new(Endpoint::UiRefresh, json!({ "tag": tag }))
}

fn drain(events: &mut UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn screen_batch() -> Value {
    json!([
        {
            "name": "screen.generic",
            "componentId": "Contacts",
            "update": false,
            "changedComponents": [
                {"id": "S1", "className": "Panel", "name": "Contacts",
                 "layout": "FormLayout,0,0,0,0,0,0"},
                {"id": "B1", "className": "Button", "parent": "S1",
                 "name": "Contacts-btnSave", "text": "Save"}
            ]
        }
    ])
}

#[tokio::test]
async fn test_queued_requests_run_in_order_without_overlap() {
    let transport = RecordingTransport::new();
    for _ in 0..3 {
        transport.reply_after(Endpoint::UiRefresh, Duration::from_millis(20), json!([]));
    }
    let (server, _events) = start(transport.clone(), config());

    let a = server.send_request(tagged("A"));
    let b = server.send_request(tagged("B"));
    let c = server.send_request(tagged("C"));
    let (a, b, c) = tokio::join!(polled_late(a), b, c);
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let calls = transport.calls();
    let tags: Vec<&str> = calls
        .iter()
        .map(|call| call.request.body["tag"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["A", "B", "C"]);
    for pair in calls.windows(2) {
        assert!(pair[0].finished.unwrap() <= pair[1].started);
    }
    assert_eq!(transport.max_in_flight(), 1);
}

/// Polls `future` only after yielding once. Queue order follows the
/// `send_request` calls, not the first poll.
async fn polled_late<F: Future>(future: F) -> F::Output {
    tokio::task::yield_now().await;
    future.await
}

#[tokio::test]
async fn test_immediate_request_times_out_with_retry_dialog() {
    let transport = RecordingTransport::new();
    transport
        .reply_after(Endpoint::UiRefresh, Duration::from_millis(500), json!([]))
        .reply(Endpoint::UiRefresh, json!([]));
    let (server, mut events) = start(
        transport.clone(),
        config().with_timeout(Duration::from_millis(50)),
    );

    let request = tagged("slow").immediate();
    let err = server.send_request(request.clone()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    let events = drain(&mut events);
    let dialog = match events.as_slice() {
        [ClientEvent::Dialog(dialog)] => dialog.clone(),
        other => panic!("expected one dialog, got {other:?}"),
    };
    let retry = dialog.retry.expect("timeouts are retryable");
    assert_eq!(retry, request);

    server.retry(retry).await.unwrap();
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].request.body, calls[1].request.body);
}

#[tokio::test]
async fn test_precheck_rejects_unknown_component() {
    let transport = RecordingTransport::new();
    let (server, mut events) = start(transport.clone(), config());

    let err = server
        .send_request(Request::press_button("B1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownComponent { .. }));
    assert!(transport.calls().is_empty());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_precheck_accepts_live_component() {
    let transport = RecordingTransport::new();
    transport.reply(Endpoint::UiRefresh, screen_batch());
    let (server, _events) = start(transport.clone(), config());

    server.send_request(tagged("open")).await.unwrap();
    server.send_request(Request::press_button("B1")).await.unwrap();

    assert_eq!(transport.endpoints(), vec![Endpoint::UiRefresh, Endpoint::PressButton]);
}

#[tokio::test]
async fn test_screen_open_updates_store_and_routes() {
    let transport = RecordingTransport::new();
    transport.reply(Endpoint::OpenScreen, screen_batch());
    let (server, mut events) = start(transport, config());

    let outcome = server
        .send_request(Request::open_screen("Contacts"))
        .await
        .unwrap();

    assert_eq!(outcome.route, Some(Route::Screen("Contacts".into())));
    assert!(lock_store(server.store()).contains("B1"));
    assert_eq!(
        drain(&mut events),
        vec![ClientEvent::Navigate(Route::Screen("Contacts".into()))]
    );
}

#[tokio::test]
async fn test_reload_refetches_before_other_responses() {
    let transport = RecordingTransport::new();
    transport.reply(
        Endpoint::UiRefresh,
        json!([
            {"name": "screen.generic", "componentId": "Contacts", "update": true,
             "changedComponents": []},
            {"name": "dal.dataProviderChanged", "dataProvider": "Contacts/contacts", "reload": -1}
        ]),
    );
    transport.reply(
        Endpoint::Fetch,
        json!([{
            "name": "dal.fetch",
            "dataProvider": "Contacts/contacts",
            "columnNames": ["ID", "NAME"],
            "records": [[1, "Ada"], [2, "Grace"]],
            "from": 0,
            "isAllFetched": true,
            "selectedRow": 1
        }]),
    );
    let (server, _events) = start(transport.clone(), config());

    let outcome = server.send_request(tagged("refresh")).await.unwrap();

    assert_eq!(outcome.handled, vec!["dal.dataProviderChanged", "screen.generic"]);
    assert_eq!(outcome.route, None);
    assert_eq!(transport.endpoints(), vec![Endpoint::UiRefresh, Endpoint::Fetch]);
    assert_eq!(transport.calls()[1].request.mode, RequestMode::Immediate);

    let store = lock_store(server.store());
    let book = store.data_book("Contacts", "Contacts/contacts").unwrap();
    assert_eq!(book.current().unwrap().len(), 2);
    assert_eq!(book.selected_row().index, 1);
    assert_eq!(
        book.selected_row().data_row.as_ref().unwrap()["NAME"],
        json!("Grace")
    );
}

#[tokio::test]
async fn test_reload_of_single_row_fetches_that_row() {
    let transport = RecordingTransport::new();
    transport.reply(
        Endpoint::UiRefresh,
        json!([{"name": "dal.dataProviderChanged", "dataProvider": "Contacts/contacts",
                "reload": 3}]),
    );
    let (server, _events) = start(transport.clone(), config());

    server.send_request(tagged("row")).await.unwrap();

    let fetch = &transport.calls()[1].request;
    assert_eq!(fetch.body["fromRow"], json!(3));
    assert_eq!(fetch.body["rowCount"], json!(1));
}

#[tokio::test]
async fn test_changed_values_patch_selected_row() {
    let transport = RecordingTransport::new();
    transport.reply(
        Endpoint::Fetch,
        json!([{
            "name": "dal.fetch",
            "dataProvider": "Contacts/contacts",
            "columnNames": ["ID", "NAME"],
            "records": [[1, "Ada"], [2, "Grace"]],
            "isAllFetched": true
        }]),
    );
    transport.reply(
        Endpoint::SetValues,
        json!([{
            "name": "dal.dataProviderChanged",
            "dataProvider": "Contacts/contacts",
            "selectedRow": 0,
            "changedColumnNames": ["NAME"],
            "changedValues": ["Ada L."]
        }]),
    );
    let (server, _events) = start(transport, config());

    server
        .send_request(Request::fetch("Contacts/contacts", 0, None))
        .await
        .unwrap();
    server
        .send_request(Request::new(Endpoint::SetValues, json!({})))
        .await
        .unwrap();

    let store = lock_store(server.store());
    let book = store.data_book("Contacts", "Contacts/contacts").unwrap();
    assert_eq!(book.current().unwrap()[0]["NAME"], json!("Ada L."));
    assert_eq!(book.current().unwrap().len(), 2);
    assert_eq!(book.selected_row().index, 0);
}

#[test]
fn test_route_priority() {
    let responses = decode_batch(json!([
        {"name": "closeScreen", "componentId": "Contacts"},
        {"name": "login", "mode": "manual"},
        {"name": "userData", "userName": "ada"}
    ]));
    assert_eq!(decide_route(&responses), Some(Route::Home));

    let responses = decode_batch(json!([
        {"name": "closeScreen", "componentId": "Contacts"},
        {"name": "login", "mode": "manual"}
    ]));
    assert_eq!(
        decide_route(&responses),
        Some(Route::Login {
            mode: Some("manual".into())
        })
    );

    let responses = decode_batch(json!([
        {"name": "userData", "userName": "ada"},
        {"name": "screen.generic", "componentId": "Orders", "changedComponents": []}
    ]));
    assert_eq!(decide_route(&responses), Some(Route::Screen("Orders".into())));

    assert_eq!(decide_route(&[]), None);
}

fn decode_batch(body: Value) -> Vec<ServerResponse> {
    response::decode_batch(body).unwrap()
}

#[tokio::test]
async fn test_server_status_becomes_dialog_and_queue_moves_on() {
    let transport = RecordingTransport::new();
    transport
        .reply(
            Endpoint::UiRefresh,
            json!({"code": 500, "reason": "Internal Server Error",
                   "description": "Database unreachable"}),
        )
        .reply(Endpoint::UiRefresh, json!([]));
    let (server, mut events) = start(transport.clone(), config());

    let failed = server.send_request(tagged("first"));
    let next = server.send_request(tagged("second"));
    let (failed, next) = tokio::join!(failed, next);

    let err = failed.unwrap_err();
    assert_eq!(err.to_string(), "500 Internal Server Error. Database unreachable");
    assert!(next.is_ok());

    match drain(&mut events).as_slice() {
        [ClientEvent::Dialog(dialog)] => {
            assert_eq!(dialog.message, "500 Internal Server Error. Database unreachable");
            assert!(dialog.retry.is_none());
        }
        other => panic!("expected one dialog, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_failure_is_retryable() {
    let transport = RecordingTransport::new();
    transport.fail(Endpoint::UiRefresh, "connection refused");
    let (server, mut events) = start(transport, config());

    let err = server.send_request(tagged("x")).await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }));
    match drain(&mut events).as_slice() {
        [ClientEvent::Dialog(dialog)] => assert!(dialog.retry.is_some()),
        other => panic!("expected one dialog, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_response_shows_dialog() {
    let transport = RecordingTransport::new();
    transport.reply(
        Endpoint::PressButton,
        json!([{"name": "error", "title": "Save failed", "message": "Name is mandatory"}]),
    );
    transport.reply(Endpoint::UiRefresh, screen_batch());
    let (server, mut events) = start(transport, config());
    server.send_request(tagged("open")).await.unwrap();
    drain(&mut events);

    let outcome = server.send_request(Request::press_button("B1")).await.unwrap();

    assert_eq!(outcome.handled, vec!["error"]);
    match drain(&mut events).as_slice() {
        [ClientEvent::Dialog(dialog)] => {
            assert_eq!(dialog.title, "Save failed");
            assert_eq!(dialog.message, "Name is mandatory");
        }
        other => panic!("expected one dialog, got {other:?}"),
    }
}

#[tokio::test]
async fn test_startup_persists_client_id() {
    let dir = tempdir().unwrap();
    let session = SessionFile::in_dir(dir.path());
    let transport = RecordingTransport::new();
    transport.reply(
        Endpoint::Startup,
        json!([
            {"name": "applicationMetaData", "clientId": "c-9", "version": "1.0"},
            {"name": "userData", "userName": "ada", "displayName": "Ada"}
        ]),
    );
    let (server, _events) = start(transport.clone(), config().with_session(session.clone()));

    let outcome = server.startup("demo").await.unwrap();
    server.send_request(tagged("after")).await.unwrap();

    assert_eq!(outcome.route, Some(Route::Home));
    assert_eq!(session.load().unwrap().as_deref(), Some("c-9"));
    assert!(lock_store(server.store()).app_state().is_logged_in());

    let calls = transport.calls();
    assert!(calls[0].request.body.get("clientId").is_none());
    assert_eq!(calls[1].request.body["clientId"], json!("c-9"));
}

#[tokio::test]
async fn test_startup_resumes_persisted_session() {
    let dir = tempdir().unwrap();
    let session = SessionFile::in_dir(dir.path());
    session.save("c-1").unwrap();
    let transport = RecordingTransport::new();
    let (server, _events) = start(transport.clone(), config().with_session(session));

    server.startup("demo").await.unwrap();

    assert_eq!(transport.calls()[0].request.body["clientId"], json!("c-1"));
}

#[tokio::test]
async fn test_session_expiry_resets_store() {
    let dir = tempdir().unwrap();
    let session = SessionFile::in_dir(dir.path());
    session.save("c-1").unwrap();
    let transport = RecordingTransport::new();
    transport
        .reply(Endpoint::UiRefresh, screen_batch())
        .reply(Endpoint::UiRefresh, json!([{"name": "session.expired"}]));
    let (server, mut events) = start(transport, config().with_session(session.clone()));

    server.send_request(tagged("open")).await.unwrap();
    drain(&mut events);
    let outcome = server.send_request(tagged("expire")).await.unwrap();

    assert!(outcome.session_expired);
    assert_eq!(outcome.route, None);
    assert!(!lock_store(server.store()).contains("S1"));
    assert_eq!(session.load().unwrap(), None);
    assert_eq!(drain(&mut events), vec![ClientEvent::SessionExpired]);
}

#[tokio::test]
async fn test_removed_component_is_rejected_when_dequeued() {
    let transport = RecordingTransport::new();
    transport
        .reply(Endpoint::UiRefresh, screen_batch())
        .reply_after(
            Endpoint::UiRefresh,
            Duration::from_millis(20),
            json!([{
                "name": "screen.generic",
                "componentId": "Contacts",
                "update": true,
                "changedComponents": [{"id": "B1", "~destroy": true}]
            }]),
        );
    let (server, _events) = start(transport.clone(), config());
    server.send_request(tagged("open")).await.unwrap();

    let destroy = server.send_request(tagged("destroy"));
    let press = server.send_request(Request::press_button("B1"));
    let (destroy, press) = tokio::join!(destroy, press);

    assert!(destroy.is_ok());
    assert!(matches!(press, Err(Error::UnknownComponent { .. })));
    assert_eq!(transport.endpoints(), vec![Endpoint::UiRefresh, Endpoint::UiRefresh]);
}

#[tokio::test]
async fn test_desktop_screen_goes_to_desktop_tree() {
    let transport = RecordingTransport::new();
    transport.reply(
        Endpoint::Startup,
        json!([{
            "name": "screen.desktop",
            "changedComponents": [{"id": "D1", "className": "DesktopPanel"}]
        }]),
    );
    let (server, _events) = start(transport, config());

    server.startup("demo").await.unwrap();

    let store = lock_store(server.store());
    assert_eq!(store.tree_of("D1"), Some(thinview_store::Tree::Desktop));
}

#[tokio::test]
async fn test_store_updates_are_visible_to_subscribers() {
    let transport = RecordingTransport::new();
    transport.reply(Endpoint::OpenScreen, screen_batch());
    let (server, _events) = start(transport, config());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = lock_store(server.store()).subscriptions().subscribe(
        thinview_store::Topic::Children("S1".into()),
        move |event| {
            if let thinview_store::StoreEvent::Children { children, .. } = event {
                sink.lock()
                    .unwrap()
                    .extend(children.iter().map(|c| c.id.clone()));
            }
        },
    );

    server
        .send_request(Request::open_screen("Contacts"))
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["B1".to_string()]);
}

#[tokio::test]
async fn test_fetch_for_owner_reaches_open_popup() {
    let transport = RecordingTransport::new();
    transport
        .reply(
            Endpoint::OpenScreen,
            json!([{
                "name": "screen.generic",
                "componentId": "Lookup",
                "update": false,
                "changedComponents": [
                    {"id": "S1", "className": "Panel", "name": "Contacts"},
                    {"id": "S2", "className": "Panel", "name": "Lookup", "screen_modal": true}
                ]
            }]),
        )
        .reply(
            Endpoint::Fetch,
            json!([{
                "name": "dal.fetch",
                "dataProvider": "Contacts/contacts",
                "columnNames": ["ID", "NAME"],
                "records": [[1, "Ada"], [2, "Grace"], [3, "Linus"]],
                "from": 0,
                "to": 2,
                "isAllFetched": true,
                "selectedRow": 1
            }]),
        );
    let (server, _events) = start(transport, config());
    let rows = Arc::new(Mutex::new(Vec::new()));
    let selections = Arc::new(Mutex::new(Vec::new()));
    let (row_sink, selection_sink) = (rows.clone(), selections.clone());
    let (_rows, _selections) = {
        let store = lock_store(server.store());
        (
            store.subscriptions().subscribe(
                thinview_store::Topic::data_changed("Lookup", "Contacts/contacts"),
                move |event| {
                    if let thinview_store::StoreEvent::DataChanged { rows, .. } = event {
                        row_sink.lock().unwrap().push(rows.len());
                    }
                },
            ),
            store.subscriptions().subscribe(
                thinview_store::Topic::selected_row("Lookup", "Contacts/contacts"),
                move |event| {
                    if let thinview_store::StoreEvent::SelectedRow { selection, .. } = event {
                        selection_sink.lock().unwrap().push(selection.index);
                    }
                },
            ),
        )
    };

    server
        .send_request(Request::open_screen("Lookup"))
        .await
        .unwrap();
    server
        .send_request(Request::fetch("Contacts/contacts", 0, None))
        .await
        .unwrap();

    assert_eq!(*rows.lock().unwrap(), vec![3]);
    assert_eq!(*selections.lock().unwrap(), vec![1]);
    let store = lock_store(server.store());
    assert_eq!(
        store.data_book("Lookup", "Contacts/contacts"),
        store.data_book("Contacts", "Contacts/contacts")
    );
}
