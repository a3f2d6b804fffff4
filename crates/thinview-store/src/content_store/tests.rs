use std::sync::{Arc, Mutex};

use serde_json::json;
use thinview_core::{ComponentKind, ComponentUpdate, MetaData, Row, SelectedRow};

use super::*;
use crate::subscription::{StoreEvent, Subscription, SubscriptionManager, Topic, ROOT};

fn row(id: i64) -> Row {
    let mut row = Row::new();
    row.insert("ID".into(), json!(id));
    row
}

fn screen(id: &str, name: &str) -> ComponentUpdate {
    ComponentUpdate::new(id)
        .with_class("Panel")
        .with_name(name)
        .with_layout("FormLayout,0,0,0,0,0,0")
}

fn popup(id: &str, name: &str) -> ComponentUpdate {
    let mut update = screen(id, name);
    update.screen_modal = Some(true);
    update
}

fn child(id: &str, parent: &str) -> ComponentUpdate {
    ComponentUpdate::new(id).with_class("Label").with_parent(parent)
}

/// Collects every event published on `topic`.
fn record(store: &ContentStore, topic: Topic) -> (Subscription, Arc<Mutex<Vec<StoreEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscription = store
        .subscriptions()
        .subscribe(topic, move |event| sink.lock().unwrap().push(event.clone()));
    (subscription, events)
}

fn child_ids(store: &ContentStore, parent: &str) -> Vec<String> {
    store.children(parent).iter().map(|c| c.id.clone()).collect()
}

#[test]
fn test_create_and_lookup() {
    let mut store = ContentStore::default();
    let changes = store.update_content(
        vec![screen("S1", "Contacts"), child("L1", "S1").with_name("Contacts-lbl")],
        false,
    );

    assert_eq!(changes.added, vec!["S1", "L1"]);
    assert!(store.contains("L1"));
    assert_eq!(store.tree_of("L1"), Some(Tree::Flat));
    assert_eq!(store.component_by_name("Contacts-lbl").unwrap().id, "L1");
    assert_eq!(store.screen_name_of("L1").as_deref(), Some("Contacts"));
    assert_eq!(store.screens().len(), 1);
}

#[test]
fn test_remove_restore_round_trip() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "Contacts"), child("L1", "S1").with_text("a")], false);

    let changes = store.update_content(
        vec![ComponentUpdate::new("L1").with_text("b").removed(true)],
        false,
    );
    assert_eq!(changes.removed, vec!["L1"]);
    assert!(!store.contains("L1"));
    assert!(store.is_removed("L1"));
    assert_eq!(store.tree_of("L1"), Some(Tree::Removed));
    assert!(child_ids(&store, "S1").is_empty());

    // properties merged before the removal are kept
    let removed = store.component("L1").unwrap();
    assert_eq!(removed.kind, ComponentKind::Label { text: Some("b".into()) });

    let changes = store.update_content(vec![ComponentUpdate::new("L1")], false);
    assert_eq!(changes.restored, vec!["L1"]);
    assert!(store.contains("L1"));
    assert!(!store.is_removed("L1"));
    assert_eq!(child_ids(&store, "S1"), vec!["L1"]);
}

#[test]
fn test_explicit_remove_false_restores() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "A"), child("L1", "S1")], false);
    store.update_content(vec![ComponentUpdate::new("L1").removed(true)], false);

    let changes = store.update_content(vec![ComponentUpdate::new("L1").removed(false)], false);
    assert_eq!(changes.restored, vec!["L1"]);
}

#[test]
fn test_destroy_purges_subtree() {
    let mut store = ContentStore::default();
    store.update_content(
        vec![
            screen("S1", "A"),
            ComponentUpdate::new("P1").with_class("Panel").with_parent("S1"),
            child("L1", "P1"),
            child("L2", "P1"),
        ],
        false,
    );
    store.update_content(vec![ComponentUpdate::new("L2").removed(true)], false);

    let changes = store.update_content(vec![ComponentUpdate::new("P1").destroyed()], false);

    assert_eq!(changes.destroyed.len(), 3);
    for id in ["P1", "L1", "L2"] {
        assert_eq!(store.tree_of(id), None, "{id} should be gone");
    }
    assert!(store.contains("S1"));
}

#[test]
fn test_remove_of_unknown_component_is_ignored() {
    let mut store = ContentStore::default();
    let changes = store.update_content(vec![ComponentUpdate::new("X").removed(true)], false);
    assert!(changes.is_empty());
    assert_eq!(store.tree_of("X"), None);
}

#[test]
fn test_children_ordered_by_index_then_arrival() {
    let mut store = ContentStore::default();
    let mut first = child("A", "S1");
    first.index_of = Some(1);
    let mut second = child("B", "S1");
    second.index_of = Some(0);
    store.update_content(
        vec![screen("S1", "A"), first, second, child("C", "S1"), child("D", "S1")],
        false,
    );

    assert_eq!(child_ids(&store, "S1"), vec!["B", "A", "C", "D"]);
}

#[test]
fn test_parent_notified_once_per_batch() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "A")], false);
    let (_sub, events) = record(&store, Topic::Children("S1".into()));

    let changes = store.update_content(
        vec![child("L1", "S1"), child("L2", "S1"), child("L3", "S1")],
        false,
    );

    assert_eq!(changes.notified_parents, vec!["S1"]);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        StoreEvent::Children { children, .. } => assert_eq!(children.len(), 3),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_property_change_notifies_component_only() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "A"), child("L1", "S1")], false);
    let (_parent, parent_events) = record(&store, Topic::Children("S1".into()));
    let (_own, own_events) = record(&store, Topic::Component("L1".into()));

    store.update_content(vec![ComponentUpdate::new("L1").with_text("changed")], false);

    assert!(parent_events.lock().unwrap().is_empty());
    assert_eq!(own_events.lock().unwrap().len(), 1);
}

#[test]
fn test_move_notifies_both_parents() {
    let mut store = ContentStore::default();
    store.update_content(
        vec![
            screen("S1", "A"),
            ComponentUpdate::new("P1").with_class("Panel").with_parent("S1"),
            ComponentUpdate::new("P2").with_class("Panel").with_parent("S1"),
            child("L1", "P1"),
        ],
        false,
    );

    let changes = store.update_content(vec![ComponentUpdate::new("L1").with_parent("P2")], false);

    assert!(changes.notified_parents.contains(&"P1".to_string()));
    assert!(changes.notified_parents.contains(&"P2".to_string()));
    assert_eq!(child_ids(&store, "P2"), vec!["L1"]);
}

#[test]
fn test_top_level_changes_notify_root() {
    let mut store = ContentStore::default();
    let (_sub, events) = record(&store, Topic::Children(ROOT.into()));

    store.update_content(vec![screen("S1", "A")], false);

    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_dangling_parent_is_recorded() {
    let mut store = ContentStore::default();
    store.update_content(vec![child("L1", "missing")], false);
    assert_eq!(store.dangling_parents().collect::<Vec<_>>(), vec!["L1"]);
}

#[test]
fn test_parent_later_in_same_batch_is_not_dangling() {
    let mut store = ContentStore::default();
    store.update_content(vec![child("L1", "S1"), screen("S1", "A")], false);
    assert_eq!(store.dangling_parents().count(), 0);
}

#[test]
fn test_desktop_content_is_separate() {
    let mut store = ContentStore::default();
    store.update_content(vec![ComponentUpdate::new("D1").with_class("DesktopPanel")], true);
    assert_eq!(store.tree_of("D1"), Some(Tree::Desktop));
    assert!(store.screens().is_empty());

    store.update_content(vec![ComponentUpdate::new("D1").removed(true)], true);
    assert_eq!(store.tree_of("D1"), Some(Tree::RemovedDesktop));
}

#[test]
fn test_component_stays_in_its_tree_family() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("D1", "Desk")], true);

    let changes =
        store.update_content(vec![ComponentUpdate::new("D1").with_name("Desk2")], false);

    assert!(changes.added.is_empty());
    assert_eq!(changes.updated, vec!["D1".to_string()]);
    assert_eq!(store.tree_of("D1"), Some(Tree::Desktop));
    assert!(!store.flat_content.contains_key("D1"));
    assert_eq!(store.component("D1").unwrap().name, "Desk2");

    store.update_content(vec![ComponentUpdate::new("D1").removed(true)], false);
    assert_eq!(store.tree_of("D1"), Some(Tree::RemovedDesktop));
    assert!(!store.removed_content.contains_key("D1"));

    store.update_content(vec![screen("S1", "A")], false);
    store.update_content(vec![ComponentUpdate::new("S1").with_name("B")], true);
    assert_eq!(store.tree_of("S1"), Some(Tree::Flat));
    assert!(!store.desktop_content.contains_key("S1"));
}

// ─────────────────────────────────────────────────────────
// ToolBarPanel
// ─────────────────────────────────────────────────────────

#[test]
fn test_tool_bar_panel_is_expanded() {
    let mut store = ContentStore::default();
    store.update_content(
        vec![
            screen("S1", "A"),
            ComponentUpdate::new("TP")
                .with_class("ToolBarPanel")
                .with_parent("S1")
                .with_layout("FormLayout,0,0,0,0,0,0"),
            ComponentUpdate::new("TB").with_class("ToolBar").with_parent("TP"),
            child("L1", "TP"),
        ],
        false,
    );

    let panel = store.component("TP").unwrap();
    assert_eq!(panel.layout.as_deref(), Some("BorderLayout,0,0,0,0,0,0"));
    assert_eq!(child_ids(&store, "TP"), vec!["TP-tbMain", "TP-tbCenter"]);
    assert_eq!(child_ids(&store, "TP-tbMain"), vec!["TB"]);
    assert_eq!(child_ids(&store, "TP-tbCenter"), vec!["L1"]);

    let center = store.component("TP-tbCenter").unwrap();
    assert_eq!(center.layout.as_deref(), Some("FormLayout,0,0,0,0,0,0"));
    assert_eq!(center.constraints.as_deref(), Some("Center"));
}

#[test]
fn test_tool_bar_panel_expansion_is_idempotent() {
    let mut store = ContentStore::default();
    let panel = ComponentUpdate::new("TP").with_class("ToolBarPanel").with_parent("S1");
    store.update_content(vec![screen("S1", "A"), panel.clone()], false);
    store.update_content(vec![panel], false);

    assert_eq!(child_ids(&store, "TP"), vec!["TP-tbMain", "TP-tbCenter"]);
    assert_eq!(
        store.component("TP").unwrap().layout.as_deref(),
        Some("BorderLayout,0,0,0,0,0,0")
    );
}

#[test]
fn test_tool_bar_area_update_moves_main() {
    let mut store = ContentStore::default();
    store.update_content(
        vec![
            screen("S1", "A"),
            ComponentUpdate::new("TP")
                .with_class("ToolBarPanel")
                .with_parent("S1"),
        ],
        false,
    );

    let mut update = ComponentUpdate::new("TP");
    update.tool_bar_area = Some(3);
    store.update_content(vec![update], false);

    let main = store.component("TP-tbMain").unwrap();
    assert_eq!(main.constraints.as_deref(), Some("East"));
}

#[test]
fn test_tool_bar_panel_remove_and_destroy_follow_helpers() {
    let mut store = ContentStore::default();
    store.update_content(
        vec![
            screen("S1", "A"),
            ComponentUpdate::new("TP")
                .with_class("ToolBarPanel")
                .with_parent("S1"),
        ],
        false,
    );

    store.update_content(vec![ComponentUpdate::new("TP").removed(true)], false);
    assert!(store.is_removed("TP-tbMain"));
    assert!(store.is_removed("TP-tbCenter"));

    store.update_content(vec![ComponentUpdate::new("TP")], false);
    assert!(store.contains("TP-tbMain"));

    store.update_content(vec![ComponentUpdate::new("TP").destroyed()], false);
    for id in ["TP", "TP-tbMain", "TP-tbCenter"] {
        assert_eq!(store.tree_of(id), None);
    }
}

// ─────────────────────────────────────────────────────────
// Replaced components / screens
// ─────────────────────────────────────────────────────────

#[test]
fn test_replace_and_restore_component() {
    let mut store = ContentStore::default();
    store.update_content(
        vec![
            screen("S1", "A"),
            child("L1", "S1")
                .with_name("A-lbl")
                .with_constraints("t;l;b;r"),
        ],
        false,
    );

    let custom = thinview_core::Component::from_update(
        &ComponentUpdate::new("custom").with_class("Button"),
    );
    assert!(store.replace_component("A-lbl", custom));

    let live = store.component("L1").unwrap();
    assert_eq!(live.class_name(), "Button");
    assert_eq!(live.constraints.as_deref(), Some("t;l;b;r"));
    assert!(store.is_replaced("A-lbl"));

    assert!(store.restore_replaced("A-lbl"));
    assert_eq!(store.component("L1").unwrap().class_name(), "Label");
    assert!(!store.is_replaced("A-lbl"));
}

#[test]
fn test_close_screen_drops_components_and_books() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "Contacts"), child("L1", "S1")], false);
    store.update_data_provider_data("Contacts", "Contacts/contacts", None, 0, vec![row(1)], true);

    assert!(store.close_screen("Contacts"));
    assert_eq!(store.tree_of("L1"), None);
    assert!(store.data_book("Contacts", "Contacts/contacts").is_none());
    assert!(!store.close_screen("Contacts"));
}

#[test]
fn test_reset_keeps_subscriptions() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "A")], false);
    let (_sub, events) = record(&store, Topic::AppState);

    store.reset();

    assert!(store.screens().is_empty());
    assert_eq!(events.lock().unwrap().len(), 1);
    assert!(store.subscriptions().has_subscribers(&Topic::AppState));
}

// ─────────────────────────────────────────────────────────
// Data books
// ─────────────────────────────────────────────────────────

#[test]
fn test_update_rows_notifies_screen() {
    let mut store = ContentStore::default();
    let (_sub, events) = record(&store, Topic::data_changed("Contacts", "Contacts/contacts"));

    store.update_data_provider_data(
        "Contacts",
        "Contacts/contacts",
        None,
        0,
        vec![row(1), row(2)],
        false,
    );

    let book = store.data_book("Contacts", "Contacts/contacts").unwrap();
    assert_eq!(book.current().unwrap().len(), 2);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        StoreEvent::DataChanged { rows, page, .. } => {
            assert_eq!(rows.len(), 2);
            assert_eq!(page, "current");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_popup_shares_owner_book() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "Contacts"), popup("S2", "Lookup")], false);
    let provider = "Contacts/contacts";
    let (_owner, owner_events) = record(&store, Topic::data_changed("Contacts", provider));
    let (_popup, popup_events) = record(&store, Topic::data_changed("Lookup", provider));

    store.update_data_provider_data("Lookup", provider, None, 0, vec![row(1)], true);

    assert_eq!(store.book_screen("Lookup", provider), "Contacts");
    assert!(store.data_books.contains_key(&BookKey::new("Contacts", provider)));
    assert!(!store.data_books.contains_key(&BookKey::new("Lookup", provider)));
    assert_eq!(store.data_book("Lookup", provider), store.data_book("Contacts", provider));
    assert_eq!(owner_events.lock().unwrap().len(), 1);
    assert_eq!(popup_events.lock().unwrap().len(), 1);
}

#[test]
fn test_owner_writes_reach_open_popup() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "Contacts"), popup("S2", "Lookup")], false);
    let provider = "Contacts/contacts";
    let (_rows, row_events) = record(&store, Topic::data_changed("Lookup", provider));
    let (_selection, selection_events) = record(&store, Topic::selected_row("Lookup", provider));

    store.update_data_provider_data("Contacts", provider, None, 0, vec![row(1)], true);
    store.set_selected_row("Contacts", provider, SelectedRow::at(0, Some(row(1))));

    assert_eq!(row_events.lock().unwrap().len(), 1);
    assert_eq!(selection_events.lock().unwrap().len(), 1);

    // a closed popup is no longer notified
    store.update_content(vec![ComponentUpdate::new("S2").removed(true)], false);
    store.clear_data_provider_data("Contacts", provider, None);
    assert_eq!(row_events.lock().unwrap().len(), 1);
}

#[test]
fn test_non_popup_keeps_own_book() {
    let mut store = ContentStore::default();
    store.update_content(vec![screen("S1", "Contacts"), screen("S2", "Other")], false);

    store.update_data_provider_data("Other", "Contacts/contacts", None, 0, vec![row(1)], true);

    assert_eq!(store.data_providers("Other"), vec!["Contacts/contacts"]);
    assert!(store.data_providers("Contacts").is_empty());
}

#[test]
fn test_selection_cleared_by_shrinking_fetch_is_published() {
    let mut store = ContentStore::default();
    let provider = "Contacts/contacts";
    let rows = vec![row(1), row(2), row(3)];
    store.update_data_provider_data("Contacts", provider, None, 0, rows, false);
    store.set_selected_row("Contacts", provider, SelectedRow::at(2, Some(row(3))));
    let (_sub, events) = record(&store, Topic::selected_row("Contacts", provider));

    store.update_data_provider_data("Contacts", provider, None, 0, vec![row(1)], true);

    let book = store.data_book("Contacts", provider).unwrap();
    assert_eq!(book.selected_row().index, -1);
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_delete_row_shifts_selection() {
    let mut store = ContentStore::default();
    let provider = "Contacts/contacts";
    let rows = vec![row(1), row(2), row(3)];
    store.update_data_provider_data("Contacts", provider, None, 0, rows, true);
    store.set_selected_row("Contacts", provider, SelectedRow::at(2, None));

    let removed = store.delete_data_provider_data("Contacts", provider, None, 0);

    assert_eq!(removed, Some(row(1)));
    assert_eq!(store.data_book("Contacts", provider).unwrap().selected_row().index, 1);
    assert_eq!(store.delete_data_provider_data("Contacts", provider, None, 9), None);
}

#[test]
fn test_meta_data_shared_with_subscribers() {
    let mut store = ContentStore::default();
    let (_sub, events) = record(&store, Topic::meta_data("Contacts", "Contacts/contacts"));

    store.set_meta_data(
        "Contacts",
        MetaData {
            data_provider: "Contacts/contacts".into(),
            primary_key_columns: vec!["ID".into()],
            ..Default::default()
        },
    );

    let book = store.data_book("Contacts", "Contacts/contacts").unwrap();
    assert_eq!(book.meta_data().unwrap().primary_key_columns, vec!["ID"]);
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_app_state_updates() {
    let mut store = ContentStore::new(SubscriptionManager::new());
    let (_sub, events) = record(&store, Topic::AppState);

    store.set_app_meta_data(crate::state::AppMetaData {
        client_id: "c-1".into(),
        ..Default::default()
    });

    assert_eq!(store.app_state().client_id(), Some("c-1"));
    assert_eq!(events.lock().unwrap().len(), 1);
}
