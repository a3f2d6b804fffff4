//! Typed publish/subscribe registry
//!
//! Renderers register callbacks per [`Topic`] and receive [`StoreEvent`]
//! snapshots. The returned [`Subscription`] unsubscribes when dropped.
//!
//! Callbacks run synchronously on the publishing thread, after the registry
//! lock is released, so a callback may subscribe or drop subscriptions. The
//! content store publishes while its own lock is held by the caller: a
//! callback must not lock the store again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use thinview_core::{Component, MetaData, Row, SelectedRow, SortDefinition};

use crate::state::AppState;

/// Parent key of top-level components (screens).
pub const ROOT: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Own properties of one component.
    Component(String),
    /// Child list of a parent, [`ROOT`] for screens.
    Children(String),
    DataChanged { screen: String, provider: String },
    SelectedRow { screen: String, provider: String },
    SortDefinition { screen: String, provider: String },
    MetaData { screen: String, provider: String },
    AppState,
}

impl Topic {
    pub fn data_changed(screen: &str, provider: &str) -> Self {
        Topic::DataChanged {
            screen: screen.to_string(),
            provider: provider.to_string(),
        }
    }

    pub fn selected_row(screen: &str, provider: &str) -> Self {
        Topic::SelectedRow {
            screen: screen.to_string(),
            provider: provider.to_string(),
        }
    }

    pub fn sort_definition(screen: &str, provider: &str) -> Self {
        Topic::SortDefinition {
            screen: screen.to_string(),
            provider: provider.to_string(),
        }
    }

    pub fn meta_data(screen: &str, provider: &str) -> Self {
        Topic::MetaData {
            screen: screen.to_string(),
            provider: provider.to_string(),
        }
    }
}

/// Snapshot delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Component(Arc<Component>),
    Children {
        parent: String,
        children: Vec<Arc<Component>>,
    },
    DataChanged {
        screen: String,
        provider: String,
        page: String,
        rows: Vec<Row>,
    },
    SelectedRow {
        screen: String,
        provider: String,
        selection: SelectedRow,
    },
    SortDefinition {
        screen: String,
        provider: String,
        sort: Vec<SortDefinition>,
    },
    MetaData {
        screen: String,
        provider: String,
        meta_data: Arc<MetaData>,
    },
    AppState(AppState),
}

type Callback = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<Topic, Vec<(u64, Callback)>>,
}

/// Shared handle to the subscriber registry. Clones share one registry.
#[derive(Clone, Default)]
pub struct SubscriptionManager {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("topics", &self.topic_count())
            .finish()
    }
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .topics
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            id,
            topic,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every subscriber of `topic`. Returns the number of
    /// callbacks invoked.
    pub fn publish(&self, topic: &Topic, event: &StoreEvent) -> usize {
        let callbacks: Vec<Callback> = {
            let registry = lock(&self.registry);
            match registry.topics.get(topic) {
                Some(subscribers) => subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return 0,
            }
        };
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        lock(&self.registry).topics.get(topic).map_or(0, Vec::len)
    }

    pub fn has_subscribers(&self, topic: &Topic) -> bool {
        self.subscriber_count(topic) > 0
    }

    fn topic_count(&self) -> usize {
        lock(&self.registry).topics.len()
    }
}

/// A poisoned registry only means a callback panicked; the map is intact.
fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scoped registration; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    topic: Topic,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        if let Some(subscribers) = registry.topics.get_mut(&self.topic) {
            subscribers.retain(|(id, _)| *id != self.id);
            if subscribers.is_empty() {
                registry.topics.remove(&self.topic);
            }
        }
    }
}
