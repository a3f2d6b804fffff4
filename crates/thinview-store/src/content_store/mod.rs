//! # ContentStore
//!
//! The authoritative component tree of a session plus the data books of its
//! screens.
//!
//! Every component lives in exactly one tree:
//!
//! | tree | contents |
//! |---|---|
//! | flat | live screen components |
//! | removed | soft-removed components, restored by the next update without `~remove` |
//! | replaced | server components overridden by a custom component |
//! | desktop | live components of the permanently mounted desktop panel |
//! | removed desktop | soft-removed desktop components |
//!
//! All mutation goes through store methods; reads hand out `Arc<Component>`
//! snapshots. Changes are published synchronously through the store's
//! [`SubscriptionManager`].

mod data;
mod toolbar;

#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use thinview_core::{Component, ComponentUpdate};

use crate::data_book::DataBook;
use crate::state::{AppMetaData, AppState, UserData};
use crate::subscription::{StoreEvent, SubscriptionManager, Topic, ROOT};

pub use toolbar::{center_id, main_id};

/// Tree a component currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree {
    Flat,
    Removed,
    Replaced,
    Desktop,
    RemovedDesktop,
}

impl Tree {
    /// Live and removed tree of the family `self` belongs to.
    fn family(self) -> (Tree, Tree) {
        match self {
            Tree::Desktop | Tree::RemovedDesktop => (Tree::Desktop, Tree::RemovedDesktop),
            Tree::Flat | Tree::Removed | Tree::Replaced => (Tree::Flat, Tree::Removed),
        }
    }
}

/// Data book address: screen name and data provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookKey {
    pub screen: String,
    pub provider: String,
}

impl BookKey {
    pub fn new(screen: &str, provider: &str) -> Self {
        Self {
            screen: screen.to_string(),
            provider: provider.to_string(),
        }
    }
}

/// What one [`ContentStore::update_content`] batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentChanges {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub restored: Vec<String>,
    pub destroyed: Vec<String>,
    /// Parents whose child list subscribers were notified, once each.
    pub notified_parents: Vec<String>,
}

impl ContentChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.restored.is_empty()
            && self.destroyed.is_empty()
    }
}

/// Parents to renotify, in first-touched order, each once.
#[derive(Debug, Default)]
struct Renotify {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl Renotify {
    fn push(&mut self, parent: Option<&str>) {
        let key = parent.unwrap_or(ROOT);
        if self.seen.insert(key.to_string()) {
            self.order.push(key.to_string());
        }
    }
}

#[derive(Debug, Default)]
pub struct ContentStore {
    flat_content: HashMap<String, Arc<Component>>,
    removed_content: HashMap<String, Arc<Component>>,
    replaced_content: HashMap<String, Arc<Component>>,
    desktop_content: HashMap<String, Arc<Component>>,
    removed_desktop_content: HashMap<String, Arc<Component>>,

    /// First-seen sequence, the tie breaker for child order.
    order: HashMap<String, u64>,
    next_order: u64,

    data_books: HashMap<BookKey, DataBook>,
    app: AppState,
    dangling: BTreeSet<String>,
    subscriptions: SubscriptionManager,
}

impl ContentStore {
    pub fn new(subscriptions: SubscriptionManager) -> Self {
        Self {
            subscriptions,
            ..Default::default()
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    // ─────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────

    fn tree(&self, tree: Tree) -> &HashMap<String, Arc<Component>> {
        match tree {
            Tree::Flat => &self.flat_content,
            Tree::Removed => &self.removed_content,
            Tree::Replaced => &self.replaced_content,
            Tree::Desktop => &self.desktop_content,
            Tree::RemovedDesktop => &self.removed_desktop_content,
        }
    }

    fn tree_mut(&mut self, tree: Tree) -> &mut HashMap<String, Arc<Component>> {
        match tree {
            Tree::Flat => &mut self.flat_content,
            Tree::Removed => &mut self.removed_content,
            Tree::Replaced => &mut self.replaced_content,
            Tree::Desktop => &mut self.desktop_content,
            Tree::RemovedDesktop => &mut self.removed_desktop_content,
        }
    }

    const SEARCH_ORDER: [Tree; 5] = [
        Tree::Flat,
        Tree::Desktop,
        Tree::Removed,
        Tree::RemovedDesktop,
        Tree::Replaced,
    ];

    /// Tree holding `id`, live trees first.
    pub fn tree_of(&self, id: &str) -> Option<Tree> {
        Self::SEARCH_ORDER
            .into_iter()
            .find(|tree| self.tree(*tree).contains_key(id))
    }

    /// Component by id from any tree.
    pub fn component(&self, id: &str) -> Option<Arc<Component>> {
        let tree = self.tree_of(id)?;
        self.tree(tree).get(id).cloned()
    }

    /// Component by name from any tree, live components first.
    pub fn component_by_name(&self, name: &str) -> Option<Arc<Component>> {
        Self::SEARCH_ORDER.into_iter().find_map(|tree| {
            self.tree(tree)
                .values()
                .find(|c| c.name == name)
                .cloned()
        })
    }

    /// Whether `id` is live (flat or desktop).
    pub fn contains(&self, id: &str) -> bool {
        self.flat_content.contains_key(id) || self.desktop_content.contains_key(id)
    }

    pub fn is_removed(&self, id: &str) -> bool {
        self.removed_content.contains_key(id) || self.removed_desktop_content.contains_key(id)
    }

    fn is_tracked(&self, id: &str) -> bool {
        self.tree_of(id).is_some()
    }

    /// Live children of `parent` ordered by `index_of`, then first appearance.
    /// [`ROOT`] lists the top-level components.
    pub fn children(&self, parent: &str) -> Vec<Arc<Component>> {
        let mut children: Vec<Arc<Component>> = self
            .flat_content
            .values()
            .chain(self.desktop_content.values())
            .filter(|c| c.parent.as_deref().unwrap_or(ROOT) == parent)
            .cloned()
            .collect();
        children.sort_by_key(|c| {
            (
                c.index_of.unwrap_or(i32::MAX),
                self.order.get(&c.id).copied().unwrap_or(u64::MAX),
            )
        });
        children
    }

    /// Live top-level components of the flat tree.
    pub fn screens(&self) -> Vec<Arc<Component>> {
        let mut screens: Vec<Arc<Component>> = self
            .flat_content
            .values()
            .filter(|c| c.parent.is_none())
            .cloned()
            .collect();
        screens.sort_by_key(|c| self.order.get(&c.id).copied().unwrap_or(u64::MAX));
        screens
    }

    /// Name of the top-level panel `id` belongs to.
    pub fn screen_name_of(&self, id: &str) -> Option<String> {
        let mut current = self.component(id)?;
        for _ in 0..=self.order.len() {
            match current.parent.as_deref() {
                None => return Some(current.name.clone()),
                Some(parent) => current = self.component(parent)?,
            }
        }
        tracing::warn!("Parent cycle above {}", id);
        None
    }

    /// Ids whose declared parent was never tracked.
    pub fn dangling_parents(&self) -> impl Iterator<Item = &str> {
        self.dangling.iter().map(String::as_str)
    }

    // ─────────────────────────────────────────────────────────
    // update_content
    // ─────────────────────────────────────────────────────────

    /// Apply one batch of component updates.
    ///
    /// Properties are merged before `~remove` / `~destroy` are evaluated, so
    /// a component updated and removed in the same batch keeps the new
    /// properties while removed. Every touched parent is notified once after
    /// the batch, then every component whose own properties changed.
    ///
    /// New components are created in the tree family picked by `desktop`.
    /// Known components stay in the family they were created in.
    pub fn update_content(
        &mut self,
        updates: Vec<ComponentUpdate>,
        desktop: bool,
    ) -> ContentChanges {
        let batch_family = if desktop {
            (Tree::Desktop, Tree::RemovedDesktop)
        } else {
            (Tree::Flat, Tree::Removed)
        };
        let updates = self.expand_tool_bar_panels(updates);

        let mut changes = ContentChanges::default();
        let mut renotify = Renotify::default();
        let mut touched: Vec<String> = Vec::new();

        for update in updates {
            let id = update.id.clone();
            let current = self.tree_of(&id).filter(|tree| *tree != Tree::Replaced);
            let (live, removed) = current.map_or(batch_family, Tree::family);

            let Some(tree) = current else {
                if update.is_destroy() || update.is_remove() {
                    tracing::debug!("Ignoring remove of unknown component {}", id);
                    continue;
                }
                self.create(update, live);
                let parent = self.tree(live).get(&id).and_then(|c| c.parent.clone());
                renotify.push(parent.as_deref());
                changes.added.push(id);
                continue;
            };

            let is_live = tree == live;
            let Some(entry) = self.tree_mut(tree).get_mut(&id) else {
                continue;
            };
            let old_parent = entry.parent.clone();
            let change = Arc::make_mut(entry).apply(&update);
            let new_parent = entry.parent.clone();

            if change.properties {
                changes.updated.push(id.clone());
                if !touched.contains(&id) {
                    touched.push(id.clone());
                }
            }
            if is_live && change.structural {
                renotify.push(new_parent.as_deref());
            }
            if is_live && change.moved {
                renotify.push(old_parent.as_deref());
            }

            if update.is_destroy() {
                let purged = self.destroy(&id);
                if is_live {
                    renotify.push(new_parent.as_deref());
                }
                changes.destroyed.extend(purged);
            } else if update.is_remove() {
                if is_live {
                    self.move_between(&id, live, removed);
                    renotify.push(new_parent.as_deref());
                    changes.removed.push(id);
                }
            } else if !is_live {
                self.move_between(&id, removed, live);
                renotify.push(new_parent.as_deref());
                changes.restored.push(id);
            }
        }

        for id in &changes.added {
            let Some(parent) = self.component(id).and_then(|c| c.parent.clone()) else {
                continue;
            };
            if !self.is_tracked(&parent) {
                tracing::warn!("Component {} refers to unknown parent {}", id, parent);
                self.dangling.insert(id.clone());
            }
        }

        for parent in &renotify.order {
            let topic = Topic::Children(parent.clone());
            if self.subscriptions.has_subscribers(&topic) {
                let event = StoreEvent::Children {
                    parent: parent.clone(),
                    children: self.children(parent),
                };
                self.subscriptions.publish(&topic, &event);
            }
        }
        for id in touched.iter().filter(|id| self.contains(id)) {
            if let Some(component) = self.component(id) {
                self.subscriptions.publish(
                    &Topic::Component(id.clone()),
                    &StoreEvent::Component(component),
                );
            }
        }

        tracing::debug!(
            "update_content: {} added, {} updated, {} removed, {} restored, {} destroyed",
            changes.added.len(),
            changes.updated.len(),
            changes.removed.len(),
            changes.restored.len(),
            changes.destroyed.len()
        );
        changes.notified_parents = renotify.order;
        changes
    }

    fn create(&mut self, update: ComponentUpdate, tree: Tree) {
        let component = Component::from_update(&update);
        self.order.entry(component.id.clone()).or_insert_with(|| {
            let seq = self.next_order;
            self.next_order += 1;
            seq
        });
        self.tree_mut(tree)
            .insert(component.id.clone(), Arc::new(component));
    }

    fn move_between(&mut self, id: &str, from: Tree, to: Tree) {
        if let Some(component) = self.tree_mut(from).remove(id) {
            self.tree_mut(to).insert(id.to_string(), component);
        }
    }

    /// Purge `id` and everything below it from every tree. Returns the purged ids.
    fn destroy(&mut self, id: &str) -> Vec<String> {
        let mut purged = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            for tree in Self::SEARCH_ORDER {
                let children: Vec<String> = self
                    .tree(tree)
                    .values()
                    .filter(|c| c.parent.as_deref() == Some(current.as_str()))
                    .map(|c| c.id.clone())
                    .collect();
                stack.extend(children);
                self.tree_mut(tree).remove(&current);
            }
            self.order.remove(&current);
            self.dangling.remove(&current);
            if !purged.contains(&current) {
                purged.push(current);
            }
        }
        purged
    }

    // ─────────────────────────────────────────────────────────
    // Replaced components
    // ─────────────────────────────────────────────────────────

    /// Put `custom` in place of the live server component named `name`.
    ///
    /// The custom component takes over the original's id, parent and
    /// constraints; the original waits in the replaced tree.
    pub fn replace_component(&mut self, name: &str, mut custom: Component) -> bool {
        let Some(original) = self
            .flat_content
            .values()
            .find(|c| c.name == name)
            .cloned()
        else {
            tracing::debug!("No live component named {} to replace", name);
            return false;
        };

        custom.id = original.id.clone();
        custom.name = original.name.clone();
        custom.parent = original.parent.clone();
        custom.constraints = original.constraints.clone();
        custom.index_of = original.index_of;

        self.replaced_content
            .insert(original.id.clone(), Arc::clone(&original));
        self.flat_content
            .insert(original.id.clone(), Arc::new(custom));
        self.publish_children(original.parent.as_deref());
        true
    }

    /// Bring back the server component replaced under `name`.
    pub fn restore_replaced(&mut self, name: &str) -> bool {
        let Some(original) = self
            .replaced_content
            .values()
            .find(|c| c.name == name)
            .cloned()
        else {
            return false;
        };
        self.replaced_content.remove(&original.id);
        self.flat_content
            .insert(original.id.clone(), Arc::clone(&original));
        self.publish_children(original.parent.as_deref());
        true
    }

    pub fn is_replaced(&self, name: &str) -> bool {
        self.replaced_content.values().any(|c| c.name == name)
    }

    // ─────────────────────────────────────────────────────────
    // Screens / session
    // ─────────────────────────────────────────────────────────

    /// Destroy the screen named `name` with its subtree and data books.
    pub fn close_screen(&mut self, name: &str) -> bool {
        let screen = self
            .flat_content
            .values()
            .chain(self.removed_content.values())
            .find(|c| c.parent.is_none() && c.name == name)
            .cloned();
        let Some(screen) = screen else {
            tracing::debug!("close_screen: no screen named {}", name);
            return false;
        };

        let purged = self.destroy(&screen.id);
        self.data_books.retain(|key, _| key.screen != name);
        tracing::debug!("Closed screen {} ({} components)", name, purged.len());
        self.publish_children(None);
        true
    }

    /// Drop every component, data book and session value. Subscriptions stay.
    pub fn reset(&mut self) {
        self.flat_content.clear();
        self.removed_content.clear();
        self.replaced_content.clear();
        self.desktop_content.clear();
        self.removed_desktop_content.clear();
        self.order.clear();
        self.next_order = 0;
        self.data_books.clear();
        self.dangling.clear();
        self.app = AppState::default();

        self.publish_children(None);
        self.subscriptions
            .publish(&Topic::AppState, &StoreEvent::AppState(self.app.clone()));
    }

    pub fn app_state(&self) -> &AppState {
        &self.app
    }

    pub fn set_app_meta_data(&mut self, meta_data: AppMetaData) {
        self.app.meta_data = Some(meta_data);
        self.subscriptions
            .publish(&Topic::AppState, &StoreEvent::AppState(self.app.clone()));
    }

    pub fn set_user_data(&mut self, user_data: Option<UserData>) {
        self.app.user_data = user_data;
        self.subscriptions
            .publish(&Topic::AppState, &StoreEvent::AppState(self.app.clone()));
    }

    fn publish_children(&self, parent: Option<&str>) {
        let parent = parent.unwrap_or(ROOT);
        let topic = Topic::Children(parent.to_string());
        if self.subscriptions.has_subscribers(&topic) {
            let event = StoreEvent::Children {
                parent: parent.to_string(),
                children: self.children(parent),
            };
            self.subscriptions.publish(&topic, &event);
        }
    }
}
