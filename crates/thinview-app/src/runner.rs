//! Headless runner
//!
//! Drives one server session, then lays out the active screen without a
//! renderer: leaf components get estimated sizes, containers are measured
//! bottom-up through the [`LayoutEngine`] and placed top-down inside the
//! requested window size. The result is a tree of absolute bounds, emitted as
//! JSON on stdout.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use thinview_core::prelude::*;
use thinview_core::{Bounds, Component, ComponentKind, Size};
use thinview_layout::{LayoutChild, LayoutEngine, SizeCalculated, Unmeasured};
use thinview_server::{
    lock_store, ClientEvent, Route, Server, ServerConfig, SessionFile, SharedStore, Transport,
};
use thinview_store::{ContentStore, SubscriptionManager};

use crate::config::{load_settings, Settings};
use crate::replay::ReplayTransport;

const CHAR_WIDTH: i32 = 7;
const LINE_HEIGHT: i32 = 22;

/// One placed component, bounds relative to the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    pub name: String,
    pub class_name: String,
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    /// Depth-first lookup by component id.
    pub fn find(&self, id: &str) -> Option<&LayoutNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutReport {
    pub screen: String,
    pub size: Size,
    pub tree: LayoutNode,
    /// Dialog and message texts raised during the session.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

/// Replay a recorded session for `project_path` and print the layout of the
/// active screen.
pub async fn run_headless(project_path: &Path, replay: &Path, size: Size) -> Result<LayoutReport> {
    info!("═══════════════════════════════════════════════════════");
    info!("thinview starting in HEADLESS mode");
    info!("Project: {}", project_path.display());
    info!("Replay: {}", replay.display());
    info!("═══════════════════════════════════════════════════════");

    let settings = load_settings(project_path);
    let transport = ReplayTransport::load(replay)?;
    let session = settings
        .session
        .persist_client_id
        .then(|| SessionFile::in_dir(&project_path.join(".thinview")));

    let report = run_session(&settings, transport, session, size).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("thinview headless mode exiting");
    Ok(report)
}

/// Start a session over `transport` and lay out the screen it ends on.
pub async fn run_session<T: Transport + Sync + 'static>(
    settings: &Settings,
    transport: T,
    session: Option<SessionFile>,
    size: Size,
) -> Result<LayoutReport> {
    let store: SharedStore = Arc::new(Mutex::new(ContentStore::new(SubscriptionManager::new())));
    let mut config = ServerConfig::new(settings.server.base_url()?)
        .with_timeout(settings.server.request_timeout());
    if let Some(session) = session {
        config = config.with_session(session);
    }

    let (server, mut events) = Server::new(transport, Arc::clone(&store), config);
    let outcome = server.startup(&settings.server.application_name).await?;
    debug!("Startup handled {:?}", outcome.handled);

    let (navigated, messages) = drain_events(&mut events);
    let route = outcome.route.or(navigated);

    let store = lock_store(&store);
    let screen = active_screen(&store, route.as_ref())
        .ok_or_else(|| Error::protocol("Session ended without a screen to lay out"))?;
    info!("Laying out {} at {}x{}", screen.name, size.width, size.height);

    let mut layout = HeadlessLayout {
        store: &store,
        engine: LayoutEngine::new().with_max_iterations(settings.layout.max_auto_size_iterations),
    };
    let tree = layout.run(&screen, size);

    Ok(LayoutReport {
        screen: screen.name.clone(),
        size,
        tree,
        messages,
    })
}

/// Last navigation plus every dialog/message text raised so far.
fn drain_events(events: &mut mpsc::UnboundedReceiver<ClientEvent>) -> (Option<Route>, Vec<String>) {
    let mut route = None;
    let mut messages = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::Navigate(next) => route = Some(next),
            ClientEvent::Dialog(dialog) => {
                warn!("Dialog: {}: {}", dialog.title, dialog.message);
                messages.push(format!("{}: {}", dialog.title, dialog.message));
            }
            ClientEvent::Message { kind, text } => {
                info!("{:?} message: {}", kind, text);
                messages.push(text);
            }
            ClientEvent::SessionExpired => {
                warn!("Session expired during replay");
                messages.push("Session expired".to_string());
            }
        }
    }
    (route, messages)
}

/// Screen named by `route`, else the most recently opened one.
fn active_screen(store: &ContentStore, route: Option<&Route>) -> Option<Arc<Component>> {
    if let Some(Route::Screen(name)) = route {
        if let Some(screen) = store
            .component_by_name(name)
            .or_else(|| store.component(name))
        {
            return Some(screen);
        }
        debug!("Route names unknown screen {}, using the last opened", name);
    }
    store.screens().pop()
}

/// Rendered size guess for a component without a layout.
fn estimate(component: &Component) -> Size {
    let text_width = |text: &Option<String>| {
        text.as_deref()
            .map_or(0, |t| t.chars().count() as i32 * CHAR_WIDTH)
    };
    match &component.kind {
        ComponentKind::Button { text } => Size::new(text_width(text) + 24, LINE_HEIGHT + 6),
        ComponentKind::Label { text } => Size::new(text_width(text), LINE_HEIGHT),
        ComponentKind::Editor { .. } => Size::new(120, LINE_HEIGHT + 2),
        ComponentKind::Table { .. } => Size::new(300, 200),
        _ => Size::new(80, LINE_HEIGHT),
    }
}

struct HeadlessLayout<'a> {
    store: &'a ContentStore,
    engine: LayoutEngine,
}

impl HeadlessLayout<'_> {
    fn run(&mut self, screen: &Component, window: Size) -> LayoutNode {
        self.measure(screen);
        self.place(screen, Bounds::new(0, 0, window.width, window.height))
    }

    fn layout_children(&self, container: &Component) -> (Vec<Arc<Component>>, Vec<LayoutChild>) {
        let children = self.store.children(&container.id);
        let layout_children = children.iter().map(|c| LayoutChild::from(c.as_ref())).collect();
        (children, layout_children)
    }

    /// Report the preferred size of every descendant, return the own one.
    fn measure(&mut self, component: &Component) -> Size {
        if component.layout.is_none() {
            return estimate(component);
        }
        let (children, layout_children) = self.layout_children(component);
        for child in &children {
            let size = self.measure(child);
            self.engine
                .report(SizeCalculated::new(&child.id, Some(component.id.as_str()), size));
        }
        self.engine
            .preferred_size(component, &layout_children, &Unmeasured)
            .unwrap_or_else(|| estimate(component))
    }

    fn place(&mut self, component: &Component, bounds: Bounds) -> LayoutNode {
        let (children, layout_children) = self.layout_children(component);
        let result = if component.layout.is_some() {
            self.engine
                .layout_container(component, &layout_children, &Unmeasured, bounds.size())
        } else {
            None
        };

        let mut nodes = Vec::new();
        if let Some(result) = result {
            for child in &children {
                // invisible children get no bounds
                let Some(relative) = result.bounds(&child.id) else {
                    continue;
                };
                let absolute = Bounds::new(
                    bounds.left + relative.left,
                    bounds.top + relative.top,
                    relative.width,
                    relative.height,
                );
                nodes.push(self.place(child, absolute));
            }
        } else if !children.is_empty() {
            debug!("{} has children but no usable layout", component.id);
        }

        LayoutNode {
            id: component.id.clone(),
            name: component.name.clone(),
            class_name: component.class_name().to_string(),
            bounds,
            children: nodes,
        }
    }
}
