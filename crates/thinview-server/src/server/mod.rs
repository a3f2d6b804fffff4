//! # Server pipeline
//!
//! Sends requests through the [`Transport`] and applies every response of a
//! batch to the shared [`ContentStore`].
//!
//! ## Ordering
//!
//! - [`RequestMode::Queue`] requests are enqueued synchronously when
//!   [`Server::send_request`] is called and served by a single worker task.
//!   The next request is not sent before every handler of the previous
//!   response finished.
//! - [`RequestMode::Immediate`] requests bypass the queue. Handlers use them
//!   for nested requests (a refetch after `reload`), which would otherwise
//!   wait behind the request being handled.
//! - Within a batch `dal.dataProviderChanged` runs first; the rest keep their
//!   order. One navigation decision is made per batch.
//!
//! Every failure ends in a `ClientEvent::Dialog` and an `error!` log, and the
//! queue always moves on to the next request.

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use thinview_core::prelude::*;
use thinview_core::{owner_screen, Row, SelectedRow, CURRENT_PAGE};
use thinview_store::ContentStore;

use crate::events::{ClientEvent, Dialog, MessageKind, Route};
use crate::request::{Request, RequestMode};
use crate::response::{self, DataProviderChanged, FetchResponse, ServerResponse};
use crate::session::SessionFile;
use crate::transport::Transport;

/// The store shared between the pipeline and its readers. Never locked
/// across an `.await`.
pub type SharedStore = Arc<Mutex<ContentStore>>;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lock the store, recovering from a panicked holder.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, ContentStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    /// Where the client id is persisted; `None` keeps it in memory only.
    pub session: Option<SessionFile>,
}

impl ServerConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_session(mut self, session: SessionFile) -> Self {
        self.session = Some(session);
        self
    }
}

/// What handling one response body did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Response names in handling order.
    pub handled: Vec<String>,
    pub route: Option<Route>,
    pub session_expired: bool,
}

struct Queued {
    request: Request,
    reply: oneshot::Sender<Result<BatchOutcome>>,
}

enum Pending {
    Queued(oneshot::Receiver<Result<BatchOutcome>>),
    Immediate(Request),
}

struct Inner<T> {
    transport: T,
    store: SharedStore,
    config: ServerConfig,
    events: mpsc::UnboundedSender<ClientEvent>,
}

/// Handle to the request pipeline. Clones share the queue and the store.
pub struct Server<T> {
    inner: Arc<Inner<T>>,
    queue: mpsc::UnboundedSender<Queued>,
}

impl<T> Clone for Server<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            queue: self.queue.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("queue", &"<channel>")
            .finish()
    }
}

impl<T: Transport + Sync + 'static> Server<T> {
    /// Create the pipeline and spawn its queue worker.
    ///
    /// Must be called from within a tokio runtime. Returns the receiver of
    /// navigation, dialog and session events.
    pub fn new(
        transport: T,
        store: SharedStore,
        config: ServerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            transport,
            store,
            config,
            events: events_tx,
        });
        tokio::spawn(run_queue(Arc::clone(&inner), queue_rx));

        (
            Self {
                inner,
                queue: queue_tx,
            },
            events_rx,
        )
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Send `request` and resolve once its response batch was handled.
    ///
    /// The component precheck and, for queued requests, enqueueing happen
    /// before this returns, so call order is send order.
    pub fn send_request(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<BatchOutcome>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let pending = self.dispatch(request);
        async move {
            match pending? {
                Pending::Queued(reply) => reply.await.map_err(|_| Error::ChannelClosed)?,
                Pending::Immediate(request) => inner.execute(request).await,
            }
        }
    }

    /// Resend a request from a failure dialog unchanged.
    pub fn retry(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<BatchOutcome>> + Send + 'static {
        info!("Retrying {}", request.description());
        self.send_request(request)
    }

    /// Start (or resume) a session for `application_name`.
    pub fn startup(
        &self,
        application_name: &str,
    ) -> impl Future<Output = Result<BatchOutcome>> + Send + 'static {
        let client_id = self
            .inner
            .config
            .session
            .as_ref()
            .and_then(|session| match session.load() {
                Ok(client_id) => client_id,
                Err(e) => {
                    warn!("Could not read session file: {}", e);
                    None
                }
            });
        if let Some(client_id) = &client_id {
            info!("Resuming session {}", client_id);
        }
        self.send_request(Request::startup(application_name, client_id.as_deref()))
    }

    fn dispatch(&self, request: Request) -> Result<Pending> {
        self.inner.precheck(&request)?;
        match request.mode {
            RequestMode::Immediate => Ok(Pending::Immediate(request)),
            RequestMode::Queue => {
                let (reply, rx) = oneshot::channel();
                debug!("Queueing {}", request.description());
                self.queue
                    .send(Queued { request, reply })
                    .map_err(|_| Error::channel_send("request queue"))?;
                Ok(Pending::Queued(rx))
            }
        }
    }
}

/// Serve queued requests one at a time until every [`Server`] handle is gone.
async fn run_queue<T: Transport + Sync + 'static>(
    inner: Arc<Inner<T>>,
    mut queue: mpsc::UnboundedReceiver<Queued>,
) {
    while let Some(Queued { request, reply }) = queue.recv().await {
        // the target may have been removed while the request waited
        let result = match inner.precheck(&request) {
            Ok(()) => Arc::clone(&inner).execute(request).await,
            Err(e) => Err(e),
        };
        if reply.send(result).is_err() {
            trace!("Requester went away before its response was handled");
        }
    }
    debug!("Request queue closed");
}

/// Single navigation decision for a batch:
/// screen open > user data > login > close screen.
pub fn decide_route(responses: &[ServerResponse]) -> Option<Route> {
    let screen_open = responses.iter().find_map(|r| match r {
        ServerResponse::GenericScreen(screen) if !screen.update => Some(if screen.home {
            Route::Home
        } else {
            Route::Screen(screen.component_id.clone())
        }),
        _ => None,
    });
    screen_open
        .or_else(|| {
            responses
                .iter()
                .any(|r| matches!(r, ServerResponse::UserData(_)))
                .then_some(Route::Home)
        })
        .or_else(|| {
            responses.iter().find_map(|r| match r {
                ServerResponse::Login(login) => Some(Route::Login {
                    mode: login.mode.clone(),
                }),
                _ => None,
            })
        })
        .or_else(|| {
            responses
                .iter()
                .any(|r| matches!(r, ServerResponse::CloseScreen { .. }))
                .then_some(Route::Home)
        })
}

/// Screen whose book receives data for `provider`.
fn screen_of(provider: &str) -> String {
    owner_screen(provider).unwrap_or_default().to_string()
}

impl<T: Transport + Sync + 'static> Inner<T> {
    fn store(&self) -> MutexGuard<'_, ContentStore> {
        lock_store(&self.store)
    }

    fn emit(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            trace!("No listener for client events");
        }
    }

    /// Reject requests whose component is no longer live.
    fn precheck(&self, request: &Request) -> Result<()> {
        let Some(id) = &request.component_id else {
            return Ok(());
        };
        if self.store().contains(id) {
            return Ok(());
        }
        debug!("Rejecting {}: component is not live", request.description());
        Err(Error::unknown_component(id.clone()))
    }

    fn execute(self: Arc<Self>, request: Request) -> BoxFuture<'static, Result<BatchOutcome>> {
        async move {
            let result = self.round_trip(&request).await;
            if let Err(e) = &result {
                self.report_failure(&request, e);
            }
            result
        }
        .boxed()
    }

    async fn round_trip(self: &Arc<Self>, request: &Request) -> Result<BatchOutcome> {
        let url = request.endpoint.url(&self.config.base_url)?;
        let client_id = self.store().app_state().client_id().map(str::to_string);
        let outgoing = request.clone().with_client_id(client_id.as_deref());

        debug!("Sending {} to {}", request.description(), url);
        let timeout = self.config.request_timeout;
        let body = match tokio::time::timeout(timeout, self.transport.send(url, outgoing)).await {
            Ok(body) => body?,
            Err(_) => {
                return Err(Error::timeout(
                    request.description(),
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        };

        let responses = response::decode_batch(body)?;
        self.process(responses).await
    }

    async fn process(self: &Arc<Self>, responses: Vec<ServerResponse>) -> Result<BatchOutcome> {
        let route = decide_route(&responses);
        let mut outcome = BatchOutcome::default();

        for response in response::reorder(responses) {
            outcome.handled.push(response.name().to_string());
            self.handle(response, &mut outcome).await;
        }

        if outcome.session_expired {
            return Ok(outcome);
        }
        if let Some(route) = route {
            debug!("Navigating to {:?}", route);
            self.emit(ClientEvent::Navigate(route.clone()));
            outcome.route = Some(route);
        }
        Ok(outcome)
    }

    async fn handle(self: &Arc<Self>, response: ServerResponse, outcome: &mut BatchOutcome) {
        match response {
            ServerResponse::ApplicationMetaData(meta) => {
                self.persist_client_id(&meta.client_id);
                self.store().set_app_meta_data(meta);
            }
            ServerResponse::UserData(user) => {
                info!("Logged in as {}", user.user_name);
                self.store().set_user_data(Some(user));
            }
            ServerResponse::Login(login) => {
                debug!("Server requests login (mode {:?})", login.mode);
                self.store().set_user_data(None);
            }
            ServerResponse::GenericScreen(screen) => {
                let changes = self.store().update_content(screen.changed_components, false);
                debug!(
                    "screen {}: {} added, {} updated",
                    screen.component_id,
                    changes.added.len(),
                    changes.updated.len()
                );
            }
            ServerResponse::DesktopScreen(screen) => {
                self.store().update_content(screen.changed_components, true);
            }
            ServerResponse::CloseScreen { component_id } => {
                self.store().close_screen(&component_id);
            }
            ServerResponse::Fetch(fetch) => {
                self.apply_fetch(fetch);
            }
            ServerResponse::MetaData(meta) => {
                let screen = screen_of(&meta.data_provider);
                self.store().set_meta_data(&screen, meta);
            }
            ServerResponse::DataProviderChanged(changed) => {
                self.apply_data_provider_changed(changed).await;
            }
            ServerResponse::Error(message) => {
                error!("Server error: {}", message.message);
                self.emit(ClientEvent::Dialog(Dialog {
                    title: message.title.unwrap_or_else(|| "Error".to_string()),
                    message: message.message,
                    retry: None,
                }));
            }
            ServerResponse::SessionExpired => {
                self.expire_session();
                outcome.session_expired = true;
            }
            ServerResponse::Information(message) => {
                self.emit(ClientEvent::Message {
                    kind: MessageKind::Information,
                    text: message.message,
                });
            }
            ServerResponse::MessageError(message) => {
                error!("Server message: {}", message.message);
                self.emit(ClientEvent::Message {
                    kind: MessageKind::Error,
                    text: message.message,
                });
            }
            ServerResponse::Unknown { name, .. } => {
                debug!("Ignoring unknown response {}", name);
            }
        }
    }

    fn persist_client_id(&self, client_id: &str) {
        let Some(session) = &self.config.session else {
            return;
        };
        if client_id.is_empty() {
            return;
        }
        if let Err(e) = session.save(client_id) {
            warn!("Could not persist client id: {}", e);
        }
    }

    fn expire_session(&self) {
        warn!("Session expired, resetting content store");
        self.store().reset();
        if let Some(session) = &self.config.session {
            if let Err(e) = session.clear() {
                warn!("Could not clear session file: {}", e);
            }
        }
        self.emit(ClientEvent::SessionExpired);
    }

    fn report_failure(&self, request: &Request, err: &Error) {
        match err {
            Error::UnknownComponent { .. } => {
                debug!("{} rejected: {}", request.description(), err);
            }
            Error::SessionExpired => self.expire_session(),
            _ => {
                error!("{} failed: {}", request.description(), err);
                let title = match err {
                    Error::Timeout { .. } => "Request timed out",
                    Error::Transport { .. } => "Connection problem",
                    _ => "Server error",
                };
                self.emit(ClientEvent::Dialog(Dialog {
                    title: title.to_string(),
                    message: err.to_string(),
                    retry: err.is_retryable().then(|| request.clone()),
                }));
            }
        }
    }

    // ─────────────────────────────────────────────────────────
    // Data providers
    // ─────────────────────────────────────────────────────────

    fn apply_fetch(&self, fetch: FetchResponse) {
        let provider = fetch.data_provider.clone();
        let screen = screen_of(&provider);
        let rows = fetch.rows();

        let mut store = self.store();
        let page = fetch_page(&store, &screen, &fetch);
        if fetch.clear {
            store.clear_data_provider_data(&screen, &provider, Some(&page));
        }
        debug!("dal.fetch {}: {} rows from {}", provider, rows.len(), fetch.from);
        store.update_data_provider_data(
            &screen,
            &provider,
            Some(&page),
            fetch.from,
            rows,
            fetch.is_all_fetched,
        );

        if let Some(index) = fetch.selected_row {
            let selection = selection_at(
                &store,
                &screen,
                &provider,
                &page,
                index,
                fetch.tree_path,
                fetch.selected_column,
            );
            store.set_selected_row(&screen, &provider, selection);
        }
    }

    async fn apply_data_provider_changed(self: &Arc<Self>, changed: DataProviderChanged) {
        let provider = changed.data_provider.clone();
        let screen = screen_of(&provider);

        match changed.reload {
            Some(-1) => {
                self.store()
                    .clear_data_provider_data(&screen, &provider, None);
                self.refetch(Request::fetch(&provider, 0, None)).await;
            }
            Some(row) if row >= 0 => {
                let row = usize::try_from(row).unwrap_or_default();
                self.refetch(Request::fetch(&provider, row, Some(1))).await;
            }
            Some(other) => debug!("Ignoring reload {} of {}", other, provider),
            None => {}
        }

        let mut store = self.store();
        if let (Some(names), Some(values)) =
            (&changed.changed_column_names, &changed.changed_values)
        {
            let index = changed.selected_row.unwrap_or_else(|| {
                store
                    .data_book(&screen, &provider)
                    .map_or(-1, |book| book.selected_row().index)
            });
            if let Ok(index) = usize::try_from(index) {
                let values: Row = thinview_core::row_from_record(names, values);
                store.patch_data_provider_row(&screen, &provider, None, index, values);
            }
        }

        if let Some(index) = changed.selected_row {
            let selection = selection_at(
                &store,
                &screen,
                &provider,
                CURRENT_PAGE,
                index,
                None,
                changed.selected_column,
            );
            store.set_selected_row(&screen, &provider, selection);
        }
    }

    /// Nested fetch issued while handling a response. Failures were already
    /// reported by `execute`.
    async fn refetch(self: &Arc<Self>, request: Request) {
        debug!("Refetching with {}", request.description());
        if let Err(e) = Arc::clone(self).execute(request.immediate()).await {
            warn!("Refetch failed: {}", e);
        }
    }
}

/// Page a fetch addresses: tree path, master row key, or the current page.
fn fetch_page(store: &ContentStore, screen: &str, fetch: &FetchResponse) -> String {
    if let Some(path) = fetch.tree_path.as_ref().filter(|path| !path.is_empty()) {
        return Value::from(path.clone()).to_string();
    }
    let Some(master) = &fetch.master_row else {
        return CURRENT_PAGE.to_string();
    };
    store
        .data_book(screen, &fetch.data_provider)
        .and_then(|book| {
            book.meta_data()
                .and_then(|meta| meta.master_reference.as_ref())
                .map(|reference| reference.page_key(master))
        })
        .unwrap_or_else(|| Value::Object(master.clone()).to_string())
}

fn selection_at(
    store: &ContentStore,
    screen: &str,
    provider: &str,
    page: &str,
    index: i64,
    tree_path: Option<Vec<i64>>,
    selected_column: Option<String>,
) -> SelectedRow {
    if index < 0 {
        return SelectedRow::none();
    }
    let data_row = store.data_book(screen, provider).and_then(|book| {
        let index = usize::try_from(index).ok()?;
        book.page(page)?.get(index).cloned()
    });
    SelectedRow {
        data_row,
        index,
        tree_path,
        selected_column,
    }
}
