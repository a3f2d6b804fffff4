//! Outbound request envelope
//!
//! A request is an opaque JSON body plus an [`Endpoint`] keyword. The
//! endpoint resolves to a path under the configured server base URL.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use thinview_core::prelude::*;

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// How a request is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestMode {
    /// Serialized through the request queue, one in flight at a time.
    #[default]
    Queue,
    /// Sent right away, bypassing the queue.
    Immediate,
}

/// Server endpoints the client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Endpoint {
    Startup,
    UiRefresh,
    Login,
    Logout,
    OpenScreen,
    CloseScreen,
    PressButton,
    SetValue,
    SetValues,
    Focus,
    Fetch,
    MetaData,
    SelectRow,
    SelectTree,
    Sort,
    InsertRecord,
    DeleteRecord,
    SaveData,
}

impl Endpoint {
    /// Path below the server base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Startup => "api/startup",
            Endpoint::UiRefresh => "api/uiRefresh",
            Endpoint::Login => "api/login",
            Endpoint::Logout => "api/logout",
            Endpoint::OpenScreen => "api/v2/openScreen",
            Endpoint::CloseScreen => "api/closeScreen",
            Endpoint::PressButton => "api/v2/pressButton",
            Endpoint::SetValue => "api/comp/setValue",
            Endpoint::SetValues => "api/dal/setValues",
            Endpoint::Focus => "api/comp/focusGained",
            Endpoint::Fetch => "api/dal/fetch",
            Endpoint::MetaData => "api/dal/metaData",
            Endpoint::SelectRow => "api/dal/selectRecord",
            Endpoint::SelectTree => "api/dal/selectRecordTree",
            Endpoint::Sort => "api/dal/sort",
            Endpoint::InsertRecord => "api/dal/insertRecord",
            Endpoint::DeleteRecord => "api/dal/deleteRecord",
            Endpoint::SaveData => "api/dal/save",
        }
    }

    /// Protocol keyword, also used by recorded sessions.
    pub fn keyword(self) -> &'static str {
        match self {
            Endpoint::Startup => "startup",
            Endpoint::UiRefresh => "uiRefresh",
            Endpoint::Login => "login",
            Endpoint::Logout => "logout",
            Endpoint::OpenScreen => "openScreen",
            Endpoint::CloseScreen => "closeScreen",
            Endpoint::PressButton => "pressButton",
            Endpoint::SetValue => "setValue",
            Endpoint::SetValues => "setValues",
            Endpoint::Focus => "focus",
            Endpoint::Fetch => "fetch",
            Endpoint::MetaData => "metaData",
            Endpoint::SelectRow => "selectRow",
            Endpoint::SelectTree => "selectTree",
            Endpoint::Sort => "sort",
            Endpoint::InsertRecord => "insertRecord",
            Endpoint::DeleteRecord => "deleteRecord",
            Endpoint::SaveData => "saveData",
        }
    }

    /// Join this endpoint onto `base`.
    pub fn url(self, base: &Url) -> Result<Url> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(self.path())
            .map_err(|e| Error::config(format!("cannot join {} onto {}: {}", self.path(), base, e)))
    }
}

/// One outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u64,
    pub endpoint: Endpoint,
    pub body: Value,
    /// Component the request acts on; checked against the store before sending.
    pub component_id: Option<String>,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(endpoint: Endpoint, body: Value) -> Self {
        Self {
            id: next_request_id(),
            endpoint,
            body,
            component_id: None,
            mode: RequestMode::Queue,
        }
    }

    pub fn for_component(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    pub fn immediate(mut self) -> Self {
        self.mode = RequestMode::Immediate;
        self
    }

    /// Human readable description for logs and dialogs.
    pub fn description(&self) -> String {
        match &self.component_id {
            Some(id) => format!("{} #{} ({})", self.endpoint.keyword(), self.id, id),
            None => format!("{} #{}", self.endpoint.keyword(), self.id),
        }
    }

    /// Set `clientId` on an object body unless it already carries one.
    pub fn with_client_id(mut self, client_id: Option<&str>) -> Self {
        if let (Some(client_id), Value::Object(body)) = (client_id, &mut self.body) {
            body.entry("clientId")
                .or_insert_with(|| Value::String(client_id.to_string()));
        }
        self
    }

    // ─────────────────────────────────────────────────────────
    // Builders
    // ─────────────────────────────────────────────────────────

    pub fn startup(application_name: &str, client_id: Option<&str>) -> Self {
        let mut body = Map::new();
        body.insert("applicationName".into(), json!(application_name));
        if let Some(client_id) = client_id {
            body.insert("clientId".into(), json!(client_id));
        }
        Self::new(Endpoint::Startup, Value::Object(body))
    }

    pub fn login(username: &str, password: &str) -> Self {
        Self::new(
            Endpoint::Login,
            json!({ "username": username, "password": password, "mode": "manual" }),
        )
    }

    pub fn logout() -> Self {
        Self::new(Endpoint::Logout, json!({}))
    }

    pub fn open_screen(component_id: &str) -> Self {
        Self::new(Endpoint::OpenScreen, json!({ "componentId": component_id }))
    }

    pub fn close_screen(screen_name: &str) -> Self {
        Self::new(Endpoint::CloseScreen, json!({ "componentId": screen_name }))
    }

    pub fn press_button(component_id: &str) -> Self {
        Self::new(Endpoint::PressButton, json!({ "componentId": component_id }))
            .for_component(component_id)
    }

    pub fn set_value(component_id: &str, value: Value) -> Self {
        Self::new(
            Endpoint::SetValue,
            json!({ "componentId": component_id, "value": value }),
        )
        .for_component(component_id)
    }

    /// Fetch rows of `data_provider` starting at `from`; `count` of `None`
    /// fetches everything.
    pub fn fetch(data_provider: &str, from: usize, count: Option<usize>) -> Self {
        let mut body = Map::new();
        body.insert("dataProvider".into(), json!(data_provider));
        body.insert("fromRow".into(), json!(from));
        body.insert("rowCount".into(), json!(count.map_or(-1, |c| c as i64)));
        body.insert("includeMetaData".into(), json!(false));
        Self::new(Endpoint::Fetch, Value::Object(body))
    }

    pub fn meta_data(data_provider: &str) -> Self {
        Self::new(Endpoint::MetaData, json!({ "dataProvider": data_provider }))
    }

    pub fn select_row(data_provider: &str, component_id: &str, filter: Value) -> Self {
        Self::new(
            Endpoint::SelectRow,
            json!({ "dataProvider": data_provider, "componentId": component_id, "filter": filter }),
        )
        .for_component(component_id)
    }

    pub fn sort(data_provider: &str, sort: &[thinview_core::SortDefinition]) -> Self {
        Self::new(
            Endpoint::Sort,
            json!({ "dataProvider": data_provider, "sortDefinition": sort }),
        )
    }
}
