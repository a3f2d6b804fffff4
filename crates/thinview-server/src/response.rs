//! # Server responses
//!
//! A response body is a JSON array of `{ "name": ..., ...payload }` objects.
//! Each entry decodes into one [`ServerResponse`] variant; unknown names are
//! kept as [`ServerResponse::Unknown`] and ignored by the pipeline.
//!
//! A body that is an object carrying `code` is a server-declared error and
//! becomes [`Error::ServerStatus`].

use serde::Deserialize;
use serde_json::Value;

use thinview_core::prelude::*;
use thinview_core::{ComponentUpdate, MetaData, Row};
use thinview_store::{AppMetaData, UserData};

pub mod names {
    pub const APPLICATION_META_DATA: &str = "applicationMetaData";
    pub const USER_DATA: &str = "userData";
    pub const LOGIN: &str = "login";
    pub const GENERIC_SCREEN: &str = "screen.generic";
    pub const DESKTOP_SCREEN: &str = "screen.desktop";
    pub const CLOSE_SCREEN: &str = "closeScreen";
    pub const FETCH: &str = "dal.fetch";
    pub const META_DATA: &str = "dal.metaData";
    pub const DATA_PROVIDER_CHANGED: &str = "dal.dataProviderChanged";
    pub const ERROR: &str = "error";
    pub const SESSION_EXPIRED: &str = "session.expired";
    pub const INFORMATION: &str = "message.information";
    pub const MESSAGE_ERROR: &str = "message.error";
}

/// `screen.generic` / `screen.desktop` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericScreen {
    #[serde(default)]
    pub component_id: String,
    /// Update of an already open screen rather than a screen open.
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub home: bool,
    #[serde(default)]
    pub changed_components: Vec<ComponentUpdate>,
}

/// `dal.fetch` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub data_provider: String,
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub records: Vec<Vec<Value>>,
    #[serde(default)]
    pub from: usize,
    #[serde(default)]
    pub to: Option<usize>,
    #[serde(default)]
    pub is_all_fetched: bool,
    #[serde(default)]
    pub selected_row: Option<i64>,
    #[serde(default)]
    pub selected_column: Option<String>,
    #[serde(default)]
    pub master_row: Option<Row>,
    #[serde(default)]
    pub tree_path: Option<Vec<i64>>,
    /// Drop the page before patching.
    #[serde(default)]
    pub clear: bool,
}

impl FetchResponse {
    pub fn rows(&self) -> Vec<Row> {
        self.records
            .iter()
            .map(|record| thinview_core::row_from_record(&self.column_names, record))
            .collect()
    }
}

/// `dal.dataProviderChanged` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProviderChanged {
    pub data_provider: String,
    /// `-1` reloads everything, `n` reloads row `n`.
    #[serde(default)]
    pub reload: Option<i64>,
    #[serde(default)]
    pub selected_row: Option<i64>,
    #[serde(default)]
    pub selected_column: Option<String>,
    #[serde(default)]
    pub changed_column_names: Option<Vec<String>>,
    #[serde(default)]
    pub changed_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// `error`, `message.error` and `message.information` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerResponse {
    ApplicationMetaData(AppMetaData),
    UserData(UserData),
    Login(LoginResponse),
    GenericScreen(GenericScreen),
    DesktopScreen(GenericScreen),
    CloseScreen { component_id: String },
    Fetch(FetchResponse),
    MetaData(MetaData),
    DataProviderChanged(DataProviderChanged),
    Error(MessageResponse),
    SessionExpired,
    Information(MessageResponse),
    MessageError(MessageResponse),
    Unknown { name: String, payload: Value },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloseScreenPayload {
    component_id: String,
}

impl ServerResponse {
    /// Decode one response object.
    pub fn decode(value: Value) -> Result<Self> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("response without a name"))?
            .to_string();

        let response = match name.as_str() {
            names::APPLICATION_META_DATA => {
                ServerResponse::ApplicationMetaData(serde_json::from_value(value)?)
            }
            names::USER_DATA => ServerResponse::UserData(serde_json::from_value(value)?),
            names::LOGIN => ServerResponse::Login(serde_json::from_value(value)?),
            names::GENERIC_SCREEN => ServerResponse::GenericScreen(serde_json::from_value(value)?),
            names::DESKTOP_SCREEN => ServerResponse::DesktopScreen(serde_json::from_value(value)?),
            names::CLOSE_SCREEN => {
                let payload: CloseScreenPayload = serde_json::from_value(value)?;
                ServerResponse::CloseScreen {
                    component_id: payload.component_id,
                }
            }
            names::FETCH => ServerResponse::Fetch(serde_json::from_value(value)?),
            names::META_DATA => ServerResponse::MetaData(serde_json::from_value(value)?),
            names::DATA_PROVIDER_CHANGED => {
                ServerResponse::DataProviderChanged(serde_json::from_value(value)?)
            }
            names::ERROR => ServerResponse::Error(serde_json::from_value(value)?),
            names::SESSION_EXPIRED => ServerResponse::SessionExpired,
            names::INFORMATION => ServerResponse::Information(serde_json::from_value(value)?),
            names::MESSAGE_ERROR => ServerResponse::MessageError(serde_json::from_value(value)?),
            _ => ServerResponse::Unknown {
                name,
                payload: value,
            },
        };
        Ok(response)
    }

    pub fn name(&self) -> &str {
        match self {
            ServerResponse::ApplicationMetaData(_) => names::APPLICATION_META_DATA,
            ServerResponse::UserData(_) => names::USER_DATA,
            ServerResponse::Login(_) => names::LOGIN,
            ServerResponse::GenericScreen(_) => names::GENERIC_SCREEN,
            ServerResponse::DesktopScreen(_) => names::DESKTOP_SCREEN,
            ServerResponse::CloseScreen { .. } => names::CLOSE_SCREEN,
            ServerResponse::Fetch(_) => names::FETCH,
            ServerResponse::MetaData(_) => names::META_DATA,
            ServerResponse::DataProviderChanged(_) => names::DATA_PROVIDER_CHANGED,
            ServerResponse::Error(_) => names::ERROR,
            ServerResponse::SessionExpired => names::SESSION_EXPIRED,
            ServerResponse::Information(_) => names::INFORMATION,
            ServerResponse::MessageError(_) => names::MESSAGE_ERROR,
            ServerResponse::Unknown { name, .. } => name,
        }
    }
}

/// Reject server-declared error bodies.
pub fn check_status(body: &Value) -> Result<()> {
    let Some(object) = body.as_object() else {
        return Ok(());
    };
    let Some(code) = object.get("code").and_then(Value::as_u64) else {
        return Ok(());
    };
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Err(Error::server_status(
        u16::try_from(code).unwrap_or(u16::MAX),
        text("reason"),
        text("description"),
    ))
}

/// Decode a whole response body.
///
/// A non-array body is a protocol error. Entries that fail to decode are
/// logged and skipped so one bad response never drops the rest of a batch.
pub fn decode_batch(body: Value) -> Result<Vec<ServerResponse>> {
    check_status(&body)?;
    let Value::Array(entries) = body else {
        return Err(Error::protocol("response body is not an array"));
    };

    let mut responses = Vec::with_capacity(entries.len());
    for entry in entries {
        match ServerResponse::decode(entry) {
            Ok(response) => responses.push(response),
            Err(e) => warn!("Skipping malformed response: {}", e),
        }
    }
    Ok(responses)
}

/// Move `dal.dataProviderChanged` responses to the front, keeping relative order.
pub fn reorder(responses: Vec<ServerResponse>) -> Vec<ServerResponse> {
    let (mut changed, rest): (Vec<_>, Vec<_>) = responses
        .into_iter()
        .partition(|r| matches!(r, ServerResponse::DataProviderChanged(_)));
    changed.extend(rest);
    changed
}
