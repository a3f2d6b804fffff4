//! Application-wide session state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `applicationMetaData` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetaData {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub lang_code: Option<String>,
    #[serde(default)]
    pub application_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `userData` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub e_mail: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub meta_data: Option<AppMetaData>,
    pub user_data: Option<UserData>,
}

impl AppState {
    pub fn client_id(&self) -> Option<&str> {
        self.meta_data
            .as_ref()
            .map(|m| m.client_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_data.is_some()
    }
}
