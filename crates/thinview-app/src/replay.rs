//! Recorded-session transport
//!
//! A replay file is a JSON array of exchanges:
//!
//! ```json
//! [
//!   { "request": "startup", "responses": [ { "name": "applicationMetaData", ... } ] },
//!   { "request": "fetch",   "responses": [ { "name": "dal.fetch", ... } ] }
//! ]
//! ```
//!
//! Each request consumes the first unused exchange recorded for its endpoint,
//! so exchanges of one endpoint are answered in file order. `responses` is
//! returned verbatim and may also be a server error object.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use thinview_core::prelude::*;
use thinview_server::{Endpoint, Request, Transport};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Exchange {
    pub request: Endpoint,
    pub responses: Value,
}

#[derive(Debug, Default)]
pub struct ReplayTransport {
    exchanges: Mutex<VecDeque<Exchange>>,
}

impl ReplayTransport {
    pub fn new(exchanges: impl IntoIterator<Item = Exchange>) -> Self {
        Self {
            exchanges: Mutex::new(exchanges.into_iter().collect()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let exchanges: Vec<Exchange> = serde_json::from_str(content)
            .map_err(|e| Error::replay(format!("Invalid replay file: {}", e)))?;
        Ok(Self::new(exchanges))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let transport = Self::from_json(&content)?;
        info!(
            "Loaded {} recorded exchanges from {}",
            transport.remaining(),
            path.display()
        );
        Ok(transport)
    }

    /// Exchanges not consumed yet.
    pub fn remaining(&self) -> usize {
        self.exchanges().len()
    }

    fn exchanges(&self) -> MutexGuard<'_, VecDeque<Exchange>> {
        self.exchanges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, endpoint: Endpoint) -> Option<Value> {
        let mut exchanges = self.exchanges();
        let index = exchanges.iter().position(|e| e.request == endpoint)?;
        exchanges.remove(index).map(|e| e.responses)
    }
}

impl Transport for ReplayTransport {
    async fn send(&self, url: Url, request: Request) -> Result<Value> {
        match self.take(request.endpoint) {
            Some(responses) => {
                debug!("Replaying {} for {}", request.description(), url);
                Ok(responses)
            }
            None => {
                warn!(
                    "No recorded exchange left for {}, answering with an empty batch",
                    request.description()
                );
                Ok(json!([]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn url() -> Url {
        Url::parse("http://localhost/api/").unwrap()
    }

    #[tokio::test]
    async fn test_exchanges_answer_per_endpoint_in_order() {
        let transport = ReplayTransport::from_json(
            r#"[
                {"request": "fetch", "responses": [{"name": "dal.fetch", "n": 1}]},
                {"request": "startup", "responses": [{"name": "applicationMetaData"}]},
                {"request": "fetch", "responses": [{"name": "dal.fetch", "n": 2}]}
            ]"#,
        )
        .unwrap();

        let first = transport
            .send(url(), Request::fetch("Fir/people", 0, None))
            .await
            .unwrap();
        let startup = transport
            .send(url(), Request::startup("demo", None))
            .await
            .unwrap();
        let second = transport
            .send(url(), Request::fetch("Fir/people", 0, None))
            .await
            .unwrap();

        assert_eq!(first[0]["n"], 1);
        assert_eq!(startup[0]["name"], "applicationMetaData");
        assert_eq!(second[0]["n"], 2);
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_unrecorded_request_gets_empty_batch() {
        let transport = ReplayTransport::default();
        let body = transport
            .send(url(), Request::logout())
            .await
            .unwrap();
        assert_eq!(body, json!([]));
    }

    #[test]
    fn test_unknown_endpoint_is_rejected() {
        let err = ReplayTransport::from_json(r#"[{"request": "teleport", "responses": []}]"#)
            .unwrap_err();
        assert!(matches!(err, Error::Replay { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"request": "uiRefresh", "responses": []}}]"#).unwrap();

        let transport = ReplayTransport::load(file.path()).unwrap();
        assert_eq!(transport.remaining(), 1);
        assert!(ReplayTransport::load(Path::new("/nonexistent/replay.json")).is_err());
    }
}
