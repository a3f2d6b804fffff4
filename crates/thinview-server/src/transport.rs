//! Transport seam
//!
//! The concrete fetch/WebSocket channel lives outside this crate. A transport
//! takes a resolved URL plus the request and yields the raw response body:
//! a JSON array of responses, or a server error object.

use serde_json::Value;
use url::Url;

use thinview_core::prelude::*;

use crate::request::Request;

/// Request/response channel to the server
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Send `request` to `url` and return the response body.
    ///
    /// Network failures map to [`Error::Transport`]; the pipeline owns
    /// timeouts.
    async fn send(&self, url: Url, request: Request) -> Result<Value>;
}
