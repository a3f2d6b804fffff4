//! # thinview-server - Request/response pipeline
//!
//! Connects the client to the server through a [`Transport`] and applies
//! response batches to a shared [`thinview_store::ContentStore`].
//!
//! ## Public API
//!
//! ### Pipeline
//! - [`Server`] - queue worker, immediate requests, timeouts, retry
//! - [`ServerConfig`], [`SharedStore`], [`BatchOutcome`]
//! - [`decide_route()`] - one navigation decision per batch
//!
//! ### Envelopes
//! - [`Request`], [`RequestMode`], [`Endpoint`] - outbound requests
//! - [`ServerResponse`], [`decode_batch()`] - inbound responses
//!
//! ### Events and session
//! - [`ClientEvent`], [`Route`], [`Dialog`] - raised for the embedding client
//! - [`SessionFile`] - persisted client id
//!
//! ### Transport
//! - [`Transport`] / [`LocalTransport`] - request/response channel seam

pub mod events;
pub mod request;
pub mod response;
pub mod server;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod transport;

pub use events::{ClientEvent, Dialog, MessageKind, Route};
pub use request::{next_request_id, Endpoint, Request, RequestMode};
pub use response::{check_status, decode_batch, reorder, ServerResponse};
pub use server::{
    decide_route, lock_store, BatchOutcome, Server, ServerConfig, SharedStore,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use session::SessionFile;
pub use transport::{LocalTransport, Transport};
