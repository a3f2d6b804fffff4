//! Test utilities for the server pipeline
//!
//! [`RecordingTransport`] answers requests from scripted replies and records
//! every call with its start and end time.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use url::Url;

use thinview_core::prelude::*;

use crate::request::{Endpoint, Request};
use crate::transport::Transport;

/// One observed transport call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: Url,
    pub request: Request,
    pub started: Instant,
    /// `None` while in flight, or when the caller gave up (timeout).
    pub finished: Option<Instant>,
}

#[derive(Debug)]
enum Reply {
    Body(Value),
    Fail(String),
}

#[derive(Debug, Default)]
struct State {
    replies: HashMap<Endpoint, VecDeque<(Duration, Reply)>>,
    calls: Vec<RecordedCall>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Scripted transport. Clones share their script and call log.
///
/// Endpoints without a scripted reply answer with an empty batch.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<State>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, endpoint: Endpoint, delay: Duration, reply: Reply) -> &Self {
        self.state()
            .replies
            .entry(endpoint)
            .or_default()
            .push_back((delay, reply));
        self
    }

    /// Answer the next `endpoint` call with `body`.
    pub fn reply(&self, endpoint: Endpoint, body: Value) -> &Self {
        self.push(endpoint, Duration::ZERO, Reply::Body(body))
    }

    /// Answer the next `endpoint` call with `body` after `delay`.
    pub fn reply_after(&self, endpoint: Endpoint, delay: Duration, body: Value) -> &Self {
        self.push(endpoint, delay, Reply::Body(body))
    }

    /// Fail the next `endpoint` call with a transport error.
    pub fn fail(&self, endpoint: Endpoint, message: &str) -> &Self {
        self.push(endpoint, Duration::ZERO, Reply::Fail(message.to_string()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.state().calls.iter().map(|c| c.request.endpoint).collect()
    }

    /// Highest number of calls that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, url: Url, request: Request) -> Result<Value> {
        let (index, delay, reply) = {
            let mut state = self.state();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let (delay, reply) = state
                .replies
                .get_mut(&request.endpoint)
                .and_then(VecDeque::pop_front)
                .unwrap_or((Duration::ZERO, Reply::Body(json!([]))));
            state.calls.push(RecordedCall {
                url,
                request,
                started: Instant::now(),
                finished: None,
            });
            (state.calls.len() - 1, delay, reply)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        {
            let mut state = self.state();
            state.in_flight -= 1;
            state.calls[index].finished = Some(Instant::now());
        }

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Fail(message) => Err(Error::transport(message)),
        }
    }
}
