//! Events the pipeline raises for the embedding client.

use crate::request::Request;

/// Navigation target chosen once per response batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Show the screen with this navigation name.
    Screen(String),
    Home,
    Login { mode: Option<String> },
}

/// User-facing dialog. Carries the failed request when it may be resent.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub retry: Option<Request>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Information,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Navigate(Route),
    Dialog(Dialog),
    Message { kind: MessageKind, text: String },
    /// The store was reset; startup must be re-run.
    SessionExpired,
}
