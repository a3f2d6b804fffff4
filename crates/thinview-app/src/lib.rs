//! # thinview-app - Application layer
//!
//! Settings, a transport that replays recorded sessions, and the headless
//! runner behind the `thinview` binary.
//!
//! ## Public API
//!
//! ### Configuration (`config`)
//! - [`Settings`] - `.thinview/config.toml` sections
//! - [`load_settings()`], [`init_config_dir()`]
//!
//! ### Replay (`replay`)
//! - [`ReplayTransport`] - answers requests from a recorded JSON file
//!
//! ### Headless (`runner`)
//! - [`run_headless()`] - replay a session and print the active screen layout
//! - [`run_session()`] - the same over any transport, without printing
//! - [`LayoutReport`], [`LayoutNode`]

pub mod config;
pub mod replay;
pub mod runner;

pub use config::{
    init_config_dir, load_settings, LayoutSettings, ServerSettings, SessionSettings, Settings,
};
pub use replay::{Exchange, ReplayTransport};
pub use runner::{run_headless, run_session, LayoutNode, LayoutReport};
