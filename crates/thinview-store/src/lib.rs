//! # thinview-store - Session state
//!
//! The [`ContentStore`] owns everything the server has told the client: the
//! component trees, one [`DataBook`] per screen and data provider, and the
//! application/user session values. Changes are published to subscribers
//! registered with the store's [`SubscriptionManager`].
//!
//! ## Public API
//!
//! - [`ContentStore`]: component trees, data books, app state
//! - [`ContentChanges`], [`Tree`], [`BookKey`]: results and addressing
//! - [`DataBook`]: paged rows, selection, sort and metadata of one provider
//! - [`SubscriptionManager`], [`Subscription`], [`Topic`], [`StoreEvent`]
//! - [`AppState`], [`AppMetaData`], [`UserData`]
//!
//! Subscriber callbacks run synchronously inside the store call that
//! published them. They must not call back into a store held behind a lock
//! by the caller.

pub mod content_store;
pub mod data_book;
pub mod state;
pub mod subscription;

pub use content_store::{center_id, main_id, BookKey, ContentChanges, ContentStore, Tree};
pub use data_book::DataBook;
pub use state::{AppMetaData, AppState, UserData};
pub use subscription::{StoreEvent, Subscription, SubscriptionManager, Topic, ROOT};
