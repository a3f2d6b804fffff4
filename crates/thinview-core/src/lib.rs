//! # thinview-core - Core Domain Types
//!
//! Foundation crate for thinview. Provides geometry primitives, layout
//! descriptors, the component model, data-provider types, error handling and
//! the logging bootstrap.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Geometry (`geometry`)
//! - [`Size`], [`Margins`], [`Gaps`], [`GridSize`], [`Bounds`] - pixel value objects
//! - [`Orientation`], [`Alignment`] - protocol enumerations
//!
//! ### Layout Descriptors (`layout`)
//! - [`LayoutDescriptor`] - parsed `layout` property of a container
//!
//! ### Components (`component`)
//! - [`Component`] - a tracked server component
//! - [`ComponentKind`] - variant payload per `className`
//! - [`ComponentUpdate`] - partial update from a server response
//!
//! ### Data (`data`)
//! - [`Row`], [`MetaData`], [`SelectedRow`], [`SortDefinition`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use thinview_core::prelude::*;
//! ```

pub mod component;
pub mod data;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod prelude;

// Re-export commonly used types at crate root for convenience
pub use component::{
    ChangeSet, Component, ComponentKind, ComponentUpdate, DataBinding, ScreenInfo, ToolBarArea,
};
pub use data::{
    owner_screen, row_from_record, ColumnDefinition, MasterReference, MetaData, Row, SelectedRow,
    SortDefinition, SortMode, CURRENT_PAGE,
};
pub use error::{Error, Result, ResultExt};
pub use geometry::{parse_int, Alignment, Bounds, Gaps, GridSize, Margins, Orientation, Size};
pub use layout::{
    BorderLayoutSpec, FlowLayoutSpec, FormLayoutSpec, GridLayoutSpec, LayoutDescriptor,
};
