//! # thinview-layout - Container layouts
//!
//! Computes child geometry for the four container layouts the server uses:
//! the anchor-constraint [`FormLayout`], plus [`BorderLayout`], [`FlowLayout`]
//! and [`GridLayout`].
//!
//! Layouts never measure widgets themselves; rendered sizes come in through the
//! [`Measure`] trait and "size calculated" reports gathered by the
//! [`LayoutCoordinator`].
//!
//! ## Public API
//!
//! - [`LayoutEngine`]: per-container layout cache and dispatch
//! - [`ContainerLayout`]: one strategy, selected by [`thinview_core::LayoutDescriptor`]
//! - [`LayoutChild`], [`LayoutResult`]: input and output of a pass
//! - [`Measure`], [`FixedMeasure`], [`Chain`]: measurement sources
//! - [`LayoutCoordinator`], [`SizeCalculated`], [`Relayout`]: measurement gating
//! - [`Anchor`], [`AnchorArena`], [`Constraint`]: form layout internals

pub mod anchor;
pub mod border;
pub mod constraint;
pub mod coordinator;
pub mod engine;
pub mod flow;
pub mod form;
pub mod grid;
pub mod measure;

pub use anchor::{Anchor, AnchorArena, AnchorId};
pub use border::{BorderLayout, Region};
pub use constraint::Constraint;
pub use coordinator::{LayoutCoordinator, Relayout, SizeCalculated};
pub use engine::{ContainerLayout, LayoutEngine};
pub use flow::FlowLayout;
pub use form::FormLayout;
pub use grid::{CellConstraint, GridLayout};
pub use measure::{Chain, FixedMeasure, LayoutChild, LayoutResult, Measure, Unmeasured};
