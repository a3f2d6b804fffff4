//! Measurement seam between layouts and rendered children
//!
//! Layouts never size widgets themselves. They ask a [`Measure`] for each
//! child's rendered preferred size, then apply the server-given size
//! properties on top.

use std::collections::BTreeMap;

use serde::Serialize;
use thinview_core::{Bounds, Component, Size};

/// Source of rendered preferred sizes.
#[cfg_attr(test, mockall::automock)]
pub trait Measure {
    /// Preferred size of `id` as rendered, `None` if not measured yet.
    fn preferred_size(&self, id: &str) -> Option<Size>;
}

impl<M: Measure + ?Sized> Measure for &M {
    fn preferred_size(&self, id: &str) -> Option<Size> {
        (**self).preferred_size(id)
    }
}

/// Measure that knows nothing; every child is unmeasured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmeasured;

impl Measure for Unmeasured {
    fn preferred_size(&self, _id: &str) -> Option<Size> {
        None
    }
}

/// Fixed per-id sizes, used by the headless runner and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedMeasure {
    sizes: BTreeMap<String, Size>,
    fallback: Option<Size>,
}

impl FixedMeasure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size reported for ids without an explicit entry.
    pub fn with_fallback(mut self, size: Size) -> Self {
        self.fallback = Some(size);
        self
    }

    pub fn with(mut self, id: impl Into<String>, size: Size) -> Self {
        self.sizes.insert(id.into(), size);
        self
    }

    pub fn set(&mut self, id: impl Into<String>, size: Size) {
        self.sizes.insert(id.into(), size);
    }
}

impl Measure for FixedMeasure {
    fn preferred_size(&self, id: &str) -> Option<Size> {
        self.sizes.get(id).copied().or(self.fallback)
    }
}

/// First measure that knows the child wins.
#[derive(Debug, Clone, Copy)]
pub struct Chain<A, B>(pub A, pub B);

impl<A: Measure, B: Measure> Measure for Chain<A, B> {
    fn preferred_size(&self, id: &str) -> Option<Size> {
        self.0.preferred_size(id).or_else(|| self.1.preferred_size(id))
    }
}

// ============================================================================
// LayoutChild / LayoutResult
// ============================================================================

/// Layout-relevant view of one child component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutChild {
    pub id: String,
    pub constraints: String,
    pub visible: bool,
    pub is_container: bool,
    pub preferred_size: Option<Size>,
    pub minimum_size: Option<Size>,
    pub maximum_size: Option<Size>,
}

impl LayoutChild {
    pub fn new(id: impl Into<String>, constraints: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            constraints: constraints.into(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn with_preferred_size(mut self, size: Size) -> Self {
        self.preferred_size = Some(size);
        self
    }

    pub fn with_minimum_size(mut self, size: Size) -> Self {
        self.minimum_size = Some(size);
        self
    }

    pub fn with_maximum_size(mut self, size: Size) -> Self {
        self.maximum_size = Some(size);
        self
    }

    pub fn container(mut self) -> Self {
        self.is_container = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Effective preferred size: the server-given property, else the rendered
    /// measurement, clamped by the minimum and maximum properties.
    pub fn preferred(&self, measure: &dyn Measure) -> Size {
        let base = self
            .preferred_size
            .or_else(|| measure.preferred_size(&self.id))
            .unwrap_or_default();
        Size::clamped(base, self.minimum_size, self.maximum_size)
    }

    pub fn minimum(&self) -> Size {
        self.minimum_size.unwrap_or_default()
    }
}

impl From<&Component> for LayoutChild {
    fn from(component: &Component) -> Self {
        Self {
            id: component.id.clone(),
            constraints: component.constraints.clone().unwrap_or_default(),
            visible: component.visible,
            is_container: component.is_container(),
            preferred_size: component.preferred_size,
            minimum_size: component.minimum_size,
            maximum_size: component.maximum_size,
        }
    }
}

/// Sizes and child bounds produced by one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    /// Outer preferred size, margins included.
    pub preferred_size: Size,
    pub minimum_size: Size,
    /// Child bounds relative to the container's top left corner.
    pub children: BTreeMap<String, Bounds>,
}

impl LayoutResult {
    pub fn bounds(&self, id: &str) -> Option<Bounds> {
        self.children.get(id).copied()
    }
}
