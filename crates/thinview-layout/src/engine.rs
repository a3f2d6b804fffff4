//! Layout dispatch and per-container layout state

use std::collections::HashMap;

use thinview_core::{Component, LayoutDescriptor, Size};

use crate::border::BorderLayout;
use crate::coordinator::{LayoutCoordinator, Relayout, SizeCalculated};
use crate::flow::FlowLayout;
use crate::form::FormLayout;
use crate::grid::GridLayout;
use crate::measure::{Chain, LayoutChild, LayoutResult, Measure};

/// One of the four layout strategies.
#[derive(Debug, Clone)]
pub enum ContainerLayout {
    Form(FormLayout),
    Border(BorderLayout),
    Flow(FlowLayout),
    Grid(GridLayout),
}

impl ContainerLayout {
    pub fn new(descriptor: &LayoutDescriptor, layout_data: &str) -> Self {
        match descriptor {
            LayoutDescriptor::Form(spec) => {
                ContainerLayout::Form(FormLayout::new(*spec, layout_data))
            }
            LayoutDescriptor::Border(spec) => ContainerLayout::Border(BorderLayout::new(*spec)),
            LayoutDescriptor::Flow(spec) => ContainerLayout::Flow(FlowLayout::new(*spec)),
            LayoutDescriptor::Grid(spec) => ContainerLayout::Grid(GridLayout::new(*spec)),
        }
    }

    /// Layout of a container component, `None` without a known layout.
    pub fn from_component(component: &Component, max_iterations: Option<usize>) -> Option<Self> {
        let descriptor = LayoutDescriptor::parse(component.layout.as_deref()?)?;
        let layout_data = component.layout_data.as_deref().unwrap_or_default();
        Some(match Self::new(&descriptor, layout_data) {
            ContainerLayout::Form(form) => ContainerLayout::Form(
                form.with_maximum_size(component.maximum_size)
                    .with_max_iterations(max_iterations),
            ),
            other => other,
        })
    }

    /// Outer `(preferred, minimum)` size.
    pub fn calculate(&mut self, children: &[LayoutChild], measure: &dyn Measure) -> (Size, Size) {
        match self {
            ContainerLayout::Form(l) => l.calculate(children, measure),
            ContainerLayout::Border(l) => l.calculate(children, measure),
            ContainerLayout::Flow(l) => l.calculate(children, measure),
            ContainerLayout::Grid(l) => l.calculate(children, measure),
        }
    }

    pub fn layout(
        &mut self,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> LayoutResult {
        match self {
            ContainerLayout::Form(l) => l.layout(children, measure, allotted),
            ContainerLayout::Border(l) => l.layout(children, measure, allotted),
            ContainerLayout::Flow(l) => l.layout(children, measure, allotted),
            ContainerLayout::Grid(l) => l.layout(children, measure, allotted),
        }
    }

    /// Only form layouts cache between passes.
    pub fn invalidate(&mut self) {
        if let ContainerLayout::Form(l) = self {
            l.invalidate();
        }
    }
}

#[derive(Debug)]
struct Cached {
    layout: String,
    layout_data: String,
    maximum_size: Option<Size>,
    strategy: ContainerLayout,
}

/// Layouts of all containers of a session plus their measurement state.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    cache: HashMap<String, Cached>,
    coordinator: LayoutCoordinator,
    max_iterations: Option<usize>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound on FormLayout auto-size iterations.
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// One-off layout of `children` with a fresh strategy for `descriptor`.
    pub fn layout(
        descriptor: &LayoutDescriptor,
        layout_data: &str,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> LayoutResult {
        ContainerLayout::new(descriptor, layout_data).layout(children, measure, allotted)
    }

    pub fn coordinator(&self) -> &LayoutCoordinator {
        &self.coordinator
    }

    /// Forward a size report. Invalidates the parent's cached layout.
    pub fn report(&mut self, event: SizeCalculated) -> Relayout {
        self.coordinator.report(event)
    }

    /// Whether `container` has every first measurement of its children.
    pub fn is_final(&self, container: &str) -> bool {
        self.coordinator.is_settled(container)
    }

    pub fn invalidate(&mut self, container: &str) {
        self.coordinator.invalidate(container);
    }

    /// Drop cached state of a destroyed component.
    pub fn remove(&mut self, id: &str) {
        self.cache.remove(id);
        self.coordinator.forget(id);
    }

    /// Outer preferred size of `container`. Reported measurements take
    /// precedence over `measure`.
    pub fn preferred_size(
        &mut self,
        container: &Component,
        children: &[LayoutChild],
        measure: &dyn Measure,
    ) -> Option<Size> {
        let strategy = strategy(
            &mut self.cache,
            &mut self.coordinator,
            self.max_iterations,
            container,
        )?;
        let measure = Chain(&self.coordinator, measure);
        Some(strategy.calculate(children, &measure).0)
    }

    /// Lay out `container` inside `allotted`, reusing its cached strategy.
    pub fn layout_container(
        &mut self,
        container: &Component,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> Option<LayoutResult> {
        self.coordinator
            .expect_children(&container.id, children.iter().map(|c| c.id.clone()));
        let strategy = strategy(
            &mut self.cache,
            &mut self.coordinator,
            self.max_iterations,
            container,
        )?;
        let measure = Chain(&self.coordinator, measure);
        Some(strategy.layout(children, &measure, allotted))
    }
}

/// Cached strategy for `container`, rebuilt when its layout properties
/// changed and invalidated when the coordinator marked it.
fn strategy<'a>(
    cache: &'a mut HashMap<String, Cached>,
    coordinator: &mut LayoutCoordinator,
    max_iterations: Option<usize>,
    container: &Component,
) -> Option<&'a mut ContainerLayout> {
    let layout = container.layout.clone()?;
    let layout_data = container.layout_data.clone().unwrap_or_default();

    let stale = match cache.get(&container.id) {
        Some(cached) => {
            cached.layout != layout
                || cached.layout_data != layout_data
                || cached.maximum_size != container.maximum_size
        }
        None => true,
    };
    if stale {
        let Some(strategy) = ContainerLayout::from_component(container, max_iterations) else {
            tracing::debug!("{} has unknown layout {:?}", container.id, layout);
            return None;
        };
        cache.insert(
            container.id.clone(),
            Cached {
                layout,
                layout_data,
                maximum_size: container.maximum_size,
                strategy,
            },
        );
    }

    let invalid = coordinator.take_invalid(&container.id);
    let cached = cache.get_mut(&container.id)?;
    if invalid {
        cached.strategy.invalidate();
    }
    Some(&mut cached.strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{FixedMeasure, Unmeasured};
    use thinview_core::{Bounds, ComponentUpdate};

    const STACKED: &str = "b1,tm,-,a,0;r1,lm,-,a,0;t2,b1,-,-,5;b2,t2,-,a,0;r2,lm,-,a,0";

    fn panel(layout: &str, layout_data: &str) -> Component {
        Component::from_update(
            &ComponentUpdate::new("panel")
                .with_class("Panel")
                .with_layout(layout)
                .with_layout_data(layout_data),
        )
    }

    fn children() -> Vec<LayoutChild> {
        vec![
            LayoutChild::new("first", "tm;lm;b1;r1"),
            LayoutChild::new("second", "t2;lm;b2;r2"),
        ]
    }

    #[test]
    fn test_reported_sizes_drive_form_layout() {
        let mut engine = LayoutEngine::new();
        let panel = panel("FormLayout,10,10,10,10,5,5,1,1", STACKED);

        engine.layout_container(&panel, &children(), &Unmeasured, Size::new(300, 200));
        assert!(!engine.is_final("panel"));

        engine.report(SizeCalculated::new("first", Some("panel"), Size::new(80, 30)));
        assert_eq!(
            engine.report(SizeCalculated::new("second", Some("panel"), Size::new(120, 40))),
            Relayout::Ready("panel".into())
        );
        assert!(engine.is_final("panel"));

        let result = engine
            .layout_container(&panel, &children(), &Unmeasured, Size::new(300, 200))
            .unwrap();
        assert_eq!(result.preferred_size, Size::new(140, 95));
        assert_eq!(result.bounds("second"), Some(Bounds::new(90, 97, 120, 40)));
    }

    #[test]
    fn test_remeasure_invalidates_cached_form() {
        let mut engine = LayoutEngine::new();
        let panel = panel("FormLayout,10,10,10,10,5,5,1,1", STACKED);
        engine.report(SizeCalculated::new("first", Some("panel"), Size::new(80, 30)));
        engine.report(SizeCalculated::new("second", Some("panel"), Size::new(120, 40)));
        assert_eq!(
            engine.preferred_size(&panel, &children(), &Unmeasured),
            Some(Size::new(140, 95))
        );

        engine.report(SizeCalculated::new("second", Some("panel"), Size::new(150, 40)));
        assert_eq!(
            engine.preferred_size(&panel, &children(), &Unmeasured),
            Some(Size::new(170, 95))
        );
    }

    #[test]
    fn test_layout_change_rebuilds_strategy() {
        let mut engine = LayoutEngine::new();
        let measure = FixedMeasure::new().with_fallback(Size::new(20, 10));
        let form = panel("FormLayout,0,0,0,0,0,0", "");
        let border = panel("BorderLayout,0,0,0,0,0,0", "");
        let kids = vec![LayoutChild::new("c", "Center")];

        assert!(engine
            .layout_container(&form, &kids, &measure, Size::new(50, 50))
            .unwrap()
            .children
            .is_empty());
        let result = engine
            .layout_container(&border, &kids, &measure, Size::new(50, 50))
            .unwrap();
        assert_eq!(result.bounds("c"), Some(Bounds::new(0, 0, 50, 50)));
    }

    #[test]
    fn test_unknown_layout_is_none() {
        let mut engine = LayoutEngine::new();
        let panel = panel("NullLayout", "");
        assert!(engine
            .layout_container(&panel, &[], &Unmeasured, Size::new(10, 10))
            .is_none());
    }

    #[test]
    fn test_static_dispatch() {
        let descriptor = LayoutDescriptor::parse("GridLayout,0,0,0,0,10,10,2,2").unwrap();
        let children = vec![LayoutChild::new("a", "0;0;1;1")];
        let result =
            LayoutEngine::layout(&descriptor, "", &children, &Unmeasured, Size::new(200, 200));
        assert_eq!(result.bounds("a"), Some(Bounds::new(0, 0, 95, 95)));
    }
}
