//! # FormLayout
//!
//! Spring-and-strut anchor solver. Every container edge and every child edge
//! is an [`Anchor`]; layout data lists the anchors as
//! `name,related|-,unused,a|-,position` separated by `;`, and each child names
//! its four edge anchors in its constraint string.
//!
//! A pass runs in order:
//!
//! 1. parse anchors and constraints
//! 2. seed auto-size anchors
//! 3. resolve auto-size anchors from the children's preferred sizes
//! 4. derive the container's preferred and minimum size
//! 5. position the border anchors against the allotted size and resolve
//!    relative anchors
//! 6. read child bounds off the anchors
//!
//! Steps 1-4 are cached until [`FormLayout::invalidate`] (or a different child
//! list) forces a rebuild. Steps 5-6 run on a copy of the solved anchors for
//! every allotted size.

use std::collections::BTreeMap;

use thinview_core::{Alignment, Bounds, FormLayoutSpec, Size};

use crate::anchor::{Anchor, AnchorArena, AnchorDescriptor, AnchorId};
use crate::constraint::Constraint;
use crate::measure::{LayoutChild, LayoutResult, Measure};


#[derive(Debug, Clone, Copy)]
struct Borders {
    l: AnchorId,
    r: AnchorId,
    t: AnchorId,
    b: AnchorId,
    lm: AnchorId,
    rm: AnchorId,
    tm: AnchorId,
    bm: AnchorId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BorderUse {
    left: bool,
    right: bool,
    top: bool,
    bottom: bool,
}

/// One visible child with a resolved constraint.
#[derive(Debug, Clone)]
struct Placed {
    child: usize,
    constraint: Constraint,
    preferred: Size,
    minimum: Size,
}

/// Anchor-constraint layout of one container.
#[derive(Debug, Clone)]
pub struct FormLayout {
    spec: FormLayoutSpec,
    layout_data: String,
    maximum_size: Option<Size>,
    max_iterations: Option<usize>,

    solved: AnchorArena,
    placed: Option<AnchorArena>,
    borders: Borders,
    constraints: Vec<Placed>,
    child_ids: Vec<String>,
    used: BorderUse,
    preferred: Size,
    minimum: Size,
    iterations: usize,
    valid: bool,
}

impl FormLayout {
    pub fn new(spec: FormLayoutSpec, layout_data: impl Into<String>) -> Self {
        let (solved, borders) = border_anchors(&spec);
        Self {
            spec,
            layout_data: layout_data.into(),
            maximum_size: None,
            max_iterations: None,
            solved,
            placed: None,
            borders,
            constraints: Vec::new(),
            child_ids: Vec::new(),
            used: BorderUse::default(),
            preferred: Size::ZERO,
            minimum: Size::ZERO,
            iterations: 0,
            valid: false,
        }
    }

    /// Maximum size of the container itself.
    pub fn with_maximum_size(mut self, maximum: Option<Size>) -> Self {
        self.maximum_size = maximum;
        self
    }

    /// Bound on auto-size iterations. `None` uses the anchor count plus one.
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Outer preferred size of the last solved pass.
    pub fn preferred_size(&self) -> Size {
        self.preferred
    }

    pub fn minimum_size(&self) -> Size {
        self.minimum
    }

    /// Preferred size without the layout margins.
    pub fn inner_size(&self) -> Size {
        let m = self.spec.margins;
        Size::new(
            (self.preferred.width - m.horizontal()).max(0),
            (self.preferred.height - m.vertical()).max(0),
        )
    }

    /// Auto-size iterations used by the last solved pass.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Anchors after the last target pass, or the solved anchors before one.
    pub fn anchors(&self) -> &AnchorArena {
        self.placed.as_ref().unwrap_or(&self.solved)
    }

    pub fn anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors().by_name(name)
    }

    pub fn absolute_position(&self, name: &str) -> Option<i32> {
        let anchors = self.anchors();
        anchors.id(name).map(|id| anchors.absolute_position(id))
    }

    /// Solve anchors and container size, reusing the cached solution while
    /// valid. Returns `(preferred, minimum)`.
    pub fn calculate(&mut self, children: &[LayoutChild], measure: &dyn Measure) -> (Size, Size) {
        let same_children = self.child_ids.len() == children.len()
            && self.child_ids.iter().zip(children).all(|(id, c)| *id == c.id);
        if !self.valid || !same_children {
            self.solve(children, measure);
        }
        (self.preferred, self.minimum)
    }

    /// Lay out `children` inside `allotted`.
    pub fn layout(
        &mut self,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> LayoutResult {
        self.calculate(children, measure);

        let anchors = self.target_dependent_anchors(allotted);
        let mut bounds = BTreeMap::new();
        for placed in &self.constraints {
            let Some(child) = children.get(placed.child) else {
                continue;
            };
            let c = placed.constraint;
            let left = anchors.absolute_position(c.left);
            let top = anchors.absolute_position(c.top);
            let mut width = anchors.absolute_position(c.right) - left;
            let mut height = anchors.absolute_position(c.bottom) - top;
            if child.is_container {
                width = width.min(self.preferred.width);
                height = height.min(self.preferred.height);
            }
            bounds.insert(
                child.id.clone(),
                Bounds::new(left, top, width.max(0), height.max(0)),
            );
        }
        self.placed = Some(anchors);

        LayoutResult {
            preferred_size: self.preferred,
            minimum_size: self.minimum,
            children: bounds,
        }
    }

    fn solve(&mut self, children: &[LayoutChild], measure: &dyn Measure) {
        let (mut anchors, borders) = border_anchors(&self.spec);
        parse_layout_data(&mut anchors, &self.layout_data);

        let mut constraints = Vec::new();
        for (index, child) in children.iter().enumerate().filter(|(_, c)| c.visible) {
            let constraint = Constraint::parse(&child.constraints, &anchors).filter(|c| {
                [c.top, c.left, c.bottom, c.right]
                    .into_iter()
                    .all(|id| anchors.is_rooted(id))
            });
            match constraint {
                Some(constraint) => constraints.push(Placed {
                    child: index,
                    constraint,
                    preferred: child.preferred(measure),
                    minimum: child.minimum(),
                }),
                None => tracing::debug!(
                    "Skipping {} with unresolved constraint {:?}",
                    child.id,
                    child.constraints
                ),
            }
        }

        seed_auto_size(&mut anchors, &constraints);
        let bound = self.max_iterations.unwrap_or(anchors.len() + 1);
        let iterations = resolve_auto_size(&mut anchors, &constraints, bound);
        let (preferred, minimum, used) = container_sizes(
            &anchors,
            &constraints,
            borders,
            self.spec.gaps.horizontal,
            self.spec.gaps.vertical,
        );

        tracing::trace!(
            "FormLayout solved: {} anchors, {} children, {} iterations, preferred {:?}",
            anchors.len(),
            constraints.len(),
            iterations,
            preferred
        );

        self.solved = anchors;
        self.placed = None;
        self.borders = borders;
        self.constraints = constraints;
        self.child_ids = children.iter().map(|c| c.id.clone()).collect();
        self.used = used;
        self.preferred = preferred;
        self.minimum = minimum;
        self.iterations = iterations;
        self.valid = true;
    }

    fn target_dependent_anchors(&self, allotted: Size) -> AnchorArena {
        let mut anchors = self.solved.clone();
        let b = self.borders;
        let maximum = self.maximum_size.unwrap_or(Size::new(i32::MAX, i32::MAX));

        let (left, right) = border_positions(
            self.spec.horizontal_alignment,
            self.used.left && self.used.right,
            self.minimum.width,
            self.preferred.width,
            maximum.width,
            allotted.width,
        );
        anchors.set_position(b.l, left);
        anchors.set_position(b.r, right);

        let (top, bottom) = border_positions(
            self.spec.vertical_alignment,
            self.used.top && self.used.bottom,
            self.minimum.height,
            self.preferred.height,
            maximum.height,
            allotted.height,
        );
        anchors.set_position(b.t, top);
        anchors.set_position(b.b, bottom);

        for placed in &self.constraints {
            let c = placed.constraint;
            calculate_relative_anchor(&mut anchors, c.left, c.right, placed.preferred.width);
            calculate_relative_anchor(&mut anchors, c.top, c.bottom, placed.preferred.height);
        }
        anchors
    }
}

// ============================================================================
// Parse
// ============================================================================

fn border_anchors(spec: &FormLayoutSpec) -> (AnchorArena, Borders) {
    let m = spec.margins;
    let mut anchors = AnchorArena::new();
    let l = anchors.insert(Anchor::new("l", None, 0));
    let r = anchors.insert(Anchor::new("r", None, 0));
    let t = anchors.insert(Anchor::new("t", None, 0));
    let b = anchors.insert(Anchor::new("b", None, 0));
    let lm = anchors.insert(Anchor::new("lm", Some(l), m.left));
    let rm = anchors.insert(Anchor::new("rm", Some(r), -m.right));
    let tm = anchors.insert(Anchor::new("tm", Some(t), m.top));
    let bm = anchors.insert(Anchor::new("bm", Some(b), -m.bottom));
    (
        anchors,
        Borders {
            l,
            r,
            t,
            b,
            lm,
            rm,
            tm,
            bm,
        },
    )
}

/// Insert every descriptor first, then resolve related names, so anchors may
/// reference ones declared later.
fn parse_layout_data(anchors: &mut AnchorArena, layout_data: &str) {
    let descriptors: Vec<AnchorDescriptor<'_>> = layout_data
        .split(';')
        .filter_map(AnchorDescriptor::parse)
        .collect();

    for d in &descriptors {
        let mut anchor = Anchor::new(d.name, None, d.position);
        anchor.auto_size = d.auto_size;
        anchors.insert(anchor);
    }
    for d in &descriptors {
        let Some(id) = anchors.id(d.name) else {
            continue;
        };
        let related = d.related.and_then(|name| {
            let related = anchors.id(name);
            if related.is_none() {
                tracing::debug!("Anchor {} relates to unknown anchor {}", d.name, name);
            }
            related
        });
        anchors.get_mut(id).related = related;
    }
}

// ============================================================================
// Auto-size
// ============================================================================

fn seed_auto_size(anchors: &mut AnchorArena, constraints: &[Placed]) {
    for id in anchors.ids() {
        let anchor = anchors.get_mut(id);
        anchor.auto_size_calculated = false;
        anchor.first_calculation = true;
        anchor.relative = anchor.auto_size;
        if anchor.auto_size {
            anchor.position = 0;
        }
    }

    // Runs between a child's own edges are sized by that child.
    for placed in constraints {
        let c = placed.constraint;
        for (start, end) in [
            (c.left, c.right),
            (c.right, c.left),
            (c.top, c.bottom),
            (c.bottom, c.top),
        ] {
            for id in anchors.auto_size_anchors_between(start, end) {
                anchors.get_mut(id).relative = false;
            }
        }
    }

    for id in anchors.ids() {
        let Some(related) = anchors.get(id).related else {
            continue;
        };
        let related_anchor = anchors.get(related);
        if !related_anchor.auto_size {
            continue;
        }
        let fixed_beyond = related_anchor
            .related
            .map(|beyond| !anchors.get(beyond).auto_size)
            .unwrap_or(false);
        if fixed_beyond {
            let position = -anchors.position(id);
            anchors.set_position(related, position);
        }
    }
}

/// Returns the number of iterations used.
fn resolve_auto_size(anchors: &mut AnchorArena, constraints: &[Placed], bound: usize) -> usize {
    let mut remaining = Some(1usize);
    let mut iterations = 0;

    while let Some(count) = remaining {
        if iterations >= bound {
            tracing::warn!(
                "FormLayout auto-size did not converge after {} iterations",
                iterations
            );
            break;
        }
        iterations += 1;

        for placed in constraints {
            let c = placed.constraint;
            calculate_auto_size(anchors, c.top, c.bottom, placed.preferred.height, count);
            calculate_auto_size(anchors, c.left, c.right, placed.preferred.width, count);
        }

        let mut next: Option<usize> = None;
        for placed in constraints {
            let c = placed.constraint;
            for outstanding in [
                finish_auto_size_calculation(anchors, c.left, c.right),
                finish_auto_size_calculation(anchors, c.top, c.bottom),
            ] {
                if outstanding > 0 {
                    next = Some(next.map_or(outstanding, |n| n.min(outstanding)));
                }
            }
        }
        remaining = next;
    }
    iterations
}

/// Spread `preferred` over the unresolved auto-size run between two edges when
/// the run has exactly `count` anchors.
fn calculate_auto_size(
    anchors: &mut AnchorArena,
    left_top: AnchorId,
    right_bottom: AnchorId,
    preferred: i32,
    count: usize,
) {
    let span = anchors.absolute_position(right_bottom) - anchors.absolute_position(left_top);

    let run = anchors.auto_size_anchors_between(left_top, right_bottom);
    if run.len() == count {
        let fixed = span + run.iter().map(|&id| anchors.position(id)).sum::<i32>();
        let diff = ceil_div(preferred - fixed, count as i32);
        for id in run {
            let anchor = anchors.get_mut(id);
            if diff > -anchor.position {
                anchor.position = -diff;
            }
            anchor.first_calculation = false;
        }
    }

    let run = anchors.auto_size_anchors_between(right_bottom, left_top);
    if run.len() == count {
        let fixed = span - run.iter().map(|&id| anchors.position(id)).sum::<i32>();
        let diff = ceil_div(preferred - fixed, count as i32);
        for id in run {
            let anchor = anchors.get_mut(id);
            if diff > anchor.position {
                anchor.position = diff;
            }
            anchor.first_calculation = false;
        }
    }
}

/// Mark converged anchors of both runs and count the outstanding ones.
fn finish_auto_size_calculation(
    anchors: &mut AnchorArena,
    left_top: AnchorId,
    right_bottom: AnchorId,
) -> usize {
    let mut outstanding = 0;
    for (start, end) in [(left_top, right_bottom), (right_bottom, left_top)] {
        for id in anchors.auto_size_anchors_between(start, end) {
            let anchor = anchors.get_mut(id);
            if anchor.first_calculation {
                outstanding += 1;
            } else {
                anchor.auto_size_calculated = true;
            }
        }
    }
    outstanding
}

fn ceil_div(value: i32, divisor: i32) -> i32 {
    let quotient = value / divisor;
    if value % divisor != 0 && (value > 0) == (divisor > 0) {
        quotient + 1
    } else {
        quotient
    }
}

// ============================================================================
// Container size
// ============================================================================

fn container_sizes(
    anchors: &AnchorArena,
    constraints: &[Placed],
    b: Borders,
    hgap: i32,
    vgap: i32,
) -> (Size, Size, BorderUse) {
    let mut used = BorderUse::default();
    let mut preferred = Size::ZERO;
    let mut minimum = Size::ZERO;
    let (mut left_width, mut right_width) = (0, 0);
    let (mut top_height, mut bottom_height) = (0, 0);

    let abs = |id| anchors.absolute_position(id);
    let border = |id| anchors.border_anchor(id);
    let auto = |id| anchors.get(id).auto_size;

    for placed in constraints {
        let c = placed.constraint;
        let (pref, min) = (placed.preferred, placed.minimum);

        if border(c.right) == b.l {
            left_width = left_width.max(abs(c.right));
            used.left = true;
        }
        if border(c.left) == b.r {
            right_width = right_width.max(-abs(c.left));
            used.right = true;
        }
        if border(c.bottom) == b.t {
            top_height = top_height.max(abs(c.bottom));
            used.top = true;
        }
        if border(c.top) == b.b {
            bottom_height = bottom_height.max(-abs(c.top));
            used.bottom = true;
        }

        if border(c.left) == b.l && border(c.right) == b.r {
            if !auto(c.left) || !auto(c.right) {
                let extent = abs(c.left) - abs(c.right);
                preferred.width = preferred.width.max(extent + pref.width);
                minimum.width = minimum.width.max(extent + min.width);
            }
            used.left = true;
            used.right = true;
        }
        if border(c.top) == b.t && border(c.bottom) == b.b {
            if !auto(c.top) || !auto(c.bottom) {
                let extent = abs(c.top) - abs(c.bottom);
                preferred.height = preferred.height.max(extent + pref.height);
                minimum.height = minimum.height.max(extent + min.height);
            }
            used.top = true;
            used.bottom = true;
        }
    }

    let width = one_sided(
        left_width,
        right_width,
        hgap,
        anchors.position(b.rm),
        anchors.position(b.lm),
    );
    preferred.width = preferred.width.max(width);
    minimum.width = minimum.width.max(width);

    let height = one_sided(
        top_height,
        bottom_height,
        vgap,
        anchors.position(b.bm),
        anchors.position(b.tm),
    );
    preferred.height = preferred.height.max(height);
    minimum.height = minimum.height.max(height);

    (preferred, minimum, used)
}

/// Width of children anchored to a single border, completed with the
/// opposite margin anchor when only one side is used.
fn one_sided(
    start_extent: i32,
    end_extent: i32,
    gap: i32,
    end_margin: i32,
    start_margin: i32,
) -> i32 {
    if start_extent != 0 && end_extent != 0 {
        start_extent + end_extent + gap
    } else if start_extent != 0 {
        start_extent - end_margin
    } else {
        end_extent + start_margin
    }
}

// ============================================================================
// Target pass
// ============================================================================

/// Border anchor positions `(start, end)` along one axis.
fn border_positions(
    alignment: Alignment,
    both_used: bool,
    minimum: i32,
    preferred: i32,
    maximum: i32,
    size: i32,
) -> (i32, i32) {
    if alignment == Alignment::Stretch || both_used {
        if minimum > size {
            (0, minimum)
        } else if maximum < size && alignment != Alignment::Stretch {
            let start = alignment.offset(size, maximum);
            (start, start + maximum)
        } else {
            (0, size)
        }
    } else if preferred > size {
        (0, preferred)
    } else {
        let start = alignment.offset(size, preferred);
        (start, start + preferred)
    }
}

/// Split the slack of a child spanning a relative anchor evenly between the
/// two sides, the larger half going to the anchor already being filled.
fn calculate_relative_anchor(
    anchors: &mut AnchorArena,
    left_top: AnchorId,
    right_bottom: AnchorId,
    preferred: i32,
) {
    if anchors.get(right_bottom).relative {
        let relative = anchors.relative_anchor(right_bottom);
        if relative == left_top {
            return;
        }
        let pref = anchors.absolute_position(relative) - anchors.absolute_position(right_bottom)
            + preferred;
        let size = match (anchors.get(relative).related, anchors.get(left_top).related) {
            (Some(a), Some(b)) => anchors.absolute_position(a) - anchors.absolute_position(b),
            _ => 0,
        };

        // A fixed opposite edge takes no share of the slack.
        let shared = anchors.get(left_top).auto_size;
        let slack = pref - size;
        let pos = match (shared, slack < 0) {
            (false, _) => slack,
            (true, true) => slack / 2,
            (true, false) => slack - slack / 2,
        };
        let anchor = anchors.get_mut(relative);
        if anchor.first_calculation || pos > anchor.position {
            anchor.first_calculation = false;
            anchor.position = pos;
        }
        if shared {
            let pos = slack - pos;
            let anchor = anchors.get_mut(left_top);
            if anchor.first_calculation || pos > -anchor.position {
                anchor.first_calculation = false;
                anchor.position = -pos;
            }
        }
    } else if anchors.get(left_top).relative {
        let relative = anchors.relative_anchor(left_top);
        if relative == right_bottom {
            return;
        }
        let pref = anchors.absolute_position(left_top) - anchors.absolute_position(relative)
            + preferred;
        let size = match (anchors.get(right_bottom).related, anchors.get(relative).related) {
            (Some(a), Some(b)) => anchors.absolute_position(a) - anchors.absolute_position(b),
            _ => 0,
        };

        let shared = anchors.get(right_bottom).auto_size;
        let slack = size - pref;
        let pos = match (shared, slack < 0) {
            (false, _) => slack,
            (true, true) => slack - slack / 2,
            (true, false) => slack / 2,
        };
        let anchor = anchors.get_mut(relative);
        if anchor.first_calculation || pos < anchor.position {
            anchor.first_calculation = false;
            anchor.position = pos;
        }
        if shared {
            let pos = slack - pos;
            let anchor = anchors.get_mut(right_bottom);
            if anchor.first_calculation || pos > -anchor.position {
                anchor.first_calculation = false;
                anchor.position = -pos;
            }
        }
    }
}
