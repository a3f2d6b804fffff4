//! FlowLayout
//!
//! Children flow in declaration order along the main axis, wrapping into new
//! lines when `auto_wrap` is set. Every child keeps its preferred size and
//! gets half a gap on each side, so neighbours end up one full gap apart.
//!
//! The computation runs in main/cross coordinates and is mapped back to
//! left/top/width/height at the end, so both orientations share one path.

use std::collections::BTreeMap;

use thinview_core::{Alignment, Bounds, FlowLayoutSpec, Orientation, Size};

use crate::measure::{LayoutChild, LayoutResult, Measure};

#[derive(Debug, Clone)]
pub struct FlowLayout {
    spec: FlowLayoutSpec,
}

#[derive(Debug, Default)]
struct Line {
    items: Vec<usize>,
    /// Sum of item extents plus one gap per item.
    main: i32,
    /// Largest item extent plus one gap.
    cross: i32,
}

impl FlowLayout {
    pub fn new(spec: FlowLayoutSpec) -> Self {
        Self { spec }
    }

    fn main(&self, size: Size) -> i32 {
        match self.spec.orientation {
            Orientation::Horizontal => size.width,
            Orientation::Vertical => size.height,
        }
    }

    fn cross(&self, size: Size) -> i32 {
        match self.spec.orientation {
            Orientation::Horizontal => size.height,
            Orientation::Vertical => size.width,
        }
    }

    /// `(main, cross)` back to a size.
    fn size(&self, main: i32, cross: i32) -> Size {
        match self.spec.orientation {
            Orientation::Horizontal => Size::new(main, cross),
            Orientation::Vertical => Size::new(cross, main),
        }
    }

    fn gaps(&self) -> (i32, i32) {
        let g = self.spec.gaps;
        match self.spec.orientation {
            Orientation::Horizontal => (g.horizontal, g.vertical),
            Orientation::Vertical => (g.vertical, g.horizontal),
        }
    }

    /// Alignment along the main axis and of the line block on the cross axis.
    fn alignments(&self) -> (Alignment, Alignment) {
        match self.spec.orientation {
            Orientation::Horizontal => {
                (self.spec.horizontal_alignment, self.spec.vertical_alignment)
            }
            Orientation::Vertical => {
                (self.spec.vertical_alignment, self.spec.horizontal_alignment)
            }
        }
    }

    fn margins(&self) -> (i32, i32, Size) {
        let m = self.spec.margins;
        let start = match self.spec.orientation {
            Orientation::Horizontal => (m.left, m.top),
            Orientation::Vertical => (m.top, m.left),
        };
        (start.0, start.1, Size::new(m.horizontal(), m.vertical()))
    }

    /// Outer `(preferred, minimum)` size of a single unwrapped line.
    pub fn calculate(&self, children: &[LayoutChild], measure: &dyn Measure) -> (Size, Size) {
        let visible: Vec<&LayoutChild> = children.iter().filter(|c| c.visible).collect();
        let preferred = self.line_size(visible.iter().map(|c| c.preferred(measure)));
        let minimum = self.line_size(visible.iter().map(|c| c.minimum()));
        (preferred, minimum)
    }

    fn line_size(&self, sizes: impl Iterator<Item = Size>) -> Size {
        let (main_gap, cross_gap) = self.gaps();
        let (mut main, mut cross) = (0, 0);
        for size in sizes {
            main += self.main(size) + main_gap;
            cross = cross.max(self.cross(size) + cross_gap);
        }
        let (_, _, margins) = self.margins();
        let size = self.size(main, cross);
        Size::new(size.width + margins.width, size.height + margins.height)
    }

    pub fn layout(
        &self,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> LayoutResult {
        let (preferred_size, minimum_size) = self.calculate(children, measure);
        let visible: Vec<(&LayoutChild, Size)> = children
            .iter()
            .filter(|c| c.visible)
            .map(|c| (c, c.preferred(measure)))
            .collect();

        let (main_gap, cross_gap) = self.gaps();
        let (main_align, content_align) = self.alignments();
        let item_align = self.spec.component_alignment;
        let (main_margin, cross_margin, margins) = self.margins();
        let inner = Size::new(
            (allotted.width - margins.width).max(0),
            (allotted.height - margins.height).max(0),
        );
        let (main_available, cross_available) = (self.main(inner), self.cross(inner));

        let mut lines: Vec<Line> = Vec::new();
        for (index, (_, size)) in visible.iter().enumerate() {
            let extent = self.main(*size) + main_gap;
            let wrap = match lines.last() {
                None => true,
                Some(line) => {
                    self.spec.auto_wrap
                        && !line.items.is_empty()
                        && line.main + extent > main_available
                }
            };
            if wrap {
                lines.push(Line::default());
            }
            if let Some(line) = lines.last_mut() {
                line.items.push(index);
                line.main += extent;
                line.cross = line.cross.max(self.cross(*size) + cross_gap);
            }
        }

        let content_cross: i32 = lines.iter().map(|l| l.cross).sum();
        let cross_slack = cross_available - content_cross;
        let (mut cursor_cross, line_grow) = distribute(content_align, cross_slack, lines.len());

        let mut bounds = BTreeMap::new();
        for line in &lines {
            let line_cross = line.cross + line_grow;
            let (mut cursor_main, item_grow) =
                distribute(main_align, main_available - line.main, line.items.len());

            for &index in &line.items {
                let (child, size) = visible[index];
                let item_main = self.main(size) + item_grow;
                let room = line_cross - cross_gap;
                let item_cross = match item_align {
                    Alignment::Stretch => room,
                    _ => self.cross(size),
                };
                let offset = item_align.offset(room, item_cross);

                let main_pos = main_margin + cursor_main + main_gap / 2;
                let cross_pos = cross_margin + cursor_cross + offset + cross_gap / 2;
                let b = match self.spec.orientation {
                    Orientation::Horizontal => {
                        Bounds::new(main_pos, cross_pos, item_main, item_cross)
                    }
                    Orientation::Vertical => {
                        Bounds::new(cross_pos, main_pos, item_cross, item_main)
                    }
                };
                bounds.insert(child.id.clone(), b);
                cursor_main += item_main + main_gap;
            }
            cursor_cross += line_cross;
        }

        LayoutResult {
            preferred_size,
            minimum_size,
            children: bounds,
        }
    }
}

/// Start offset and per-item growth for `slack` pixels spread over `count`
/// items.
fn distribute(alignment: Alignment, slack: i32, count: usize) -> (i32, i32) {
    match alignment {
        Alignment::Start => (0, 0),
        Alignment::Center => (slack / 2, 0),
        Alignment::End => (slack, 0),
        Alignment::Stretch if count > 0 && slack > 0 => (0, slack / count as i32),
        Alignment::Stretch => (0, 0),
    }
}
