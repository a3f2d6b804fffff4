//! GridLayout
//!
//! The inner area is split into `rows x columns` equal fields. A child spanning
//! `span` fields along an axis with field size `f`, gap `g` and `n` fields gets
//!
//! ```text
//! offset = x * (f + g / n)
//! extent = span * (f - (g / span - g / n))
//! ```
//!
//! so multi-field children lose proportionally less gap per field. Per-child
//! margins are applied afterwards.

use std::collections::BTreeMap;

use thinview_core::{parse_int, Bounds, GridLayoutSpec, Margins, Size};

use crate::measure::{LayoutChild, LayoutResult, Measure};

/// Cell rectangle of one child: `x;y;width;height,margins(4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellConstraint {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub margins: Margins,
}

impl CellConstraint {
    /// Spans below 1 are read as 1.
    pub fn parse(raw: &str) -> Self {
        let (cell, margins) = raw.split_once(',').unwrap_or((raw, ""));
        let f: Vec<&str> = cell.split(';').collect();
        Self {
            x: parse_int(f.first().copied()).max(0),
            y: parse_int(f.get(1).copied()).max(0),
            width: parse_int(f.get(2).copied()).max(1),
            height: parse_int(f.get(3).copied()).max(1),
            margins: Margins::parse(margins),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridLayout {
    spec: GridLayoutSpec,
}

impl GridLayout {
    pub fn new(spec: GridLayoutSpec) -> Self {
        Self { spec }
    }

    /// Declared grid size, or the extent of the children when not declared.
    fn dimensions(&self, cells: &[CellConstraint]) -> (i32, i32) {
        let declared = self.spec.grid;
        let columns = if declared.columns > 0 {
            declared.columns
        } else {
            cells.iter().map(|c| c.x + c.width).max().unwrap_or(1)
        };
        let rows = if declared.rows > 0 {
            declared.rows
        } else {
            cells.iter().map(|c| c.y + c.height).max().unwrap_or(1)
        };
        (rows.max(1), columns.max(1))
    }

    fn cells(children: &[LayoutChild]) -> Vec<(&LayoutChild, CellConstraint)> {
        children
            .iter()
            .filter(|c| c.visible)
            .map(|c| (c, CellConstraint::parse(&c.constraints)))
            .collect()
    }

    /// Outer `(preferred, minimum)` size.
    pub fn calculate(&self, children: &[LayoutChild], measure: &dyn Measure) -> (Size, Size) {
        let cells = Self::cells(children);
        let only: Vec<CellConstraint> = cells.iter().map(|(_, c)| *c).collect();
        let (rows, columns) = self.dimensions(&only);
        let preferred = self.outer_size(&cells, rows, columns, |c| c.preferred(measure));
        let minimum = self.outer_size(&cells, rows, columns, LayoutChild::minimum);
        (preferred, minimum)
    }

    fn outer_size(
        &self,
        cells: &[(&LayoutChild, CellConstraint)],
        rows: i32,
        columns: i32,
        size: impl Fn(&LayoutChild) -> Size,
    ) -> Size {
        let gaps = self.spec.gaps;
        let (mut field_width, mut field_height) = (0.0_f64, 0.0_f64);
        for (child, cell) in cells {
            let s = size(child);
            field_width = field_width.max(required_field(
                s.width + cell.margins.horizontal(),
                cell.width,
                gaps.horizontal,
                columns,
            ));
            field_height = field_height.max(required_field(
                s.height + cell.margins.vertical(),
                cell.height,
                gaps.vertical,
                rows,
            ));
        }
        let m = self.spec.margins;
        Size::new(
            (field_width * columns as f64).ceil() as i32 + m.horizontal(),
            (field_height * rows as f64).ceil() as i32 + m.vertical(),
        )
    }

    pub fn layout(
        &self,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> LayoutResult {
        let (preferred_size, minimum_size) = self.calculate(children, measure);
        let cells = Self::cells(children);
        let only: Vec<CellConstraint> = cells.iter().map(|(_, c)| *c).collect();
        let (rows, columns) = self.dimensions(&only);

        let m = self.spec.margins;
        let gaps = self.spec.gaps;
        let field_width = (allotted.width - m.horizontal()).max(0) as f64 / columns as f64;
        let field_height = (allotted.height - m.vertical()).max(0) as f64 / rows as f64;

        let mut bounds = BTreeMap::new();
        for (child, cell) in cells {
            let (left, width) = axis(cell.x, cell.width, field_width, gaps.horizontal, columns);
            let (top, height) = axis(cell.y, cell.height, field_height, gaps.vertical, rows);
            let cm = cell.margins;
            bounds.insert(
                child.id.clone(),
                Bounds::new(
                    m.left + left + cm.left,
                    m.top + top + cm.top,
                    (width - cm.horizontal()).max(0),
                    (height - cm.vertical()).max(0),
                ),
            );
        }

        LayoutResult {
            preferred_size,
            minimum_size,
            children: bounds,
        }
    }
}

/// `(offset, extent)` of a span along one axis.
fn axis(position: i32, span: i32, field: f64, gap: i32, fields: i32) -> (i32, i32) {
    let (gap, span_f, fields) = (gap as f64, span as f64, fields as f64);
    let offset = position as f64 * (field + gap / fields);
    let extent = span_f * (field - (gap / span_f - gap / fields));
    (offset.round() as i32, extent.round() as i32)
}

/// Smallest field size that fits `extent` across `span` fields.
fn required_field(extent: i32, span: i32, gap: i32, fields: i32) -> f64 {
    let (gap, span_f) = (gap as f64, span as f64);
    let field = (extent as f64 + gap - span_f * gap / fields as f64) / span_f;
    field.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{FixedMeasure, Unmeasured};
    use thinview_core::{Gaps, GridSize};

    fn grid(rows: i32, columns: i32, gap: i32) -> GridLayout {
        GridLayout::new(GridLayoutSpec {
            margins: Margins::default(),
            gaps: Gaps::new(gap, gap),
            grid: GridSize::new(rows, columns),
        })
    }

    #[test]
    fn test_cell_constraint_parse() {
        let cell = CellConstraint::parse("1;2;3;1,4,5,6,7");
        assert_eq!((cell.x, cell.y, cell.width, cell.height), (1, 2, 3, 1));
        assert_eq!(cell.margins, Margins::new(4, 5, 6, 7));

        let cell = CellConstraint::parse("0;0;0;0");
        assert_eq!((cell.width, cell.height), (1, 1));
    }

    #[test]
    fn test_single_cell_gap_share() {
        let children = vec![LayoutChild::new("a", "0;0;1;1")];
        let result = grid(2, 2, 10).layout(&children, &Unmeasured, Size::new(200, 200));
        assert_eq!(result.bounds("a"), Some(Bounds::new(0, 0, 95, 95)));
    }

    #[test]
    fn test_spanning_child_keeps_full_width() {
        let children = vec![LayoutChild::new("a", "0;0;2;1")];
        let result = grid(2, 2, 10).layout(&children, &Unmeasured, Size::new(200, 200));
        assert_eq!(result.bounds("a").unwrap().width, 200);
    }

    #[test]
    fn test_last_cell_reaches_edge() {
        let children = vec![LayoutChild::new("a", "1;1;1;1")];
        let result = grid(2, 2, 10).layout(&children, &Unmeasured, Size::new(200, 200));
        let b = result.bounds("a").unwrap();
        assert_eq!(b, Bounds::new(105, 105, 95, 95));
        assert_eq!(b.right(), 200);
    }

    #[test]
    fn test_child_margins_applied() {
        let children = vec![LayoutChild::new("a", "0;0;1;1,1,2,3,4")];
        let result = grid(2, 2, 10).layout(&children, &Unmeasured, Size::new(200, 200));
        assert_eq!(result.bounds("a"), Some(Bounds::new(2, 1, 89, 91)));
    }

    #[test]
    fn test_preferred_inverts_formula() {
        let children = vec![
            LayoutChild::new("a", "0;0;1;1"),
            LayoutChild::new("b", "1;1;1;1"),
        ];
        let measure = FixedMeasure::new().with_fallback(Size::new(95, 95));
        let (preferred, _) = grid(2, 2, 10).calculate(&children, &measure);
        assert_eq!(preferred, Size::new(200, 200));
    }

    #[test]
    fn test_undeclared_grid_uses_children_extent() {
        let children = vec![LayoutChild::new("a", "0;0;1;1"), LayoutChild::new("b", "2;0;1;1")];
        let result = grid(0, 0, 0).layout(&children, &Unmeasured, Size::new(300, 100));
        assert_eq!(result.bounds("b"), Some(Bounds::new(200, 0, 100, 100)));
    }
}
