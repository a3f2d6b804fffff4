//! BorderLayout
//!
//! Five regions keyed by the child's constraint keyword. North and South take
//! the full inner width, West and East the height left between them, Center
//! the rest. Gaps only separate occupied regions.

use std::collections::BTreeMap;

use thinview_core::{BorderLayoutSpec, Bounds, Size};

use crate::measure::{LayoutChild, LayoutResult, Measure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    North,
    West,
    Center,
    East,
    South,
}

impl Region {
    /// Unknown or empty keywords fall into Center.
    pub fn parse(constraint: &str) -> Self {
        match constraint.trim() {
            "North" => Region::North,
            "West" => Region::West,
            "East" => Region::East,
            "South" => Region::South,
            _ => Region::Center,
        }
    }
}

#[derive(Debug, Default)]
struct Regions<'a> {
    north: Option<&'a LayoutChild>,
    west: Option<&'a LayoutChild>,
    center: Option<&'a LayoutChild>,
    east: Option<&'a LayoutChild>,
    south: Option<&'a LayoutChild>,
}

impl<'a> Regions<'a> {
    fn bucket(children: &'a [LayoutChild]) -> Self {
        let mut regions = Regions::default();
        for child in children.iter().filter(|c| c.visible) {
            let slot = match Region::parse(&child.constraints) {
                Region::North => &mut regions.north,
                Region::West => &mut regions.west,
                Region::Center => &mut regions.center,
                Region::East => &mut regions.east,
                Region::South => &mut regions.south,
            };
            if let Some(previous) = slot.replace(child) {
                tracing::debug!("{} replaces {} in BorderLayout region", child.id, previous.id);
            }
        }
        regions
    }

    fn has_middle(&self) -> bool {
        self.west.is_some() || self.center.is_some() || self.east.is_some()
    }
}

/// Gaps between occupied regions only.
#[derive(Debug, Clone, Copy, Default)]
struct RegionGaps {
    north: i32,
    south: i32,
    west: i32,
    east: i32,
}

impl RegionGaps {
    fn new(regions: &Regions<'_>, spec: &BorderLayoutSpec) -> Self {
        let (h, v) = (spec.gaps.horizontal, spec.gaps.vertical);
        let gap = |present: bool, followed: bool, value: i32| {
            if present && followed {
                value
            } else {
                0
            }
        };
        Self {
            north: gap(
                regions.north.is_some(),
                regions.has_middle() || regions.south.is_some(),
                v,
            ),
            south: gap(regions.south.is_some(), regions.has_middle(), v),
            west: gap(
                regions.west.is_some(),
                regions.center.is_some() || regions.east.is_some(),
                h,
            ),
            east: gap(regions.east.is_some(), regions.center.is_some(), h),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BorderLayout {
    spec: BorderLayoutSpec,
}

impl BorderLayout {
    pub fn new(spec: BorderLayoutSpec) -> Self {
        Self { spec }
    }

    /// Outer `(preferred, minimum)` size.
    pub fn calculate(&self, children: &[LayoutChild], measure: &dyn Measure) -> (Size, Size) {
        let regions = Regions::bucket(children);
        let gaps = RegionGaps::new(&regions, &self.spec);
        let preferred = self.outer_size(&regions, gaps, |c| c.preferred(measure));
        let minimum = self.outer_size(&regions, gaps, LayoutChild::minimum);
        (preferred, minimum)
    }

    pub fn layout(
        &self,
        children: &[LayoutChild],
        measure: &dyn Measure,
        allotted: Size,
    ) -> LayoutResult {
        let (preferred_size, minimum_size) = self.calculate(children, measure);
        let regions = Regions::bucket(children);
        let gaps = RegionGaps::new(&regions, &self.spec);
        let m = self.spec.margins;
        let size_of = |child: Option<&LayoutChild>| {
            child.map(|c| c.preferred(measure)).unwrap_or_default()
        };

        let inner_width = (allotted.width - m.horizontal()).max(0);
        let inner_height = (allotted.height - m.vertical()).max(0);
        let (north, south) = (size_of(regions.north), size_of(regions.south));
        let (west, east) = (size_of(regions.west), size_of(regions.east));

        let middle_top = m.top + north.height + gaps.north;
        let middle_height =
            (inner_height - north.height - south.height - gaps.north - gaps.south).max(0);

        let mut bounds = BTreeMap::new();
        let mut place = |child: Option<&LayoutChild>, b: Bounds| {
            if let Some(child) = child {
                bounds.insert(child.id.clone(), b);
            }
        };

        place(
            regions.north,
            Bounds::new(m.left, m.top, inner_width, north.height),
        );
        place(
            regions.south,
            Bounds::new(
                m.left,
                m.top + inner_height - south.height,
                inner_width,
                south.height,
            ),
        );
        place(
            regions.west,
            Bounds::new(m.left, middle_top, west.width, middle_height),
        );
        place(
            regions.east,
            Bounds::new(
                m.left + inner_width - east.width,
                middle_top,
                east.width,
                middle_height,
            ),
        );
        place(
            regions.center,
            Bounds::new(
                m.left + west.width + gaps.west,
                middle_top,
                (inner_width - west.width - east.width - gaps.west - gaps.east).max(0),
                middle_height,
            ),
        );

        LayoutResult {
            preferred_size,
            minimum_size,
            children: bounds,
        }
    }

    fn outer_size(
        &self,
        regions: &Regions<'_>,
        gaps: RegionGaps,
        size: impl Fn(&LayoutChild) -> Size,
    ) -> Size {
        let of = |child: Option<&LayoutChild>| child.map(&size).unwrap_or_default();
        let (north, south) = (of(regions.north), of(regions.south));
        let (west, center, east) = (of(regions.west), of(regions.center), of(regions.east));

        let middle_width = west.width + center.width + east.width + gaps.west + gaps.east;
        let middle_height = west.height.max(center.height).max(east.height);
        let m = self.spec.margins;
        Size::new(
            north.width.max(south.width).max(middle_width) + m.horizontal(),
            north.height + middle_height + south.height + gaps.north + gaps.south + m.vertical(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::FixedMeasure;
    use thinview_core::{Gaps, Margins};

    fn layout(gap: i32) -> BorderLayout {
        BorderLayout::new(BorderLayoutSpec {
            margins: Margins::default(),
            gaps: Gaps::new(gap, gap),
        })
    }

    fn measure() -> FixedMeasure {
        FixedMeasure::new().with_fallback(Size::new(20, 10))
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(Region::parse("North"), Region::North);
        assert_eq!(Region::parse(" East "), Region::East);
        assert_eq!(Region::parse(""), Region::Center);
    }

    #[test]
    fn test_no_gap_without_north() {
        let children = vec![LayoutChild::new("center", "Center")];
        let result = layout(5).layout(&children, &measure(), Size::new(100, 100));
        assert_eq!(result.bounds("center"), Some(Bounds::new(0, 0, 100, 100)));
    }

    #[test]
    fn test_gap_between_north_and_center() {
        let children = vec![
            LayoutChild::new("north", "North"),
            LayoutChild::new("center", "Center"),
        ];
        let result = layout(5).layout(&children, &measure(), Size::new(100, 100));
        assert_eq!(result.bounds("north"), Some(Bounds::new(0, 0, 100, 10)));
        assert_eq!(result.bounds("center"), Some(Bounds::new(0, 15, 100, 85)));
    }

    #[test]
    fn test_all_regions() {
        let children = vec![
            LayoutChild::new("n", "North"),
            LayoutChild::new("s", "South"),
            LayoutChild::new("w", "West"),
            LayoutChild::new("e", "East"),
            LayoutChild::new("c", "Center"),
        ];
        let result = layout(5).layout(&children, &measure(), Size::new(200, 100));

        assert_eq!(result.bounds("s"), Some(Bounds::new(0, 90, 200, 10)));
        assert_eq!(result.bounds("w"), Some(Bounds::new(0, 15, 20, 70)));
        assert_eq!(result.bounds("e"), Some(Bounds::new(180, 15, 20, 70)));
        assert_eq!(result.bounds("c"), Some(Bounds::new(25, 15, 150, 70)));
        // 20 + 5 + 20 + 5 + 20 wide, 10 + 5 + 10 + 5 + 10 high.
        assert_eq!(result.preferred_size, Size::new(70, 40));
    }

    #[test]
    fn test_margins_in_preferred_size() {
        let layout = BorderLayout::new(BorderLayoutSpec {
            margins: Margins::new(1, 2, 3, 4),
            gaps: Gaps::new(5, 5),
        });
        let children = vec![LayoutChild::new("c", "Center")];
        let (preferred, minimum) = layout.calculate(&children, &measure());
        assert_eq!(preferred, Size::new(26, 14));
        assert_eq!(minimum, Size::new(6, 4));
    }
}
