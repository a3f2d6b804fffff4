//! Layout descriptors
//!
//! A container's `layout` property is `"<LayoutName>,<margins(4)>,<gaps(2)>,<extra...>"`.
//! The extra fields depend on the layout:
//!
//! - `FormLayout`: horizontal and vertical alignment
//! - `FlowLayout`: orientation, horizontal, vertical and component alignment, auto wrap
//! - `GridLayout`: rows, columns
//! - `BorderLayout`: none

use serde::Serialize;

use crate::geometry::{parse_int, Alignment, Gaps, GridSize, Margins, Orientation};

/// Parsed layout property of a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LayoutDescriptor {
    Form(FormLayoutSpec),
    Border(BorderLayoutSpec),
    Flow(FlowLayoutSpec),
    Grid(GridLayoutSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormLayoutSpec {
    pub margins: Margins,
    pub gaps: Gaps,
    pub horizontal_alignment: Alignment,
    pub vertical_alignment: Alignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BorderLayoutSpec {
    pub margins: Margins,
    pub gaps: Gaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowLayoutSpec {
    pub margins: Margins,
    pub gaps: Gaps,
    pub orientation: Orientation,
    pub horizontal_alignment: Alignment,
    pub vertical_alignment: Alignment,
    pub component_alignment: Alignment,
    pub auto_wrap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridLayoutSpec {
    pub margins: Margins,
    pub gaps: Gaps,
    pub grid: GridSize,
}

impl LayoutDescriptor {
    /// Parse a layout property. Unknown layout names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let f: Vec<&str> = raw.split(',').collect();
        let name = f.first().map(|n| n.trim()).unwrap_or_default();
        let margins = Margins::from_fields(window(&f, 1, 5));
        let gaps = Gaps::from_fields(window(&f, 5, 7));

        let descriptor = match name {
            "FormLayout" => LayoutDescriptor::Form(FormLayoutSpec {
                margins,
                gaps,
                horizontal_alignment: Alignment::parse_or(f.get(7).copied(), Alignment::Stretch),
                vertical_alignment: Alignment::parse_or(f.get(8).copied(), Alignment::Stretch),
            }),
            "BorderLayout" => LayoutDescriptor::Border(BorderLayoutSpec { margins, gaps }),
            "FlowLayout" => LayoutDescriptor::Flow(FlowLayoutSpec {
                margins,
                gaps,
                orientation: Orientation::from_code(parse_int(f.get(7).copied())),
                horizontal_alignment: Alignment::parse_or(f.get(8).copied(), Alignment::Center),
                vertical_alignment: Alignment::parse_or(f.get(9).copied(), Alignment::Center),
                component_alignment: Alignment::parse_or(f.get(10).copied(), Alignment::Center),
                auto_wrap: f.get(11).map(|w| w.trim() != "false").unwrap_or(true),
            }),
            "GridLayout" => LayoutDescriptor::Grid(GridLayoutSpec {
                margins,
                gaps,
                grid: GridSize::new(parse_int(f.get(7).copied()), parse_int(f.get(8).copied())),
            }),
            other => {
                tracing::debug!("Unknown layout {:?}", other);
                return None;
            }
        };
        Some(descriptor)
    }

    pub fn margins(&self) -> Margins {
        match self {
            LayoutDescriptor::Form(s) => s.margins,
            LayoutDescriptor::Border(s) => s.margins,
            LayoutDescriptor::Flow(s) => s.margins,
            LayoutDescriptor::Grid(s) => s.margins,
        }
    }

    pub fn gaps(&self) -> Gaps {
        match self {
            LayoutDescriptor::Form(s) => s.gaps,
            LayoutDescriptor::Border(s) => s.gaps,
            LayoutDescriptor::Flow(s) => s.gaps,
            LayoutDescriptor::Grid(s) => s.gaps,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayoutDescriptor::Form(_) => "FormLayout",
            LayoutDescriptor::Border(_) => "BorderLayout",
            LayoutDescriptor::Flow(_) => "FlowLayout",
            LayoutDescriptor::Grid(_) => "GridLayout",
        }
    }
}

/// Sub-slice that tolerates descriptors shorter than expected.
fn window<'a>(f: &'a [&'a str], start: usize, end: usize) -> &'a [&'a str] {
    let len = f.len();
    &f[start.min(len)..end.min(len)]
}
