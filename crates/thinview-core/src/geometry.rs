//! # Geometry Primitives
//!
//! Immutable value objects parsed from the comma-separated strings the server
//! sends for sizes, margins, gaps, alignments and grid dimensions.
//!
//! Missing fields default to zero (or the "normal" variant). Malformed
//! integers also parse to zero; see [`parse_int`].

use serde::{Deserialize, Serialize};

/// Parse one protocol integer field.
///
/// Absent or malformed fields yield 0. The server is expected to send
/// well-formed numbers; a bad field is traced instead of rejected so a
/// single broken property never blanks out a whole screen.
pub fn parse_int(field: Option<&str>) -> i32 {
    match field.map(str::trim) {
        None | Some("") => 0,
        Some(raw) => raw.parse::<i32>().unwrap_or_else(|_| {
            tracing::debug!("Malformed protocol integer {:?}, using 0", raw);
            0
        }),
    }
}

fn fields(raw: &str) -> Vec<&str> {
    raw.split(',').collect()
}

// ============================================================================
// Size
// ============================================================================

/// Width and height in pixels (`"<width>,<height>"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn parse(raw: &str) -> Self {
        let f = fields(raw);
        Self {
            width: parse_int(f.first().copied()),
            height: parse_int(f.get(1).copied()),
        }
    }

    /// Apply minimum and maximum sizes to a preferred size, per axis.
    ///
    /// The preferred dimension widens to at least the minimum and narrows to
    /// at most the maximum. A preferred dimension of exactly 0 means
    /// "unmeasured": it is replaced by the minimum (or the maximum when no
    /// minimum is given) instead of being clamped.
    pub fn clamped(preferred: Size, minimum: Option<Size>, maximum: Option<Size>) -> Size {
        Size {
            width: clamp_axis(
                preferred.width,
                minimum.map(|m| m.width),
                maximum.map(|m| m.width),
            ),
            height: clamp_axis(
                preferred.height,
                minimum.map(|m| m.height),
                maximum.map(|m| m.height),
            ),
        }
    }

    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

fn clamp_axis(preferred: i32, minimum: Option<i32>, maximum: Option<i32>) -> i32 {
    let mut value = preferred;
    if let Some(min) = minimum {
        if value == 0 || value < min {
            value = min;
        }
    }
    if let Some(max) = maximum {
        if value == 0 || value > max {
            value = max;
        }
    }
    value
}

// ============================================================================
// Margins / Gaps
// ============================================================================

/// Insets in pixels (`"<top>,<left>,<bottom>,<right>"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Margins {
    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn parse(raw: &str) -> Self {
        Self::from_fields(&fields(raw))
    }

    pub(crate) fn from_fields(f: &[&str]) -> Self {
        Self {
            top: parse_int(f.first().copied()),
            left: parse_int(f.get(1).copied()),
            bottom: parse_int(f.get(2).copied()),
            right: parse_int(f.get(3).copied()),
        }
    }

    /// Left + right.
    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    /// Top + bottom.
    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

/// Spacing between children (`"<horizontal>,<vertical>"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gaps {
    pub horizontal: i32,
    pub vertical: i32,
}

impl Gaps {
    pub const fn new(horizontal: i32, vertical: i32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn parse(raw: &str) -> Self {
        Self::from_fields(&fields(raw))
    }

    pub(crate) fn from_fields(f: &[&str]) -> Self {
        Self {
            horizontal: parse_int(f.first().copied()),
            vertical: parse_int(f.get(1).copied()),
        }
    }
}

// ============================================================================
// Orientation / Alignment
// ============================================================================

/// Flow direction. Protocol code `0` is horizontal, `1` vertical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Orientation::Vertical,
            _ => Orientation::Horizontal,
        }
    }
}

/// Alignment along one axis.
///
/// Protocol codes: `0` = left/top, `1` = center, `2` = right/bottom,
/// `3` = stretch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
    Stretch,
}

impl Alignment {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Alignment::Center,
            2 => Alignment::End,
            3 => Alignment::Stretch,
            _ => Alignment::Start,
        }
    }

    /// Parse an optional field, falling back to `default` when absent.
    pub fn parse_or(field: Option<&str>, default: Alignment) -> Self {
        match field.map(str::trim) {
            None | Some("") => default,
            Some(raw) => Alignment::from_code(parse_int(Some(raw))),
        }
    }

    /// Offset of an item of `size` inside `available` for start/center/end.
    ///
    /// Stretch behaves like start; callers stretch the size themselves.
    pub fn offset(self, available: i32, size: i32) -> i32 {
        match self {
            Alignment::Start | Alignment::Stretch => 0,
            Alignment::Center => (available - size) / 2,
            Alignment::End => available - size,
        }
    }
}

// ============================================================================
// GridSize / Bounds
// ============================================================================

/// Row and column count of a grid (`"<rows>,<columns>"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: i32,
    pub columns: i32,
}

impl GridSize {
    pub const fn new(rows: i32, columns: i32) -> Self {
        Self { rows, columns }
    }

    pub fn parse(raw: &str) -> Self {
        let f = fields(raw);
        Self {
            rows: parse_int(f.first().copied()),
            columns: parse_int(f.get(1).copied()),
        }
    }
}

/// Absolute child rectangle produced by a layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_parse() {
        assert_eq!(Size::parse("80,30"), Size::new(80, 30));
        assert_eq!(Size::parse("80"), Size::new(80, 0));
        assert_eq!(Size::parse(""), Size::ZERO);
    }

    #[test]
    fn test_malformed_fields_parse_to_zero() {
        assert_eq!(Size::parse("abc,12"), Size::new(0, 12));
        assert_eq!(parse_int(Some(" 7 ")), 7);
        assert_eq!(parse_int(None), 0);
    }

    #[test]
    fn test_margins_parse() {
        let m = Margins::parse("1,2,3,4");
        assert_eq!(m, Margins::new(1, 2, 3, 4));
        assert_eq!(m.horizontal(), 6);
        assert_eq!(m.vertical(), 4);
    }

    #[test]
    fn test_gaps_parse() {
        assert_eq!(Gaps::parse("5,8"), Gaps::new(5, 8));
        assert_eq!(Gaps::parse("5"), Gaps::new(5, 0));
    }

    #[test]
    fn test_clamp_zero_preferred_replaced_by_min() {
        let size = Size::clamped(Size::new(0, 10), Some(Size::new(40, 5)), None);
        assert_eq!(size.width, 40);
        assert_eq!(size.height, 10);
    }

    #[test]
    fn test_clamp_to_max() {
        let size = Size::clamped(Size::new(100, 20), None, Some(Size::new(50, 50)));
        assert_eq!(size, Size::new(50, 20));
    }

    #[test]
    fn test_clamp_zero_preferred_replaced_by_max_without_min() {
        let size = Size::clamped(Size::new(0, 0), None, Some(Size::new(70, 15)));
        assert_eq!(size, Size::new(70, 15));
    }

    #[test]
    fn test_clamp_respects_bounds_for_many_triples() {
        for pref in [0, 1, 39, 40, 41, 99, 100, 101, 500] {
            for min in [0, 20, 40] {
                for max in [40, 100, 200] {
                    let size = Size::clamped(
                        Size::new(pref, pref),
                        Some(Size::new(min, min)),
                        Some(Size::new(max, max)),
                    );
                    assert!(size.width >= min, "pref={pref} min={min} max={max}");
                    assert!(size.width <= max, "pref={pref} min={min} max={max}");
                }
            }
        }
    }

    #[test]
    fn test_clamp_without_limits_is_identity() {
        let size = Size::clamped(Size::new(0, 12), None, None);
        assert_eq!(size, Size::new(0, 12));
    }

    #[test]
    fn test_alignment_codes() {
        assert_eq!(Alignment::from_code(0), Alignment::Start);
        assert_eq!(Alignment::from_code(1), Alignment::Center);
        assert_eq!(Alignment::from_code(2), Alignment::End);
        assert_eq!(Alignment::from_code(3), Alignment::Stretch);
        assert_eq!(Alignment::parse_or(None, Alignment::Stretch), Alignment::Stretch);
    }

    #[test]
    fn test_alignment_offset() {
        assert_eq!(Alignment::Center.offset(100, 40), 30);
        assert_eq!(Alignment::End.offset(100, 40), 60);
        assert_eq!(Alignment::Stretch.offset(100, 40), 0);
    }

    #[test]
    fn test_orientation_codes() {
        assert_eq!(Orientation::from_code(0), Orientation::Horizontal);
        assert_eq!(Orientation::from_code(1), Orientation::Vertical);
    }

    #[test]
    fn test_grid_size_parse() {
        assert_eq!(GridSize::parse("2,3"), GridSize::new(2, 3));
    }
}
