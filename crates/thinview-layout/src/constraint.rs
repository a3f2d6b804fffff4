//! Per-child anchor constraints

use crate::anchor::{AnchorArena, AnchorId};

/// The four edge anchors of one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub top: AnchorId,
    pub left: AnchorId,
    pub bottom: AnchorId,
    pub right: AnchorId,
}

impl Constraint {
    /// Resolve `top;left;bottom;right` anchor names against `anchors`.
    ///
    /// Commas are accepted as separators too. Returns `None` if a name is
    /// missing or unknown.
    pub fn parse(raw: &str, anchors: &AnchorArena) -> Option<Self> {
        let mut names = raw.split([';', ',']).map(str::trim);
        let mut next = || names.next().and_then(|name| anchors.id(name));
        Some(Self {
            top: next()?,
            left: next()?,
            bottom: next()?,
            right: next()?,
        })
    }

    /// Edge pairs in the order the solver visits them: (start, end) per axis.
    pub fn horizontal(&self) -> (AnchorId, AnchorId) {
        (self.left, self.right)
    }

    pub fn vertical(&self) -> (AnchorId, AnchorId) {
        (self.top, self.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Anchor;

    fn arena() -> AnchorArena {
        let mut arena = AnchorArena::new();
        for name in ["t", "l", "b", "r"] {
            arena.insert(Anchor::new(name, None, 0));
        }
        arena
    }

    #[test]
    fn test_parse_semicolon() {
        let arena = arena();
        let c = Constraint::parse("t;l;b;r", &arena).unwrap();
        assert_eq!(c.top, arena.id("t").unwrap());
        assert_eq!(c.right, arena.id("r").unwrap());
    }

    #[test]
    fn test_parse_comma() {
        let arena = arena();
        let c = Constraint::parse("t,l,b,r", &arena).unwrap();
        assert_eq!(c.horizontal(), (arena.id("l").unwrap(), arena.id("r").unwrap()));
    }

    #[test]
    fn test_unknown_anchor() {
        let arena = arena();
        assert!(Constraint::parse("t;l;b;x", &arena).is_none());
        assert!(Constraint::parse("t;l;b", &arena).is_none());
    }
}
