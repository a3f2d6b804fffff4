//! Anchor arena for the form layout solver
//!
//! Anchors reference each other by [`AnchorId`] into a flat arena. Chains are
//! walked iteratively with a step bound equal to the arena length, so a cyclic
//! chain sent by the server degrades to "unresolved" instead of hanging.

use std::collections::HashMap;

use thinview_core::parse_int;

/// Index of an anchor inside an [`AnchorArena`].
pub type AnchorId = usize;

/// One edge position in the constraint graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub name: String,
    /// Anchor this one is positioned against. `None` for border anchors.
    pub related: Option<AnchorId>,
    /// Signed offset from the related anchor, absolute for border anchors.
    pub position: i32,
    /// Position is computed from the measured size of children.
    pub auto_size: bool,
    /// Participates in redistribution of slack during the target pass.
    pub relative: bool,
    pub auto_size_calculated: bool,
    pub first_calculation: bool,
}

impl Anchor {
    pub fn new(name: impl Into<String>, related: Option<AnchorId>, position: i32) -> Self {
        Self {
            name: name.into(),
            related,
            position,
            auto_size: false,
            relative: false,
            auto_size_calculated: false,
            first_calculation: true,
        }
    }

    pub fn auto_sized(mut self) -> Self {
        self.auto_size = true;
        self
    }
}

/// One anchor descriptor with its related anchor still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnchorDescriptor<'a> {
    pub name: &'a str,
    pub related: Option<&'a str>,
    pub auto_size: bool,
    pub position: i32,
}

impl<'a> AnchorDescriptor<'a> {
    /// Parse `name,related|-,unused,a|-,position`.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let f: Vec<&str> = raw.split(',').map(str::trim).collect();
        let name = *f.first()?;
        if name.is_empty() {
            return None;
        }
        let related = f.get(1).copied().filter(|r| !r.is_empty() && *r != "-");
        Some(Self {
            name,
            related,
            auto_size: f.get(3).copied() == Some("a"),
            position: parse_int(f.get(4).copied()),
        })
    }
}

/// Flat storage of all anchors of one form layout.
#[derive(Debug, Clone, Default)]
pub struct AnchorArena {
    anchors: Vec<Anchor>,
    by_name: HashMap<String, AnchorId>,
}

impl AnchorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an anchor, replacing one of the same name in place.
    pub fn insert(&mut self, anchor: Anchor) -> AnchorId {
        if let Some(&id) = self.by_name.get(&anchor.name) {
            self.anchors[id] = anchor;
            return id;
        }
        let id = self.anchors.len();
        self.by_name.insert(anchor.name.clone(), id);
        self.anchors.push(anchor);
        id
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
        self.by_name.clear();
    }

    pub fn id(&self, name: &str) -> Option<AnchorId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: AnchorId) -> &Anchor {
        &self.anchors[id]
    }

    pub fn get_mut(&mut self, id: AnchorId) -> &mut Anchor {
        &mut self.anchors[id]
    }

    pub fn by_name(&self, name: &str) -> Option<&Anchor> {
        self.id(name).map(|id| &self.anchors[id])
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<AnchorId> {
        0..self.anchors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    pub fn position(&self, id: AnchorId) -> i32 {
        self.anchors[id].position
    }

    pub fn set_position(&mut self, id: AnchorId, position: i32) {
        self.anchors[id].position = position;
    }

    /// Sum of positions along the related chain.
    pub fn absolute_position(&self, id: AnchorId) -> i32 {
        let mut total = 0;
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(anchor_id) = current {
            if steps > self.anchors.len() {
                tracing::debug!("Anchor cycle through {:?}", self.anchors[id].name);
                break;
            }
            steps += 1;
            let anchor = &self.anchors[anchor_id];
            total += anchor.position;
            current = anchor.related;
        }
        total
    }

    /// Root of the related chain, one of the border anchors for a well formed graph.
    pub fn border_anchor(&self, id: AnchorId) -> AnchorId {
        let mut current = id;
        for _ in 0..=self.anchors.len() {
            match self.anchors[current].related {
                Some(next) => current = next,
                None => return current,
            }
        }
        current
    }

    /// Whether the related chain ends at a root anchor instead of cycling.
    pub fn is_rooted(&self, id: AnchorId) -> bool {
        let mut current = id;
        for _ in 0..=self.anchors.len() {
            match self.anchors[current].related {
                Some(next) => current = next,
                None => return true,
            }
        }
        false
    }

    /// First anchor along the chain that is relative, or the border anchor.
    pub fn relative_anchor(&self, id: AnchorId) -> AnchorId {
        let mut current = id;
        for _ in 0..=self.anchors.len() {
            let anchor = &self.anchors[current];
            match anchor.related {
                Some(next) if !anchor.relative => current = next,
                _ => return current,
            }
        }
        current
    }

    /// Auto-size anchors walked from `start` towards `end` that are not yet
    /// calculated.
    ///
    /// Returns an empty list when `end` is not reachable from `start`.
    pub fn auto_size_anchors_between(&self, start: AnchorId, end: AnchorId) -> Vec<AnchorId> {
        let mut found = Vec::new();
        let mut current = Some(start);
        let mut steps = 0;
        while let Some(id) = current {
            if id == end {
                return found;
            }
            if steps > self.anchors.len() {
                break;
            }
            steps += 1;
            let anchor = &self.anchors[id];
            if anchor.auto_size && !anchor.auto_size_calculated {
                found.push(id);
            }
            current = anchor.related;
        }
        Vec::new()
    }
}
