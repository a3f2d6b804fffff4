//! # Component Model
//!
//! Server components are a closed tagged union ([`ComponentKind`]) keyed by the
//! protocol's `className`, plus a set of typed properties every component
//! shares (parent, constraints, sizes, ...).
//!
//! Updates arrive as partial JSON objects and are decoded into a
//! [`ComponentUpdate`]: every property is optional, and only the properties
//! present are merged into the stored [`Component`].
//!
//! ## Key Types
//!
//! - [`Component`] - a tracked component (no transient flags)
//! - [`ComponentKind`] - variant payload per `className`
//! - [`ComponentUpdate`] - one entry of a `changedComponents` array
//! - [`ChangeSet`] - what an update touched, used for change notification

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::Size;

// ============================================================================
// ToolBarArea
// ============================================================================

/// Side of a ToolBarPanel the toolbars dock to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolBarArea {
    #[default]
    North,
    West,
    South,
    East,
}

impl ToolBarArea {
    /// Protocol codes: 0 = top, 1 = left, 2 = bottom, 3 = right.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ToolBarArea::West,
            2 => ToolBarArea::South,
            3 => ToolBarArea::East,
            _ => ToolBarArea::North,
        }
    }

    /// BorderLayout constraint keyword for this side.
    pub fn border_constraint(self) -> &'static str {
        match self {
            ToolBarArea::North => "North",
            ToolBarArea::West => "West",
            ToolBarArea::South => "South",
            ToolBarArea::East => "East",
        }
    }

    /// Toolbars stack horizontally on north/south, vertically on west/east.
    pub fn is_horizontal(self) -> bool {
        matches!(self, ToolBarArea::North | ToolBarArea::South)
    }
}

// ============================================================================
// Variant payloads
// ============================================================================

/// Screen information carried by top-level panels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenInfo {
    pub class_name: Option<String>,
    pub navigation_name: Option<String>,
    pub title: Option<String>,
    /// Screen is shown as a modal popup over another screen.
    pub modal: bool,
}

impl ScreenInfo {
    fn apply(&mut self, update: &ComponentUpdate) {
        merge(&mut self.class_name, &update.screen_class_name);
        merge(&mut self.navigation_name, &update.screen_navigation_name);
        merge(&mut self.title, &update.screen_title);
        if let Some(modal) = update.screen_modal {
            self.modal = modal;
        }
    }

    fn is_empty(&self) -> bool {
        self.class_name.is_none() && self.navigation_name.is_none() && self.title.is_none()
    }
}

/// Binding of a data-aware component to a data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataBinding {
    pub data_provider: String,
    pub column_name: Option<String>,
}

/// Variant payload, one per protocol `className`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ComponentKind {
    Panel { screen: Option<ScreenInfo> },
    GroupPanel { text: Option<String> },
    ScrollPanel,
    SplitPanel,
    DesktopPanel,
    ToolBarPanel { area: ToolBarArea },
    /// Synthetic outer panel of a ToolBarPanel, holds the toolbars.
    ToolBarHelperMain,
    /// Synthetic content panel of a ToolBarPanel, holds the regular children.
    ToolBarHelperCenter,
    ToolBar,
    Button { text: Option<String> },
    Label { text: Option<String> },
    Editor { binding: DataBinding },
    Table { binding: DataBinding, columns: Vec<String> },
    Other { class_name: String },
}

impl ComponentKind {
    /// Build the variant for `class_name` from the properties of an update.
    pub fn from_update(class_name: &str, update: &ComponentUpdate) -> Self {
        let mut kind = match class_name {
            "Panel" => ComponentKind::Panel { screen: None },
            "GroupPanel" => ComponentKind::GroupPanel { text: None },
            "ScrollPanel" => ComponentKind::ScrollPanel,
            "SplitPanel" => ComponentKind::SplitPanel,
            "DesktopPanel" => ComponentKind::DesktopPanel,
            "ToolBarPanel" => ComponentKind::ToolBarPanel {
                area: ToolBarArea::North,
            },
            "ToolBarHelperMain" => ComponentKind::ToolBarHelperMain,
            "ToolBarHelperCenter" => ComponentKind::ToolBarHelperCenter,
            "ToolBar" => ComponentKind::ToolBar,
            "Button" => ComponentKind::Button { text: None },
            "Label" => ComponentKind::Label { text: None },
            "Editor" => ComponentKind::Editor {
                binding: DataBinding::default(),
            },
            "Table" => ComponentKind::Table {
                binding: DataBinding::default(),
                columns: Vec::new(),
            },
            other => ComponentKind::Other {
                class_name: other.to_string(),
            },
        };
        kind.apply(update);
        kind
    }

    /// Merge the variant-specific properties present in `update`.
    pub fn apply(&mut self, update: &ComponentUpdate) {
        match self {
            ComponentKind::Panel { screen } => {
                let info = screen.get_or_insert_with(ScreenInfo::default);
                info.apply(update);
                if info.is_empty() && !info.modal {
                    *screen = None;
                }
            }
            ComponentKind::GroupPanel { text }
            | ComponentKind::Button { text }
            | ComponentKind::Label { text } => merge(text, &update.text),
            ComponentKind::ToolBarPanel { area } => {
                if let Some(code) = update.tool_bar_area {
                    *area = ToolBarArea::from_code(code);
                }
            }
            ComponentKind::Editor { binding } => {
                merge_binding(binding, &update.data_row, &update.column_name)
            }
            ComponentKind::Table { binding, columns } => {
                merge_binding(binding, &update.data_book, &None);
                if let Some(cols) = &update.columns {
                    *columns = cols.clone();
                }
            }
            ComponentKind::ScrollPanel
            | ComponentKind::SplitPanel
            | ComponentKind::DesktopPanel
            | ComponentKind::ToolBarHelperMain
            | ComponentKind::ToolBarHelperCenter
            | ComponentKind::ToolBar
            | ComponentKind::Other { .. } => {}
        }
    }

    /// Protocol `className` of this variant.
    pub fn class_name(&self) -> &str {
        match self {
            ComponentKind::Panel { .. } => "Panel",
            ComponentKind::GroupPanel { .. } => "GroupPanel",
            ComponentKind::ScrollPanel => "ScrollPanel",
            ComponentKind::SplitPanel => "SplitPanel",
            ComponentKind::DesktopPanel => "DesktopPanel",
            ComponentKind::ToolBarPanel { .. } => "ToolBarPanel",
            ComponentKind::ToolBarHelperMain => "ToolBarHelperMain",
            ComponentKind::ToolBarHelperCenter => "ToolBarHelperCenter",
            ComponentKind::ToolBar => "ToolBar",
            ComponentKind::Button { .. } => "Button",
            ComponentKind::Label { .. } => "Label",
            ComponentKind::Editor { .. } => "Editor",
            ComponentKind::Table { .. } => "Table",
            ComponentKind::Other { class_name } => class_name,
        }
    }

    /// Whether this component lays out children of its own.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ComponentKind::Panel { .. }
                | ComponentKind::GroupPanel { .. }
                | ComponentKind::ScrollPanel
                | ComponentKind::SplitPanel
                | ComponentKind::DesktopPanel
                | ComponentKind::ToolBarPanel { .. }
                | ComponentKind::ToolBarHelperMain
                | ComponentKind::ToolBarHelperCenter
                | ComponentKind::ToolBar
        )
    }

    /// Data provider this component reads from, if any.
    pub fn data_provider(&self) -> Option<&str> {
        match self {
            ComponentKind::Editor { binding } | ComponentKind::Table { binding, .. } => {
                Some(binding.data_provider.as_str()).filter(|p| !p.is_empty())
            }
            _ => None,
        }
    }
}

fn merge<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

fn merge_binding(binding: &mut DataBinding, provider: &Option<String>, column: &Option<String>) {
    if let Some(provider) = provider {
        binding.data_provider = provider.clone();
    }
    merge(&mut binding.column_name, column);
}

// ============================================================================
// ComponentUpdate
// ============================================================================

/// One entry of a server `changedComponents` array.
///
/// Every property is optional; absent properties leave the stored value
/// untouched. `~remove` and `~destroy` are transient and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_of: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_bar_area: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_row: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_book: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(
        default,
        rename = "screen_className",
        skip_serializing_if = "Option::is_none"
    )]
    pub screen_class_name: Option<String>,
    #[serde(
        default,
        rename = "screen_navigationName",
        skip_serializing_if = "Option::is_none"
    )]
    pub screen_navigation_name: Option<String>,
    #[serde(default, rename = "screen_title", skip_serializing_if = "Option::is_none")]
    pub screen_title: Option<String>,
    #[serde(default, rename = "screen_modal", skip_serializing_if = "Option::is_none")]
    pub screen_modal: Option<bool>,
    #[serde(default, rename = "~remove", skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,
    #[serde(default, rename = "~destroy", skip_serializing_if = "Option::is_none")]
    pub destroy: Option<bool>,
    /// Properties without a typed field, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = Some(constraints.into());
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn with_layout_data(mut self, layout_data: impl Into<String>) -> Self {
        self.layout_data = Some(layout_data.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn removed(mut self, remove: bool) -> Self {
        self.remove = Some(remove);
        self
    }

    pub fn destroyed(mut self) -> Self {
        self.destroy = Some(true);
        self
    }

    pub fn is_remove(&self) -> bool {
        self.remove == Some(true)
    }

    pub fn is_destroy(&self) -> bool {
        self.destroy == Some(true)
    }
}

// ============================================================================
// Component
// ============================================================================

/// What a merge changed on a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Parent, visibility, constraints or ordering changed: the parent's
    /// child list must be re-rendered.
    pub structural: bool,
    /// `parent` changed, so the old parent must be renotified too.
    pub moved: bool,
    /// Any property changed.
    pub properties: bool,
}

/// A component tracked by the content store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub id: String,
    pub parent: Option<String>,
    pub name: String,
    pub kind: ComponentKind,
    pub visible: bool,
    pub constraints: Option<String>,
    pub index_of: Option<i32>,
    pub layout: Option<String>,
    pub layout_data: Option<String>,
    pub preferred_size: Option<Size>,
    pub minimum_size: Option<Size>,
    pub maximum_size: Option<Size>,
    pub extra: Map<String, Value>,
}

impl Component {
    /// Create a component from its first appearance in a response.
    pub fn from_update(update: &ComponentUpdate) -> Self {
        let class_name = update.class_name.as_deref().unwrap_or("Other");
        let mut component = Self {
            id: update.id.clone(),
            parent: None,
            name: update.id.clone(),
            kind: ComponentKind::from_update(class_name, update),
            visible: true,
            constraints: None,
            index_of: None,
            layout: None,
            layout_data: None,
            preferred_size: None,
            minimum_size: None,
            maximum_size: None,
            extra: Map::new(),
        };
        component.merge_common(update);
        component
    }

    /// Shallow-merge the properties present in `update`.
    pub fn apply(&mut self, update: &ComponentUpdate) -> ChangeSet {
        let before = self.clone();

        match &update.class_name {
            Some(class_name) if class_name != self.kind.class_name() => {
                self.kind = ComponentKind::from_update(class_name, update);
            }
            _ => self.kind.apply(update),
        }
        self.merge_common(update);

        ChangeSet {
            structural: before.parent != self.parent
                || before.visible != self.visible
                || before.constraints != self.constraints
                || before.index_of != self.index_of,
            moved: before.parent != self.parent,
            properties: before != *self,
        }
    }

    fn merge_common(&mut self, update: &ComponentUpdate) {
        merge(&mut self.parent, &update.parent);
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(visible) = update.visible {
            self.visible = visible;
        }
        merge(&mut self.constraints, &update.constraints);
        merge(&mut self.index_of, &update.index_of);
        merge(&mut self.layout, &update.layout);
        merge(&mut self.layout_data, &update.layout_data);
        if let Some(raw) = &update.preferred_size {
            self.preferred_size = Some(Size::parse(raw));
        }
        if let Some(raw) = &update.minimum_size {
            self.minimum_size = Some(Size::parse(raw));
        }
        if let Some(raw) = &update.maximum_size {
            self.maximum_size = Some(Size::parse(raw));
        }
        for (key, value) in &update.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    pub fn class_name(&self) -> &str {
        self.kind.class_name()
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Screen info when this is a top-level screen panel.
    pub fn screen(&self) -> Option<&ScreenInfo> {
        match &self.kind {
            ComponentKind::Panel { screen } => screen.as_ref(),
            _ => None,
        }
    }
}
