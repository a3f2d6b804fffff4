//! ToolBarPanel expansion
//!
//! A server `ToolBarPanel` is tracked as three components: the panel itself
//! (a plain BorderLayout), `<id>-tbMain` docking the toolbars to one side,
//! and `<id>-tbCenter` holding the regular content with the panel's original
//! layout. Updates addressed to the panel are rewritten before they reach
//! the trees.

use std::collections::HashSet;

use thinview_core::{ComponentKind, ComponentUpdate, ToolBarArea};

use super::ContentStore;

const MAIN_SUFFIX: &str = "-tbMain";
const CENTER_SUFFIX: &str = "-tbCenter";

const PANEL_LAYOUT: &str = "BorderLayout,0,0,0,0,0,0";

/// Id of the synthetic toolbar holder of panel `id`.
pub fn main_id(id: &str) -> String {
    format!("{id}{MAIN_SUFFIX}")
}

/// Id of the synthetic content holder of panel `id`.
pub fn center_id(id: &str) -> String {
    format!("{id}{CENTER_SUFFIX}")
}

/// Flow of toolbars along the docked side, never wrapping.
fn main_layout(area: ToolBarArea) -> String {
    let orientation = if area.is_horizontal() { 0 } else { 1 };
    format!("FlowLayout,0,0,0,0,0,0,{orientation},0,0,3,false")
}

impl ContentStore {
    fn is_tool_bar_panel(&self, id: &str) -> bool {
        self.component(id)
            .is_some_and(|c| matches!(c.kind, ComponentKind::ToolBarPanel { .. }))
    }

    pub(super) fn expand_tool_bar_panels(
        &self,
        updates: Vec<ComponentUpdate>,
    ) -> Vec<ComponentUpdate> {
        let mut panels_in_batch: HashSet<String> = HashSet::new();
        let mut expanded = Vec::with_capacity(updates.len());

        for mut update in updates {
            let class_name = update
                .class_name
                .clone()
                .or_else(|| self.component(&update.id).map(|c| c.class_name().to_string()));

            if let Some(parent) = update.parent.clone() {
                if panels_in_batch.contains(&parent) || self.is_tool_bar_panel(&parent) {
                    update.parent = Some(if class_name.as_deref() == Some("ToolBar") {
                        main_id(&parent)
                    } else {
                        center_id(&parent)
                    });
                }
            }

            if class_name.as_deref() != Some("ToolBarPanel") {
                expanded.push(update);
                continue;
            }

            panels_in_batch.insert(update.id.clone());
            let first_appearance = self.component(&update.id).is_none();
            expanded.extend(split_panel(update, first_appearance));
        }
        expanded
    }
}

/// Rewrite one panel update into panel, main and center updates.
fn split_panel(mut panel: ComponentUpdate, first_appearance: bool) -> [ComponentUpdate; 3] {
    let id = panel.id.clone();
    let mut main = ComponentUpdate::new(main_id(&id));
    let mut center = ComponentUpdate::new(center_id(&id));

    center.layout = panel.layout.take();
    center.layout_data = panel.layout_data.take();

    let area = match panel.tool_bar_area {
        Some(code) => Some(ToolBarArea::from_code(code)),
        None if first_appearance => Some(ToolBarArea::North),
        None => None,
    };
    if let Some(area) = area {
        main.constraints = Some(area.border_constraint().to_string());
        main.layout = Some(main_layout(area));
    }

    if first_appearance {
        tracing::debug!("Expanding ToolBarPanel {}", id);
        panel.layout = Some(PANEL_LAYOUT.to_string());
        main = main.with_class("ToolBarHelperMain").with_parent(&id);
        center = center
            .with_class("ToolBarHelperCenter")
            .with_parent(&id)
            .with_constraints("Center");
    }

    main.remove = panel.remove;
    main.destroy = panel.destroy;
    center.remove = panel.remove;
    center.destroy = panel.destroy;

    [panel, main, center]
}
