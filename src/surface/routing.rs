//! Pointer routing from the unified event stream to a layout leaf.
//!
//! The surface receives every pointer-down on one invisible full-extent
//! layer. The docking layout that owns the tabs is an outside collaborator
//! reached through [`LayoutHost`].

use wmm_ui::{Point, Rectangle};

/// A visible tab/leaf of the docking layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLeaf {
    pub id: String,
    pub bounds: Rectangle,
}

/// What the surface needs from the docking layout.
pub trait LayoutHost {
    /// The currently selected leaf.
    fn selected_leaf(&self) -> Option<LayoutLeaf>;

    /// Visible leaves in layout order.
    fn leaves(&self) -> Vec<LayoutLeaf>;

    /// Make `leaf` the selected one.
    fn select_leaf(&self, leaf: &LayoutLeaf);
}

/// Result of routing one pointer-down.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPointer {
    pub leaf: LayoutLeaf,
    /// Position relative to the leaf
    pub local: Point,
    /// True when routing changed the selected leaf
    pub switched: bool,
}

/// Find the leaf under `position`, selecting it when it is not already
/// selected. The full leaf list is only searched when the point falls
/// outside the selected leaf.
pub fn route_pointer(host: &dyn LayoutHost, position: Point) -> Option<RoutedPointer> {
    if let Some(selected) = host.selected_leaf() {
        if selected.bounds.contains(position) {
            return Some(RoutedPointer {
                local: selected.bounds.to_local(position),
                leaf: selected,
                switched: false,
            });
        }
    }

    let leaf = host
        .leaves()
        .into_iter()
        .find(|leaf| leaf.bounds.contains(position))?;
    log::debug!("🖱️ pointer selects leaf {}", leaf.id);
    host.select_leaf(&leaf);
    Some(RoutedPointer {
        local: leaf.bounds.to_local(position),
        leaf,
        switched: true,
    })
}
