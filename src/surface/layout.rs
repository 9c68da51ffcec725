//! Placement of views and minimaps on the shared surface.

use wmm_ui::{Rectangle, Size};

use crate::config::{MinimapConfig, MinimapCorner};
use crate::model::ViewId;
use crate::state::ViewRegistration;

/// Cell `index` of a near-square grid of `elements` cells over `bounds`.
///
/// The grid has `ceil(sqrt(n))` columns and as many rows as needed; cells
/// fill row by row.
pub fn grid_cell(bounds: Rectangle, elements: usize, index: usize) -> Rectangle {
    let elements = elements.max(1);
    let columns = (elements as f64).sqrt().ceil() as usize;
    let rows = elements.div_ceil(columns);

    let width = bounds.width / columns as f32;
    let height = bounds.height / rows as f32;
    let col = index % columns;
    let row = index / columns;

    Rectangle::new(
        bounds.x + col as f32 * width,
        bounds.y + row as f32 * height,
        width,
        height,
    )
}

/// Size of a minimap for an image of `image` pixels shown in a detail view
/// of `detail` screen pixels.
pub fn minimap_size(image: (u32, u32), detail: Size, config: &MinimapConfig) -> Size {
    let (w, h) = image;
    if w == 0 || h == 0 {
        return Size::zero();
    }
    let ratio = h as f32 / w as f32;
    if ratio < 1.0 {
        let width = config
            .max_width
            .min((detail.width * config.scale).max(config.min_width));
        Size::new(width, width * ratio)
    } else {
        let height = config
            .max_height
            .min((detail.height * config.scale).max(config.min_height));
        Size::new(height / ratio, height)
    }
}

/// Minimap rectangle pinned to a corner of `detail`.
pub fn minimap_bounds(image: (u32, u32), detail: Rectangle, config: &MinimapConfig) -> Rectangle {
    let size = minimap_size(image, detail.size(), config);
    let margin = config.margin;
    let (x, y) = match config.position {
        MinimapCorner::TopLeft => (margin, margin),
        MinimapCorner::TopRight => (detail.width - size.width - margin, margin),
        MinimapCorner::BottomLeft => (margin, detail.height - size.height - margin),
        MinimapCorner::BottomRight => (
            detail.width - size.width - margin,
            detail.height - size.height - margin,
        ),
    };
    Rectangle::new(detail.x + x, detail.y + y, size.width, size.height)
}

/// What a sub-viewport shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportKind {
    Detail,
    Minimap { parent: ViewId },
}

/// One region of the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SubViewport {
    pub id: ViewId,
    pub bounds: Rectangle,
    pub kind: ViewportKind,
}

/// Layout of one composited frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Details in registration order, then minimaps
    pub viewports: Vec<SubViewport>,
    /// Invisible layer covering every viewport; receives all pointer-downs
    pub hit_layer: Rectangle,
}

impl Frame {
    pub fn compute(registrations: &[ViewRegistration], canvas: Size, minimap: &MinimapConfig) -> Self {
        let mut viewports: Vec<SubViewport> = registrations
            .iter()
            .map(|r| SubViewport {
                id: r.id.clone(),
                bounds: r.config.bounds(),
                kind: ViewportKind::Detail,
            })
            .collect();

        for r in registrations.iter().filter(|r| r.config.minimap_enabled) {
            let shape = r.config.image.image_shape();
            let bounds = minimap_bounds((shape.width, shape.height), r.config.bounds(), minimap);
            if !bounds.size().is_drawable() {
                continue;
            }
            viewports.push(SubViewport {
                id: r.id.minimap(),
                bounds,
                kind: ViewportKind::Minimap {
                    parent: r.id.clone(),
                },
            });
        }

        Self {
            viewports,
            hit_layer: Rectangle::new(0.0, 0.0, canvas.width, canvas.height),
        }
    }

    pub fn get(&self, id: &ViewId) -> Option<&SubViewport> {
        self.viewports.iter().find(|v| &v.id == id)
    }

    /// Viewport under a surface point. Minimaps sit above their parent.
    pub fn viewport_at(&self, point: wmm_ui::Point) -> Option<&SubViewport> {
        self.viewports
            .iter()
            .rev()
            .find(|v| v.bounds.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_cells() {
        let bounds = Rectangle::new(10.0, 20.0, 300.0, 200.0);
        // 3 elements -> 2 columns, 2 rows
        assert_eq!(grid_cell(bounds, 3, 0), Rectangle::new(10.0, 20.0, 150.0, 100.0));
        assert_eq!(grid_cell(bounds, 3, 1), Rectangle::new(160.0, 20.0, 150.0, 100.0));
        assert_eq!(grid_cell(bounds, 3, 2), Rectangle::new(10.0, 120.0, 150.0, 100.0));
        assert_eq!(grid_cell(bounds, 1, 0), bounds);
    }

    #[test]
    fn test_minimap_size_landscape_and_portrait() {
        let config = MinimapConfig::default();
        // Landscape: width = min(150, max(800 * 0.2, 0)) = 150
        assert_eq!(minimap_size((1000, 500), Size::new(800.0, 600.0), &config), Size::new(150.0, 75.0));
        // Small detail view scales down
        assert_eq!(minimap_size((1000, 500), Size::new(400.0, 300.0), &config), Size::new(80.0, 40.0));
        // Portrait: height = min(150, 600 * 0.2) = 120
        assert_eq!(minimap_size((500, 1000), Size::new(800.0, 600.0), &config), Size::new(60.0, 120.0));
    }

    #[test]
    fn test_minimap_corners_offset_by_parent() {
        let mut config = MinimapConfig::default();
        let detail = Rectangle::new(100.0, 50.0, 400.0, 300.0);
        let top_left = minimap_bounds((1000, 500), detail, &config);
        assert_eq!(top_left, Rectangle::new(108.0, 58.0, 80.0, 40.0));

        config.position = MinimapCorner::BottomRight;
        let bottom_right = minimap_bounds((1000, 500), detail, &config);
        assert_eq!(bottom_right, Rectangle::new(100.0 + 400.0 - 80.0 - 8.0, 50.0 + 300.0 - 40.0 - 8.0, 80.0, 40.0));
    }
}
