//! Camera mathematics.
//!
//! Cameras look at an image-space `target` that sits at the centre of the
//! viewport; `zoom` is a base-2 exponent, so one image pixel spans
//! `2^zoom` screen pixels. These helpers are pure and shared by the
//! camera store, the render surface and the views.

use wmm_ui::{Point, Size};

use crate::model::{CameraState, Target};

/// Zoom at which an image of `image` pixels fits `viewport`, backed off by
/// `back_off` zoom steps. `back_off = 1.0` shows the image at half the
/// fitting size.
///
/// Returns `None` when either extent is empty.
pub fn fit_zoom(image: (u32, u32), viewport: Size, back_off: f64) -> Option<f64> {
    let (width, height) = image;
    if width == 0 || height == 0 || !viewport.is_drawable() {
        return None;
    }
    let ratio = (f64::from(viewport.width) / f64::from(width))
        .min(f64::from(viewport.height) / f64::from(height));
    Some(ratio.log2() - back_off)
}

/// Camera centred on the image at the backed-off fitting zoom.
pub fn default_camera(image: (u32, u32), viewport: Size, back_off: f64) -> Option<(Target, f64)> {
    let zoom = fit_zoom(image, viewport, back_off)?;
    let target = Target::new(f64::from(image.0) / 2.0, f64::from(image.1) / 2.0);
    Some((target, zoom))
}

/// Image-space position under a viewport-local screen point.
pub fn screen_to_world(camera: &CameraState, viewport: Size, local: Point) -> Target {
    let scale = camera.scale();
    Target::new(
        camera.target.x + (f64::from(local.x) - f64::from(viewport.width) / 2.0) / scale,
        camera.target.y + (f64::from(local.y) - f64::from(viewport.height) / 2.0) / scale,
    )
}

/// Viewport-local screen position of an image-space point.
pub fn world_to_screen(camera: &CameraState, viewport: Size, world: Target) -> Point {
    let scale = camera.scale();
    Point::new(
        ((world.x - camera.target.x) * scale + f64::from(viewport.width) / 2.0) as f32,
        ((world.y - camera.target.y) * scale + f64::from(viewport.height) / 2.0) as f32,
    )
}

/// Camera after dragging the image by a screen-space delta.
pub fn pan_by(camera: &CameraState, dx: f32, dy: f32) -> CameraState {
    let scale = camera.scale();
    CameraState {
        target: Target::new(
            camera.target.x - f64::from(dx) / scale,
            camera.target.y - f64::from(dy) / scale,
        ),
        ..*camera
    }
}

/// Camera zoomed to `new_zoom` while the image point under `anchor` stays put.
///
/// No clamping happens here; out-of-range results are handled by the
/// surface, which also decides whether the accompanying pan commits.
pub fn zoom_at(camera: &CameraState, viewport: Size, anchor: Point, new_zoom: f64) -> CameraState {
    let world = screen_to_world(camera, viewport, anchor);
    let new_scale = new_zoom.exp2();
    let rel_x = f64::from(anchor.x) - f64::from(viewport.width) / 2.0;
    let rel_y = f64::from(anchor.y) - f64::from(viewport.height) / 2.0;
    CameraState {
        target: Target::new(world.x - rel_x / new_scale, world.y - rel_y / new_scale),
        zoom: new_zoom,
        version: camera.version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_fit_zoom_uses_tighter_axis() {
        // 800/1600 = 0.5 is tighter than 600/600 = 1
        let zoom = fit_zoom((1600, 600), Size::new(800.0, 600.0), 0.0).unwrap();
        assert!(approx_eq(zoom, -1.0));

        let backed_off = fit_zoom((1600, 600), Size::new(800.0, 600.0), 0.5).unwrap();
        assert!(approx_eq(backed_off, -1.5));
    }

    #[test]
    fn test_fit_zoom_rejects_empty() {
        assert!(fit_zoom((0, 10), Size::new(10.0, 10.0), 0.5).is_none());
        assert!(fit_zoom((10, 10), Size::zero(), 0.5).is_none());
    }

    #[test]
    fn test_default_camera_centres_image() {
        let (target, _) = default_camera((512, 256), Size::new(800.0, 600.0), 0.5).unwrap();
        assert_eq!(target, Target::new(256.0, 128.0));
    }

    #[test]
    fn test_screen_world_roundtrip() {
        let camera = CameraState::new(Target::new(100.0, 50.0), 1.0, 0);
        let viewport = Size::new(400.0, 300.0);
        let p = Point::new(250.0, 100.0);
        let world = screen_to_world(&camera, viewport, p);
        let back = world_to_screen(&camera, viewport, world);
        assert!((back.x - p.x).abs() < 1e-4);
        assert!((back.y - p.y).abs() < 1e-4);
    }

    #[test]
    fn test_viewport_centre_maps_to_target() {
        let camera = CameraState::new(Target::new(10.0, 20.0), 3.0, 0);
        let world = screen_to_world(&camera, Size::new(200.0, 100.0), Point::new(100.0, 50.0));
        assert_eq!(world, Target::new(10.0, 20.0));
    }

    #[test]
    fn test_zoom_at_preserves_anchor_point() {
        let camera = CameraState::new(Target::new(40.0, 30.0), 0.0, 7);
        let viewport = Size::new(200.0, 200.0);
        let anchor = Point::new(150.0, 60.0);
        let before = screen_to_world(&camera, viewport, anchor);

        let zoomed = zoom_at(&camera, viewport, anchor, 2.0);
        let after = screen_to_world(&zoomed, viewport, anchor);

        assert_eq!(zoomed.zoom, 2.0);
        assert_eq!(zoomed.version, 7);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_pan_by_scales_with_zoom() {
        let camera = CameraState::new(Target::new(0.0, 0.0), 1.0, 0);
        let panned = pan_by(&camera, 10.0, -4.0);
        assert_eq!(panned.target, Target::new(-5.0, 2.0));
        assert_eq!(panned.zoom, 1.0);
    }
}
