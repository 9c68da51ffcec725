/// Scripted native session against the in-memory backend.
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = demo::run() {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::PathBuf;
    use std::rc::Rc;

    use web_time::Instant;
    use wmm::backend::memory::MemoryBackend;
    use wmm::viewer::{ImageView, ViewOptions};
    use wmm::{AppConfig, AppState, EditMode, ImageHandle, SharedRenderSurface, Target, ViewerError};
    use wmm_ui::{Key, Modifiers, MouseButton, Rectangle, Size};

    pub fn run() -> Result<(), ViewerError> {
        let path = std::env::args()
            .nth(1)
            .map_or_else(|| PathBuf::from("wmm-config.json"), PathBuf::from);
        let config = AppConfig::load_or_default(&path);
        env_logger::Builder::new()
            .filter_level(config.log_level.to_level_filter())
            .init();

        let state = AppState::default();
        let surface = Rc::new(SharedRenderSurface::new(
            &state,
            config.viewer,
            Size::new(1600.0, 600.0),
        )?);

        // One tile per time point
        let area = Rectangle::new(0.0, 0.0, 1600.0, 600.0);
        let left_backend = MemoryBackend::demo();
        let mut left_options = ViewOptions::tiled(area, 2, 0);
        left_options.linked = true;
        left_options.minimap = true;
        let left = ImageView::mount(
            "t0".into(),
            ImageHandle::from_backend(left_backend.clone()),
            Rc::clone(&surface),
            &state,
            &config.channels,
            left_options,
        )?;

        let mut right_options = ViewOptions::tiled(area, 2, 1);
        right_options.linked = true;
        let right = ImageView::mount(
            "t1".into(),
            ImageHandle::from_backend(MemoryBackend::demo()),
            Rc::clone(&surface),
            &state,
            &config.channels,
            right_options,
        )?;

        for viewport in &surface.frame().viewports {
            log::info!("🖼️ {} at {:?}", viewport.id, viewport.bounds);
        }

        // Walk to the first spine and jump there on both linked views
        left.activate();
        left.handle_key(Key::Right, Modifiers::alt());
        log::info!("🎯 left camera {:?}", left.camera());
        log::info!("🎯 right camera {:?}", right.camera());

        // Add a spine to the first segment with the add-spine tool
        if let Some(&segment) = left_backend.segment_ids().first() {
            state.selected_segment.set(Some(segment));
            left.set_edit_mode(EditMode::AddSpine);
            if let Some(local) = left.world_to_screen(Target::new(200.0, 150.0)) {
                let outcome = left.on_press(local, MouseButton::Left, Modifiers::default(), Instant::now());
                log::info!("➕ press on background: {:?}", outcome);
            }
            log::info!(
                "📍 segment {} now has {} spines",
                segment,
                left_backend.spines_of(segment).len()
            );
        }

        left.handle_key(Key::Escape, Modifiers::default());
        left.handle_key(Key::Escape, Modifiers::default());
        left.handle_key(Key::Enter, Modifiers::default());

        log::info!(
            "✅ session done: revision {}, {} overlay builds on t{}",
            state.revision.get(),
            left.overlay_build_count(),
            left.image().index()
        );
        Ok(())
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
