use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::backend::AlertSink;
use crate::config::AppConfig;
use crate::state::AppState;

/// Reports backend failures through `window.alert`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserAlertSink;

impl AlertSink for BrowserAlertSink {
    fn alert(&self, message: &str) {
        log::warn!("⚠️ {}", message);
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.alert_with_message(message) {
                log::error!("❌ window.alert failed: {:?}", e);
            }
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    if let Some(level) = config.log_level.to_level_filter().to_level() {
        // Fails only when a logger is already installed
        console_log::init_with_level(level).ok();
    }
    log::info!("🚀 WMM viewer core loaded");
}

/// Process-wide state for a browser session, alerting through the window.
pub fn browser_state() -> AppState {
    AppState::new(Rc::new(BrowserAlertSink))
}
