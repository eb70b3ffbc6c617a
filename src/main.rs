mod app;
mod attachment;
mod config;
mod editor_core;
mod error;
mod markup;
mod session;
mod shortcuts;

use app::*;
use config::EditorConfig;
use error::ConfigError;
use leptos::prelude::*;

const CONFIG_ELEMENT_ID: &str = "note-editor-config";

/// Reads the optional inline JSON config block from the page.
fn load_config() -> Result<EditorConfig, ConfigError> {
    match document()
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|el| el.text_content())
    {
        Some(raw) if !raw.trim().is_empty() => EditorConfig::from_json(&raw),
        _ => Ok(EditorConfig::default()),
    }
}

fn main() {
    console_error_panic_hook::set_once();

    let (config, config_error) = match load_config() {
        Ok(config) => (config, None),
        Err(err) => (EditorConfig::default(), Some(err)),
    };
    if let Err(err) = console_log::init_with_level(config.log_level()) {
        leptos::web_sys::console::warn_1(&format!("failed to initialize logger: {err}").into());
    }
    if let Some(err) = config_error {
        log::warn!("{err}; falling back to defaults");
    }

    log::info!("note editor starting with {} models", config.models.len());
    leptos::mount::mount_to_body(move || view! { <App config=config /> })
}
