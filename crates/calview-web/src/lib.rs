#![forbid(unsafe_code)]

//! `calview-web` runs the calendar view engine in the browser.
//!
//! Design:
//! - **Host-driven**: [`calview_core`] never touches the DOM. `WebHost`
//!   implements [`Host`](calview_core::Host) over `web-sys` and turns DOM
//!   events, timers and intersection callbacks back into engine calls.
//! - **One view per page**: the `CalendarView<WebHost>` lives in a
//!   thread-local slot. Every callback borrows it for the duration of one
//!   engine call. A callback that finds the slot busy is dropped with a
//!   warning.
//! - **Configuration** comes from an optional inline JSON block
//!   (see [`CONFIG_SCRIPT_ID`]). Bad JSON never stops the page: the defaults
//!   are used instead.
//!
//! Only [`resolve_config`] and [`HostError`] exist off `wasm32`; everything
//! touching `web-sys` is compiled for the browser target alone.

#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod runtime;

#[cfg(target_arch = "wasm32")]
pub use host::WebHost;
#[cfg(target_arch = "wasm32")]
pub use runtime::{rescan, start};

use calview_core::ViewConfig;

/// Id of the `<script type="application/json">` element holding overrides.
pub const CONFIG_SCRIPT_ID: &str = "calview-config";

/// Failure to reach the browser environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("no global window")]
    MissingWindow,
    #[error("window has no document")]
    MissingDocument,
    #[error("document has no body")]
    MissingBody,
    #[error("javascript error: {0}")]
    Js(String),
}

/// Build the view configuration from the raw text of the config block.
///
/// Absent or blank text yields the defaults. Text that does not parse or
/// validate is reported and also yields the defaults.
#[must_use]
pub fn resolve_config(raw: Option<&str>) -> ViewConfig {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return ViewConfig::default();
    };
    match ViewConfig::from_json_str(raw) {
        Ok(config) => {
            tracing::debug!(bytes = raw.len(), "view config loaded");
            config
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid view config, using defaults");
            ViewConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_or_blank_config_is_default() {
        assert_eq!(resolve_config(None), ViewConfig::default());
        assert_eq!(resolve_config(Some("  \n")), ViewConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            resolve_config(Some(r#"{ "gap": 4, "timing": { "close_duration_ms": 300 } }"#));
        assert_eq!(config.gap, 4.0);
        assert_eq!(config.timing.close_duration_ms, 300);
        assert_eq!(config.margin, ViewConfig::default().margin);
        assert_eq!(config.classes, ViewConfig::default().classes);
    }

    #[test]
    fn broken_config_falls_back() {
        assert_eq!(resolve_config(Some("{ not json")), ViewConfig::default());
        assert_eq!(
            resolve_config(Some(r#"{ "observer": { "threshold": 3.0 } }"#)),
            ViewConfig::default()
        );
    }

    #[test]
    fn host_error_messages() {
        assert_eq!(HostError::MissingBody.to_string(), "document has no body");
        assert_eq!(
            HostError::Js("TypeError".into()).to_string(),
            "javascript error: TypeError"
        );
    }
}
