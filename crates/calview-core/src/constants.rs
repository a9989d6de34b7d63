#![forbid(unsafe_code)]

//! Static tokens shared by every part of the engine.
//!
//! Everything here is the *default*; [`ViewConfig`](crate::config::ViewConfig)
//! carries the values actually used at runtime so a theme can rename class
//! tokens without recompiling.

use std::time::Duration;

/// Gap between the trigger edge and the popover edge, in CSS pixels.
pub const DEFAULT_GAP_PX: f64 = 10.0;

/// Minimum distance kept between the popover and the viewport edges.
pub const DEFAULT_MARGIN_PX: f64 = 10.0;

/// Fraction of a calendar that must be on screen before it counts as visible.
pub const OBSERVER_THRESHOLD: f64 = 0.1;

/// Pre-trigger margin around the viewport used by the intersection observer.
pub const OBSERVER_ROOT_MARGIN_PX: f64 = 50.0;

/// Delay before the active class lands, so the browser has laid out the
/// initial (hidden) state and the enter transition actually runs.
pub const ACTIVATE_DELAY: Duration = Duration::from_millis(10);

/// Length of the exit transition; nodes are removed once it elapses.
pub const CLOSE_DURATION: Duration = Duration::from_millis(200);

/// CSS class tokens read from and written to the document.
pub mod class {
    pub const CALENDAR: &str = "wp-block-query-calendar";
    pub const EVENT: &str = "query-calendar__event";
    pub const POPOVER: &str = "query-calendar__popover";
    pub const BACKDROP: &str = "query-calendar__backdrop";
    pub const POPOVER_CLOSE: &str = "query-calendar__popover-close";
    pub const ACTIVE: &str = "is-active";
}

/// Attribute names of the server-rendered markup contract.
pub mod attr {
    /// On an event marker: id of the hidden element holding popover content.
    pub const CONTENT_REF: &str = "data-popover-content";
    /// On an event marker: raw inline style applied to the popover.
    pub const POPOVER_STYLE: &str = "data-popover-style";
    /// Idempotency guard written once a marker has listeners.
    pub const SETUP: &str = "data-setup";
    /// Engine-issued calendar identity.
    pub const CALENDAR_ID: &str = "data-calview-id";
}

/// Accessibility literals.
pub mod aria {
    pub const ROLE: &str = "role";
    pub const ROLE_DIALOG: &str = "dialog";
    pub const ROLE_BUTTON: &str = "button";
    pub const MODAL: &str = "aria-modal";
    pub const LABEL: &str = "aria-label";
    pub const TABINDEX: &str = "tabindex";
    pub const CLOSE_LABEL: &str = "Close";
    pub const CLOSE_GLYPH: &str = "&times;";
}
