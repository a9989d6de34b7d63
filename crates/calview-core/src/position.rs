#![forbid(unsafe_code)]

//! Popover placement relative to its trigger.
//!
//! [`compute_position`] is pure geometry. [`Repositioner`] is the callback
//! the engine runs on scroll/resize: it re-reads live geometry through the
//! [`Host`] and re-applies the position, but only while a session is active
//! and the owning calendar is visible.
//!
//! # Placement rules
//!
//! 1. Below the trigger, horizontally centered on it, `gap` pixels away.
//! 2. Horizontal clamp into `[margin, viewport.width - margin]`: left edge
//!    first, then right edge. The right clamp runs last, so it wins when the
//!    popover is wider than the usable band.
//! 3. If the bottom edge would pass `viewport.height - margin`, flip above
//!    the trigger. The vertical decision is independent of the horizontal one.
//! 4. A top still above `margin` is clamped to `margin`. In a viewport too
//!    short for either side this overlaps the trigger; that is accepted.

use crate::geometry::{Rect, Size, Viewport};
use crate::host::Host;
use crate::store::{CalendarId, ViewState};

/// Spacing parameters for placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    /// Distance between trigger and popover.
    pub gap: f64,
    /// Minimum distance between popover and viewport edges.
    pub margin: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            gap: crate::constants::DEFAULT_GAP_PX,
            margin: crate::constants::DEFAULT_MARGIN_PX,
        }
    }
}

/// Top-left corner of the popover in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

/// Compute where the popover goes.
#[must_use]
pub fn compute_position(
    popover: Size,
    trigger: Rect,
    viewport: Viewport,
    config: PlacementConfig,
) -> Position {
    let PlacementConfig { gap, margin } = config;

    let mut left = trigger.left() + trigger.width / 2.0 - popover.width / 2.0;
    let mut top = trigger.bottom() + gap;

    if left < margin {
        left = margin;
    }
    if left + popover.width > viewport.width - margin {
        left = viewport.width - margin - popover.width;
    }

    if top + popover.height > viewport.height - margin {
        top = trigger.top() - popover.height - gap;
    }
    if top < margin {
        top = margin;
    }

    Position { top, left }
}

/// Measure `popover` and `trigger`, compute the placement and write it as
/// inline `top`/`left`.
pub fn place<H: Host>(
    host: &mut H,
    popover: &H::Element,
    trigger: &H::Element,
    config: PlacementConfig,
) -> Position {
    let popover_box = host.bounding_rect(popover);
    let trigger_box = host.bounding_rect(trigger);
    let position = compute_position(popover_box.size(), trigger_box, host.viewport(), config);
    host.set_style_px(popover, "top", position.top);
    host.set_style_px(popover, "left", position.left);
    position
}

/// Scroll/resize callback bound to one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Repositioner<E> {
    popover: E,
    trigger: E,
    calendar: CalendarId,
}

impl<E: Clone + PartialEq> Repositioner<E> {
    #[must_use]
    pub fn new(popover: E, trigger: E, calendar: CalendarId) -> Self {
        Self {
            popover,
            trigger,
            calendar,
        }
    }

    /// Re-place the popover. Returns `None` (and touches nothing) when no
    /// session is active or the calendar is not visible.
    pub fn run<H>(
        &self,
        host: &mut H,
        state: &ViewState<E>,
        config: PlacementConfig,
    ) -> Option<Position>
    where
        H: Host<Element = E>,
    {
        if !state.is_session_active() || !state.visibility.is_visible(self.calendar) {
            return None;
        }
        let position = place(host, &self.popover, &self.trigger, config);
        tracing::trace!(
            calendar = self.calendar.get(),
            top = position.top,
            left = position.left,
            "popover repositioned"
        );
        Some(position)
    }
}
