#![forbid(unsafe_code)]

//! Event-marker activation and the DOM event handlers.
//!
//! Markers are real hyperlinks so the calendar works without script. Once a
//! marker's calendar becomes visible it is upgraded in place: it gets
//! `role="button"`, a tab stop, and click/keydown routing. Both handlers are
//! gated on the calendar's visibility flag and leave the event untouched when
//! the calendar is off screen.

use crate::constants::aria;
use crate::engine::Engine;
use crate::host::{EventOutcome, Host};
use crate::store::CalendarId;

/// `KeyboardEvent.key` values that activate a marker.
#[must_use]
pub fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " " | "Spacebar")
}

/// `KeyboardEvent.key` values that dismiss the popover.
#[must_use]
pub fn is_escape_key(key: &str) -> bool {
    matches!(key, "Escape" | "Esc")
}

impl<H: Host> Engine<H> {
    /// Upgrade one marker. Idempotent: a marker carrying the setup attribute
    /// is left alone. Returns whether listeners were attached.
    pub fn activate_marker(&mut self, marker: &H::Element, calendar: CalendarId) -> bool {
        let setup = &self.config.attributes.setup;
        if self.host.attribute(marker, setup).is_some() {
            return false;
        }
        self.host.set_attribute(marker, setup, "true");
        self.host.set_attribute(marker, aria::ROLE, aria::ROLE_BUTTON);
        self.host.set_attribute(marker, aria::TABINDEX, "0");
        self.host.listen_marker(marker, calendar);
        true
    }

    /// Upgrade every marker inside `element`. Returns how many were new.
    pub fn activate_calendar(&mut self, element: &H::Element, calendar: CalendarId) -> usize {
        let markers = self.host.query_class(Some(element), &self.config.classes.event);
        let mut activated = 0;
        for marker in &markers {
            if self.activate_marker(marker, calendar) {
                activated += 1;
            }
        }
        tracing::debug!(
            calendar = calendar.get(),
            markers = markers.len(),
            activated,
            "calendar activated"
        );
        activated
    }

    /// Click on an activated marker.
    pub fn handle_marker_click(
        &mut self,
        marker: &H::Element,
        calendar: CalendarId,
    ) -> EventOutcome {
        if !self.state.visibility.is_visible(calendar) {
            return EventOutcome::ignored();
        }
        self.open(marker, calendar, false);
        EventOutcome::consumed()
    }

    /// Keydown on an activated marker.
    pub fn handle_marker_key(
        &mut self,
        marker: &H::Element,
        calendar: CalendarId,
        key: &str,
    ) -> EventOutcome {
        if !self.state.visibility.is_visible(calendar) || !is_activation_key(key) {
            return EventOutcome::ignored();
        }
        self.open(marker, calendar, true);
        EventOutcome::consumed()
    }

    /// Keydown anywhere in the document.
    pub fn handle_document_key(&mut self, key: &str) -> EventOutcome {
        if is_escape_key(key) && self.close() {
            EventOutcome::handled()
        } else {
            EventOutcome::ignored()
        }
    }

    /// Click on the backdrop or the close control.
    pub fn handle_dismiss(&mut self) -> EventOutcome {
        if self.close() {
            EventOutcome::handled()
        } else {
            EventOutcome::ignored()
        }
    }
}
