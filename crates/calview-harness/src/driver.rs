#![forbid(unsafe_code)]

//! Scenario driver: dispatches simulated DOM events into a
//! [`CalendarView<MockHost>`] the way a browser would.
//!
//! Dispatch follows the registrations the engine made on the host. A click
//! on a marker runs every click route registered for it, so a marker wired
//! twice would open twice. Keydown bubbles from the target to the document
//! listener, when one is installed.

use std::time::Duration;

use calview_core::bootstrap::{BootOutcome, CalendarView};
use calview_core::config::ViewConfig;
use calview_core::engine::Engine;
use calview_core::host::{EventOutcome, IntersectionEntry};
use calview_core::position::Position;
use calview_core::store::PopoverPhase;
use calview_core::visibility::VisibilityTransition;

use crate::dom::{MockHost, NodeId};

/// A view over a [`MockHost`] plus event dispatch helpers.
#[derive(Debug)]
pub struct Harness {
    view: CalendarView<MockHost>,
}

impl Harness {
    #[must_use]
    pub fn new(host: MockHost) -> Self {
        Self::with_config(host, ViewConfig::default())
    }

    #[must_use]
    pub fn with_config(host: MockHost, config: ViewConfig) -> Self {
        Self {
            view: CalendarView::new(host, config),
        }
    }

    #[must_use]
    pub const fn view(&self) -> &CalendarView<MockHost> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut CalendarView<MockHost> {
        &mut self.view
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine<MockHost> {
        self.view.engine()
    }

    pub fn engine_mut(&mut self) -> &mut Engine<MockHost> {
        self.view.engine_mut()
    }

    #[must_use]
    pub const fn host(&self) -> &MockHost {
        self.view.host()
    }

    pub fn host_mut(&mut self) -> &mut MockHost {
        self.view.host_mut()
    }

    #[must_use]
    pub fn phase(&self) -> PopoverPhase {
        self.view.phase()
    }

    pub fn boot(&mut self) -> BootOutcome {
        self.view.boot()
    }

    /// Click `target`.
    pub fn click(&mut self, target: NodeId) -> EventOutcome {
        let mut outcome = EventOutcome::ignored();
        for calendar in self.host().marker_routes(target) {
            merge(&mut outcome, self.view.handle_marker_click(&target, calendar));
        }
        if self.host().has_dismiss_listener(target) {
            merge(&mut outcome, self.view.handle_dismiss());
        }
        outcome
    }

    /// Keydown on `target`, bubbling to the document.
    pub fn key(&mut self, target: NodeId, key: &str) -> EventOutcome {
        let mut outcome = EventOutcome::ignored();
        for calendar in self.host().marker_routes(target) {
            merge(
                &mut outcome,
                self.view.handle_marker_key(&target, calendar, key),
            );
        }
        merge(&mut outcome, self.document_key(key));
        outcome
    }

    /// Keydown with no focused target.
    pub fn document_key(&mut self, key: &str) -> EventOutcome {
        if self.host().document_key_listeners() == 0 {
            return EventOutcome::ignored();
        }
        self.view.handle_document_key(key)
    }

    /// Scroll the window. Returns the last applied position.
    pub fn scroll(&mut self) -> Option<Position> {
        let mut last = None;
        for _ in self.host().viewport_listener_ids() {
            if let Some(position) = self.view.handle_viewport_change() {
                last = Some(position);
            }
        }
        last
    }

    /// Deliver one batch of intersection readings. Targets no connected
    /// observer watches are dropped, as a browser would never report them.
    pub fn intersect(&mut self, readings: &[(NodeId, bool)]) -> Vec<VisibilityTransition> {
        let entries: Vec<IntersectionEntry<NodeId>> = readings
            .iter()
            .filter(|(target, _)| self.host().is_observed(*target))
            .map(|(target, is_intersecting)| IntersectionEntry {
                target: *target,
                is_intersecting: *is_intersecting,
            })
            .collect();
        if entries.is_empty() {
            return Vec::new();
        }
        self.view.handle_intersections(&entries)
    }

    /// Advance the clock and deliver every timer that comes due, including
    /// ones scheduled by the timers being delivered.
    pub fn advance(&mut self, dt: Duration) {
        let mut due = self.host_mut().advance(dt);
        while !due.is_empty() {
            for timer in due {
                self.view.on_timer(timer);
            }
            due = self.host_mut().take_due();
        }
    }

    /// Advance until no timer is pending.
    pub fn settle(&mut self) {
        while let Some(dt) = self.host().time_to_last_timer() {
            self.advance(dt);
        }
    }

    pub fn unload(&mut self) {
        self.view.unload();
    }

    /// The session's popover node, if a session exists.
    #[must_use]
    pub fn popover(&self) -> Option<NodeId> {
        self.engine().state().session().map(|session| session.popover)
    }

    #[must_use]
    pub fn backdrop(&self) -> Option<NodeId> {
        self.engine().state().session().map(|session| session.backdrop)
    }

    /// The close control inside the current popover.
    #[must_use]
    pub fn close_control(&self) -> Option<NodeId> {
        let popover = self.popover()?;
        let class = &self.engine().config().classes.popover_close;
        self.host()
            .children(popover)
            .iter()
            .copied()
            .find(|child| self.host().has_class(*child, class))
    }
}

fn merge(into: &mut EventOutcome, other: EventOutcome) {
    into.handled |= other.handled;
    into.prevent_default |= other.prevent_default;
}
