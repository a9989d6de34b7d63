#![forbid(unsafe_code)]

//! The engine context shared by every component.
//!
//! [`Engine`] owns the host, the configuration, the state store, the timer
//! queue and the calendar registry. It is constructed explicitly and passed
//! around by `&mut`; there are no module-level globals, so several engines
//! can coexist (one per test, for instance).
//!
//! Behavior is split across modules by concern, each adding an
//! `impl<H: Host> Engine<H>` block:
//!
//! - [`popover`](crate::popover): `open`, `close`, `on_timer`
//! - [`interaction`](crate::interaction): marker activation and DOM handlers
//! - [`visibility`](crate::visibility): intersection transitions

use crate::config::ViewConfig;
use crate::constants::aria;
use crate::host::Host;
use crate::position::Position;
use crate::scheduler::TimerQueue;
use crate::store::{CalendarId, SessionSerial, ViewState};

/// A calendar container known to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredCalendar<E> {
    pub id: CalendarId,
    pub element: E,
}

/// Shared engine context.
#[derive(Debug)]
pub struct Engine<H: Host> {
    pub(crate) host: H,
    pub(crate) config: ViewConfig,
    pub(crate) state: ViewState<H::Element>,
    pub(crate) timers: TimerQueue,
    calendars: Vec<RegisteredCalendar<H::Element>>,
    next_calendar: u32,
    next_serial: u64,
}

impl<H: Host> Engine<H> {
    #[must_use]
    pub fn new(host: H, config: ViewConfig) -> Self {
        Self {
            host,
            config,
            state: ViewState::new(),
            timers: TimerQueue::new(),
            calendars: Vec::new(),
            next_calendar: 0,
            next_serial: 0,
        }
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub const fn config(&self) -> &ViewConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &ViewState<H::Element> {
        &self.state
    }

    #[must_use]
    pub const fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Calendars currently registered.
    #[must_use]
    pub fn calendars(&self) -> &[RegisteredCalendar<H::Element>] {
        &self.calendars
    }

    /// Identity of a registered calendar element.
    #[must_use]
    pub fn calendar_id_of(&self, element: &H::Element) -> Option<CalendarId> {
        self.calendars
            .iter()
            .find(|calendar| &calendar.element == element)
            .map(|calendar| calendar.id)
    }

    #[must_use]
    pub fn calendar_element(&self, id: CalendarId) -> Option<&H::Element> {
        self.calendars
            .iter()
            .find(|calendar| calendar.id == id)
            .map(|calendar| &calendar.element)
    }

    /// Register a calendar container, stamping its identity attribute.
    ///
    /// Returns the id and whether the calendar was new. New calendars start
    /// out not visible.
    pub fn register_calendar(&mut self, element: &H::Element) -> (CalendarId, bool) {
        if let Some(id) = self.calendar_id_of(element) {
            return (id, false);
        }
        self.next_calendar += 1;
        let id = CalendarId::new(self.next_calendar);
        let attribute = self.config.attributes.calendar_id.clone();
        self.host.set_attribute(element, &attribute, &id.get().to_string());
        self.state.visibility.register(id);
        self.calendars.push(RegisteredCalendar {
            id,
            element: element.clone(),
        });
        tracing::debug!(calendar = id.get(), "calendar registered");
        (id, true)
    }

    /// Drop a calendar from the registry and the visibility store.
    ///
    /// Its markers lose their routing and go back to plain links, so a
    /// later rescan can adopt the same element under a new id.
    pub fn forget_calendar(&mut self, id: CalendarId) -> Option<H::Element> {
        let index = self.calendars.iter().position(|calendar| calendar.id == id)?;
        let calendar = self.calendars.remove(index);
        self.state.visibility.forget(id);
        self.host.unlisten_markers(id);
        let released = self.release_markers(&calendar.element);
        let stamp = self.config.attributes.calendar_id.clone();
        self.host.remove_attribute(&calendar.element, &stamp);
        tracing::debug!(calendar = id.get(), released, "calendar forgotten");
        Some(calendar.element)
    }

    /// Undo the upgrade of every marker inside `element`.
    fn release_markers(&mut self, element: &H::Element) -> usize {
        let setup = self.config.attributes.setup.clone();
        let markers = self.host.query_class(Some(element), &self.config.classes.event);
        let mut released = 0;
        for marker in &markers {
            if self.host.attribute(marker, &setup).is_none() {
                continue;
            }
            self.host.remove_attribute(marker, &setup);
            self.host.remove_attribute(marker, aria::ROLE);
            self.host.remove_attribute(marker, aria::TABINDEX);
            released += 1;
        }
        released
    }

    pub(crate) fn next_session_serial(&mut self) -> SessionSerial {
        self.next_serial += 1;
        SessionSerial::new(self.next_serial)
    }

    /// Scroll or resize happened: run the session's repositioner.
    pub fn handle_viewport_change(&mut self) -> Option<Position> {
        let placement = self.config.placement();
        let repositioner = self.state.session()?.repositioner.clone();
        repositioner.run(&mut self.host, &self.state, placement)
    }
}
