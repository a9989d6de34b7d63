#![forbid(unsafe_code)]

//! Page bootstrap and the host-facing entry points.
//!
//! [`CalendarView`] is what a host embeds: it owns the [`Engine`] and the
//! activation strategy chosen at boot, and exposes one method per DOM event
//! the host forwards.
//!
//! ```ignore
//! let mut view = CalendarView::new(host, ViewConfig::default());
//! match view.boot() {
//!     BootOutcome::Idle => {}                      // no calendar on this page
//!     BootOutcome::Started { .. } => {}            // observer + key handler live
//!     BootOutcome::AlreadyStarted => unreachable!(),
//! }
//! ```

use crate::config::ViewConfig;
use crate::engine::{Engine, RegisteredCalendar};
use crate::host::{EventOutcome, Host, IntersectionEntry};
use crate::position::Position;
use crate::scheduler::TimerId;
use crate::store::{CalendarId, PopoverPhase};
use crate::visibility::{ActivationStrategy, StrategyKind, VisibilityTransition, select_strategy};

/// What [`CalendarView::boot`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// No calendar on the page; nothing was installed.
    Idle,
    /// Calendars found and wired.
    Started {
        calendars: usize,
        strategy: StrategyKind,
    },
    /// `boot` already ran successfully.
    AlreadyStarted,
}

/// The calendar view of one page.
pub struct CalendarView<H: Host> {
    engine: Engine<H>,
    strategy: Option<Box<dyn ActivationStrategy<H>>>,
}

impl<H: Host> std::fmt::Debug for CalendarView<H>
where
    H: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarView")
            .field("engine", &self.engine)
            .field("strategy", &self.strategy_kind())
            .finish()
    }
}

impl<H: Host> CalendarView<H> {
    #[must_use]
    pub fn new(host: H, config: ViewConfig) -> Self {
        Self {
            engine: Engine::new(host, config),
            strategy: None,
        }
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine<H> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<H> {
        &mut self.engine
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        self.engine.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.engine.host_mut()
    }

    #[must_use]
    pub fn phase(&self) -> PopoverPhase {
        self.engine.phase()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.strategy.is_some()
    }

    #[must_use]
    pub fn strategy_kind(&self) -> Option<StrategyKind> {
        self.strategy.as_ref().map(|strategy| strategy.kind())
    }

    /// Find the calendars on the page and wire everything up.
    ///
    /// A page without calendars gets no observer and no global listeners.
    pub fn boot(&mut self) -> BootOutcome {
        if self.strategy.is_some() {
            return BootOutcome::AlreadyStarted;
        }
        let found = self.discover();
        if found.is_empty() {
            tracing::debug!("no calendars on page");
            return BootOutcome::Idle;
        }

        let mut strategy = select_strategy(self.engine.host());
        strategy.adopt(&mut self.engine, &found);

        let host = self.engine.host_mut();
        host.listen_document_keys();
        host.listen_unload();

        let kind = strategy.kind();
        self.strategy = Some(strategy);
        tracing::info!(
            calendars = found.len(),
            strategy = kind.as_str(),
            "calendar view started"
        );
        BootOutcome::Started {
            calendars: found.len(),
            strategy: kind,
        }
    }

    /// Pick up calendars inserted after boot and drop detached ones.
    /// Boots the view if it was idle. Returns how many calendars were new.
    pub fn rescan(&mut self) -> usize {
        let Some(mut strategy) = self.strategy.take() else {
            return match self.boot() {
                BootOutcome::Started { calendars, .. } => calendars,
                BootOutcome::Idle | BootOutcome::AlreadyStarted => 0,
            };
        };
        self.prune_with(&mut strategy);
        let fresh = self.discover();
        if !fresh.is_empty() {
            strategy.adopt(&mut self.engine, &fresh);
            tracing::debug!(calendars = fresh.len(), "calendars adopted on rescan");
        }
        self.strategy = Some(strategy);
        fresh.len()
    }

    /// Forget calendars the host reports as detached. A popover owned by
    /// such a calendar is closed. Returns how many were dropped.
    pub fn prune_detached(&mut self) -> usize {
        let Some(mut strategy) = self.strategy.take() else {
            return 0;
        };
        let pruned = self.prune_with(&mut strategy);
        self.strategy = Some(strategy);
        pruned
    }

    /// Intersection observer callback.
    pub fn handle_intersections(
        &mut self,
        entries: &[IntersectionEntry<H::Element>],
    ) -> Vec<VisibilityTransition> {
        self.prune_detached();
        entries
            .iter()
            .map(|entry| {
                self.engine
                    .apply_intersection(&entry.target, entry.is_intersecting)
            })
            .collect()
    }

    pub fn handle_marker_click(
        &mut self,
        marker: &H::Element,
        calendar: CalendarId,
    ) -> EventOutcome {
        self.engine.handle_marker_click(marker, calendar)
    }

    pub fn handle_marker_key(
        &mut self,
        marker: &H::Element,
        calendar: CalendarId,
        key: &str,
    ) -> EventOutcome {
        self.engine.handle_marker_key(marker, calendar, key)
    }

    pub fn handle_document_key(&mut self, key: &str) -> EventOutcome {
        self.engine.handle_document_key(key)
    }

    pub fn handle_dismiss(&mut self) -> EventOutcome {
        self.engine.handle_dismiss()
    }

    pub fn handle_viewport_change(&mut self) -> Option<Position> {
        self.engine.handle_viewport_change()
    }

    pub fn on_timer(&mut self, timer: TimerId) {
        self.engine.on_timer(timer);
    }

    /// Page is going away: close the popover and stop observing.
    pub fn unload(&mut self) {
        self.engine.close();
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.teardown(&mut self.engine);
        }
        tracing::debug!("calendar view unloaded");
    }

    /// Register every calendar not yet known and return the new ones.
    fn discover(&mut self) -> Vec<RegisteredCalendar<H::Element>> {
        let class = self.engine.config().classes.calendar.clone();
        let elements = self.engine.host().query_class(None, &class);
        let mut fresh = Vec::new();
        for element in elements {
            let (id, is_new) = self.engine.register_calendar(&element);
            if is_new {
                fresh.push(RegisteredCalendar { id, element });
            }
        }
        fresh
    }

    fn prune_with(&mut self, strategy: &mut Box<dyn ActivationStrategy<H>>) -> usize {
        let detached: Vec<RegisteredCalendar<H::Element>> = self
            .engine
            .calendars()
            .iter()
            .filter(|calendar| !self.engine.host().is_connected(&calendar.element))
            .cloned()
            .collect();
        for calendar in &detached {
            if self.engine.state().session_owner() == Some(calendar.id) {
                self.engine.close();
            }
            strategy.release(&mut self.engine, &calendar.element);
            self.engine.forget_calendar(calendar.id);
        }
        detached.len()
    }
}
