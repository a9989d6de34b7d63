#![forbid(unsafe_code)]

//! Lazy activation of calendars as they scroll into view.
//!
//! Two interchangeable [`ActivationStrategy`] implementations exist, picked
//! once at boot by probing the host:
//!
//! - [`ObservedActivation`]: one intersection observer watches every
//!   calendar. Markers are upgraded the first time their calendar enters the
//!   viewport, and a popover owned by a calendar that leaves the viewport is
//!   closed.
//! - [`EagerActivation`]: the host cannot observe intersections, so every
//!   calendar is marked visible and upgraded immediately. No observer exists.
//!
//! # Ordering
//!
//! The visibility flag is written before any decision is taken from it, so
//! a handler running during a transition never reads a stale "visible".

use crate::engine::{Engine, RegisteredCalendar};
use crate::host::{Host, ObserverOptions};

/// Which strategy a view runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Observed,
    Eager,
}

impl StrategyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Observed => "observed",
            Self::Eager => "eager",
        }
    }
}

/// Result of applying one intersection reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityTransition {
    /// Not visible → visible. The calendar's markers were activated.
    Entered,
    /// Visible → not visible. `closed` tells whether the calendar's popover
    /// was closed as a consequence.
    Left { closed: bool },
    /// Same reading as before.
    Unchanged,
    /// The target is not a registered calendar.
    Unknown,
}

/// How calendars get activated.
pub trait ActivationStrategy<H: Host> {
    fn kind(&self) -> StrategyKind;

    /// Take charge of newly registered calendars.
    fn adopt(&mut self, engine: &mut Engine<H>, calendars: &[RegisteredCalendar<H::Element>]);

    /// Stop tracking a calendar that left the document.
    fn release(&mut self, engine: &mut Engine<H>, calendar: &H::Element);

    /// Release every host resource. Safe to call repeatedly.
    fn teardown(&mut self, engine: &mut Engine<H>);
}

/// Pick the strategy the host supports.
#[must_use]
pub fn select_strategy<H: Host>(host: &H) -> Box<dyn ActivationStrategy<H>> {
    if host.supports_intersection() {
        Box::new(ObservedActivation)
    } else {
        Box::new(EagerActivation)
    }
}

/// Intersection-driven activation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObservedActivation;

impl<H: Host> ActivationStrategy<H> for ObservedActivation {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Observed
    }

    fn adopt(&mut self, engine: &mut Engine<H>, calendars: &[RegisteredCalendar<H::Element>]) {
        let observer = match engine.state.observer() {
            Some(observer) => observer,
            None => {
                let options = ObserverOptions {
                    threshold: engine.config.observer.threshold,
                    root_margin: engine.config.observer.root_margin(),
                };
                let Some(observer) = engine.host.create_observer(&options) else {
                    tracing::warn!(
                        calendars = calendars.len(),
                        "intersection observer unavailable, activating eagerly"
                    );
                    ActivationStrategy::<H>::adopt(&mut EagerActivation, engine, calendars);
                    return;
                };
                engine.state.set_observer(observer);
                observer
            }
        };
        for calendar in calendars {
            engine.state.visibility.set(calendar.id, false);
            engine.host.observe(observer, &calendar.element);
        }
        tracing::debug!(
            observer = observer.get(),
            calendars = calendars.len(),
            "observing calendars"
        );
    }

    fn release(&mut self, engine: &mut Engine<H>, calendar: &H::Element) {
        if let Some(observer) = engine.state.observer() {
            engine.host.unobserve(observer, calendar);
        }
    }

    fn teardown(&mut self, engine: &mut Engine<H>) {
        engine.teardown_observer();
    }
}

/// Fallback when the host cannot observe intersections.
#[derive(Debug, Default, Clone, Copy)]
pub struct EagerActivation;

impl<H: Host> ActivationStrategy<H> for EagerActivation {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Eager
    }

    fn adopt(&mut self, engine: &mut Engine<H>, calendars: &[RegisteredCalendar<H::Element>]) {
        for calendar in calendars {
            engine.state.visibility.set(calendar.id, true);
            engine.activate_calendar(&calendar.element, calendar.id);
        }
    }

    fn release(&mut self, _engine: &mut Engine<H>, _calendar: &H::Element) {}

    fn teardown(&mut self, _engine: &mut Engine<H>) {}
}

impl<H: Host> Engine<H> {
    /// Apply one intersection reading for `target`.
    pub fn apply_intersection(
        &mut self,
        target: &H::Element,
        is_intersecting: bool,
    ) -> VisibilityTransition {
        let Some(calendar) = self.calendar_id_of(target) else {
            return VisibilityTransition::Unknown;
        };
        let was_visible = self.state.visibility.set(calendar, is_intersecting);
        match (was_visible, is_intersecting) {
            (false, true) => {
                tracing::debug!(calendar = calendar.get(), "calendar entered viewport");
                self.activate_calendar(target, calendar);
                VisibilityTransition::Entered
            }
            (true, false) => {
                let closed = self.state.session_owner() == Some(calendar) && self.close();
                tracing::debug!(calendar = calendar.get(), closed, "calendar left viewport");
                VisibilityTransition::Left { closed }
            }
            _ => VisibilityTransition::Unchanged,
        }
    }

    /// Disconnect the observer, if any, and clear its slot.
    pub fn teardown_observer(&mut self) -> bool {
        match self.state.take_observer() {
            Some(observer) => {
                self.host.disconnect(observer);
                tracing::debug!(observer = observer.get(), "observer disconnected");
                true
            }
            None => false,
        }
    }
}
