#![forbid(unsafe_code)]

//! Engine state: per-calendar visibility, the observer slot, and the single
//! popover session.
//!
//! # Invariants
//!
//! 1. At most one [`Session`] exists per [`ViewState`].
//! 2. A calendar absent from the [`VisibilityStore`] reads as not visible.
//! 3. Session fields are written only by the popover lifecycle
//!    (`record`/`reset` are crate-private); everything else reads.
//! 4. The store holds no calendar nodes: calendars are keyed by
//!    [`CalendarId`] and forgotten explicitly when they leave the document.

use std::collections::HashMap;

use crate::host::{Host, ListenerId, ObserverId};
use crate::position::Repositioner;
use crate::scheduler::TimerId;

/// Engine-issued identity of a calendar container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarId(u32);

impl CalendarId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Parse the value of the identity attribute.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().map(Self)
    }
}

/// Monotonic session number, used to tell stale timers from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionSerial(u64);

impl SessionSerial {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle phase of the popover.
///
/// State machine: `Closed → Opening → Open → Closing → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopoverPhase {
    /// No session.
    #[default]
    Closed,
    /// Nodes attached, waiting for the active class.
    Opening,
    /// Active class applied.
    Open,
    /// Active class removed, waiting for nodes to be detached.
    Closing,
}

impl PopoverPhase {
    /// Whether `close()` and the repositioner act in this phase.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Opening | Self::Open)
    }
}

/// Per-calendar visibility flags.
#[derive(Debug, Default)]
pub struct VisibilityStore {
    flags: HashMap<CalendarId, bool>,
}

impl VisibilityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent calendars are not visible.
    #[must_use]
    pub fn is_visible(&self, calendar: CalendarId) -> bool {
        self.flags.get(&calendar).copied().unwrap_or(false)
    }

    /// Set the flag and return the previous reading.
    pub fn set(&mut self, calendar: CalendarId, visible: bool) -> bool {
        self.flags.insert(calendar, visible).unwrap_or(false)
    }

    /// Track a calendar as not visible unless it is already tracked.
    pub fn register(&mut self, calendar: CalendarId) {
        self.flags.entry(calendar).or_insert(false);
    }

    pub fn forget(&mut self, calendar: CalendarId) {
        self.flags.remove(&calendar);
    }

    #[must_use]
    pub fn contains(&self, calendar: CalendarId) -> bool {
        self.flags.contains_key(&calendar)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.flags.values().filter(|visible| **visible).count()
    }
}

/// Detaches the session's scroll/resize listeners. Running it twice removes
/// nothing the second time.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionCleanup {
    listener: Option<ListenerId>,
}

impl SessionCleanup {
    #[must_use]
    pub const fn new(listener: ListenerId) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    /// Returns whether a listener was actually removed.
    pub fn run<H: Host>(&mut self, host: &mut H) -> bool {
        match self.listener.take() {
            Some(id) => {
                host.unlisten(id);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub const fn is_spent(&self) -> bool {
        self.listener.is_none()
    }
}

/// Pending exit transition of a session.
///
/// Cancelled when a new session replaces one that is still closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseHandle {
    timer: TimerId,
}

impl CloseHandle {
    #[must_use]
    pub const fn new(timer: TimerId) -> Self {
        Self { timer }
    }

    #[must_use]
    pub const fn timer(self) -> TimerId {
        self.timer
    }
}

/// The active popover session.
#[derive(Debug)]
pub struct Session<E> {
    pub serial: SessionSerial,
    pub popover: E,
    pub backdrop: E,
    pub owner: CalendarId,
    pub trigger: E,
    pub opened_via_keyboard: bool,
    pub cleanup: SessionCleanup,
    pub repositioner: Repositioner<E>,
    pub phase: PopoverPhase,
    pub activate_timer: Option<TimerId>,
    pub close_handle: Option<CloseHandle>,
}

/// All mutable engine state.
#[derive(Debug)]
pub struct ViewState<E> {
    pub visibility: VisibilityStore,
    observer: Option<ObserverId>,
    session: Option<Session<E>>,
}

impl<E> Default for ViewState<E> {
    fn default() -> Self {
        Self {
            visibility: VisibilityStore::new(),
            observer: None,
            session: None,
        }
    }
}

impl<E> ViewState<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    pub fn set_observer(&mut self, observer: ObserverId) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<ObserverId> {
        self.observer.take()
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session<E>> {
        self.session.as_ref()
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut Session<E>> {
        self.session.as_mut()
    }

    /// Record a new session. The caller has already torn down any previous one.
    pub(crate) fn record(&mut self, session: Session<E>) {
        debug_assert!(self.session.is_none(), "previous session not reset");
        self.session = Some(session);
    }

    /// Clear every session field in one step.
    pub(crate) fn reset(&mut self) -> Option<Session<E>> {
        self.session.take()
    }

    #[must_use]
    pub fn phase(&self) -> PopoverPhase {
        self.session
            .as_ref()
            .map_or(PopoverPhase::Closed, |session| session.phase)
    }

    /// A session exists and is not on its way out.
    #[must_use]
    pub fn is_session_active(&self) -> bool {
        self.phase().is_active()
    }

    /// Calendar owning the session, if any.
    #[must_use]
    pub fn session_owner(&self) -> Option<CalendarId> {
        self.session.as_ref().map(|session| session.owner)
    }
}
