#![forbid(unsafe_code)]

//! Popover lifecycle: creation, animated show, animated teardown.
//!
//! # State machine
//!
//! ```text
//!   open()            Activate timer        close()          FinishClose timer
//! Closed ──▶ Opening ───────────────▶ Open ─────────▶ Closing ──────────────────▶ Closed
//!              │                              ▲
//!              └──────────── close() ─────────┘
//! ```
//!
//! # Invariants
//!
//! 1. At most one session exists. `open()` tears the previous one down
//!    synchronously (listeners, timers, nodes, store) before building the new
//!    one, so two sessions never overlap and no two transitions run at once.
//! 2. `close()` detaches the scroll/resize listeners before it schedules the
//!    delayed node removal.
//! 3. A timer carries its session serial. A timer for a session that is no
//!    longer current does nothing.
//! 4. Nodes are only removed while still attached.
//!
//! # Failure modes
//!
//! Missing content reference, missing container and empty content make
//! `open()` return `false` without touching the store. A forced teardown
//! skips the exit transition of the old session.

use crate::constants::aria;
use crate::engine::Engine;
use crate::host::Host;
use crate::position::{Repositioner, place};
use crate::scheduler::{TimerId, TimerTask};
use crate::store::{CalendarId, CloseHandle, PopoverPhase, Session, SessionCleanup, SessionSerial};

/// Why a marker produced no popover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMiss {
    /// The marker has no (or an empty) content reference attribute.
    NoReference,
    /// No element carries the referenced id.
    NoContainer,
    /// The container exists but holds only whitespace.
    Empty,
}

impl ContentMiss {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoReference => "no_reference",
            Self::NoContainer => "no_container",
            Self::Empty => "empty",
        }
    }
}

impl<H: Host> Engine<H> {
    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PopoverPhase {
        self.state.phase()
    }

    /// Markup the popover for `marker` would show.
    pub fn resolve_content(&self, marker: &H::Element) -> Result<String, ContentMiss> {
        let reference = self
            .host
            .attribute(marker, &self.config.attributes.content_ref)
            .ok_or(ContentMiss::NoReference)?;
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ContentMiss::NoReference);
        }
        let container = self
            .host
            .element_by_id(reference)
            .ok_or(ContentMiss::NoContainer)?;
        let html = self.host.inner_html(&container);
        if html.trim().is_empty() {
            return Err(ContentMiss::Empty);
        }
        Ok(html)
    }

    /// Open the popover for `marker`, replacing any current session.
    ///
    /// Returns `false` when the marker's content cannot be resolved; the
    /// previous session is still gone in that case.
    pub fn open(
        &mut self,
        marker: &H::Element,
        calendar: CalendarId,
        opened_via_keyboard: bool,
    ) -> bool {
        if self.state.session().is_some() {
            self.teardown_now();
        }

        let content = match self.resolve_content(marker) {
            Ok(content) => content,
            Err(miss) => {
                tracing::debug!(
                    calendar = calendar.get(),
                    reason = miss.as_str(),
                    "popover content unavailable"
                );
                return false;
            }
        };

        let classes = self.config.classes.clone();
        let host = &mut self.host;

        let (Some(backdrop), Some(popover), Some(close)) = (
            host.create_element("div"),
            host.create_element("div"),
            host.create_element("button"),
        ) else {
            tracing::warn!(calendar = calendar.get(), "popover elements could not be created");
            return false;
        };

        host.add_class(&backdrop, &classes.backdrop);
        host.listen_dismiss(&backdrop);

        host.add_class(&popover, &classes.popover);
        host.set_attribute(&popover, aria::ROLE, aria::ROLE_DIALOG);
        host.set_attribute(&popover, aria::MODAL, "true");
        host.set_attribute(&popover, aria::TABINDEX, "-1");
        host.set_inner_html(&popover, &content);

        host.set_attribute(&close, "type", "button");
        host.add_class(&close, &classes.popover_close);
        host.set_attribute(&close, aria::LABEL, aria::CLOSE_LABEL);
        host.set_inner_html(&close, aria::CLOSE_GLYPH);
        host.append_child(&popover, &close);
        host.listen_dismiss(&close);

        if let Some(style) = host.attribute(marker, &self.config.attributes.popover_style) {
            if !style.trim().is_empty() {
                host.append_style(&popover, &style);
            }
        }

        host.append_to_body(&backdrop);
        host.append_to_body(&popover);

        let position = place(host, &popover, marker, self.config.placement());

        let serial = self.next_session_serial();
        let activate_timer = self.timers.schedule(TimerTask::Activate(serial));
        self.host.schedule(self.config.timing.activate_delay(), activate_timer);

        let listener = self.host.listen_viewport();
        self.state.record(Session {
            serial,
            popover: popover.clone(),
            backdrop,
            owner: calendar,
            trigger: marker.clone(),
            opened_via_keyboard,
            cleanup: SessionCleanup::new(listener),
            repositioner: Repositioner::new(popover.clone(), marker.clone(), calendar),
            phase: PopoverPhase::Opening,
            activate_timer: Some(activate_timer),
            close_handle: None,
        });

        self.host.focus(&popover);

        tracing::debug!(
            calendar = calendar.get(),
            session = serial.get(),
            keyboard = opened_via_keyboard,
            top = position.top,
            left = position.left,
            "popover opened"
        );
        true
    }

    /// Start closing the active session.
    ///
    /// Returns `false` when there is nothing to close (no session, or one
    /// already closing).
    pub fn close(&mut self) -> bool {
        let close_duration = self.config.timing.close_duration();
        let active = self.config.classes.active.clone();
        let Some(session) = self.state.session_mut() else {
            return false;
        };
        if !session.phase.is_active() {
            return false;
        }

        session.cleanup.run(&mut self.host);
        if let Some(timer) = session.activate_timer.take() {
            self.timers.cancel(timer);
        }
        self.host.remove_class(&session.popover, &active);
        self.host.remove_class(&session.backdrop, &active);
        session.phase = PopoverPhase::Closing;

        let serial = session.serial;
        let owner = session.owner;
        let keyboard = session.opened_via_keyboard;
        let timer = self.timers.schedule(TimerTask::FinishClose(serial));
        session.close_handle = Some(CloseHandle::new(timer));
        self.host.schedule(close_duration, timer);

        tracing::debug!(
            calendar = owner.get(),
            session = serial.get(),
            keyboard,
            "popover closing"
        );
        true
    }

    /// Deliver a fired timer.
    pub fn on_timer(&mut self, timer: TimerId) {
        let Some(task) = self.timers.take(timer) else {
            tracing::trace!(timer = timer.get(), "stale timer ignored");
            return;
        };
        tracing::trace!(timer = timer.get(), session = task.session().get(), "timer fired");
        match task {
            TimerTask::Activate(serial) => self.activate_session(serial),
            TimerTask::FinishClose(serial) => self.finish_close(serial),
        }
    }

    fn activate_session(&mut self, serial: SessionSerial) {
        let active = self.config.classes.active.clone();
        let Some(session) = self.state.session_mut() else {
            return;
        };
        if session.serial != serial || session.phase != PopoverPhase::Opening {
            return;
        }
        session.activate_timer = None;
        self.host.add_class(&session.popover, &active);
        self.host.add_class(&session.backdrop, &active);
        session.phase = PopoverPhase::Open;
        tracing::trace!(session = serial.get(), "popover active");
    }

    fn finish_close(&mut self, serial: SessionSerial) {
        if self.state.session().map(|session| session.serial) != Some(serial) {
            return;
        }
        let Some(session) = self.state.reset() else {
            return;
        };
        self.detach(&session);
        if session.opened_via_keyboard {
            self.host.focus(&session.trigger);
        }
        tracing::debug!(
            calendar = session.owner.get(),
            session = serial.get(),
            restored_focus = session.opened_via_keyboard,
            "popover closed"
        );
    }

    /// Tear the session down right now, without an exit transition.
    fn teardown_now(&mut self) {
        let Some(mut session) = self.state.reset() else {
            return;
        };
        session.cleanup.run(&mut self.host);
        if let Some(timer) = session.activate_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(handle) = session.close_handle.take() {
            self.timers.cancel(handle.timer());
        }
        let active = &self.config.classes.active;
        self.host.remove_class(&session.popover, active);
        self.host.remove_class(&session.backdrop, active);
        self.detach(&session);
        tracing::debug!(
            calendar = session.owner.get(),
            session = session.serial.get(),
            "popover replaced"
        );
    }

    fn detach(&mut self, session: &Session<H::Element>) {
        for element in [&session.popover, &session.backdrop] {
            if self.host.is_connected(element) {
                self.host.remove(element);
            }
        }
    }
}
