#![forbid(unsafe_code)]

//! Core: the frontend popover and visibility engine of the Query Calendar
//! block.
//!
//! # Role in calview
//! `calview-core` owns every decision the calendar frontend makes: which
//! calendars are live, when markers get upgraded, where the popover goes,
//! and how it opens and closes. It does not know about browsers. The
//! document is reached through the [`Host`](host::Host) trait, which
//! `calview-web` implements over `web-sys` and `calview-harness` implements
//! over an in-memory tree.
//!
//! # Primary responsibilities
//! - **State store**: per-calendar visibility, the observer slot, the single
//!   popover session ([`store`]).
//! - **Positioning**: trigger-relative placement with edge clamping and flip
//!   ([`position`]).
//! - **Popover lifecycle**: `Closed → Opening → Open → Closing → Closed` with
//!   host-driven timers ([`popover`], [`scheduler`]).
//! - **Interaction**: idempotent marker upgrade, visibility-gated click and
//!   key handling, Escape-to-close ([`interaction`]).
//! - **Visibility**: observed or eager activation strategies
//!   ([`visibility`]).
//! - **Bootstrap**: discovery, wiring, unload ([`bootstrap`]).
//!
//! # Determinism
//! The engine never reads a clock and never sleeps. Time advances only when
//! the host delivers a timer, which makes every sequence of events
//! replayable in tests.

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod interaction;
pub mod popover;
pub mod position;
pub mod scheduler;
pub mod store;
pub mod visibility;

pub use bootstrap::{BootOutcome, CalendarView};
pub use config::ViewConfig;
pub use engine::Engine;
pub use error::ConfigError;
pub use host::{EventOutcome, Host, IntersectionEntry};
pub use store::{CalendarId, PopoverPhase};
pub use visibility::StrategyKind;
