#![forbid(unsafe_code)]

//! The seam between the engine and the document.
//!
//! The engine never calls a browser API. Everything it needs from the page
//! (queries, mutation, geometry, listener wiring, timers, intersection
//! observation) goes through [`Host`]. The web binding implements it over
//! `web-sys`; the test harness implements it over an in-memory tree.
//!
//! # Event routing
//!
//! `listen_*` methods only *register interest*. When the matching DOM event
//! fires, the host calls back into the engine:
//!
//! | Registration | Host calls |
//! |--------------|------------|
//! | [`listen_marker`](Host::listen_marker) | `handle_marker_click` / `handle_marker_key` |
//! | [`listen_dismiss`](Host::listen_dismiss) | `handle_dismiss` |
//! | [`listen_viewport`](Host::listen_viewport) | `handle_viewport_change` |
//! | [`listen_document_keys`](Host::listen_document_keys) | `handle_document_key` |
//! | [`listen_unload`](Host::listen_unload) | `unload` |
//! | [`schedule`](Host::schedule) | `on_timer` |
//! | [`create_observer`](Host::create_observer) | `handle_intersections` |
//!
//! Host methods must tolerate redundant calls: removing a detached node,
//! unlistening an unknown id or calendar, or disconnecting a dead observer
//! are no-ops.

use std::fmt;
use std::time::Duration;

use crate::geometry::{Rect, Viewport};
use crate::scheduler::TimerId;
use crate::store::CalendarId;

/// Handle for a scroll/resize listener pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

impl ListenerId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Handle for an intersection observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u32);

impl ObserverId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Options for [`Host::create_observer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    /// Visible fraction at which the callback fires.
    pub threshold: f64,
    /// CSS margin string, e.g. `"50px"`.
    pub root_margin: String,
}

/// One intersection change reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry<E> {
    pub target: E,
    pub is_intersecting: bool,
}

/// What the host should do with the DOM event that triggered a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// The engine acted on the event.
    pub handled: bool,
    /// Call `preventDefault()` on the event.
    pub prevent_default: bool,
}

impl EventOutcome {
    /// The event was not for us; let the browser do its default.
    #[must_use]
    pub const fn ignored() -> Self {
        Self {
            handled: false,
            prevent_default: false,
        }
    }

    /// Handled, default action left alone.
    #[must_use]
    pub const fn handled() -> Self {
        Self {
            handled: true,
            prevent_default: false,
        }
    }

    /// Handled and the default action must be suppressed.
    #[must_use]
    pub const fn consumed() -> Self {
        Self {
            handled: true,
            prevent_default: true,
        }
    }
}

/// Document access required by the engine.
pub trait Host {
    /// Element handle. Equality is node identity.
    type Element: Clone + PartialEq + fmt::Debug;

    // --- Queries ---

    /// Elements carrying `class`, in document order. `scope` limits the search
    /// to descendants of that element.
    fn query_class(&self, scope: Option<&Self::Element>, class: &str) -> Vec<Self::Element>;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    fn attribute(&self, el: &Self::Element, name: &str) -> Option<String>;

    /// Serialized inner markup.
    fn inner_html(&self, el: &Self::Element) -> String;

    /// Whether the node is attached to the document.
    fn is_connected(&self, el: &Self::Element) -> bool;

    /// Live bounding box in viewport coordinates.
    fn bounding_rect(&self, el: &Self::Element) -> Rect;

    fn viewport(&self) -> Viewport;

    /// Capability probe for intersection observation.
    fn supports_intersection(&self) -> bool;

    // --- Mutation ---

    /// Create a detached element. `None` if the document refuses the tag.
    fn create_element(&mut self, tag: &str) -> Option<Self::Element>;

    fn set_attribute(&mut self, el: &Self::Element, name: &str, value: &str);

    fn remove_attribute(&mut self, el: &Self::Element, name: &str);

    fn set_inner_html(&mut self, el: &Self::Element, html: &str);

    /// Append raw declarations to the inline style.
    fn append_style(&mut self, el: &Self::Element, css: &str);

    /// Set one inline style property in pixels.
    fn set_style_px(&mut self, el: &Self::Element, property: &str, px: f64);

    fn add_class(&mut self, el: &Self::Element, class: &str);

    fn remove_class(&mut self, el: &Self::Element, class: &str);

    fn append_child(&mut self, parent: &Self::Element, child: &Self::Element);

    fn append_to_body(&mut self, el: &Self::Element);

    /// Detach `el`. Must be a no-op if it is already detached.
    fn remove(&mut self, el: &Self::Element);

    fn focus(&mut self, el: &Self::Element);

    // --- Wiring ---

    /// Route click and keydown on `marker` to the engine.
    fn listen_marker(&mut self, marker: &Self::Element, calendar: CalendarId);

    /// Drop the routing of every marker wired to `calendar`.
    fn unlisten_markers(&mut self, calendar: CalendarId);

    /// Route clicks on `el` (backdrop, close control) to the engine.
    fn listen_dismiss(&mut self, el: &Self::Element);

    /// Register passive scroll and resize listeners on the window.
    fn listen_viewport(&mut self) -> ListenerId;

    /// Remove a listener pair. Unknown ids are ignored.
    fn unlisten(&mut self, id: ListenerId);

    /// Route document keydown to the engine. Installed once.
    fn listen_document_keys(&mut self);

    /// Route page unload to the engine. Installed once.
    fn listen_unload(&mut self);

    /// Wake the engine with `timer` after `delay`.
    fn schedule(&mut self, delay: Duration, timer: TimerId);

    /// Create an intersection observer. `None` if the capability is missing.
    fn create_observer(&mut self, options: &ObserverOptions) -> Option<ObserverId>;

    fn observe(&mut self, observer: ObserverId, target: &Self::Element);

    fn unobserve(&mut self, observer: ObserverId, target: &Self::Element);

    /// Stop all observation. Unknown ids are ignored.
    fn disconnect(&mut self, observer: ObserverId);
}
