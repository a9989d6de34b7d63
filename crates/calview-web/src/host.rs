#![forbid(unsafe_code)]

//! [`Host`] over `web-sys`.
//!
//! Listener handles are owned here: dropping a `gloo` listener detaches it.
//! Handles are never dropped from inside their own callback. Dismiss
//! listeners of a removed popover are parked in `retired` and released the
//! next time a popover is built. Fired timeouts are parked in `spent_timers`
//! and released when the next one fires. Viewport and marker listeners are
//! only ever removed from other callbacks.

use std::collections::HashMap;
use std::time::Duration;

use calview_core::geometry::{Rect, Viewport};
use calview_core::host::{Host, IntersectionEntry, ListenerId, ObserverId, ObserverOptions};
use calview_core::scheduler::TimerId;
use calview_core::store::CalendarId;
use gloo_events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo_timers::callback::Timeout;
use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, HtmlCollection, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, KeyboardEvent, Window,
};

use crate::HostError;
use crate::runtime::with_runtime;

type ObserverCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

struct WebObserver {
    observer: IntersectionObserver,
    _callback: ObserverCallback,
}

/// The browser document, as seen by the engine.
pub struct WebHost {
    window: Window,
    document: Document,
    body: HtmlElement,
    marker_listeners: HashMap<CalendarId, Vec<EventListener>>,
    dismiss_listeners: Vec<(Element, EventListener)>,
    retired: Vec<EventListener>,
    viewport_listeners: HashMap<ListenerId, [EventListener; 2]>,
    next_listener: u32,
    global_listeners: Vec<EventListener>,
    timers: HashMap<TimerId, Timeout>,
    spent_timers: Vec<Timeout>,
    observers: HashMap<ObserverId, WebObserver>,
    next_observer: u32,
}

impl std::fmt::Debug for WebHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebHost")
            .field("marker_calendars", &self.marker_listeners.len())
            .field("dismiss_listeners", &self.dismiss_listeners.len())
            .field("viewport_listeners", &self.viewport_listeners.len())
            .field("timers", &self.timers.len())
            .field("spent_timers", &self.spent_timers.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl WebHost {
    /// Bind to the current window.
    pub fn new() -> Result<Self, HostError> {
        let window = web_sys::window().ok_or(HostError::MissingWindow)?;
        let document = window.document().ok_or(HostError::MissingDocument)?;
        let body = document.body().ok_or(HostError::MissingBody)?;
        Ok(Self {
            window,
            document,
            body,
            marker_listeners: HashMap::new(),
            dismiss_listeners: Vec::new(),
            retired: Vec::new(),
            viewport_listeners: HashMap::new(),
            next_listener: 0,
            global_listeners: Vec::new(),
            timers: HashMap::new(),
            spent_timers: Vec::new(),
            observers: HashMap::new(),
            next_observer: 0,
        })
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Text of the inline configuration block, if the page has one.
    #[must_use]
    pub fn config_json(&self) -> Option<String> {
        self.document
            .get_element_by_id(crate::CONFIG_SCRIPT_ID)
            .and_then(|script| script.text_content())
    }

    /// Calendars whose markers currently have click and keydown routing.
    #[must_use]
    pub fn routed_calendars(&self) -> usize {
        self.marker_listeners.len()
    }

    fn timer_fired(&mut self, timer: TimerId) {
        // Runs inside the timeout's own callback, so this handle is parked
        // rather than dropped. The ones parked earlier have finished running.
        self.spent_timers.clear();
        if let Some(timeout) = self.timers.remove(&timer) {
            self.spent_timers.push(timeout);
        }
    }
}

fn report(op: &'static str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        let err = HostError::from(err);
        tracing::warn!(op, error = %err, "dom call failed");
    }
}

impl From<JsValue> for HostError {
    fn from(value: JsValue) -> Self {
        Self::Js(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

fn collect(collection: &HtmlCollection) -> Vec<Element> {
    (0..collection.length())
        .filter_map(|index| collection.item(index))
        .collect()
}

fn bubbling() -> EventListenerOptions {
    EventListenerOptions {
        phase: EventListenerPhase::Bubble,
        passive: false,
    }
}

fn key_of(event: &Event) -> Option<String> {
    event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key)
}

impl Host for WebHost {
    type Element = Element;

    fn query_class(&self, scope: Option<&Element>, class: &str) -> Vec<Element> {
        match scope {
            Some(scope) => collect(&scope.get_elements_by_class_name(class)),
            None => collect(&self.document.get_elements_by_class_name(class)),
        }
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn attribute(&self, el: &Element, name: &str) -> Option<String> {
        el.get_attribute(name)
    }

    fn inner_html(&self, el: &Element) -> String {
        el.inner_html()
    }

    fn is_connected(&self, el: &Element) -> bool {
        el.is_connected()
    }

    fn bounding_rect(&self, el: &Element) -> Rect {
        let rect = el.get_bounding_client_rect();
        Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
    }

    fn viewport(&self) -> Viewport {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|value| value.as_f64()).unwrap_or(0.0)
        };
        Viewport::new(
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }

    fn supports_intersection(&self) -> bool {
        js_sys::Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver"))
            .unwrap_or(false)
    }

    fn create_element(&mut self, tag: &str) -> Option<Element> {
        match self.document.create_element(tag) {
            Ok(element) => Some(element),
            Err(err) => {
                let err = HostError::from(err);
                tracing::warn!(tag, error = %err, "element creation failed");
                None
            }
        }
    }

    fn set_attribute(&mut self, el: &Element, name: &str, value: &str) {
        report("set_attribute", el.set_attribute(name, value));
    }

    fn remove_attribute(&mut self, el: &Element, name: &str) {
        report("remove_attribute", el.remove_attribute(name));
    }

    fn set_inner_html(&mut self, el: &Element, html: &str) {
        el.set_inner_html(html);
    }

    fn append_style(&mut self, el: &Element, css: &str) {
        let style = match el.get_attribute("style") {
            Some(existing) if !existing.trim().is_empty() => {
                let existing = existing.trim_end();
                if existing.ends_with(';') {
                    format!("{existing} {css}")
                } else {
                    format!("{existing}; {css}")
                }
            }
            _ => css.to_owned(),
        };
        report("append_style", el.set_attribute("style", &style));
    }

    fn set_style_px(&mut self, el: &Element, property: &str, px: f64) {
        if let Some(el) = el.dyn_ref::<HtmlElement>() {
            report(
                "set_style_px",
                el.style().set_property(property, &format!("{px}px")),
            );
        }
    }

    fn add_class(&mut self, el: &Element, class: &str) {
        report("add_class", el.class_list().add_1(class));
    }

    fn remove_class(&mut self, el: &Element, class: &str) {
        report("remove_class", el.class_list().remove_1(class));
    }

    fn append_child(&mut self, parent: &Element, child: &Element) {
        report("append_child", parent.append_child(child).map(drop));
    }

    fn append_to_body(&mut self, el: &Element) {
        report("append_to_body", self.body.append_child(el).map(drop));
    }

    fn remove(&mut self, el: &Element) {
        el.remove();
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.dismiss_listeners)
            .into_iter()
            .partition(|(target, _)| target == el || el.contains(Some(target.as_ref())));
        self.dismiss_listeners = kept;
        self.retired
            .extend(gone.into_iter().map(|(_, listener)| listener));
    }

    fn focus(&mut self, el: &Element) {
        if let Some(el) = el.dyn_ref::<HtmlElement>() {
            report("focus", el.focus());
        }
    }

    fn listen_marker(&mut self, marker: &Element, calendar: CalendarId) {
        let target = marker.clone();
        let click = EventListener::new_with_options(marker, "click", bubbling(), move |event| {
            let outcome = with_runtime(|view| view.handle_marker_click(&target, calendar));
            if outcome.is_some_and(|outcome| outcome.prevent_default) {
                event.prevent_default();
            }
        });
        let target = marker.clone();
        let keydown =
            EventListener::new_with_options(marker, "keydown", bubbling(), move |event| {
                let Some(key) = key_of(event) else {
                    return;
                };
                let outcome =
                    with_runtime(|view| view.handle_marker_key(&target, calendar, &key));
                if outcome.is_some_and(|outcome| outcome.prevent_default) {
                    event.prevent_default();
                }
            });
        self.marker_listeners
            .entry(calendar)
            .or_default()
            .extend([click, keydown]);
    }

    fn unlisten_markers(&mut self, calendar: CalendarId) {
        self.marker_listeners.remove(&calendar);
    }

    fn listen_dismiss(&mut self, el: &Element) {
        // Called while a popover is being built, never from a dismiss click.
        self.retired.clear();
        let listener = EventListener::new_with_options(el, "click", bubbling(), |event| {
            let outcome = with_runtime(|view| view.handle_dismiss());
            if outcome.is_some_and(|outcome| outcome.prevent_default) {
                event.prevent_default();
            }
        });
        self.dismiss_listeners.push((el.clone(), listener));
    }

    fn listen_viewport(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId::new(self.next_listener);
        let on_change = |_: &Event| {
            with_runtime(|view| view.handle_viewport_change());
        };
        let scroll = EventListener::new(&self.window, "scroll", on_change);
        let resize = EventListener::new(&self.window, "resize", on_change);
        self.viewport_listeners.insert(id, [scroll, resize]);
        id
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.viewport_listeners.remove(&id);
    }

    fn listen_document_keys(&mut self) {
        let listener = EventListener::new(&self.document, "keydown", |event| {
            if let Some(key) = key_of(event) {
                with_runtime(|view| view.handle_document_key(&key));
            }
        });
        self.global_listeners.push(listener);
    }

    fn listen_unload(&mut self) {
        let listener = EventListener::new(&self.window, "pagehide", |_| {
            with_runtime(|view| view.unload());
        });
        self.global_listeners.push(listener);
    }

    fn schedule(&mut self, delay: Duration, timer: TimerId) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, move || {
            with_runtime(|view| {
                view.host_mut().timer_fired(timer);
                view.on_timer(timer);
            });
        });
        self.timers.insert(timer, timeout);
    }

    fn create_observer(&mut self, options: &ObserverOptions) -> Option<ObserverId> {
        if !self.supports_intersection() {
            return None;
        }
        let callback: ObserverCallback =
            Closure::new(|records: Array, _observer: IntersectionObserver| {
                let entries: Vec<IntersectionEntry<Element>> = records
                    .iter()
                    .filter_map(|record| record.dyn_into::<IntersectionObserverEntry>().ok())
                    .map(|entry| IntersectionEntry {
                        target: entry.target(),
                        is_intersecting: entry.is_intersecting(),
                    })
                    .collect();
                with_runtime(|view| view.handle_intersections(&entries));
            });

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(options.threshold));
        init.set_root_margin(&options.root_margin);
        let observer = match IntersectionObserver::new_with_options(
            callback.as_ref().unchecked_ref(),
            &init,
        ) {
            Ok(observer) => observer,
            Err(err) => {
                let err = HostError::from(err);
                tracing::warn!(error = %err, "intersection observer rejected");
                return None;
            }
        };

        self.next_observer += 1;
        let id = ObserverId::new(self.next_observer);
        self.observers.insert(
            id,
            WebObserver {
                observer,
                _callback: callback,
            },
        );
        Some(id)
    }

    fn observe(&mut self, observer: ObserverId, target: &Element) {
        if let Some(web) = self.observers.get(&observer) {
            web.observer.observe(target);
        }
    }

    fn unobserve(&mut self, observer: ObserverId, target: &Element) {
        if let Some(web) = self.observers.get(&observer) {
            web.observer.unobserve(target);
        }
    }

    fn disconnect(&mut self, observer: ObserverId) {
        if let Some(web) = self.observers.get(&observer) {
            web.observer.disconnect();
        }
    }
}
