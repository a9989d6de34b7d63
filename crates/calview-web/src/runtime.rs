#![forbid(unsafe_code)]

//! Page-level entry points and the thread-local view slot.

use std::cell::RefCell;

use calview_core::CalendarView;
use gloo_events::EventListener;
use wasm_bindgen::prelude::*;

use crate::host::WebHost;
use crate::resolve_config;

thread_local! {
    static VIEW: RefCell<Option<CalendarView<WebHost>>> = const { RefCell::new(None) };
}

/// Run `f` against the page's view.
///
/// Returns `None` when the view is not installed yet, or when it is already
/// borrowed by an outer callback; the event is dropped in that case.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&mut CalendarView<WebHost>) -> R) -> Option<R> {
    VIEW.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            tracing::warn!("calendar view busy, event dropped");
            return None;
        };
        slot.as_mut().map(f)
    })
}

/// Module entry point: install logging, then boot once the document is
/// parsed.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // A second subscriber is refused; the first one keeps logging.
    let _ = tracing_wasm::try_set_as_global_default();

    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        tracing::error!("no document, calendar view not started");
        return;
    };
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", |_| boot_page()).forget();
    } else {
        boot_page();
    }
}

/// Pick up calendars inserted after load. Returns how many were new.
#[wasm_bindgen]
pub fn rescan() -> u32 {
    with_runtime(CalendarView::rescan)
        .map_or(0, |fresh| u32::try_from(fresh).unwrap_or(u32::MAX))
}

fn boot_page() {
    if with_runtime(|_| ()).is_some() {
        tracing::debug!("calendar view already installed, rescanning");
        rescan();
        return;
    }

    let host = match WebHost::new() {
        Ok(host) => host,
        Err(err) => {
            tracing::error!(error = %err, "calendar view not started");
            return;
        }
    };
    let config = resolve_config(host.config_json().as_deref());
    let view = CalendarView::new(host, config);

    let installed = VIEW.with(|slot| match slot.try_borrow_mut() {
        Ok(mut slot) => {
            *slot = Some(view);
            true
        }
        Err(_) => false,
    });
    if !installed {
        tracing::warn!("calendar view slot busy, boot skipped");
        return;
    }

    with_runtime(CalendarView::boot);
}
