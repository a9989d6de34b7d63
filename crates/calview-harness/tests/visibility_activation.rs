#![forbid(unsafe_code)]

//! Lazy activation, visibility gating, and the eager fallback.
//!
//! Run:
//!   cargo test -p calview-harness --test visibility_activation

use std::time::Duration;

use calview_core::constants::{aria, attr, class};
use calview_core::host::Host;
use calview_core::store::{PopoverPhase, SessionSerial};
use calview_core::visibility::VisibilityTransition;
use calview_core::{BootOutcome, StrategyKind, ViewConfig};
use calview_harness::{Harness, MockHost, NodeId};
use pretty_assertions::assert_eq;

fn two_calendars(host: MockHost) -> (Harness, [NodeId; 2], [NodeId; 2]) {
    let mut host = host;
    let first = host.add_calendar();
    let second = host.add_calendar();
    host.add_content("a", "<p>A</p>");
    host.add_content("b", "<p>B</p>");
    let a = host.add_marker(first, Some("a"));
    let b = host.add_marker(second, Some("b"));
    (Harness::new(host), [first, second], [a, b])
}

fn calendar_id(harness: &Harness, calendar: NodeId) -> calview_core::CalendarId {
    harness
        .engine()
        .calendar_id_of(&calendar)
        .expect("calendar registered")
}

#[test]
fn page_without_calendars_installs_nothing() {
    let mut harness = Harness::new(MockHost::new());
    assert_eq!(harness.boot(), BootOutcome::Idle);
    assert!(!harness.view().is_started());
    assert!(harness.host().observers().is_empty());
    assert_eq!(harness.host().document_key_listeners(), 0);
    assert_eq!(harness.host().unload_listeners(), 0);
}

#[test]
fn boot_observes_every_calendar_without_activating() {
    let (mut harness, [first, second], [a, b]) = two_calendars(MockHost::new());
    assert_eq!(
        harness.boot(),
        BootOutcome::Started {
            calendars: 2,
            strategy: StrategyKind::Observed,
        }
    );
    assert_eq!(harness.boot(), BootOutcome::AlreadyStarted);

    let observers: Vec<_> = harness.host().observers().values().cloned().collect();
    assert_eq!(observers.len(), 1);
    assert_eq!(observers[0].options.threshold, 0.1);
    assert_eq!(observers[0].options.root_margin, "50px");
    assert_eq!(observers[0].targets, vec![first, second]);

    for calendar in [first, second] {
        let id = calendar_id(&harness, calendar);
        assert!(!harness.engine().state().visibility.is_visible(id));
        assert!(harness.host().attr(calendar, attr::CALENDAR_ID).is_some());
    }
    // Markers stay plain links until their calendar is seen.
    for marker in [a, b] {
        assert_eq!(harness.host().attr(marker, attr::SETUP), None);
        assert_eq!(harness.host().marker_listener_count(marker), 0);
    }
    assert_eq!(harness.host().document_key_listeners(), 1);
    assert_eq!(harness.host().unload_listeners(), 1);
}

#[test]
fn entering_viewport_upgrades_markers_once() {
    let (mut harness, [first, _], [a, b]) = two_calendars(MockHost::new());
    harness.boot();

    assert_eq!(
        harness.intersect(&[(first, true)]),
        vec![VisibilityTransition::Entered]
    );
    assert_eq!(harness.host().attr(a, attr::SETUP), Some("true"));
    assert_eq!(harness.host().attr(a, aria::ROLE), Some("button"));
    assert_eq!(harness.host().attr(a, aria::TABINDEX), Some("0"));
    assert_eq!(harness.host().marker_listener_count(a), 1);
    // The other calendar is untouched.
    assert_eq!(harness.host().marker_listener_count(b), 0);

    assert_eq!(
        harness.intersect(&[(first, true)]),
        vec![VisibilityTransition::Unchanged]
    );
    harness.intersect(&[(first, false)]);
    assert_eq!(
        harness.intersect(&[(first, true)]),
        vec![VisibilityTransition::Entered]
    );
    assert_eq!(harness.host().marker_listener_count(a), 1);
}

#[test]
fn repeated_activation_wires_a_single_listener() {
    let (mut harness, [first, _], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true)]);
    let id = calendar_id(&harness, first);

    for _ in 0..4 {
        assert!(!harness.engine_mut().activate_marker(&a, id));
        assert_eq!(harness.engine_mut().activate_calendar(&first, id), 0);
    }
    assert_eq!(harness.host().marker_listener_count(a), 1);

    harness.click(a);
    let session = harness.engine().state().session().unwrap();
    assert_eq!(session.serial, SessionSerial::new(1));
    assert_eq!(harness.host().connected_with_class(class::POPOVER).len(), 1);
}

#[test]
fn hidden_calendar_leaves_events_to_the_browser() {
    let (mut harness, [first, _], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true)]);
    harness.intersect(&[(first, false)]);

    let click = harness.click(a);
    assert!(!click.handled);
    assert!(!click.prevent_default);

    let key = harness.key(a, "Enter");
    assert!(!key.prevent_default);

    assert!(harness.engine().state().session().is_none());
    assert!(harness.host().connected_with_class(class::POPOVER).is_empty());
}

#[test]
fn non_activation_keys_pass_through() {
    let (mut harness, [first, _], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true)]);

    for key in ["a", "Tab", "ArrowDown"] {
        let outcome = harness.key(a, key);
        assert!(!outcome.prevent_default, "{key} must not be consumed");
    }
    assert_eq!(harness.phase(), PopoverPhase::Closed);

    for key in ["Enter", " ", "Spacebar"] {
        let outcome = harness.key(a, key);
        assert!(outcome.prevent_default, "{key:?} opens");
        let session = harness.engine().state().session().unwrap();
        assert!(session.opened_via_keyboard);
    }
}

#[test]
fn escape_backdrop_and_close_control_all_dismiss() {
    let (mut harness, [first, _], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true)]);

    // Escape with nothing open is not claimed.
    assert!(!harness.document_key("Escape").handled);

    harness.click(a);
    assert!(harness.document_key("Esc").handled);
    assert_eq!(harness.phase(), PopoverPhase::Closing);
    harness.settle();

    harness.click(a);
    let backdrop = harness.backdrop().unwrap();
    let outcome = harness.click(backdrop);
    assert!(outcome.handled);
    assert!(!outcome.prevent_default);
    assert_eq!(harness.phase(), PopoverPhase::Closing);
    harness.settle();

    harness.click(a);
    let close = harness.close_control().unwrap();
    assert!(harness.click(close).handled);
    assert_eq!(harness.phase(), PopoverPhase::Closing);
    harness.settle();
    assert_eq!(harness.phase(), PopoverPhase::Closed);
}

#[test]
fn leaving_viewport_closes_only_the_owned_popover() {
    let (mut harness, [first, second], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true), (second, true)]);
    harness.click(a);
    harness.advance(Duration::from_millis(10));

    // Another calendar scrolling away does not touch the session.
    assert_eq!(
        harness.intersect(&[(second, false)]),
        vec![VisibilityTransition::Left { closed: false }]
    );
    assert_eq!(harness.phase(), PopoverPhase::Open);

    assert_eq!(
        harness.intersect(&[(first, false)]),
        vec![VisibilityTransition::Left { closed: true }]
    );
    assert_eq!(harness.phase(), PopoverPhase::Closing);
    harness.settle();
    assert!(harness.host().connected_with_class(class::POPOVER).is_empty());
}

#[test]
fn missing_intersection_support_activates_eagerly() {
    let (mut harness, [first, second], [a, b]) =
        two_calendars(MockHost::new().without_intersection());
    assert_eq!(
        harness.boot(),
        BootOutcome::Started {
            calendars: 2,
            strategy: StrategyKind::Eager,
        }
    );
    assert!(harness.host().observers().is_empty());
    assert!(harness.engine().state().observer().is_none());

    for calendar in [first, second] {
        let id = calendar_id(&harness, calendar);
        assert!(harness.engine().state().visibility.is_visible(id));
    }
    for marker in [a, b] {
        assert_eq!(harness.host().marker_listener_count(marker), 1);
    }

    assert!(harness.click(b).prevent_default);
    assert_eq!(harness.phase(), PopoverPhase::Opening);
}

#[test]
fn rescan_adopts_late_calendars() {
    let (mut harness, [first, _], _) = two_calendars(MockHost::new());
    harness.boot();

    let late = harness.host_mut().add_calendar();
    harness.host_mut().add_content("late", "<p>Late</p>");
    let marker = harness.host_mut().add_marker(late, Some("late"));

    assert_eq!(harness.view_mut().rescan(), 1);
    assert_eq!(harness.view_mut().rescan(), 0);
    assert!(harness.host().is_observed(late));
    assert_eq!(harness.engine().calendars().len(), 3);

    harness.intersect(&[(late, true), (first, true)]);
    assert!(harness.click(marker).prevent_default);
    assert_eq!(harness.host().markup(harness.popover().unwrap()), "<p>Late</p>");
}

#[test]
fn rescan_boots_an_idle_view() {
    let mut harness = Harness::new(MockHost::new());
    assert_eq!(harness.boot(), BootOutcome::Idle);

    let calendar = harness.host_mut().add_calendar();
    assert_eq!(harness.view_mut().rescan(), 1);
    assert_eq!(harness.view().strategy_kind(), Some(StrategyKind::Observed));
    assert!(harness.host().is_observed(calendar));
    assert_eq!(harness.host().document_key_listeners(), 1);
}

#[test]
fn detached_calendar_is_forgotten_and_its_popover_closed() {
    let (mut harness, [first, second], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true), (second, true)]);
    harness.click(a);
    let first_id = calendar_id(&harness, first);

    harness.host_mut().detach(first);
    // The next observer batch prunes before applying readings.
    harness.intersect(&[(second, false)]);

    assert_eq!(harness.engine().calendar_id_of(&first), None);
    assert!(!harness.engine().state().visibility.contains(first_id));
    assert!(!harness.host().is_observed(first));
    assert_eq!(harness.phase(), PopoverPhase::Closing);
    assert_eq!(harness.view_mut().prune_detached(), 0);
}

#[test]
fn reattached_calendar_is_adopted_again() {
    let (mut harness, [first, second], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true), (second, true)]);
    let old_id = calendar_id(&harness, first);

    harness.host_mut().detach(first);
    harness.intersect(&[(second, false)]);
    // Forgetting the calendar turns its markers back into plain links.
    assert!(harness.host().marker_routes(a).is_empty());
    assert_eq!(harness.host().attr(a, attr::SETUP), None);
    assert_eq!(harness.host().attr(a, aria::ROLE), None);
    assert_eq!(harness.host().attr(a, aria::TABINDEX), None);
    assert_eq!(harness.host().attr(first, attr::CALENDAR_ID), None);

    harness.host_mut().append_to_body(&first);
    assert_eq!(harness.view_mut().rescan(), 1);
    let new_id = calendar_id(&harness, first);
    assert_ne!(new_id, old_id);

    assert_eq!(
        harness.intersect(&[(first, true)]),
        vec![VisibilityTransition::Entered]
    );
    assert_eq!(harness.host().marker_routes(a), vec![new_id]);
    assert!(harness.click(a).prevent_default);
    assert_eq!(harness.phase(), PopoverPhase::Opening);
    assert_eq!(harness.engine().state().session_owner(), Some(new_id));
}

#[test]
fn unload_closes_and_disconnects() {
    let (mut harness, [first, _], [a, _]) = two_calendars(MockHost::new());
    harness.boot();
    harness.intersect(&[(first, true)]);
    harness.click(a);

    harness.unload();
    assert_eq!(harness.phase(), PopoverPhase::Closing);
    assert!(harness.engine().state().observer().is_none());
    assert!(
        harness
            .host()
            .observers()
            .values()
            .all(|observer| !observer.connected)
    );
    assert!(!harness.host().is_observed(first));

    // A second unload is harmless.
    harness.unload();
    harness.settle();
    assert_eq!(harness.phase(), PopoverPhase::Closed);
}

#[test]
fn custom_tokens_flow_through_discovery_and_dom() {
    let config = ViewConfig::from_json_str(
        r#"{
            "classes": {
                "calendar": "agenda",
                "event": "agenda__item",
                "popover": "agenda__card"
            },
            "attributes": { "content_ref": "data-card" }
        }"#,
    )
    .expect("valid config");

    let mut host = MockHost::with_config(&config);
    let calendar = host.add_calendar();
    host.add_content("x", "<p>X</p>");
    let marker = host.add_marker(calendar, Some("x"));
    assert!(host.has_class(calendar, "agenda"));
    assert_eq!(host.attr(marker, "data-card"), Some("x"));

    let mut harness = Harness::with_config(host, config);
    assert_eq!(
        harness.boot(),
        BootOutcome::Started {
            calendars: 1,
            strategy: StrategyKind::Observed,
        }
    );
    harness.intersect(&[(calendar, true)]);
    harness.click(marker);
    let popover = harness.popover().unwrap();
    assert!(harness.host().has_class(popover, "agenda__card"));
    assert!(harness.host().is_connected(&popover));
}
