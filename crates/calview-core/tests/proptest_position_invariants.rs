#![forbid(unsafe_code)]

//! Property-based invariant tests for popover placement.
//!
//! 1. A popover that fits the usable band stays inside the horizontal margins
//! 2. The top edge never goes above the margin
//! 3. With room below, the popover sits exactly `gap` below the trigger
//! 4. The horizontal result does not depend on vertical inputs
//! 5. When a flip happens and the space above suffices, the popover ends
//!    `gap` above the trigger
//!
//! Run:
//!   cargo test -p calview-core --test proptest_position_invariants

use calview_core::geometry::{Rect, Size, Viewport};
use calview_core::position::{PlacementConfig, compute_position};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

// ── Strategies ──────────────────────────────────────────────────────────

fn px(max: u32) -> impl Strategy<Value = f64> {
    (0..=max).prop_map(f64::from)
}

fn viewport_strategy() -> impl Strategy<Value = Viewport> {
    (px(2400), px(1600)).prop_map(|(w, h)| Viewport::new(w + 200.0, h + 200.0))
}

fn size_strategy() -> impl Strategy<Value = Size> {
    (px(900), px(600)).prop_map(|(w, h)| Size::new(w + 1.0, h + 1.0))
}

fn trigger_strategy() -> impl Strategy<Value = Rect> {
    (px(2600), px(1800), px(120), px(60))
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w + 1.0, h + 1.0))
}

fn config_strategy() -> impl Strategy<Value = PlacementConfig> {
    (px(40), px(40)).prop_map(|(gap, margin)| PlacementConfig { gap, margin })
}

proptest! {
    #[test]
    fn fitting_popover_stays_within_horizontal_margins(
        viewport in viewport_strategy(),
        popover in size_strategy(),
        trigger in trigger_strategy(),
        config in config_strategy(),
    ) {
        prop_assume!(popover.width <= viewport.width - 2.0 * config.margin);
        let position = compute_position(popover, trigger, viewport, config);
        prop_assert!(position.left >= config.margin - EPS);
        prop_assert!(position.left + popover.width <= viewport.width - config.margin + EPS);
    }

    #[test]
    fn top_never_above_margin(
        viewport in viewport_strategy(),
        popover in size_strategy(),
        trigger in trigger_strategy(),
        config in config_strategy(),
    ) {
        let position = compute_position(popover, trigger, viewport, config);
        prop_assert!(position.top >= config.margin - EPS);
    }

    #[test]
    fn no_flip_means_gap_below_trigger(
        width in px(2400),
        height in px(1600),
        popover in size_strategy(),
        x in px(2600),
        y in px(400),
        config in config_strategy(),
    ) {
        let viewport = Viewport::new(width + 200.0, height + 1200.0);
        let trigger = Rect::new(x, y, 40.0, 20.0);
        let below = trigger.bottom() + config.gap;
        prop_assume!(below >= config.margin);
        let position = compute_position(popover, trigger, viewport, config);
        prop_assert!((position.top - below).abs() < EPS);
    }

    #[test]
    fn horizontal_placement_ignores_vertical_inputs(
        viewport in viewport_strategy(),
        popover in size_strategy(),
        trigger in trigger_strategy(),
        config in config_strategy(),
        other_y in px(1800),
        other_height in px(1600),
    ) {
        let moved = Rect::new(trigger.x, other_y, trigger.width, trigger.height);
        let taller = Viewport::new(viewport.width, other_height + 200.0);
        let a = compute_position(popover, trigger, viewport, config);
        let b = compute_position(popover, moved, taller, config);
        prop_assert!((a.left - b.left).abs() < EPS);
    }

    #[test]
    fn flip_lands_gap_above_trigger_when_room(
        viewport in viewport_strategy(),
        popover_width in px(900),
        popover_height in 1u32..=150,
        slack_percent in 0u32..100,
        x in px(2600),
        config in config_strategy(),
    ) {
        let popover = Size::new(popover_width + 1.0, f64::from(popover_height));
        // The trigger's bottom sits less than one popover height above the
        // viewport bottom, so the popover cannot fit below it.
        let slack = popover.height * f64::from(slack_percent) / 100.0;
        let trigger = Rect::new(x, viewport.height - 20.0 - slack, 40.0, 20.0);
        let above = trigger.top() - popover.height - config.gap;
        prop_assume!(above >= config.margin);
        let position = compute_position(popover, trigger, viewport, config);
        prop_assert!((position.top - above).abs() < EPS);
    }
}
