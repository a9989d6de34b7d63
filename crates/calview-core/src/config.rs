#![forbid(unsafe_code)]

//! Runtime configuration for the calendar view.
//!
//! [`ViewConfig`] groups every tunable value of the engine. All fields default
//! to the tokens in [`constants`](crate::constants), so `ViewConfig::default()`
//! matches the markup emitted by the block's server renderer.
//!
//! A page can override any subset through JSON:
//!
//! ```json
//! { "gap": 12, "classes": { "active": "is-open" } }
//! ```
//!
//! ```rust
//! use calview_core::config::ViewConfig;
//!
//! let config = ViewConfig::from_json_str(r#"{ "gap": 12 }"#).unwrap();
//! assert_eq!(config.gap, 12.0);
//! assert_eq!(config.margin, calview_core::constants::DEFAULT_MARGIN_PX);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{self, attr, class};
use crate::error::ConfigError;
use crate::position::PlacementConfig;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Gap between trigger and popover (px).
    pub gap: f64,
    /// Minimum distance from viewport edges (px).
    pub margin: f64,
    pub observer: ObserverConfig,
    pub timing: TimingConfig,
    pub classes: ClassTokens,
    pub attributes: AttributeNames,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            gap: constants::DEFAULT_GAP_PX,
            margin: constants::DEFAULT_MARGIN_PX,
            observer: ObserverConfig::default(),
            timing: TimingConfig::default(),
            classes: ClassTokens::default(),
            attributes: AttributeNames::default(),
        }
    }
}

/// Intersection observer tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Visible fraction that counts as "in view".
    pub threshold: f64,
    /// Margin added around the viewport before intersection is computed.
    pub root_margin_px: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            threshold: constants::OBSERVER_THRESHOLD,
            root_margin_px: constants::OBSERVER_ROOT_MARGIN_PX,
        }
    }
}

impl ObserverConfig {
    /// CSS `rootMargin` string for the observer.
    #[must_use]
    pub fn root_margin(&self) -> String {
        format!("{}px", self.root_margin_px)
    }
}

/// Transition timing in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub activate_delay_ms: u64,
    pub close_duration_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            activate_delay_ms: constants::ACTIVATE_DELAY.as_millis() as u64,
            close_duration_ms: constants::CLOSE_DURATION.as_millis() as u64,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub const fn activate_delay(&self) -> Duration {
        Duration::from_millis(self.activate_delay_ms)
    }

    #[must_use]
    pub const fn close_duration(&self) -> Duration {
        Duration::from_millis(self.close_duration_ms)
    }
}

/// CSS class tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassTokens {
    pub calendar: String,
    pub event: String,
    pub popover: String,
    pub backdrop: String,
    pub popover_close: String,
    pub active: String,
}

impl Default for ClassTokens {
    fn default() -> Self {
        Self {
            calendar: class::CALENDAR.to_owned(),
            event: class::EVENT.to_owned(),
            popover: class::POPOVER.to_owned(),
            backdrop: class::BACKDROP.to_owned(),
            popover_close: class::POPOVER_CLOSE.to_owned(),
            active: class::ACTIVE.to_owned(),
        }
    }
}

/// Attribute names of the markup contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeNames {
    pub content_ref: String,
    pub popover_style: String,
    pub setup: String,
    pub calendar_id: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            content_ref: attr::CONTENT_REF.to_owned(),
            popover_style: attr::POPOVER_STYLE.to_owned(),
            setup: attr::SETUP.to_owned(),
            calendar_id: attr::CALENDAR_ID.to_owned(),
        }
    }
}

impl ViewConfig {
    /// Parse and validate a JSON override. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Placement parameters for the positioning engine.
    #[must_use]
    pub const fn placement(&self) -> PlacementConfig {
        PlacementConfig {
            gap: self.gap,
            margin: self.margin,
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gap.is_finite() || self.gap < 0.0 {
            return Err(ConfigError::invalid("gap", "must be a finite value >= 0"));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::invalid("margin", "must be a finite value >= 0"));
        }
        if !(0.0..=1.0).contains(&self.observer.threshold) {
            return Err(ConfigError::invalid(
                "observer.threshold",
                "must be within [0, 1]",
            ));
        }
        if !self.observer.root_margin_px.is_finite() {
            return Err(ConfigError::invalid(
                "observer.root_margin_px",
                "must be finite",
            ));
        }

        let classes = [
            ("classes.calendar", &self.classes.calendar),
            ("classes.event", &self.classes.event),
            ("classes.popover", &self.classes.popover),
            ("classes.backdrop", &self.classes.backdrop),
            ("classes.popover_close", &self.classes.popover_close),
            ("classes.active", &self.classes.active),
        ];
        for (field, token) in classes {
            if token.is_empty() {
                return Err(ConfigError::invalid(field, "class token is empty"));
            }
            if token.chars().any(char::is_whitespace) {
                return Err(ConfigError::invalid(field, "class token contains whitespace"));
            }
        }

        let attributes = [
            ("attributes.content_ref", &self.attributes.content_ref),
            ("attributes.popover_style", &self.attributes.popover_style),
            ("attributes.setup", &self.attributes.setup),
            ("attributes.calendar_id", &self.attributes.calendar_id),
        ];
        for (field, name) in attributes {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid(field, "attribute name is empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_validate() {
        ViewConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewConfig::from_json_str(
            r#"{ "margin": 4, "classes": { "active": "is-open" }, "timing": { "close_duration_ms": 50 } }"#,
        )
        .expect("partial override parses");

        let mut expected = ViewConfig::default();
        expected.margin = 4.0;
        expected.classes.active = "is-open".to_owned();
        expected.timing.close_duration_ms = 50;
        assert_eq!(config, expected);
        assert_eq!(config.timing.close_duration(), Duration::from_millis(50));
        assert_eq!(config.timing.activate_delay(), constants::ACTIVATE_DELAY);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = ViewConfig::from_json_str("{ gap: ").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn negative_gap_rejected() {
        let err = ViewConfig::from_json_str(r#"{ "gap": -1 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gap", .. }));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let err = ViewConfig::from_json_str(r#"{ "observer": { "threshold": 1.5 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "observer.threshold",
                ..
            }
        ));
    }

    #[test]
    fn class_token_with_space_rejected() {
        let err =
            ViewConfig::from_json_str(r#"{ "classes": { "popover": "a b" } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "classes.popover",
                ..
            }
        ));
    }

    #[test]
    fn root_margin_formats_as_css() {
        assert_eq!(ObserverConfig::default().root_margin(), "50px");
    }
}
