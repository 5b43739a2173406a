#![forbid(unsafe_code)]

//! Accordion settings.
//!
//! [`AccordionSettings`] is the single configuration record shared read-only
//! by the locator and the controller. Hosts usually supply a partial JSON
//! object; keys they provide win, everything else keeps its default.
//!
//! ```json
//! { "toggleRole": "[data-accordion-toggle]", "resizeDebounceMs": 150 }
//! ```
//!
//! ```rust
//! use accordion_core::AccordionSettings;
//!
//! let settings = AccordionSettings::from_json_str(r#"{ "activeClassName": "open" }"#)?;
//! assert_eq!(settings.active_class_name, "open");
//! assert_eq!(settings.panel_role, ".accordion-panel");
//! # Ok::<(), accordion_core::SettingsError>(())
//! ```
//!
//! # Defaults
//!
//! | key                      | default              |
//! |--------------------------|----------------------|
//! | `initClassName`          | `js-accordion`       |
//! | `groupRole`              | `.accordion`         |
//! | `panelRole`              | `.accordion-panel`   |
//! | `toggleRole`             | `.accordion-toggle`  |
//! | `contentRole`            | `.accordion-content` |
//! | `activeClassName`        | `is-active`          |
//! | `transitioningClassName` | `is-transitioning`   |
//! | `resizeDebounceMs`       | `100`                |
//! | `transitionTimeoutMs`    | `1000` (0 disables)  |

use core::fmt;
use core::time::Duration;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::selector::{Selector, SelectorError};

/// Configuration record for one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccordionSettings {
    /// Class added to the document root once the controller is live.
    pub init_class_name: String,
    /// Selector identifying panel groups.
    pub group_role: String,
    /// Selector identifying panels inside a group.
    pub panel_role: String,
    /// Selector identifying a panel's toggle control.
    pub toggle_role: String,
    /// Selector identifying a panel's content region.
    pub content_role: String,
    /// Class marking an open (or opening) panel.
    pub active_class_name: String,
    /// Class present on a panel while it animates.
    pub transitioning_class_name: String,
    /// Quiet interval before a resize burst is handled.
    pub resize_debounce_ms: u64,
    /// Fallback after which an unconfirmed transition is settled. `0` waits forever.
    pub transition_timeout_ms: u64,
}

impl Default for AccordionSettings {
    fn default() -> Self {
        Self {
            init_class_name: "js-accordion".into(),
            group_role: ".accordion".into(),
            panel_role: ".accordion-panel".into(),
            toggle_role: ".accordion-toggle".into(),
            content_role: ".accordion-content".into(),
            active_class_name: "is-active".into(),
            transitioning_class_name: "is-transitioning".into(),
            resize_debounce_ms: 100,
            transition_timeout_ms: 1_000,
        }
    }
}

/// Parsed role selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSelectors {
    pub group: Selector,
    pub panel: Selector,
    pub toggle: Selector,
    pub content: Selector,
}

impl AccordionSettings {
    /// Overlay a partial JSON document onto the defaults.
    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        let overrides: Value = serde_json::from_str(s).map_err(SettingsError::Json)?;
        Self::default().overlay(overrides)
    }

    /// Load overrides from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SettingsError::Io)?;
        Self::from_json_str(&content)
    }

    /// Overlay a partial TOML document onto the defaults.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let overrides: Value = toml::from_str(s).map_err(SettingsError::Toml)?;
        Self::default().overlay(overrides)
    }

    /// Overlay `overrides` onto `self` and validate the result.
    ///
    /// Object values merge key-by-key (recursively); any other value replaces
    /// the existing one. `null` overrides are ignored.
    pub fn overlay(&self, overrides: Value) -> Result<Self, SettingsError> {
        let mut merged = serde_json::to_value(self).map_err(SettingsError::Json)?;
        merge_json(&mut merged, overrides);
        let settings: Self = serde_json::from_value(merged).map_err(SettingsError::Json)?;
        let errors = settings.validate();
        if errors.is_empty() {
            Ok(settings)
        } else {
            Err(SettingsError::Validation(errors))
        }
    }

    /// Validate all values.
    ///
    /// Returns a list of validation errors. An empty list means the settings
    /// are valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, raw) in [
            ("groupRole", &self.group_role),
            ("panelRole", &self.panel_role),
            ("toggleRole", &self.toggle_role),
            ("contentRole", &self.content_role),
        ] {
            if let Err(err) = Selector::parse(raw) {
                errors.push(format!("{key}: {err}"));
            }
        }

        for (key, class) in [
            ("initClassName", &self.init_class_name),
            ("activeClassName", &self.active_class_name),
            ("transitioningClassName", &self.transitioning_class_name),
        ] {
            if class.is_empty() {
                errors.push(format!("{key} must not be empty"));
            } else if class.chars().any(char::is_whitespace) {
                errors.push(format!("{key} must be a single class name, got {class:?}"));
            }
        }

        if self.active_class_name == self.transitioning_class_name {
            errors.push("activeClassName and transitioningClassName must differ".into());
        }

        errors
    }

    /// Parse every role selector.
    pub fn role_selectors(&self) -> Result<RoleSelectors, SelectorError> {
        Ok(RoleSelectors {
            group: Selector::parse(&self.group_role)?,
            panel: Selector::parse(&self.panel_role)?,
            toggle: Selector::parse(&self.toggle_role)?,
            content: Selector::parse(&self.content_role)?,
        })
    }

    /// Resize quiet interval.
    #[must_use]
    pub const fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Transition fallback, `None` when disabled.
    #[must_use]
    pub const fn transition_timeout(&self) -> Option<Duration> {
        if self.transition_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.transition_timeout_ms))
        }
    }
}

/// Deep-merge `overlay` into `base`.
///
/// Objects merge per key, recursively; `null` leaves `base` untouched; any
/// other overlay value replaces `base` wholesale.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        if !value.is_null() {
                            base_map.insert(key, value);
                        }
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when loading settings.
#[derive(Debug)]
pub enum SettingsError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// JSON parse or shape error.
    Json(serde_json::Error),
    /// TOML parse error.
    #[cfg(feature = "toml")]
    Toml(toml::de::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            #[cfg(feature = "toml")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            #[cfg(feature = "toml")]
            Self::Toml(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
