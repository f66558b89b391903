//! Configuration loading and management
//!
//! The policy is fixed: wheel inverted, trackpad natural, Control+scroll
//! switches desktops. Environment variables may override the timing
//! constants and switch either half off; nothing is persisted.

use std::time::Duration;

use crate::classify::ClassifierWindows;
use crate::dispatch::DispatchSettings;

const TRACKPAD_WINDOW_MS: &str = "DESKSCROLL_TRACKPAD_WINDOW_MS";
const MOUSE_IDLE_MS: &str = "DESKSCROLL_MOUSE_IDLE_MS";
const SWITCH_COOLDOWN_MS: &str = "DESKSCROLL_SWITCH_COOLDOWN_MS";
const KEY_GAP_US: &str = "DESKSCROLL_KEY_GAP_US";
const NOISE_THRESHOLD: &str = "DESKSCROLL_NOISE_THRESHOLD";
const INVERT_MOUSE: &str = "DESKSCROLL_INVERT_MOUSE";
const DESKTOP_SWITCH: &str = "DESKSCROLL_DESKTOP_SWITCH";
const SCRIPT_FALLBACK: &str = "DESKSCROLL_SCRIPT_FALLBACK";

/// Errors parsing configuration overrides
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be true or false, got {value:?}")]
    InvalidBool { key: &'static str, value: String },
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Classifier timing windows
    pub classifier: ClassifierWindows,

    /// Desktop switch cooldown, noise threshold and key gap
    pub dispatch: DispatchSettings,

    /// Invert scroll events classified as mouse
    pub invert_mouse: bool,

    /// Map Control+scroll to desktop switching
    pub desktop_switch: bool,

    /// Run the AppleScript fallback when key synthesis fails
    pub script_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            classifier: ClassifierWindows::default(),
            dispatch: DispatchSettings::default(),
            invert_mouse: true,
            desktop_switch: true,
            script_fallback: true,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse_number(key, lookup(key))?.map_or(default, Duration::from_millis))
        };
        let flag = |key: &'static str, default: bool| -> Result<bool, ConfigError> {
            Ok(parse_bool(key, lookup(key))?.unwrap_or(default))
        };

        let classifier = ClassifierWindows {
            trackpad_window: millis(TRACKPAD_WINDOW_MS, defaults.classifier.trackpad_window)?,
            mouse_idle: millis(MOUSE_IDLE_MS, defaults.classifier.mouse_idle)?,
        };

        let key_gap = parse_number(KEY_GAP_US, lookup(KEY_GAP_US))?
            .map_or(defaults.dispatch.key_gap, Duration::from_micros);
        let noise_threshold = parse_number(NOISE_THRESHOLD, lookup(NOISE_THRESHOLD))?
            .unwrap_or(defaults.dispatch.noise_threshold);

        let dispatch = DispatchSettings {
            cooldown: millis(SWITCH_COOLDOWN_MS, defaults.dispatch.cooldown)?,
            noise_threshold,
            key_gap,
        };

        Ok(Self {
            classifier,
            dispatch,
            invert_mouse: flag(INVERT_MOUSE, defaults.invert_mouse)?,
            desktop_switch: flag(DESKTOP_SWITCH, defaults.desktop_switch)?,
            script_fallback: flag(SCRIPT_FALLBACK, defaults.script_fallback)?,
        })
    }
}

fn parse_number(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };

    value
        .trim()
        .parse::<u32>()
        .map(|n| Some(u64::from(n)))
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_fixed_policy() {
        let config = load(&[]).unwrap();
        assert_eq!(config.classifier.trackpad_window, Duration::from_millis(222));
        assert_eq!(config.classifier.mouse_idle, Duration::from_millis(333));
        assert_eq!(config.dispatch.cooldown, Duration::from_millis(200));
        assert_eq!(config.dispatch.key_gap, Duration::from_millis(1));
        assert_eq!(config.dispatch.noise_threshold, 0);
        assert!(config.invert_mouse);
        assert!(config.desktop_switch);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DESKSCROLL_TRACKPAD_WINDOW_MS", "150"),
            ("DESKSCROLL_SWITCH_COOLDOWN_MS", " 400 "),
            ("DESKSCROLL_KEY_GAP_US", "2500"),
            ("DESKSCROLL_NOISE_THRESHOLD", "1"),
            ("DESKSCROLL_INVERT_MOUSE", "off"),
            ("DESKSCROLL_SCRIPT_FALLBACK", "FALSE"),
        ])
        .unwrap();

        assert_eq!(config.classifier.trackpad_window, Duration::from_millis(150));
        assert_eq!(config.classifier.mouse_idle, Duration::from_millis(333));
        assert_eq!(config.dispatch.cooldown, Duration::from_millis(400));
        assert_eq!(config.dispatch.key_gap, Duration::from_micros(2500));
        assert_eq!(config.dispatch.noise_threshold, 1);
        assert!(!config.invert_mouse);
        assert!(config.desktop_switch);
        assert!(!config.script_fallback);
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("DESKSCROLL_MOUSE_IDLE_MS", "-5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: "DESKSCROLL_MOUSE_IDLE_MS", .. }));

        let err = load(&[("DESKSCROLL_DESKTOP_SWITCH", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("DESKSCROLL_DESKTOP_SWITCH"));
    }
}
