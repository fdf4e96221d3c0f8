//! Run configuration
//!
//! Every poll interval, timeout and settle delay lives in [`Timings`]; every
//! name the scenario looks for lives in [`Scenario`]. Both load from YAML with
//! all fields optional:
//!
//! ```yaml
//! timings:
//!   poll_interval: 200ms
//!   startup_timeout: 2m
//! scenario:
//!   project_name: Project1
//!   plugin_button: ElectricalLoadPlugin
//!   action_buttons: [Execute, Insert Equipment]
//! ```

use crate::candidate::CornerBand;
use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timings: Timings,
    pub scenario: Scenario,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Interval between polls of the tree
    #[serde(with = "human_duration")]
    pub poll_interval: Duration,
    /// Interval for the recent-file list, which re-renders quickly
    #[serde(with = "human_duration")]
    pub fast_poll_interval: Duration,
    /// Pause after an interaction before checking its effect
    #[serde(with = "human_duration")]
    pub settle_delay: Duration,
    /// Pause between moving the pointer and clicking
    #[serde(with = "human_duration")]
    pub pointer_settle: Duration,
    /// Pause after filtering the recent-file list
    #[serde(with = "human_duration")]
    pub search_settle: Duration,
    /// Pause after activating the add-in's ribbon button
    #[serde(with = "human_duration")]
    pub plugin_settle: Duration,
    #[serde(with = "human_duration")]
    pub startup_timeout: Duration,
    #[serde(with = "human_duration")]
    pub main_window_timeout: Duration,
    #[serde(with = "human_duration")]
    pub popup_timeout: Duration,
    #[serde(with = "human_duration")]
    pub project_open_timeout: Duration,
    #[serde(with = "human_duration")]
    pub project_confirm_timeout: Duration,
    #[serde(with = "human_duration")]
    pub project_final_timeout: Duration,
    #[serde(with = "human_duration")]
    pub plugin_button_timeout: Duration,
    #[serde(with = "human_duration")]
    pub action_button_timeout: Duration,
    #[serde(with = "human_duration")]
    pub dialog_timeout: Duration,
    #[serde(with = "human_duration")]
    pub teardown_grace: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            fast_poll_interval: Duration::from_millis(150),
            settle_delay: Duration::from_millis(250),
            pointer_settle: Duration::from_millis(60),
            search_settle: Duration::from_millis(600),
            plugin_settle: Duration::from_millis(500),
            startup_timeout: Duration::from_secs(120),
            main_window_timeout: Duration::from_secs(60),
            popup_timeout: Duration::from_secs(15),
            project_open_timeout: Duration::from_secs(30),
            project_confirm_timeout: Duration::from_secs(6),
            project_final_timeout: Duration::from_secs(8),
            plugin_button_timeout: Duration::from_secs(10),
            action_button_timeout: Duration::from_secs(5),
            dialog_timeout: Duration::from_secs(20),
            teardown_grace: Duration::from_millis(500),
        }
    }
}

impl Timings {
    /// Every duration divided by `factor`. Handy for driving the scenario
    /// against an in-memory tree in milliseconds instead of seconds.
    pub fn scaled_down(&self, factor: u32) -> Self {
        let factor = factor.max(1);
        Self {
            poll_interval: self.poll_interval / factor,
            fast_poll_interval: self.fast_poll_interval / factor,
            settle_delay: self.settle_delay / factor,
            pointer_settle: self.pointer_settle / factor,
            search_settle: self.search_settle / factor,
            plugin_settle: self.plugin_settle / factor,
            startup_timeout: self.startup_timeout / factor,
            main_window_timeout: self.main_window_timeout / factor,
            popup_timeout: self.popup_timeout / factor,
            project_open_timeout: self.project_open_timeout / factor,
            project_confirm_timeout: self.project_confirm_timeout / factor,
            project_final_timeout: self.project_final_timeout / factor,
            plugin_button_timeout: self.plugin_button_timeout / factor,
            action_button_timeout: self.action_button_timeout / factor,
            dialog_timeout: self.dialog_timeout / factor,
            teardown_grace: self.teardown_grace / factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Executable to launch when no running instance is found
    pub application_path: Option<PathBuf>,
    /// Process name used to attach and for teardown
    pub process_name: String,
    /// Recent-file entry to open
    pub project_name: String,
    /// Ribbon button the add-in registers
    pub plugin_button: String,
    /// Buttons that must show up once the add-in is activated
    pub action_buttons: Vec<String>,
    /// Which of the action buttons to press
    pub result_button: String,
    /// Title of the window the add-in opens in response
    pub dialog_title: String,
    /// Name of the document hosting the startup popup
    pub startup_popup: String,
    /// Name of the recent-files search box
    pub recent_search_box: String,
    /// Where the popup's close glyph is expected
    pub popup_band: CornerBand,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            application_path: Some(PathBuf::from(
                r"C:\Program Files\Autodesk\Revit 2026\Revit.exe",
            )),
            process_name: "Revit".to_string(),
            project_name: "Project1".to_string(),
            plugin_button: "ElectricalLoadPlugin".to_string(),
            action_buttons: vec!["Execute".to_string(), "Insert Equipment".to_string()],
            result_button: "Execute".to_string(),
            dialog_title: "ElectricalLoadPlugin".to_string(),
            startup_popup: "IPM Loader".to_string(),
            recent_search_box: "Search for recent files".to_string(),
            popup_band: CornerBand::default(),
        }
    }
}

impl ProbeConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, AutomationError> {
        let config: ProbeConfig = serde_yaml::from_str(content)
            .map_err(|e| AutomationError::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        let t = &self.timings;
        if t.poll_interval.is_zero() || t.fast_poll_interval.is_zero() {
            return Err(AutomationError::Config(
                "poll intervals must be greater than zero".to_string(),
            ));
        }

        let s = &self.scenario;
        for (field, value) in [
            ("process_name", &s.process_name),
            ("project_name", &s.project_name),
            ("plugin_button", &s.plugin_button),
            ("result_button", &s.result_button),
            ("dialog_title", &s.dialog_title),
            ("startup_popup", &s.startup_popup),
        ] {
            if value.trim().is_empty() {
                return Err(AutomationError::Config(format!("{field} must not be empty")));
            }
        }
        if let Some(empty) = s.action_buttons.iter().position(|b| b.trim().is_empty()) {
            return Err(AutomationError::Config(format!(
                "action_buttons[{empty}] must not be empty"
            )));
        }
        if !s.action_buttons.is_empty() && !s.action_buttons.contains(&s.result_button) {
            return Err(AutomationError::Config(format!(
                "result_button '{}' is not one of action_buttons",
                s.result_button
            )));
        }
        Ok(())
    }
}

/// Parse human-readable durations: "500ms", "2s", "1.5m", "1h". Plain numbers
/// are milliseconds.
pub fn parse_duration(input: &str) -> Result<Duration, AutomationError> {
    let input = input.trim();

    if let Ok(ms) = input.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    let split_pos = input
        .char_indices()
        .find(|(_, ch)| ch.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    let (number_part, unit_part) = input.split_at(split_pos);
    if number_part.trim().is_empty() {
        return Err(AutomationError::InvalidArgument(format!(
            "No numeric value in duration: {input}"
        )));
    }
    let value: f64 = number_part.trim().parse().map_err(|_| {
        AutomationError::InvalidArgument(format!("Invalid number in duration: {number_part}"))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(AutomationError::InvalidArgument(format!(
            "Duration must be a non-negative number: {input}"
        )));
    }

    let multiplier = match unit_part {
        "ms" | "milliseconds" | "millisecond" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "" => 1.0,
        _ => {
            return Err(AutomationError::InvalidArgument(format!(
                "Unknown time unit: {unit_part}"
            )))
        }
    };

    Ok(Duration::from_millis((value * multiplier) as u64))
}

/// Serde adapter: durations as "250ms"-style strings, or plain milliseconds.
mod human_duration {
    use super::parse_duration;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("500").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2.5s").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ProbeConfig::from_yaml_str(
            "timings:\n  poll_interval: 50ms\n  dialog_timeout: 30000\nscenario:\n  project_name: Tower\n",
        )
        .unwrap();
        assert_eq!(config.timings.poll_interval, Duration::from_millis(50));
        assert_eq!(config.timings.dialog_timeout, Duration::from_secs(30));
        assert_eq!(config.timings.popup_timeout, Duration::from_secs(15));
        assert_eq!(config.scenario.project_name, "Tower");
        assert_eq!(config.scenario.startup_popup, "IPM Loader");
    }

    #[test]
    fn test_validation_rejects_bad_config() {
        let mut config = ProbeConfig::default();
        config.timings.poll_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(AutomationError::Config(_))));

        let mut config = ProbeConfig::default();
        config.scenario.result_button = "Cancel".to_string();
        assert!(config.validate().is_err());

        let mut config = ProbeConfig::default();
        config.scenario.project_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scenario:\n  plugin_button: MyAddin\n  action_buttons: [Run]\n  result_button: Run").unwrap();
        let config = ProbeConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.scenario.plugin_button, "MyAddin");
        assert_eq!(config.scenario.action_buttons, vec!["Run".to_string()]);
    }

    #[test]
    fn test_serialized_config_reloads() {
        let config = ProbeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(ProbeConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_scaled_timings() {
        let t = Timings::default().scaled_down(100);
        assert_eq!(t.startup_timeout, Duration::from_millis(1200));
        assert_eq!(t.poll_interval, Duration::from_millis(2));
    }
}
