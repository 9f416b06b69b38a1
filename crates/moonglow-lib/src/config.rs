//! Application configuration — TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{self, Rgb};
use crate::modes::{ColorTable, MODE_KEYS, ModeKey};

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# Moonglow configuration — changes made outside the app may be overwritten.\n\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub strip: StripConfig,

    #[serde(default)]
    pub printer: PrinterConfig,

    #[serde(default)]
    pub modes: ModesConfig,
}

/// `[strip]` — the WS2812 output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    /// Number of addressable pixels.
    #[serde(default = "default_strip_length")]
    pub length: usize,

    /// spidev device the strip data line hangs off (Pi: MOSI/GPIO10).
    #[serde(default = "default_strip_device")]
    pub device: String,

    /// Overall brightness, 0.0-1.0. Out-of-range values are saturated at
    /// the point of use, never rejected.
    #[serde(default = "default_strip_brightness")]
    pub brightness: f64,
}

/// `[printer]` — the Moonraker instance to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterConfig {
    #[serde(default = "default_printer_host")]
    pub host: String,

    #[serde(default = "default_printer_port")]
    pub port: u16,

    /// Polling cadence of the run loop in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// One `[modes.<key>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Mode color (hex or name).
    pub color: String,

    /// Per-mode brightness multiplier applied to the color channels
    /// (saturating). Independent of the strip-level brightness.
    #[serde(default = "default_mode_brightness")]
    pub brightness: f64,
}

/// `[modes]` — one entry per configurable mode key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModesConfig {
    #[serde(default = "default_init_mode")]
    pub init: ModeConfig,
    #[serde(default = "default_listening_mode")]
    pub listening: ModeConfig,
    #[serde(default = "default_timelapse_mode")]
    pub timelapse: ModeConfig,
    #[serde(default = "default_progress_mode")]
    pub progress: ModeConfig,
    #[serde(default = "default_failure_mode")]
    pub failure: ModeConfig,
}

fn default_strip_length() -> usize {
    10
}
fn default_strip_device() -> String {
    "/dev/spidev0.0".into()
}
fn default_strip_brightness() -> f64 {
    1.0
}
fn default_printer_host() -> String {
    "localhost".into()
}
fn default_printer_port() -> u16 {
    7125
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_mode_brightness() -> f64 {
    1.0
}

fn mode_defaults(key: ModeKey, enabled: bool) -> ModeConfig {
    ModeConfig {
        enabled,
        color: color::format_color(ColorTable::default().get(key)),
        brightness: 1.0,
    }
}

fn default_init_mode() -> ModeConfig {
    mode_defaults(ModeKey::Init, false)
}
fn default_listening_mode() -> ModeConfig {
    mode_defaults(ModeKey::Listening, false)
}
fn default_timelapse_mode() -> ModeConfig {
    mode_defaults(ModeKey::Timelapse, false)
}
fn default_progress_mode() -> ModeConfig {
    mode_defaults(ModeKey::Progress, true)
}
fn default_failure_mode() -> ModeConfig {
    mode_defaults(ModeKey::Failure, true)
}

impl Default for StripConfig {
    fn default() -> Self {
        StripConfig {
            length: default_strip_length(),
            device: default_strip_device(),
            brightness: default_strip_brightness(),
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        PrinterConfig {
            host: default_printer_host(),
            port: default_printer_port(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ModesConfig {
    fn default() -> Self {
        ModesConfig {
            init: default_init_mode(),
            listening: default_listening_mode(),
            timelapse: default_timelapse_mode(),
            progress: default_progress_mode(),
            failure: default_failure_mode(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strip: StripConfig::default(),
            printer: PrinterConfig::default(),
            modes: ModesConfig::default(),
        }
    }
}

impl ModesConfig {
    pub fn get(&self, key: ModeKey) -> &ModeConfig {
        match key {
            ModeKey::Init => &self.init,
            ModeKey::Listening => &self.listening,
            ModeKey::Timelapse => &self.timelapse,
            ModeKey::Progress => &self.progress,
            ModeKey::Failure => &self.failure,
        }
    }

    /// Parse a mode's configured color scaled by its brightness, falling
    /// back to the built-in default color on invalid input.
    pub fn color_or_default(&self, key: ModeKey) -> Rgb {
        let mc = self.get(key);
        color::parse_color(&mc.color)
            .map(|c| c.scaled(mc.brightness))
            .unwrap_or_else(|_| ColorTable::default().get(key))
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A `[modes.<key>]` color could not be parsed.
    InvalidColor { mode: String, reason: String },
    /// The strip has no pixels.
    ZeroStripLength,
    /// The spidev device path is empty.
    EmptyDevice,
    /// The Moonraker host is empty.
    EmptyHost,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidColor { mode, reason } => {
                write!(f, "Invalid color for modes.{mode}: {reason}")
            }
            ValidationError::ZeroStripLength => write!(f, "Strip length must be at least 1"),
            ValidationError::EmptyDevice => write!(f, "Strip device path cannot be empty"),
            ValidationError::EmptyHost => write!(f, "Printer host cannot be empty"),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("moonglow"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save config to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Validate the entire config, collecting all errors.
    ///
    /// Out-of-range brightness is not an error; it is saturated into range
    /// wherever it is consumed.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.strip.length == 0 {
            errors.push(ValidationError::ZeroStripLength);
        }
        if self.strip.device.trim().is_empty() {
            errors.push(ValidationError::EmptyDevice);
        }
        if self.printer.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost);
        }
        for key in MODE_KEYS {
            if let Err(e) = color::parse_color(&self.modes.get(key).color) {
                errors.push(ValidationError::InvalidColor {
                    mode: key.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.strip.length, 10);
        assert_eq!(c.strip.device, "/dev/spidev0.0");
        assert_eq!(c.strip.brightness, 1.0);
        assert_eq!(c.printer.host, "localhost");
        assert_eq!(c.printer.port, 7125);
        assert_eq!(c.printer.poll_interval_ms, 1000);
    }

    #[test]
    fn default_mode_colors() {
        let c = Config::default();
        assert_eq!(c.modes.init.color, "#FFFFFF");
        assert_eq!(c.modes.listening.color, "#FFFFFF");
        assert_eq!(c.modes.timelapse.color, "#FFFFFF");
        assert_eq!(c.modes.progress.color, "#00FF00");
        assert_eq!(c.modes.failure.color, "#FF0000");
    }

    #[test]
    fn default_enabled_modes() {
        let c = Config::default();
        assert!(!c.modes.init.enabled);
        assert!(!c.modes.listening.enabled);
        assert!(!c.modes.timelapse.enabled);
        assert!(c.modes.progress.enabled);
        assert!(c.modes.failure.enabled);
    }

    // ── serde round-trips ──

    #[test]
    fn serialize_roundtrip() {
        let mut c = Config::default();
        c.strip.length = 30;
        c.printer.host = "printer.local".into();
        c.modes.progress.color = "#123456".into();
        c.modes.timelapse.enabled = true;

        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c2.strip.length, 30);
        assert_eq!(c2.printer.host, "printer.local");
        assert_eq!(c2.modes.progress.color, "#123456");
        assert!(c2.modes.timelapse.enabled);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c.strip.length, 10);
        assert_eq!(c.printer.port, 7125);
        assert_eq!(c.modes.failure.color, "#FF0000");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r##"
[strip]
length = 24

[modes.listening]
enabled = true
color = "cyan"
"##;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.strip.length, 24);
        assert_eq!(c.strip.device, "/dev/spidev0.0");
        assert!(c.modes.listening.enabled);
        assert_eq!(c.modes.listening.color, "cyan");
        // Untouched sections keep their defaults
        assert_eq!(c.modes.progress.color, "#00FF00");
        assert!(c.modes.progress.enabled);
    }

    #[test]
    fn mode_brightness_defaults_to_one() {
        let toml_str = r##"
[modes.failure]
enabled = true
color = "#FF0000"
"##;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.modes.failure.brightness, 1.0);
    }

    #[test]
    fn malformed_toml_rejected_by_parser() {
        let result: std::result::Result<Config, _> = toml::from_str("this is { not valid toml");
        assert!(result.is_err());
    }

    // ── color_or_default ──

    #[test]
    fn color_or_default_parses_and_scales() {
        let mut c = Config::default();
        c.modes.progress.color = "#FF0000".into();
        c.modes.progress.brightness = 0.5;
        assert_eq!(
            c.modes.color_or_default(ModeKey::Progress),
            Rgb::new(127, 0, 0)
        );
    }

    #[test]
    fn color_or_default_falls_back_on_garbage() {
        let mut c = Config::default();
        c.modes.failure.color = "not-a-color".into();
        assert_eq!(
            c.modes.color_or_default(ModeKey::Failure),
            Rgb::new(255, 0, 0)
        );
    }

    #[test]
    fn color_or_default_overbright_saturates() {
        let mut c = Config::default();
        c.modes.listening.color = "#102030".into();
        c.modes.listening.brightness = 99.0;
        assert_eq!(
            c.modes.color_or_default(ModeKey::Listening),
            Rgb::new(0x10, 0x20, 0x30)
        );
    }

    // ── paths ──

    #[test]
    fn config_path_is_some() {
        assert!(Config::dir().is_some());
        assert!(Config::path().is_some());
    }

    #[test]
    fn config_path_ends_with_toml() {
        let path = Config::path().unwrap();
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }

    // ── save_to / load_from ──

    #[test]
    fn save_to_load_from_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.strip.length = 16;
        config.strip.brightness = 0.25;
        config.printer.host = "octopi.local".into();
        config.modes.timelapse.enabled = true;
        config.modes.timelapse.color = "purple".into();
        config.save_to(&path).unwrap();

        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded.strip.length, 16);
        assert_eq!(loaded.strip.brightness, 0.25);
        assert_eq!(loaded.printer.host, "octopi.local");
        assert!(loaded.modes.timelapse.enabled);
        assert_eq!(loaded.modes.timelapse.color, "purple");
    }

    #[test]
    fn save_to_includes_header_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::default().save_to(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(
            contents.starts_with("# Moonglow configuration"),
            "saved file should start with header comment"
        );
    }

    #[test]
    fn save_to_cleans_up_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::default().save_to(&path).unwrap();
        let tmp = dir.path().join("config.toml.tmp");
        assert!(!tmp.exists(), "temp file should not remain after save");
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");

        let (config, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(config.strip.length, 10);
    }

    #[test]
    fn load_from_invalid_toml_returns_defaults_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();

        let (config, warnings) = Config::load_from(&path);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
        assert_eq!(config.strip.length, 10);
    }

    #[test]
    fn load_ignores_header_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded.strip.length, 10);
    }

    // ── validate ──

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_length() {
        let mut c = Config::default();
        c.strip.length = 0;
        let errs = c.validate().unwrap_err();
        assert_eq!(errs, vec![ValidationError::ZeroStripLength]);
    }

    #[test]
    fn validate_invalid_color() {
        let mut c = Config::default();
        c.modes.progress.color = "chartreuse".into();
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(
            &errs[0],
            ValidationError::InvalidColor { mode, .. } if mode == "progress"
        ));
        assert!(errs[0].to_string().contains("modes.progress"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut c = Config::default();
        c.strip.length = 0;
        c.strip.device = "  ".into();
        c.printer.host = "".into();
        c.modes.init.color = "???".into();
        c.modes.failure.color = "#12".into();
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 5);
    }

    #[test]
    fn validate_out_of_range_brightness_is_not_an_error() {
        let mut c = Config::default();
        c.strip.brightness = 7.0;
        c.modes.progress.brightness = -2.0;
        assert!(c.validate().is_ok());
    }
}
