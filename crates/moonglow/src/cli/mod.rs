//! CLI subcommands — daemon loop, printer status, strip checks.

mod config_cmd;
mod off;
mod run;
mod status;
mod test_cmd;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use moonglow_lib::config::Config;
pub(super) use moonglow_lib::error::Result;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{key:<width$}{value}", width = w);
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Load the config from a custom path if given, else the platform default.
/// Parse warnings go to the log either way.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    match custom_path {
        Some(path) => {
            let (config, warnings) = Config::load_from(path);
            for w in &warnings {
                log::warn!("{w}");
            }
            config
        }
        None => Config::load(),
    }
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub printer: Option<PrinterStatusJson>,
    pub config: ConfigSummaryJson,
}

#[derive(Serialize)]
pub(super) struct PrinterStatusJson {
    pub url: String,
    pub state: String,
    pub done_percent: Option<f64>,
}

#[derive(Serialize)]
pub(super) struct ConfigSummaryJson {
    pub strip_length: usize,
    pub strip_device: String,
    pub strip_brightness: f64,
    pub poll_interval_ms: u64,
    pub enabled_modes: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub warnings: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the status daemon (polls Moonraker, drives the strip)
    Run,

    /// Show printer reachability and configuration summary
    Status,

    /// Show current configuration and file paths
    Config,

    /// Step the strip through every mode's appearance
    Test {
        /// Seconds to hold each mode
        #[arg(long, default_value_t = 2)]
        delay: u64,

        /// Progress percentage used for the bar step
        #[arg(long, default_value_t = 50.0)]
        percent: f64,

        /// Only show a single mode (init, listening, timelapse, progress, failure)
        #[arg(long)]
        mode: Option<String>,
    },

    /// Turn every pixel off and exit
    Off,
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Run => {
            if json {
                warn_json_unsupported("run");
            }
            run::cmd_run(config_path)
        }
        Command::Status => status::cmd_status(json, config_path),
        Command::Config => config_cmd::cmd_config(json, config_path),
        Command::Test {
            delay,
            percent,
            mode,
        } => {
            if json {
                warn_json_unsupported("test");
            }
            test_cmd::cmd_test(config_path, delay, percent, mode.as_deref())
        }
        Command::Off => {
            if json {
                warn_json_unsupported("off");
            }
            off::cmd_off(config_path)
        }
    }
}


#[cfg(test)]
mod json_struct_tests {
    use super::*;

    #[test]
    fn config_summary_json_has_expected_fields() {
        let summary = ConfigSummaryJson {
            strip_length: 10,
            strip_device: "/dev/spidev0.0".into(),
            strip_brightness: 1.0,
            poll_interval_ms: 1000,
            enabled_modes: vec!["progress".into(), "failure".into()],
        };
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 5, "ConfigSummaryJson should have 5 fields");
        assert!(obj.contains_key("strip_length"));
        assert!(obj.contains_key("enabled_modes"));
    }

    #[test]
    fn status_output_with_null_printer() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            printer: None,
            config: ConfigSummaryJson {
                strip_length: 10,
                strip_device: "/dev/spidev0.0".into(),
                strip_brightness: 1.0,
                poll_interval_ms: 1000,
                enabled_modes: vec![],
            },
        };
        let json = serde_json::to_string_pretty(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["version"], "0.1.0");
        assert!(parsed["printer"].is_null());
        assert_eq!(parsed["config"]["strip_length"], 10);
    }

    #[test]
    fn status_output_with_printer() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            printer: Some(PrinterStatusJson {
                url: "http://localhost:7125".into(),
                state: "printing".into(),
                done_percent: Some(42.0),
            }),
            config: ConfigSummaryJson {
                strip_length: 10,
                strip_device: "/dev/spidev0.0".into(),
                strip_brightness: 1.0,
                poll_interval_ms: 1000,
                enabled_modes: vec!["progress".into()],
            },
        };
        let json = serde_json::to_string_pretty(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["printer"]["state"], "printing");
        assert_eq!(parsed["printer"]["done_percent"], 42.0);
    }

    #[test]
    fn config_output_missing_path_is_null() {
        let output = ConfigOutput {
            config_file: None,
            config_file_exists: false,
            settings: Config::default(),
            warnings: vec![],
        };
        let json = serde_json::to_string_pretty(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["config_file"].is_null());
        assert!(parsed["settings"].is_object());
        assert_eq!(parsed["settings"]["strip"]["length"], 10);
    }
}
