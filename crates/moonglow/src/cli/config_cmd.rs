//! `config` subcommand — show current configuration and file paths.

use std::path::Path;

use moonglow_lib::color;
use moonglow_lib::modes::MODE_KEYS;

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().map(|p| p.exists()).unwrap_or(false);
    let (config, warnings) = match &config_path {
        Some(path) => Config::load_from(path),
        None => (Config::default(), vec![]),
    };
    let validation: Vec<String> = match config.validate() {
        Ok(()) => vec![],
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    };

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            warnings: warnings.iter().chain(validation.iter()).cloned().collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
        return Ok(());
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "length:",
            "device:",
            "brightness:",
            "host:",
            "port:",
            "poll_interval_ms:",
        ],
    );

    match &config_path {
        Some(p) => {
            if config_exists {
                kv("Config file:", format_args!("{} (loaded)", p.display()), w);
            } else {
                kv(
                    "Config file:",
                    format_args!("{} (not found, using defaults)", p.display()),
                    w,
                );
            }
        }
        None => kv("Config file:", "(no config directory)", w),
    }
    for warning in warnings.iter().chain(validation.iter()) {
        println!("  ! {warning}");
    }
    println!();

    println!("Strip:");
    kv_indent("length:", config.strip.length, w);
    kv_indent("device:", &config.strip.device, w);
    kv_indent("brightness:", format_args!("{:.2}", config.strip.brightness), w);
    println!();

    println!("Printer:");
    kv_indent("host:", &config.printer.host, w);
    kv_indent("port:", config.printer.port, w);
    kv_indent("poll_interval_ms:", config.printer.poll_interval_ms, w);
    println!();

    println!("Modes:");
    for key in MODE_KEYS {
        let mc = config.modes.get(key);
        let color_display = match color::parse_color(&mc.color) {
            Ok(c) => format!("{} -> {}", mc.color, color::format_color(c)),
            Err(_) => format!("{} (invalid)", mc.color),
        };
        let state = if mc.enabled { "on " } else { "off" };
        let name = key.to_string();
        println!(
            "  {state}  {name:<10} {color_display} (brightness {:.2})",
            mc.brightness
        );
    }
    Ok(())
}
