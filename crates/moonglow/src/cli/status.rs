//! `status` subcommand — printer reachability and configuration summary.

use std::path::Path;

use moonglow_lib::config::Config;
use moonglow_lib::modes::MODE_KEYS;
use moonglow_lib::moonraker::{MoonrakerClient, PrinterApi, PrinterState};

use super::{
    ConfigSummaryJson, PrinterStatusJson, Result, StatusOutput, kv, kv_indent, kv_width,
};

/// Query the printer once. Returns None if Moonraker is unreachable or the
/// response is unusable.
fn get_printer_status(config: &Config) -> Option<PrinterStatusJson> {
    let client = MoonrakerClient::new(&config.printer.host, config.printer.port).ok()?;
    let state = client.printer_state().ok()?;
    let done_percent = if state == PrinterState::Printing {
        client.printing_stats().ok().map(|s| s.done_percent)
    } else {
        None
    };
    Some(PrinterStatusJson {
        url: client.base_url().to_string(),
        state: state.to_string(),
        done_percent,
    })
}

fn config_summary(config: &Config) -> ConfigSummaryJson {
    let enabled_modes: Vec<String> = MODE_KEYS
        .iter()
        .filter(|&&key| config.modes.get(key).enabled)
        .map(|key| key.to_string())
        .collect();
    ConfigSummaryJson {
        strip_length: config.strip.length,
        strip_device: config.strip.device.clone(),
        strip_brightness: config.strip.brightness,
        poll_interval_ms: config.printer.poll_interval_ms,
        enabled_modes,
    }
}

/// Print or serialize the status output.
fn print_status(
    printer_status: Option<PrinterStatusJson>,
    config: &Config,
    json: bool,
) -> Result<()> {
    let summary = config_summary(config);

    if json {
        let output = StatusOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            printer: printer_status,
            config: summary,
        };
        let json_str = serde_json::to_string_pretty(&output).map_err(|e| {
            moonglow_lib::MoonglowError::Config(format!("JSON serialization failed: {e}"))
        })?;
        println!("{json_str}");
        return Ok(());
    }

    // Human-readable output
    let w = kv_width(
        &["Version:", "Printer:"],
        &[
            "URL:",
            "State:",
            "Progress:",
            "Strip:",
            "Device:",
            "Brightness:",
            "Poll interval:",
            "Enabled modes:",
        ],
    );

    kv("Version:", env!("CARGO_PKG_VERSION"), w);
    println!();

    match &printer_status {
        Some(printer) => {
            kv("Printer:", "REACHABLE", w);
            kv_indent("URL:", &printer.url, w);
            kv_indent("State:", &printer.state, w);
            if let Some(percent) = printer.done_percent {
                kv_indent("Progress:", format_args!("{percent:.0}%"), w);
            }
        }
        None => {
            kv("Printer:", "NOT REACHABLE", w);
            kv_indent(
                "URL:",
                format_args!(
                    "http://{}:{}",
                    config.printer.host, config.printer.port
                ),
                w,
            );
        }
    }

    println!();
    println!("Config:");
    kv_indent(
        "Strip:",
        format_args!("{} pixels", summary.strip_length),
        w,
    );
    kv_indent("Device:", &summary.strip_device, w);
    kv_indent("Brightness:", format_args!("{:.2}", summary.strip_brightness), w);
    kv_indent(
        "Poll interval:",
        format_args!("{} ms", summary.poll_interval_ms),
        w,
    );
    kv_indent(
        "Enabled modes:",
        if summary.enabled_modes.is_empty() {
            "(none)".to_string()
        } else {
            summary.enabled_modes.join(", ")
        },
        w,
    );

    Ok(())
}

pub(super) fn cmd_status(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path);
    let printer_status = get_printer_status(&config);
    print_status(printer_status, &config, json)
}
