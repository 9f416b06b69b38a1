//! `test` subcommand — step the strip through every mode's appearance.
//!
//! Verifies wiring and colors without a printer: each mode is held for a
//! few seconds, then the strip is blanked. `--mode` narrows the run to a
//! single mode key; unknown keys are rejected.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use moonglow_lib::color::{self, BLACK};
use moonglow_lib::config::Config;
use moonglow_lib::modes::{MODE_KEYS, ModeKey};
use moonglow_lib::strip::{PixelStrip, open_strip};

use super::{RUNNING, Result};

/// Paint one mode's appearance: a full-strip fill, except Progress which
/// draws the bar at `percent` over a blank strip.
fn paint_mode<S: PixelStrip>(
    strip: &mut S,
    config: &Config,
    key: ModeKey,
    percent: f64,
) -> Result<()> {
    let color = config.modes.color_or_default(key);
    if key == ModeKey::Progress {
        let lit = ((strip.len() as f64 * percent.clamp(0.0, 100.0) / 100.0).floor() as usize)
            .min(strip.len());
        println!(
            "  {:<10} {} ({lit}/{} pixels)",
            key.to_string(),
            color::format_color(color),
            strip.len()
        );
        strip.set_all(BLACK)?;
        for ix in 0..lit {
            strip.set_pixel(ix, color)?;
        }
    } else {
        println!("  {:<10} {}", key.to_string(), color::format_color(color));
        strip.set_all(color)?;
    }
    strip.show()?;
    Ok(())
}

pub(super) fn cmd_test(
    config_path: Option<&Path>,
    delay: u64,
    percent: f64,
    mode: Option<&str>,
) -> Result<()> {
    let config = super::load_config(config_path);
    let delay = Duration::from_secs(delay);

    // Reject unknown mode keys before touching the hardware.
    let only: Option<ModeKey> = mode.map(str::parse).transpose()?;

    let mut strip = open_strip(
        &config.strip.device,
        config.strip.length,
        config.strip.brightness,
    )?;
    println!(
        "[strip] {} pixels on {}",
        config.strip.length, config.strip.device
    );

    for key in MODE_KEYS {
        if let Some(only) = only
            && only != key
        {
            continue;
        }
        if !RUNNING.load(Ordering::SeqCst) {
            break;
        }
        paint_mode(&mut strip, &config, key, percent)?;
        std::thread::sleep(delay);
    }

    println!("  {:<10} off", "done");
    strip.set_all(BLACK)?;
    strip.show()?;
    Ok(())
}
