//! `run` subcommand — the daemon loop (polls Moonraker, drives the strip).

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use moonglow_lib::color::{self, BLACK};
use moonglow_lib::config::ValidationError;
use moonglow_lib::controller::{CycleOutcome, StripController};
use moonglow_lib::modes::{MODE_KEYS, Mode, ModeKey};
use moonglow_lib::moonraker::MoonrakerClient;
use moonglow_lib::reconnect::{self, Backoff};
use moonglow_lib::strip::{PixelStrip, PlatformStrip, open_strip};

use super::{Config, RUNNING, Result, load_config};

/// Cadence of boot-ramp frames. 50 frames at 20 ms spans about a second.
const BOOT_TICK: Duration = Duration::from_millis(20);

/// State for the `run` command, created during setup.
struct RunCtx {
    strip: Option<PlatformStrip>,
    controller: StripController,
    client: MoonrakerClient,
    backoff: Backoff,
    config: Config,
}

/// Validate config, open the strip, build the client and controller.
fn run_setup(config: Config) -> Result<RunCtx> {
    if let Err(errors) = config.validate() {
        for e in &errors {
            match e {
                ValidationError::InvalidColor { .. } => {
                    log::warn!("[config] {e} — using the default color");
                }
                fatal => {
                    return Err(moonglow_lib::MoonglowError::Config(fatal.to_string()));
                }
            }
        }
    }

    let client = MoonrakerClient::new(&config.printer.host, config.printer.port)?;
    println!("[printer] {}", client.base_url());

    let strip = open_strip(
        &config.strip.device,
        config.strip.length,
        config.strip.brightness,
    )?;
    println!(
        "[strip]   {} pixels on {} (brightness {:.2})",
        config.strip.length, config.strip.device, config.strip.brightness
    );

    let controller = StripController::from_config(&config);
    let enabled: Vec<String> = MODE_KEYS
        .iter()
        .filter(|&&key| controller.mode_enabled(key))
        .map(|key| key.to_string())
        .collect();
    println!(
        "[modes]   enabled: {}",
        if enabled.is_empty() {
            "(none)".to_string()
        } else {
            enabled.join(", ")
        }
    );

    Ok(RunCtx {
        strip: Some(strip),
        controller,
        client,
        backoff: Backoff::with_defaults(),
        config,
    })
}

/// Print a transition line and log any fetch failure for one cycle.
fn report_cycle(outcome: &CycleOutcome, controller: &StripController) {
    if let Some(e) = &outcome.api_error {
        log::warn!("[printer] {e}");
    }
    let Some(mode) = outcome.entered else {
        return;
    };
    match mode {
        Mode::Init | Mode::Off => println!("  OFF"),
        Mode::Listening => println!(
            "  LISTENING -> {}",
            color::format_color(controller.color(ModeKey::Listening))
        ),
        Mode::Timelapse => println!(
            "  TIMELAPSE -> {}",
            color::format_color(controller.color(ModeKey::Timelapse))
        ),
        Mode::Progress => println!(
            "  PROGRESS  -> {} ({:.0}%)",
            color::format_color(controller.color(ModeKey::Progress)),
            controller.print_progress()
        ),
        Mode::Failure => println!(
            "  FAILURE   -> {}",
            color::format_color(controller.color(ModeKey::Failure))
        ),
    }
}

/// Main loop: boot ramp at its own cadence, then poll cycles with
/// strip-reconnect handling.
fn run_loop(ctx: &mut RunCtx) {
    // Boot ramp frames tick much faster than poll cycles.
    while RUNNING.load(Ordering::SeqCst) && ctx.controller.booting() {
        let Some(strip) = ctx.strip.as_mut() else {
            break;
        };
        if let Err(e) = ctx.controller.process(strip, &ctx.client) {
            log::warn!("[strip] {e}");
            log::warn!("[strip] will attempt to reopen...");
            ctx.strip = None;
            break;
        }
        std::thread::sleep(BOOT_TICK);
    }

    let interval = Duration::from_millis(ctx.config.printer.poll_interval_ms);
    while RUNNING.load(Ordering::SeqCst) {
        // Attempt to reopen the strip if it was dropped
        if ctx.strip.is_none()
            && let Some(strip) = reconnect::try_reopen(
                &mut ctx.backoff,
                &ctx.config.strip.device,
                ctx.config.strip.length,
                ctx.config.strip.brightness,
            )
        {
            println!("[strip]   reopened {}", ctx.config.strip.device);
            ctx.strip = Some(strip);
            if let Some(strip) = ctx.strip.as_mut()
                && let Err(e) = ctx.controller.redraw(strip)
            {
                log::warn!("could not repaint after reopen: {e}");
                ctx.strip = None;
            }
        }

        match ctx.strip.as_mut() {
            Some(strip) => match ctx.controller.process(strip, &ctx.client) {
                Ok(outcome) => report_cycle(&outcome, &ctx.controller),
                Err(e) => {
                    log::warn!("[strip] {e}");
                    log::warn!("[strip] will attempt to reopen...");
                    ctx.strip = None;
                }
            },
            None => {
                // Keep the mode current even without a strip
                let outcome = ctx.controller.poll_only(&ctx.client);
                if let Some(e) = &outcome.api_error {
                    log::warn!("[printer] {e}");
                }
            }
        }

        std::thread::sleep(interval);
    }
}

/// Blank the strip on exit.
fn run_teardown(ctx: &mut RunCtx) {
    println!();
    println!("Turning strip off...");
    match ctx.strip.as_mut() {
        Some(strip) => {
            if let Err(e) = strip.set_all(BLACK).and_then(|_| strip.show()) {
                log::warn!("could not blank strip: {e}");
            }
        }
        None => log::warn!("strip disconnected, cannot blank it"),
    }
    println!("Done.");
}

pub(super) fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);

    println!("Moonglow — mirrors the printer state onto the LED strip.");
    println!("Press Ctrl+C to exit (turns the strip off).");
    println!();

    let mut ctx = run_setup(config)?;

    println!();
    println!("Polling... (Ctrl+C to stop)");

    run_loop(&mut ctx);
    run_teardown(&mut ctx);
    Ok(())
}
