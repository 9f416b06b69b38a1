//! Cycle state machine — testable mode/render logic decoupled from I/O.
//!
//! [`StripController`] encapsulates the per-cycle control flow: poll the
//! printer, run per-mode processing, resolve the active mode, render on
//! transitions. The strip and the printer API are passed in per call, so
//! the host binary is a thin adapter that wires real backends (or mocks)
//! to this state machine.

use crate::color::{self, BLACK, Rgb};
use crate::modes::{ColorTable, EnableFlags, MODE_KEYS, Mode, ModeKey, resolve};
use crate::moonraker::{ApiError, PrinterApi, PrinterState};
use crate::strip::PixelStrip;

/// Frames in the boot ramp. The host drives one frame per tick; at the
/// suggested 20 ms tick the ramp spans about one second.
pub const BOOT_FRAMES: u32 = 50;

/// Grayscale boot ramp, advanced one frame per host tick.
///
/// Intensity rises monotonically from 0 to the init color's red channel
/// over [`BOOT_FRAMES`] frames. All three output channels track the red
/// channel of the init color.
#[derive(Debug)]
struct BootRamp {
    step: u32,
    frames: u32,
}

impl BootRamp {
    fn new(frames: u32) -> Self {
        BootRamp {
            step: 0,
            frames: frames.max(1),
        }
    }

    /// The grayscale frame for the current step, or `None` once exhausted.
    fn next_frame(&mut self, init_color: Rgb) -> Option<Rgb> {
        if self.step > self.frames {
            return None;
        }
        let level = init_color.r as f64 * self.step as f64 / self.frames as f64;
        self.step += 1;
        let v = color::saturate_channel(level);
        Some(Rgb::new(v, v, v))
    }

    fn finished(&self) -> bool {
        self.step > self.frames
    }
}

/// What one [`StripController::process`] call did.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Mode after this cycle.
    pub mode: Mode,
    /// `Some(mode)` when a transition render fired this cycle.
    pub entered: Option<Mode>,
    /// Printer fetch failure, if any. The cycle continued with the
    /// previously observed values.
    pub api_error: Option<ApiError>,
    /// True while the boot ramp is still running (no polling, no resolve).
    pub booting: bool,
}

/// Number of pixels lit for a progress percentage.
///
/// `floor(len * percent / 100)`, clamped into `0..=len`.
pub(crate) fn lit_count(len: usize, percent: f64) -> usize {
    if !percent.is_finite() {
        return 0;
    }
    let lit = (len as f64 * percent / 100.0).floor().max(0.0) as usize;
    lit.min(len)
}

/// The mode state machine and transition renderer.
pub struct StripController {
    flags: EnableFlags,
    colors: ColorTable,
    mode: Mode,
    /// Last observed print progress in percent. Persists until the printer
    /// reports `printing` again.
    print_progress: f64,
    /// True only while the printer reports `error`.
    print_fail: bool,
    boot: Option<BootRamp>,
}

impl StripController {
    pub fn new(flags: EnableFlags, colors: ColorTable) -> Self {
        StripController {
            flags,
            colors,
            mode: Mode::Init,
            print_progress: 0.0,
            print_fail: false,
            boot: Some(BootRamp::new(BOOT_FRAMES)),
        }
    }

    /// Build a controller from the on-disk configuration: enable flags and
    /// scaled colors per mode, unparseable colors falling back to defaults.
    pub fn from_config(config: &crate::config::Config) -> Self {
        let mut flags = EnableFlags::default();
        let mut colors = ColorTable::default();
        for key in MODE_KEYS {
            let mc = config.modes.get(key);
            flags.set(key, mc.enabled);
            colors.set(key, config.modes.color_or_default(key));
        }
        Self::new(flags, colors)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn print_progress(&self) -> f64 {
        self.print_progress
    }

    pub fn print_fail(&self) -> bool {
        self.print_fail
    }

    /// True while the boot ramp still has frames to render.
    pub fn booting(&self) -> bool {
        self.mode == Mode::Init
            && self.flags.init
            && self.boot.as_ref().is_some_and(|ramp| !ramp.finished())
    }

    /// Overwrite one mode's enable flag.
    pub fn set_mode_enabled(&mut self, key: ModeKey, enabled: bool) {
        self.flags.set(key, enabled);
    }

    pub fn mode_enabled(&self, key: ModeKey) -> bool {
        self.flags.get(key)
    }

    /// Store a mode color, each channel scaled by `brightness` and
    /// saturated into range before storage.
    pub fn set_color_config(&mut self, key: ModeKey, r: u8, g: u8, b: u8, brightness: f64) {
        self.colors.set(key, Rgb::new(r, g, b).scaled(brightness));
    }

    pub fn color(&self, key: ModeKey) -> Rgb {
        self.colors.get(key)
    }

    /// Run one full cycle: boot frame or (poll, per-mode processing,
    /// resolve, transition render).
    ///
    /// Strip failures abort the cycle and propagate; printer fetch failures
    /// are reported in the outcome and the cycle continues with retained
    /// values.
    pub fn process<S: PixelStrip>(
        &mut self,
        strip: &mut S,
        api: &impl PrinterApi,
    ) -> crate::error::Result<CycleOutcome> {
        // Boot phase: one ramp frame per tick, no polling until it is done.
        if self.mode == Mode::Init
            && self.flags.init
            && let Some(ramp) = self.boot.as_mut()
            && let Some(frame) = ramp.next_frame(self.colors.get(ModeKey::Init))
        {
            strip.set_all(frame)?;
            strip.show()?;
            if !ramp.finished() {
                return Ok(CycleOutcome {
                    mode: Mode::Init,
                    entered: None,
                    api_error: None,
                    booting: true,
                });
            }
        }
        self.boot = None;

        let api_error = self.update_printer_state(api);

        // Per-mode processing is keyed on the mode at the START of the
        // cycle, before resolution.
        if self.mode == Mode::Progress {
            self.draw_progress(strip)?;
        }

        let next = resolve(self.flags, self.print_fail);
        let entered = if next != self.mode {
            log::debug!("mode {} -> {}", self.mode, next);
            self.enter(strip, next)?;
            Some(next)
        } else {
            None
        };
        self.mode = next;

        Ok(CycleOutcome {
            mode: next,
            entered,
            api_error,
            booting: false,
        })
    }

    /// Poll and resolve without touching the strip. Used by the host while
    /// the strip is disconnected so the mode stays current; a subsequent
    /// [`redraw`](Self::redraw) paints the full appearance.
    pub fn poll_only(&mut self, api: &impl PrinterApi) -> CycleOutcome {
        self.boot = None;
        let api_error = self.update_printer_state(api);
        let next = resolve(self.flags, self.print_fail);
        let entered = (next != self.mode).then_some(next);
        if let Some(m) = entered {
            log::debug!("mode {} -> {} (strip offline)", self.mode, m);
        }
        self.mode = next;
        CycleOutcome {
            mode: next,
            entered,
            api_error,
            booting: false,
        }
    }

    /// Repaint the current mode's full appearance (enter render plus the
    /// progress bar when applicable). Used after a strip reopen.
    pub fn redraw<S: PixelStrip>(&self, strip: &mut S) -> crate::strip::Result<()> {
        self.enter(strip, self.mode)?;
        if self.mode == Mode::Progress {
            self.draw_progress(strip)?;
        }
        Ok(())
    }

    /// Derive `print_fail`/`print_progress` from the printer. On any fetch
    /// failure both retain their previous values and the error is returned.
    fn update_printer_state(&mut self, api: &impl PrinterApi) -> Option<ApiError> {
        let state = match api.printer_state() {
            Ok(state) => state,
            Err(e) => return Some(e),
        };
        let stats = if state == PrinterState::Printing {
            match api.printing_stats() {
                Ok(stats) => Some(stats),
                Err(e) => return Some(e),
            }
        } else {
            None
        };

        // Fail is re-derived every successful poll; it never latches.
        self.print_fail = state == PrinterState::Error;
        if let Some(stats) = stats {
            self.print_progress = stats.done_percent;
        }
        None
    }

    /// Draw the progress bar: pixels `0..lit` in the progress color, one
    /// commit. Pixels at and beyond `lit` keep their previous color; the
    /// blank laid down on entering Progress is what cleared them.
    fn draw_progress<S: PixelStrip>(&self, strip: &mut S) -> crate::strip::Result<()> {
        let lit = lit_count(strip.len(), self.print_progress);
        let color = self.colors.get(ModeKey::Progress);
        for ix in 0..lit {
            strip.set_pixel(ix, color)?;
        }
        strip.show()
    }

    /// Enter render for a newly resolved mode: one full-strip fill, one
    /// commit.
    fn enter<S: PixelStrip>(&self, strip: &mut S, mode: Mode) -> crate::strip::Result<()> {
        let fill = match mode {
            Mode::Init | Mode::Off | Mode::Progress => BLACK,
            Mode::Listening => self.colors.get(ModeKey::Listening),
            Mode::Timelapse => self.colors.get(ModeKey::Timelapse),
            Mode::Failure => self.colors.get(ModeKey::Failure),
        };
        strip.set_all(fill)?;
        strip.show()
    }
}
