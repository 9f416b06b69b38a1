//! Display modes — mode enum, enable flags, color table, priority resolver.

use std::fmt;
use std::str::FromStr;

use crate::color::Rgb;

/// The strip's display mode. Exactly one is current at any instant;
/// [`Mode::Init`] is the only legal initial value and is never produced
/// by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Init,
    Off,
    Listening,
    Timelapse,
    Progress,
    Failure,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Init => "init",
            Mode::Off => "off",
            Mode::Listening => "listening",
            Mode::Timelapse => "timelapse",
            Mode::Progress => "progress",
            Mode::Failure => "failure",
        };
        write!(f, "{s}")
    }
}

/// Key identifying a configurable mode (enable flag + color entry).
///
/// `Off` is not configurable and has no key. Unknown keys are
/// unrepresentable: parsing an unrecognized name fails instead of silently
/// creating an unused entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKey {
    Init,
    Listening,
    Timelapse,
    Progress,
    Failure,
}

/// All mode keys, in color-table index order.
pub const MODE_KEYS: [ModeKey; 5] = [
    ModeKey::Init,
    ModeKey::Listening,
    ModeKey::Timelapse,
    ModeKey::Progress,
    ModeKey::Failure,
];

impl ModeKey {
    fn index(self) -> usize {
        match self {
            ModeKey::Init => 0,
            ModeKey::Listening => 1,
            ModeKey::Timelapse => 2,
            ModeKey::Progress => 3,
            ModeKey::Failure => 4,
        }
    }
}

impl fmt::Display for ModeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModeKey::Init => "init",
            ModeKey::Listening => "listening",
            ModeKey::Timelapse => "timelapse",
            ModeKey::Progress => "progress",
            ModeKey::Failure => "failure",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ModeKey {
    type Err = crate::MoonglowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "init" => Ok(ModeKey::Init),
            "listening" => Ok(ModeKey::Listening),
            "timelapse" => Ok(ModeKey::Timelapse),
            "progress" => Ok(ModeKey::Progress),
            "failure" => Ok(ModeKey::Failure),
            other => Err(crate::MoonglowError::Config(format!(
                "unknown mode key \"{other}\" (expected init, listening, timelapse, progress or failure)"
            ))),
        }
    }
}

/// Per-mode enable flags. Independent feature toggles, not mutually
/// exclusive states — [`resolve`] imposes exclusivity via priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnableFlags {
    pub init: bool,
    pub listening: bool,
    pub timelapse: bool,
    pub progress: bool,
    pub failure: bool,
}

impl EnableFlags {
    pub fn get(&self, key: ModeKey) -> bool {
        match key {
            ModeKey::Init => self.init,
            ModeKey::Listening => self.listening,
            ModeKey::Timelapse => self.timelapse,
            ModeKey::Progress => self.progress,
            ModeKey::Failure => self.failure,
        }
    }

    pub fn set(&mut self, key: ModeKey, enabled: bool) {
        match key {
            ModeKey::Init => self.init = enabled,
            ModeKey::Listening => self.listening = enabled,
            ModeKey::Timelapse => self.timelapse = enabled,
            ModeKey::Progress => self.progress = enabled,
            ModeKey::Failure => self.failure = enabled,
        }
    }
}

/// Fixed-size mode color table, indexed by [`ModeKey`].
///
/// Channel values are saturated before storage by the callers
/// ([`crate::controller::StripController::set_color_config`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTable([Rgb; 5]);

impl Default for ColorTable {
    fn default() -> Self {
        ColorTable([
            Rgb::new(255, 255, 255), // init
            Rgb::new(255, 255, 255), // listening
            Rgb::new(255, 255, 255), // timelapse
            Rgb::new(0, 255, 0),     // progress
            Rgb::new(255, 0, 0),     // failure
        ])
    }
}

impl ColorTable {
    pub fn get(&self, key: ModeKey) -> Rgb {
        self.0[key.index()]
    }

    pub fn set(&mut self, key: ModeKey, color: Rgb) {
        self.0[key.index()] = color;
    }
}

/// Resolve the active mode from the enable flags and the latest observed
/// failure condition, using a fixed descending priority order.
///
/// Higher-priority flags override lower ones regardless of how many are
/// simultaneously enabled. `Failure` requires BOTH its flag and an active
/// failure condition. The `init` flag does not participate — it only gates
/// the boot animation while the mode is still [`Mode::Init`].
pub fn resolve(flags: EnableFlags, print_fail: bool) -> Mode {
    if flags.timelapse {
        Mode::Timelapse
    } else if flags.listening {
        Mode::Listening
    } else if flags.failure && print_fail {
        Mode::Failure
    } else if flags.progress {
        Mode::Progress
    } else {
        Mode::Off
    }
}
