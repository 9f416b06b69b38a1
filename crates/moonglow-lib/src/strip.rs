//! Pixel strip — trait + WS2812-over-SPI backend.
//!
//! Writes are buffered: `set_all`/`set_pixel` mutate the frame buffer and
//! `show` commits the whole frame to the transport in one write. On a failed
//! commit the visible strip is assumed unchanged; partially-clocked-out
//! frames cannot be rolled back on real hardware.

use std::fmt;

use crate::color::Rgb;

// ── Error type ──

/// Pixel strip errors.
///
/// String payloads follow the convention **"context: details"** where
/// *context* identifies the operation or step (e.g. `"SPI open"`,
/// `"SPI write"`) and *details* describes what went wrong.
#[derive(Debug)]
pub enum StripError {
    OpenFailed(String),
    WriteFailed(String),
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for StripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StripError::OpenFailed(e) => write!(f, "Failed to open strip: {e}"),
            StripError::WriteFailed(e) => write!(f, "Strip write failed: {e}"),
            StripError::IndexOutOfRange { index, len } => {
                write!(f, "Pixel index {index} out of range (strip has {len} pixels)")
            }
        }
    }
}

impl std::error::Error for StripError {}

pub type Result<T> = std::result::Result<T, StripError>;

// ── Trait ──

/// An addressable strip of RGB pixels.
///
/// `set_all` and `set_pixel` only touch the frame buffer; nothing reaches
/// the hardware until `show`. Brightness scaling is the backend's concern,
/// not the caller's.
pub trait PixelStrip {
    /// Number of addressable pixels.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set every pixel in the frame buffer to `color`.
    fn set_all(&mut self, color: Rgb) -> Result<()>;

    /// Set one pixel in the frame buffer. Errors if `index >= len()`.
    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<()>;

    /// Commit the frame buffer to the hardware.
    fn show(&mut self) -> Result<()>;
}

// ── Linux implementation (WS2812 over spidev) ──

#[cfg(target_os = "linux")]
mod spi_impl {
    use super::*;

    use linux_embedded_hal::SpidevBus;
    use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
    use smart_leds::{RGB8, SmartLedsWrite, brightness, gamma};
    use ws2812_spi::Ws2812;

    /// WS2812 bit patterns need ~3.5 MHz on the SPI bus; 3.8 MHz lands the
    /// pulse widths inside the tolerance window on Pi-class hosts.
    const SPI_CLOCK_HZ: u32 = 3_800_000;

    /// A WS2812 strip clocked out over a spidev device (e.g. the Pi's
    /// `/dev/spidev0.0`, MOSI on GPIO10).
    pub struct SpiStrip {
        link: Ws2812<SpidevBus>,
        frame: Vec<RGB8>,
        /// Driver-level brightness, 0-255 (from the configured 0.0-1.0).
        level: u8,
    }

    impl SpiStrip {
        /// Open a spidev device and prepare a frame buffer of `len` pixels,
        /// all off. `brightness` saturates to [0,1].
        pub fn open(device: &str, len: usize, brightness_unit: f64) -> Result<Self> {
            let mut bus = SpidevBus::open(device)
                .map_err(|e| StripError::OpenFailed(format!("SPI open {device}: {e}")))?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(SPI_CLOCK_HZ)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            bus.0
                .configure(&options)
                .map_err(|e| StripError::OpenFailed(format!("SPI configure {device}: {e}")))?;

            let level =
                crate::color::saturate_channel(crate::color::saturate_unit(brightness_unit) * 255.0);
            let mut strip = SpiStrip {
                link: Ws2812::new(bus),
                frame: vec![RGB8::default(); len],
                level,
            };
            strip.show()?;
            Ok(strip)
        }
    }

    impl PixelStrip for SpiStrip {
        fn len(&self) -> usize {
            self.frame.len()
        }

        fn set_all(&mut self, color: Rgb) -> Result<()> {
            self.frame.fill(RGB8::new(color.r, color.g, color.b));
            Ok(())
        }

        fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<()> {
            let len = self.frame.len();
            let px = self
                .frame
                .get_mut(index)
                .ok_or(StripError::IndexOutOfRange { index, len })?;
            *px = RGB8::new(color.r, color.g, color.b);
            Ok(())
        }

        fn show(&mut self) -> Result<()> {
            let frame = self.frame.iter().cloned();
            self.link
                .write(brightness(gamma(frame), self.level))
                .map_err(|e| StripError::WriteFailed(format!("SPI write: {e:?}")))
        }
    }
}

#[cfg(target_os = "linux")]
pub use spi_impl::SpiStrip;

// ── Stub strip for unsupported platforms ──

/// Placeholder strip that always fails to open.
/// Enables compilation and `cargo test` on unsupported hosts.
#[cfg(not(target_os = "linux"))]
pub struct StubStrip;

#[cfg(not(target_os = "linux"))]
impl StubStrip {
    pub fn open(_device: &str, _len: usize, _brightness_unit: f64) -> Result<Self> {
        Err(StripError::OpenFailed(
            "WS2812 output is not supported on this platform".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl PixelStrip for StubStrip {
    fn len(&self) -> usize {
        0
    }
    fn set_all(&mut self, _color: Rgb) -> Result<()> {
        unreachable!()
    }
    fn set_pixel(&mut self, _index: usize, _color: Rgb) -> Result<()> {
        unreachable!()
    }
    fn show(&mut self) -> Result<()> {
        unreachable!()
    }
}

/// Concrete strip type for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformStrip = SpiStrip;
#[cfg(not(target_os = "linux"))]
pub type PlatformStrip = StubStrip;

/// Open the platform-appropriate strip backend.
pub fn open_strip(device: &str, len: usize, brightness_unit: f64) -> Result<PlatformStrip> {
    PlatformStrip::open(device, len, brightness_unit)
}

// ── Mock strip for testing ──

/// In-memory mock strip for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;

    /// In-memory strip. `set_*` writes go to `pixels`; each `show` pushes a
    /// snapshot onto `committed`, so tests can count commits and inspect the
    /// visible frame independently of the working buffer.
    pub struct MockStrip {
        pub pixels: Vec<Rgb>,
        /// Snapshot of the frame buffer at each successful `show`.
        pub committed: Vec<Vec<Rgb>>,
        /// If true, `set_all`/`set_pixel` return an error.
        pub fail_set: bool,
        /// If true, `show` returns an error (buffer keeps its writes, but
        /// nothing new is committed).
        pub fail_show: bool,
    }

    impl MockStrip {
        pub fn new(len: usize) -> Self {
            MockStrip {
                pixels: vec![crate::color::BLACK; len],
                committed: Vec::new(),
                fail_set: false,
                fail_show: false,
            }
        }

        /// The last committed (visible) frame, or all-off if never shown.
        pub fn visible(&self) -> Vec<Rgb> {
            self.committed
                .last()
                .cloned()
                .unwrap_or_else(|| vec![crate::color::BLACK; self.pixels.len()])
        }

        /// Number of successful commits so far.
        pub fn commits(&self) -> usize {
            self.committed.len()
        }
    }

    impl PixelStrip for MockStrip {
        fn len(&self) -> usize {
            self.pixels.len()
        }

        fn set_all(&mut self, color: Rgb) -> Result<()> {
            if self.fail_set {
                return Err(StripError::WriteFailed("mock: set failure injected".into()));
            }
            self.pixels.fill(color);
            Ok(())
        }

        fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<()> {
            if self.fail_set {
                return Err(StripError::WriteFailed("mock: set failure injected".into()));
            }
            let len = self.pixels.len();
            let px = self
                .pixels
                .get_mut(index)
                .ok_or(StripError::IndexOutOfRange { index, len })?;
            *px = color;
            Ok(())
        }

        fn show(&mut self) -> Result<()> {
            if self.fail_show {
                return Err(StripError::WriteFailed("mock: show failure injected".into()));
            }
            self.committed.push(self.pixels.clone());
            Ok(())
        }
    }
}
