//! Driver layer consumed by the input pipeline
//!
//! The pipeline only talks to hardware through three narrow traits:
//!
//! - [`InputSource`] - a digital input read by the sampler
//! - [`PixelDevice`] - a staged LED strip owned by the consumer
//! - [`TickSource`] - a monotonic clock used for event timestamps
//!
//! Concrete backends live in the submodules. GPIO backends go through `rppal`,
//! the others are host-side stand-ins for running without hardware.

pub mod clock;
pub mod console;
pub mod frame;
pub mod gpio;
pub mod scripted;

#[cfg(test)]
pub(crate) mod recording;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use clock::{ManualClock, MonotonicClock};
pub use console::ConsoleStrip;
pub use frame::FrameBuffer;
pub use gpio::{GpioButton, GpioLed};
pub use scripted::ScriptedInput;

/// Logic level of a digital input
///
/// With pull-up wiring `High` means the button is released and `Low` means
/// it is pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    High,
    Low,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Monotonic scheduler time unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 8-bit RGB colour as staged on a pixel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }
}

/// Errors raised by driver backends
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Pixel index {index} out of range for a strip of {len} LEDs")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Invalid input script character {0:?}, expected '0' or '1'")]
    InvalidScript(char),
}

/// Digital input polled by the sampler
///
/// Must be cheap enough to be called on every sampling tick.
pub trait InputSource: Send {
    fn read_level(&mut self) -> Level;
}

/// Addressable LED strip with staged writes
///
/// `set_pixel` and `clear` only touch the staging buffer. Nothing becomes
/// visible until `refresh` commits the buffer to the device.
pub trait PixelDevice: Send {
    fn led_count(&self) -> usize;

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), DeviceError>;

    fn clear(&mut self) -> Result<(), DeviceError>;

    fn refresh(&mut self) -> Result<(), DeviceError>;
}

/// Monotonic clock used only for timestamping events
pub trait TickSource: Send + Sync {
    fn now(&self) -> Tick;
}
