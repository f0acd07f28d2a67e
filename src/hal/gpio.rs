//! `rppal` backed GPIO devices for running on a Raspberry Pi

use super::{DeviceError, FrameBuffer, InputSource, Level, PixelDevice, Rgb};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::{debug, info};

/// Push button on a BCM pin with the internal pull-up enabled
#[derive(Debug)]
pub struct GpioButton {
    pin: InputPin,
}

impl GpioButton {
    pub fn open(bcm_pin: u8) -> Result<Self, DeviceError> {
        info!("Configuring button input on GPIO {} with pull-up", bcm_pin);
        let gpio = Gpio::new()?;
        let pin = gpio.get(bcm_pin)?.into_input_pullup();
        debug!("Initial button level on GPIO {}: {:?}", bcm_pin, pin.read());
        Ok(Self { pin })
    }
}

impl InputSource for GpioButton {
    fn read_level(&mut self) -> Level {
        Level::from(self.pin.is_high())
    }
}

/// A single LED on an output pin, driven like a one-pixel strip
///
/// The pin goes high on refresh when any staged pixel is lit. Larger
/// `led_count` values are accepted so the same animations can run against it.
#[derive(Debug)]
pub struct GpioLed {
    pin: OutputPin,
    staged: FrameBuffer,
}

impl GpioLed {
    pub fn open(bcm_pin: u8, led_count: usize) -> Result<Self, DeviceError> {
        info!("Configuring LED output on GPIO {}", bcm_pin);
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(bcm_pin)?.into_output_low();
        pin.set_reset_on_drop(true);
        Ok(Self {
            pin,
            staged: FrameBuffer::new(led_count),
        })
    }
}

impl PixelDevice for GpioLed {
    fn led_count(&self) -> usize {
        self.staged.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), DeviceError> {
        self.staged.set(index, color)
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.staged.clear();
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DeviceError> {
        if self.staged.any_lit() {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}
