use crate::lcd::hd44780::driver::{HD44780Driver, RegisterSelect};
use crate::{GpioBias, GpioDirection, GpioDriver, GpioResult};
use log::trace;
use std::sync::Arc;
use std::time::Duration;

/// Logical pin numbers of a 4-bit HD44780 interface.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HD44780Pins {
    /// Register select.
    pub rs: usize,
    /// Enable (strobe).
    pub e: usize,
    /// Data lines D4, D5, D6, D7, in that order.
    pub data: [usize; 4],
}

/// HD44780 driver bit-banging the 4-bit write interface over a [GpioDriver].
///
/// Every nibble is presented on the data lines, then latched with an E pulse of [Self::E_PULSE],
/// framed by [Self::E_DELAY] on both sides. The delays go through [GpioDriver::sleep].
#[derive(Debug)]
pub struct GpioHD44780Driver {
    gpio: Arc<dyn GpioDriver>,
    pins: HD44780Pins,
}

impl GpioHD44780Driver {
    /// Width of the E pulse.
    pub const E_PULSE: Duration = Duration::from_micros(50);
    /// Settle time before and after each E pulse.
    pub const E_DELAY: Duration = Duration::from_micros(50);

    pub fn new_4bit(gpio: Arc<dyn GpioDriver>, pins: HD44780Pins) -> Self {
        GpioHD44780Driver { gpio, pins }
    }

    /// Configures RS, E and the data lines as outputs.
    pub fn configure_pins(&self) -> GpioResult<()> {
        for pin in [self.pins.rs, self.pins.e].into_iter().chain(self.pins.data) {
            self.gpio.configure(pin, GpioDirection::Output, GpioBias::None)?;
        }
        Ok(())
    }

    fn pulse_e(&self) -> GpioResult<()> {
        self.gpio.sleep(Self::E_DELAY);
        // Set E pin to high
        self.gpio.write(self.pins.e, true)?;
        self.gpio.sleep(Self::E_PULSE);
        // Set E pin to low
        self.gpio.write(self.pins.e, false)?;
        self.gpio.sleep(Self::E_DELAY);
        Ok(())
    }

    /// Drives the data lines with the lower 4 bits of `nibble`, D4 being bit 0.
    fn write_nibble(&self, nibble: u8) -> GpioResult<()> {
        for &pin in &self.pins.data {
            self.gpio.write(pin, false)?;
        }
        for (bit, &pin) in self.pins.data.iter().enumerate() {
            if nibble & (1 << bit) != 0 {
                self.gpio.write(pin, true)?;
            }
        }
        Ok(())
    }
}

impl HD44780Driver for GpioHD44780Driver {
    fn send(&mut self, value: u8, register: RegisterSelect) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {:?}", value, register);

        // Set RS pin
        self.gpio.write(self.pins.rs, register.level())?;

        let high_nibble = (value >> 4) & 0x0F;
        let low_nibble = value & 0x0F;

        trace!("Writing HN: {:04b}", high_nibble);
        self.write_nibble(high_nibble)?;
        self.pulse_e()?;

        trace!("Writing LN: {:04b}", low_nibble);
        self.write_nibble(low_nibble)?;
        self.pulse_e()?;

        Ok(())
    }

    fn delay(&self, duration: Duration) {
        self.gpio.sleep(duration);
    }
}
