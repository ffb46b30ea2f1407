//! The display handle: pins, startup, backlight button and guaranteed release.
use crate::backlight::Backlight;
use crate::lcd::display::CharDisplay;
use crate::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Pins};
use crate::{GpioBias, GpioDirection, GpioDriver, GpioEdge, GpioEdgeEvent, GpioError, GpioResult};
use log::{debug, error, info, warn};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Logical (BCM) pin numbers of the display module, its backlight and the backlight button.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LcdPins {
    pub rs: usize,
    pub e: usize,
    /// D4, D5, D6, D7.
    pub data: [usize; 4],
    /// Output enabling the backlight.
    pub backlight: usize,
    /// Input of the button toggling the backlight, pulled down, active high.
    pub button: usize,
}

impl Default for LcdPins {
    fn default() -> Self {
        LcdPins {
            rs: 7,
            e: 8,
            data: [25, 24, 23, 18],
            backlight: 15,
            button: 4,
        }
    }
}

impl LcdPins {
    fn all(&self) -> [usize; 8] {
        let [d4, d5, d6, d7] = self.data;
        [self.rs, self.e, d4, d5, d6, d7, self.backlight, self.button]
    }

    /// Checks no pin is assigned twice.
    pub fn validate(&self) -> GpioResult<()> {
        let pins = self.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(GpioError::InvalidArgument);
            }
        }
        Ok(())
    }

    pub fn display(&self) -> HD44780Pins {
        HD44780Pins {
            rs: self.rs,
            e: self.e,
            data: self.data,
        }
    }
}

/// Handle to an initialized 20x4 display.
///
/// Dereferences to the [CharDisplay], so text and animation operations are called on it directly.
/// Dropping the handle, or calling [Self::shutdown], blanks the display, turns the backlight off and
/// releases every pin through [GpioDriver::cleanup]. The release also runs when a `?` or a panic
/// unwinds past the handle. A signal kills the process without unwinding, so a program that can be
/// interrupted must turn the signal into a normal return (the `charlcd` binary stops its scene loop
/// on Ctrl+C and SIGTERM).
///
/// There should be one handle per display: nothing stops two handles from fighting over the pins.
#[derive(Debug)]
pub struct LcdController {
    display: CharDisplay<GpioHD44780Driver>,
    gpio: Arc<dyn GpioDriver>,
    backlight: Backlight,
    released: bool,
}

impl LcdController {
    /// How long the backlight stays off during the startup blink.
    pub const READY_BLINK: Duration = Duration::from_secs(1);
    /// Debounce window requested from the GPIO driver for the button.
    pub const BUTTON_DEBOUNCE: Duration = Duration::from_millis(700);

    /// Brings the display up.
    ///
    /// With `auto_pin_mode`, the driver is switched to BCM numbering first; without it, the caller
    /// must have selected that numbering already. Every pin is then claimed: all as outputs except
    /// the button, which becomes a pulled-down input. The display is initialized, the backlight
    /// blinks off and on, and the button is wired to toggle it.
    pub fn initialize(gpio: Arc<dyn GpioDriver>, pins: LcdPins, auto_pin_mode: bool) -> GpioResult<Self> {
        pins.validate()?;
        debug!("Initializing LCD with {:?}", pins);

        if auto_pin_mode {
            gpio.use_bcm_numbering()?;
        }

        let display = CharDisplay::new(GpioHD44780Driver::new_4bit(Arc::clone(&gpio), pins.display()));

        if let Err(err) = Self::configure_pins(&*gpio, &display, &pins) {
            if let Err(cleanup_err) = gpio.cleanup() {
                warn!("Failed to clean up after pin configuration error: {}", cleanup_err);
            }
            return Err(err);
        }

        // Anything failing from here on is released by Drop.
        let mut controller = LcdController {
            display,
            gpio,
            backlight: Backlight::new(pins.backlight),
            released: false,
        };

        controller.display.init()?;

        controller.backlight.force(&*controller.gpio, false)?;
        controller.gpio.sleep(Self::READY_BLINK);
        controller.backlight.force(&*controller.gpio, true)?;

        // The callback holds the driver until cleanup unregisters it.
        let mut toggle = controller.backlight.toggle(Instant::now());
        let gpio = Arc::clone(&controller.gpio);
        controller.gpio.on_edge(
            pins.button,
            GpioEdge::Rising,
            Self::BUTTON_DEBOUNCE,
            Box::new(move |event: GpioEdgeEvent| {
                if let Err(err) = toggle.on_edge(&*gpio, event.at) {
                    warn!("Failed to toggle backlight: {}", err);
                }
            }),
        )?;

        info!("LCD initialised");
        Ok(controller)
    }

    fn configure_pins(
        gpio: &dyn GpioDriver,
        display: &CharDisplay<GpioHD44780Driver>,
        pins: &LcdPins,
    ) -> GpioResult<()> {
        display.driver().configure_pins()?;
        gpio.configure(pins.backlight, GpioDirection::Output, GpioBias::None)?;
        gpio.configure(pins.button, GpioDirection::Input, GpioBias::PullDown)?;
        Ok(())
    }

    /// Whether the backlight is currently on.
    pub fn backlight(&self) -> bool {
        self.backlight.is_lit()
    }

    pub fn gpio(&self) -> &Arc<dyn GpioDriver> {
        &self.gpio
    }

    /// Releases the display now, reporting the first error.
    pub fn shutdown(mut self) -> GpioResult<()> {
        self.release()
    }

    /// Blanks the display, turns the backlight off and releases the pins.
    ///
    /// Every step is attempted even if an earlier one failed.
    fn release(&mut self) -> GpioResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let cleared = self.display.clear();
        let darkened = self.backlight.force(&*self.gpio, false);
        let cleaned = self.gpio.cleanup();

        info!("LCD destroyed");
        cleared.and(darkened).and(cleaned)
    }
}

impl Deref for LcdController {
    type Target = CharDisplay<GpioHD44780Driver>;

    fn deref(&self) -> &Self::Target {
        &self.display
    }
}

impl DerefMut for LcdController {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.display
    }
}

impl Drop for LcdController {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!("Failed to release LCD: {}", err);
        }
    }
}
