//! Push-button backlight toggle.
//!
//! The button callback runs on the GPIO driver's event thread while the display may be animating on
//! another one. The toggle keeps its own last-event timestamp; the only state shared with the rest
//! of the program is the on/off flag, and the only pin it touches is the backlight pin, which no
//! display operation uses. A forced write racing a toggle is last-write-wins: at worst a press
//! inside the guard window is lost or applied twice.
use crate::{GpioDriver, GpioResult};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Controller-side view of the backlight.
#[derive(Debug, Clone)]
pub struct Backlight {
    pin: usize,
    lit: Arc<AtomicBool>,
}

impl Backlight {
    pub fn new(pin: usize) -> Self {
        Backlight {
            pin,
            lit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit.load(Ordering::Relaxed)
    }

    /// Drives the backlight to `lit`, whatever its current state.
    pub fn force(&self, gpio: &dyn GpioDriver, lit: bool) -> GpioResult<()> {
        gpio.write(self.pin, lit)?;
        self.lit.store(lit, Ordering::Relaxed);
        Ok(())
    }

    /// Creates the button handler flipping this backlight. `now` counts as its last event.
    pub fn toggle(&self, now: Instant) -> BacklightToggle {
        BacklightToggle {
            pin: self.pin,
            lit: Arc::clone(&self.lit),
            last_event: now,
            guard: BacklightToggle::DEFAULT_GUARD,
        }
    }
}

/// Button edge handler flipping the backlight.
///
/// Edges arriving [Self::guard] or less after the last handled one are ignored, on top of whatever
/// debouncing the GPIO driver does.
#[derive(Debug)]
pub struct BacklightToggle {
    pin: usize,
    lit: Arc<AtomicBool>,
    last_event: Instant,
    pub guard: Duration,
}

impl BacklightToggle {
    pub const DEFAULT_GUARD: Duration = Duration::from_millis(700);

    pub fn with_guard(mut self, guard: Duration) -> Self {
        self.guard = guard;
        self
    }

    pub fn last_event(&self) -> Instant {
        self.last_event
    }

    /// Handles a button edge seen at `at`. Returns whether the backlight was flipped.
    pub fn on_edge(&mut self, gpio: &dyn GpioDriver, at: Instant) -> GpioResult<bool> {
        if at.saturating_duration_since(self.last_event) <= self.guard {
            return Ok(false);
        }

        let lit = !self.lit.load(Ordering::Relaxed);
        gpio.write(self.pin, lit)?;
        self.lit.store(lit, Ordering::Relaxed);
        self.last_event = at;

        debug!("Backlight toggled {}", if lit { "on" } else { "off" });
        Ok(true)
    }
}
