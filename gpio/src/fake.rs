//! In-memory GPIO driver that records every operation instead of touching hardware.
//!
//! Sleeps are logged but return immediately, so code with real-time delays can be tested at full
//! speed while still asserting on the delays themselves. Edges are injected with
//! [FakeGpioDriver::fire_edge]. No debouncing is applied on the way, which lets tests exercise the
//! handlers' own guards.
use crate::{EdgeCallback, GpioBias, GpioDirection, GpioDriver, GpioEdge, GpioEdgeEvent, GpioError, GpioResult};
use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One recorded call into the [FakeGpioDriver].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FakeGpioEvent {
    BcmNumbering,
    Configure {
        pin: usize,
        direction: GpioDirection,
        bias: GpioBias,
    },
    Write {
        pin: usize,
        value: bool,
    },
    Sleep(Duration),
    EdgeRegistered {
        pin: usize,
        edge: GpioEdge,
        debounce: Duration,
    },
    Cleanup,
}

#[derive(Default)]
struct FakeState {
    events: Vec<FakeGpioEvent>,
    levels: Vec<bool>,
    configured: Vec<bool>,
    failing: Vec<usize>,
    generation: u64,
}

struct RegisteredCallback {
    pin: usize,
    edge: GpioEdge,
    callback: EdgeCallback,
}

pub struct FakeGpioDriver {
    pin_count: usize,
    state: Mutex<FakeState>,
    callbacks: Mutex<Vec<RegisteredCallback>>,
}

impl FakeGpioDriver {
    pub fn new(pin_count: usize) -> Self {
        FakeGpioDriver {
            pin_count,
            state: Mutex::new(FakeState {
                levels: vec![false; pin_count],
                configured: vec![false; pin_count],
                ..FakeState::default()
            }),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<RegisteredCallback>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_pin(&self, pin: usize) -> GpioResult<()> {
        if pin >= self.pin_count {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    /// All events recorded so far.
    pub fn events(&self) -> Vec<FakeGpioEvent> {
        self.state().events.clone()
    }

    /// Returns the recorded events and clears the log.
    pub fn take_events(&self) -> Vec<FakeGpioEvent> {
        std::mem::take(&mut self.state().events)
    }

    /// Current level of the pin, as last written.
    pub fn level(&self, pin: usize) -> bool {
        self.state().levels.get(pin).copied().unwrap_or(false)
    }

    pub fn is_configured(&self, pin: usize) -> bool {
        self.state().configured.get(pin).copied().unwrap_or(false)
    }

    /// Makes every following write to `pin` fail.
    pub fn fail_writes_to(&self, pin: usize) {
        self.state().failing.push(pin);
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks().len()
    }

    /// Invokes every callback registered for `pin`, as if an edge had been detected at `at`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn fire_edge(&self, pin: usize, at: Instant) -> usize {
        // Callbacks usually write back through this driver, so they can't run under the lock.
        let generation = self.state().generation;
        let mut callbacks = std::mem::take(&mut *self.callbacks());

        let mut invoked = 0;
        for registered in callbacks.iter_mut().filter(|registered| registered.pin == pin) {
            (registered.callback)(GpioEdgeEvent { pin, edge: registered.edge, at });
            invoked += 1;
        }

        if self.state().generation == generation {
            let mut current = self.callbacks();
            callbacks.append(&mut current);
            *current = callbacks;
        }
        invoked
    }
}

impl Debug for FakeGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FakeGpioDriver({})", self.pin_count)
    }
}

impl GpioDriver for FakeGpioDriver {
    fn use_bcm_numbering(&self) -> GpioResult<()> {
        self.state().events.push(FakeGpioEvent::BcmNumbering);
        Ok(())
    }

    fn configure(&self, pin: usize, direction: GpioDirection, bias: GpioBias) -> GpioResult<()> {
        self.check_pin(pin)?;
        let mut state = self.state();
        if state.configured[pin] {
            return Err(GpioError::AlreadyInUse);
        }
        state.configured[pin] = true;
        state.levels[pin] = false;
        state.events.push(FakeGpioEvent::Configure { pin, direction, bias });
        Ok(())
    }

    fn write(&self, pin: usize, value: bool) -> GpioResult<()> {
        self.check_pin(pin)?;
        let mut state = self.state();
        if state.failing.contains(&pin) {
            return Err(GpioError::Other(format!("injected failure on pin {}", pin)));
        }
        state.levels[pin] = value;
        state.events.push(FakeGpioEvent::Write { pin, value });
        Ok(())
    }

    fn on_edge(
        &self,
        pin: usize,
        edge: GpioEdge,
        debounce: Duration,
        callback: EdgeCallback,
    ) -> GpioResult<()> {
        self.check_pin(pin)?;
        self.state().events.push(FakeGpioEvent::EdgeRegistered { pin, edge, debounce });
        self.callbacks().push(RegisteredCallback { pin, edge, callback });
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        self.state().events.push(FakeGpioEvent::Sleep(duration));
    }

    fn cleanup(&self) -> GpioResult<()> {
        self.callbacks().clear();
        let mut state = self.state();
        state.generation += 1;
        state.configured.iter_mut().for_each(|configured| *configured = false);
        state.levels.iter_mut().for_each(|level| *level = false);
        state.events.push(FakeGpioEvent::Cleanup);
        Ok(())
    }
}
