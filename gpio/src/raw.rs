use crate::debounce::TimedEdgeDebounce;
use crate::{EdgeCallback, GpioBias, GpioDirection, GpioDriver, GpioEdge, GpioEdgeEvent, GpioError, GpioResult};
use bitvec::vec::BitVec;
use log::{debug, trace, warn};
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// The memory-mapped GPIO register block.
struct RawRegisters {
    mmap: MmapRaw,
}

impl RawRegisters {
    const PIN_COUNT: usize = 58;

    fn check_pin(pin_index: usize) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    fn set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 {
            return Err(GpioError::InvalidArgument);
        }
        Self::check_pin(pin_index)?;

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift); // Clear the bits for this pin
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    fn set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check_pin(pin_index)?;

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr = unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + pin_index / 32) };
        let shift = pin_index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };

        Ok(())
    }

    fn get_pin_level(&self, pin_index: usize) -> GpioResult<bool> {
        Self::check_pin(pin_index)?;

        let mmap = self.mmap.as_ptr() as *const u32;
        // GPLEVn register
        let register_ptr = unsafe { mmap.add((0x34 / 4) + pin_index / 32) };
        let shift = pin_index % 32;

        let register_value = unsafe { register_ptr.read_volatile() };
        Ok((register_value >> shift) & 1 != 0)
    }

    fn set_bias(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        Self::check_pin(pin_index)?;

        let bias_value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPIO_PUP_PDN_CNTRL_REGn register (yes that is a long name)
        let register_ptr = unsafe { mmap.add(0xE4 / 4 + pin_index / 16) };
        let shift = (pin_index % 16) * 2;
        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b11 << shift); // Clear the bits for this pin
        register_value |= bias_value << shift;

        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    fn reset(&self, pin_index: usize) -> GpioResult<()> {
        self.set_pin_function(pin_index, 0)?;
        self.set_bias(pin_index, GpioBias::None)?;
        self.set_pin_output(pin_index, false)?;
        Ok(())
    }
}

/// Atomically marks `pin` as used. Returns `false` if it already was.
fn try_claim(used_pins: &BitVec<AtomicU8>, pin: usize) -> bool {
    // Lsb0 order: bit `pin % 8` of element `pin / 8`.
    let mask = 1u8 << (pin % 8);
    used_pins.as_raw_slice()[pin / 8].fetch_or(mask, Ordering::AcqRel) & mask == 0
}

/// A polling thread that reports debounced edges of one input pin.
struct EdgeWatcher {
    pin: usize,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// GPIO driver poking the BCM283x/BCM2711 registers directly through `/dev/gpiomem` or `/dev/mem`.
///
/// Edge detection is done in software: every registered callback gets its own thread sampling the
/// pin level every [Self::POLL_INTERVAL].
pub struct RawGpioDriver {
    registers: Arc<RawRegisters>,
    used_pins: BitVec<AtomicU8>,
    watchers: Mutex<Vec<EdgeWatcher>>,
}

impl RawGpioDriver {
    // 0x7e200000 on the bus
    // const GPIO_BASE: u32 = 0xFE200000;
    const GPIO_BASE: u32 = 0x3F200000;

    pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
                .offset(offset)
                .len(4096)
                .map_raw(&file)?;

        Ok(RawGpioDriver {
            registers: Arc::new(RawRegisters { mmap }),
            used_pins: BitVec::repeat(false, RawRegisters::PIN_COUNT),
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Maps the GPIO block through `/dev/gpiomem`, which exposes it at offset 0 and doesn't require root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE as u64)
    }

    fn lock_watchers(&self) -> GpioResult<std::sync::MutexGuard<'_, Vec<EdgeWatcher>>> {
        self.watchers
            .lock()
            .map_err(|_| GpioError::Other("edge watcher list poisoned".to_string()))
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.registers.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn use_bcm_numbering(&self) -> GpioResult<()> {
        // The register banks are indexed by BCM number; there is nothing to switch.
        trace!("{:?} uses BCM numbering", self);
        Ok(())
    }

    fn configure(&self, pin: usize, direction: GpioDirection, bias: GpioBias) -> GpioResult<()> {
        RawRegisters::check_pin(pin)?;

        if !try_claim(&self.used_pins, pin) {
            return Err(GpioError::AlreadyInUse);
        }

        self.registers.reset(pin)?;
        self.registers.set_bias(pin, bias)?;
        let function = match direction {
            GpioDirection::Input => 0,
            GpioDirection::Output => 1,
        };
        self.registers.set_pin_function(pin, function)?;

        trace!("Configured pin {} as {:?} ({:?})", pin, direction, bias);
        Ok(())
    }

    fn write(&self, pin: usize, value: bool) -> GpioResult<()> {
        self.registers.set_pin_output(pin, value)
    }

    fn on_edge(
        &self,
        pin: usize,
        edge: GpioEdge,
        debounce: Duration,
        mut callback: EdgeCallback,
    ) -> GpioResult<()> {
        let registers = Arc::clone(&self.registers);
        let initial = registers.get_pin_level(pin)?;
        let mut debouncer = TimedEdgeDebounce::new(edge, initial).with_window(debounce);
        let stop = Arc::new(AtomicBool::new(false));

        let thread = thread::Builder::new()
            .name(format!("gpio-edge-{}", pin))
            .spawn({
                let stop = Arc::clone(&stop);
                move || {
                    while !stop.load(Ordering::Relaxed) {
                        match registers.get_pin_level(pin) {
                            Ok(level) => {
                                let now = Instant::now();
                                if debouncer.update(level, now) {
                                    trace!("Edge {:?} on pin {}", edge, pin);
                                    callback(GpioEdgeEvent { pin, edge, at: now });
                                }
                            }
                            Err(err) => {
                                warn!("Stopped watching pin {}: {}", pin, err);
                                break;
                            }
                        }
                        thread::sleep(Self::POLL_INTERVAL);
                    }
                }
            })?;

        debug!("Watching pin {} for {:?} edges (debounce {:?})", pin, edge, debounce);
        self.lock_watchers()?.push(EdgeWatcher { pin, stop, thread });
        Ok(())
    }

    fn cleanup(&self) -> GpioResult<()> {
        let watchers = std::mem::take(&mut *self.lock_watchers()?);
        for watcher in &watchers {
            watcher.stop.store(true, Ordering::Relaxed);
        }
        for watcher in watchers {
            // A callback cleaning up can't wait for its own thread.
            if watcher.thread.thread().id() == thread::current().id() {
                continue;
            }
            if watcher.thread.join().is_err() {
                warn!("Edge watcher for pin {} panicked", watcher.pin);
            }
        }

        let mut result = Ok(());
        for pin in 0..RawRegisters::PIN_COUNT {
            if !self.used_pins[pin] {
                continue;
            }
            if let Err(err) = self.registers.reset(pin) {
                warn!("Failed to reset pin {}: {}", pin, err);
                result = result.and(Err(err));
            }
            self.used_pins.set_aliased(pin, false);
        }

        debug!("{:?} cleaned up", self);
        result
    }
}

impl Drop for RawGpioDriver {
    fn drop(&mut self) {
        if let Ok(watchers) = self.watchers.get_mut() {
            for watcher in watchers.iter() {
                watcher.stop.store(true, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let used_pins: BitVec<AtomicU8> = BitVec::repeat(false, RawRegisters::PIN_COUNT);
        assert!(try_claim(&used_pins, 17));
        assert!(!try_claim(&used_pins, 17));
        assert!(used_pins[17]);
        assert!(!used_pins[16]);
        assert!(!used_pins[18]);

        used_pins.set_aliased(17, false);
        assert!(try_claim(&used_pins, 17));
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let used_pins: BitVec<AtomicU8> = BitVec::repeat(false, RawRegisters::PIN_COUNT);
        for pin in [0, 9, 57] {
            let winners: usize = thread::scope(|scope| {
                let handles: Vec<_> = (0..8)
                    .map(|_| scope.spawn(|| try_claim(&used_pins, pin)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap() as usize)
                    .sum()
            });
            assert_eq!(winners, 1);
            assert!(used_pins[pin]);
        }
    }
}
