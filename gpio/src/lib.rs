pub mod backlight;
pub mod debounce;
pub mod fake;
pub mod lcd;
pub mod raw;

use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// Direction of a GPIO pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpioDirection {
    Input,
    Output,
}

/// Specifies the bias of the GPIO pin.
///
/// You can use this to enable pull-up or pull-down resistors.
/// These should work in both input and output modes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// The signal transition an edge callback listens for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpioEdge {
    Rising,
    Falling,
}

impl GpioEdge {
    /// Whether going from `previous` to `current` is this kind of edge.
    pub fn matches(&self, previous: bool, current: bool) -> bool {
        match self {
            GpioEdge::Rising => !previous && current,
            GpioEdge::Falling => previous && !current,
        }
    }
}

/// A single edge seen on an input pin.
///
/// `at` is stamped by the driver that detected the edge, not by the handler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GpioEdgeEvent {
    pub pin: usize,
    pub edge: GpioEdge,
    pub at: Instant,
}

/// Callback invoked by a [GpioDriver] for every debounced edge.
///
/// Runs on the driver's event thread, not on the thread that registered it.
pub type EdgeCallback = Box<dyn FnMut(GpioEdgeEvent) + Send + 'static>;

/// Process-wide GPIO resource manager.
///
/// There is meant to be one instance per process, shared behind an `Arc` between the display and
/// the edge handlers. All methods take `&self`; implementations handle their own synchronization.
pub trait GpioDriver: Debug + Send + Sync {
    /// Switches pin arguments to BCM (SoC) numbering.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend can't number pins that way.
    fn use_bcm_numbering(&self) -> GpioResult<()>;

    /// Claims the pin and sets its direction and bias.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the pin doesn't exist.
    /// - `GpioError::AlreadyInUse` if the pin was already configured and not released with [Self::cleanup].
    fn configure(&self, pin: usize, direction: GpioDirection, bias: GpioBias) -> GpioResult<()>;

    /// Drives the output pin high (`true`) or low (`false`).
    fn write(&self, pin: usize, value: bool) -> GpioResult<()>;

    /// Registers `callback` to be called for every `edge` on `pin`.
    ///
    /// Edges closer than `debounce` to the previously reported one are swallowed by the driver.
    fn on_edge(
        &self,
        pin: usize,
        edge: GpioEdge,
        debounce: Duration,
        callback: EdgeCallback,
    ) -> GpioResult<()>;

    /// Blocks the calling thread.
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    /// Unregisters all edge callbacks and releases every configured pin.
    fn cleanup(&self) -> GpioResult<()>;
}
