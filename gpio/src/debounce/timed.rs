use std::time::{Duration, Instant};
use crate::GpioEdge;

/// Edge detector with a timed lockout window.
///
/// Fed with successive pin levels, it reports an edge only when the level transition matches
/// [Self::edge] and at least [Self::window] has passed since the last reported edge. Transitions
/// inside the window still update the tracked level, so a bouncing contact reports one edge.
#[derive(Debug, Clone)]
pub struct TimedEdgeDebounce {
    pub edge: GpioEdge,
    pub window: Duration,
    level: bool,
    last_reported: Option<Instant>,
}

impl TimedEdgeDebounce {
    pub fn new(edge: GpioEdge, initial_level: bool) -> Self {
        Self {
            edge,
            window: Duration::from_millis(50),
            level: initial_level,
            last_reported: None,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// The level seen in the last call to [Self::update].
    pub fn level(&self) -> bool {
        self.level
    }

    /// Feeds a new sample taken at `now`. Returns `true` if it completes a reportable edge.
    pub fn update(&mut self, level: bool, now: Instant) -> bool {
        let previous = self.level;
        self.level = level;

        if !self.edge.matches(previous, level) {
            return false;
        }

        if let Some(last) = self.last_reported {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }

        self.last_reported = Some(now);
        true
    }
}
