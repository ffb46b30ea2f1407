use charlcd_gpio::lcd::display::{CharDisplay, Justify, LineAddress};
use charlcd_gpio::lcd::hd44780::driver::HD44780Driver;
use charlcd_gpio::{GpioError, GpioResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest stretch of a pause between cycles before a stop request is noticed.
const PAUSE_SLICE: Duration = Duration::from_millis(100);

/// [Justify] as written in the config file.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl From<Alignment> for Justify {
    fn from(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Left => Justify::Left,
            Alignment::Center => Justify::Center,
            Alignment::Right => Justify::Right,
        }
    }
}

fn first_line() -> usize {
    1
}

fn all_lines() -> usize {
    4
}

/// One step of the showcase. Lines are numbered 1 to 4.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Scene {
    Static {
        text: String,
        #[serde(default = "first_line")]
        line: usize,
        #[serde(default)]
        align: Alignment,
    },
    SlideLeft {
        text: String,
        #[serde(default = "first_line")]
        line: usize,
    },
    SlideRight {
        text: String,
        #[serde(default = "first_line")]
        line: usize,
    },
    CascadeDown {
        text: String,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        trail: bool,
        #[serde(default = "all_lines")]
        lines: usize,
    },
    Clear,
}

impl Scene {
    /// The scenes played when no config file exists.
    pub fn showcase() -> Vec<Scene> {
        vec![
            Scene::CascadeDown {
                text: "test".to_string(),
                align: Alignment::Left,
                trail: false,
                lines: 4,
            },
            Scene::CascadeDown {
                text: "Disco".to_string(),
                align: Alignment::Center,
                trail: true,
                lines: 3,
            },
            Scene::SlideLeft {
                text: "charlcd".to_string(),
                line: 1,
            },
            Scene::SlideRight {
                text: concat!("v", env!("CARGO_PKG_VERSION")).to_string(),
                line: 2,
            },
        ]
    }

    /// The line a single-line scene targets.
    pub fn line(&self) -> Option<usize> {
        match self {
            Scene::Static { line, .. } | Scene::SlideLeft { line, .. } | Scene::SlideRight { line, .. } => {
                Some(*line)
            }
            Scene::CascadeDown { .. } | Scene::Clear => None,
        }
    }

    pub fn play<D: HD44780Driver>(&self, display: &mut CharDisplay<D>) -> GpioResult<()> {
        debug!("Playing {:?}", self);
        let line = self
            .line()
            .map(|row| LineAddress::from_row(row).ok_or(GpioError::InvalidArgument))
            .transpose()?
            .unwrap_or(LineAddress::Line1);

        match self {
            Scene::Static { text, align, .. } => display.write_line(text, line, (*align).into()),
            Scene::SlideLeft { text, .. } => display.animate_left(text, line),
            Scene::SlideRight { text, .. } => display.animate_right(text, line),
            Scene::CascadeDown { text, align, trail, lines } => {
                display.animate_down(text, (*align).into(), *trail, *lines)
            }
            Scene::Clear => display.clear(),
        }
    }
}

/// Plays `scenes` over and over, `cycles` times (0 for no limit), pausing after each cycle.
///
/// Stops early once `running` is cleared: before the next scene, or during the pause. A scene
/// already playing runs to its end. Returns the number of completed cycles.
pub fn play_cycles<D: HD44780Driver>(
    display: &mut CharDisplay<D>,
    scenes: &[Scene],
    cycles: u32,
    pause: Duration,
    running: &AtomicBool,
) -> GpioResult<u32> {
    let mut cycle = 0;
    'cycles: while running.load(Ordering::SeqCst) {
        for scene in scenes {
            if !running.load(Ordering::SeqCst) {
                break 'cycles;
            }
            scene.play(display)?;
        }

        cycle += 1;
        debug!("Cycle {} done.", cycle);
        if cycles != 0 && cycle >= cycles {
            break;
        }

        let mut remaining = pause;
        while !remaining.is_zero() && running.load(Ordering::SeqCst) {
            let slice = remaining.min(PAUSE_SLICE);
            display.driver().delay(slice);
            remaining -= slice;
        }
    }

    if !running.load(Ordering::SeqCst) {
        info!("Stopped after {} cycles.", cycle);
    }
    Ok(cycle)
}
