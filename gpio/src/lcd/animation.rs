//! Blocking, frame-by-frame text animations.
//!
//! Every frame is fully transmitted before the [FRAME_DELAY] starts, and the delay fully elapses
//! before the next frame. Nothing can interrupt an animation once it started.
use crate::lcd::display::{justify, CharDisplay, Justify, LineAddress, LCD_LINES, LCD_WIDTH};
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::GpioResult;
use log::debug;
use std::time::Duration;

/// Pause between two frames.
pub const FRAME_DELAY: Duration = Duration::from_millis(500);

/// Frames of [CharDisplay::animate_left].
///
/// The first [LCD_WIDTH] characters of `message` grow in from the right edge one by one. Once the
/// message is fully visible, every further frame appends a space, pushing it left. Always
/// [LCD_WIDTH] frames.
///
/// Open question: a short message therefore ends up against the LEFT edge (`"hi"` then 18
/// spaces), although a reveal that settles on the right edge may have been the intent. The frames
/// follow the growth rule above until the product owner decides otherwise.
pub fn slide_left_frames(message: &str) -> Vec<String> {
    let chars: Vec<char> = message.chars().collect();
    let mut visible = String::new();
    (1..=LCD_WIDTH)
        .map(|step| {
            if step > chars.len() {
                visible.push(' ');
            } else {
                visible = chars[..step].iter().collect();
            }
            justify(&visible, Justify::Right)
        })
        .collect()
}

/// Frames of [CharDisplay::animate_right].
///
/// `message` enters from the left edge, last character first, one cell per frame. Once it is fully
/// visible, spaces are prepended, sliding it right until its first character sits at
/// `LCD_WIDTH - len`. Always `LCD_WIDTH + 1` frames.
///
/// Open question: a short message therefore ends up against the RIGHT edge (18 spaces then
/// `"hi"`), although a slide that settles on the left edge may have been the intent. The frames
/// follow the sliding rule above until the product owner decides otherwise.
///
/// A message wider than the display has no room to slide; its tail past the width is shown first
/// and the frames converge on the message itself.
pub fn slide_right_frames(message: &str) -> Vec<String> {
    let chars: Vec<char> = message.chars().collect();
    let gap = LCD_WIDTH.saturating_sub(chars.len());
    let mut visible = String::new();
    (0..=LCD_WIDTH)
        .rev()
        .map(|step| {
            if step < gap {
                visible.insert(0, ' ');
            } else {
                let start = (step - gap).min(chars.len());
                visible = chars[start..].iter().collect();
            }
            justify(&visible, Justify::Left)
        })
        .collect()
}

impl<D: HD44780Driver> CharDisplay<D> {
    /// Reveals `message` on `line`, growing leftward from the right edge.
    pub fn animate_left(&mut self, message: &str, line: LineAddress) -> GpioResult<()> {
        debug!("Animating {:?} left on {:?}", message, line);
        for frame in slide_left_frames(message) {
            self.write_line(&frame, line, Justify::Right)?;
            self.driver().delay(FRAME_DELAY);
        }
        Ok(())
    }

    /// Slides `message` in from the left edge of `line` towards the right one.
    pub fn animate_right(&mut self, message: &str, line: LineAddress) -> GpioResult<()> {
        debug!("Animating {:?} right on {:?}", message, line);
        for frame in slide_right_frames(message) {
            self.write_line(&frame, line, Justify::Left)?;
            self.driver().delay(FRAME_DELAY);
        }
        Ok(())
    }

    /// Drops `message` down the display, one line per frame, stopping after `how_many_lines` lines
    /// (clamped to `1..=4`).
    ///
    /// Unless `trail` is set, the line above is blanked before each write. The line above the first
    /// one is the last one, so line 4 is blanked before line 1 is written.
    pub fn animate_down(
        &mut self,
        message: &str,
        style: Justify,
        trail: bool,
        how_many_lines: usize,
    ) -> GpioResult<()> {
        let count = how_many_lines.clamp(1, LCD_LINES);
        debug!("Animating {:?} down {} lines (trail: {})", message, count, trail);

        for (index, line) in LineAddress::ALL.into_iter().enumerate() {
            if !trail {
                self.write_line("", line.previous(), Justify::Left)?;
            }
            self.write_line(message, line, style)?;

            if index + 1 == count {
                break;
            }
            self.driver().delay(FRAME_DELAY);
        }
        Ok(())
    }
}
