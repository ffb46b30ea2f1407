//! Test model of an HD44780 on the receiving end of a [FakeGpioDriver](crate::fake::FakeGpioDriver).
//!
//! Replays the recorded pin writes and sleeps, latching the data lines on every rising edge of E
//! the way the controller does.
use crate::fake::FakeGpioEvent;
use crate::lcd::hd44780::driver::{HD44780Pins, RegisterSelect};
use std::time::Duration;

/// One latched nibble, with the timing around its E pulse.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Strobe {
    pub rs: bool,
    /// Levels of D4..D7 when E went high.
    pub data: [bool; 4],
    pub delay_before: Duration,
    pub pulse: Duration,
    pub delay_after: Duration,
}

impl Strobe {
    pub fn nibble(&self) -> u8 {
        self.data
            .iter()
            .enumerate()
            .fold(0, |nibble, (bit, &high)| nibble | ((high as u8) << bit))
    }
}

pub(crate) fn strobes(events: &[FakeGpioEvent], pins: HD44780Pins) -> Vec<Strobe> {
    let mut rs = false;
    let mut data = [false; 4];
    let mut e = false;
    let mut slept = Duration::ZERO;
    let mut awaiting_after: Option<usize> = None;
    let mut strobes: Vec<Strobe> = Vec::new();

    for event in events {
        match *event {
            FakeGpioEvent::Sleep(duration) => slept += duration,
            FakeGpioEvent::Write { pin, value } => {
                if let Some(index) = awaiting_after.take() {
                    strobes[index].delay_after = slept;
                }

                if pin == pins.rs {
                    rs = value;
                } else if let Some(line) = pins.data.iter().position(|&data_pin| data_pin == pin) {
                    data[line] = value;
                } else if pin == pins.e {
                    if value && !e {
                        strobes.push(Strobe {
                            rs,
                            data,
                            delay_before: slept,
                            pulse: Duration::ZERO,
                            delay_after: Duration::ZERO,
                        });
                    } else if !value && e {
                        if let Some(strobe) = strobes.last_mut() {
                            strobe.pulse = slept;
                        }
                        awaiting_after = Some(strobes.len() - 1);
                    }
                    e = value;
                }
                slept = Duration::ZERO;
            }
            _ => {}
        }
    }

    if let Some(index) = awaiting_after {
        strobes[index].delay_after = slept;
    }
    strobes
}

/// Pairs up the latched nibbles into transmitted bytes.
pub(crate) fn transmissions(events: &[FakeGpioEvent], pins: HD44780Pins) -> Vec<(u8, RegisterSelect)> {
    strobes(events, pins)
        .chunks_exact(2)
        .map(|pair| {
            let register = if pair[0].rs { RegisterSelect::Character } else { RegisterSelect::Command };
            ((pair[0].nibble() << 4) | pair[1].nibble(), register)
        })
        .collect()
}

/// Display RAM of a 20x4 module, fed with transmitted bytes.
#[derive(Debug, Clone)]
pub(crate) struct Ddram {
    rows: [[u8; 20]; 4],
    address: u8,
}

impl Ddram {
    const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

    pub fn new() -> Self {
        Ddram { rows: [[b' '; 20]; 4], address: 0 }
    }

    pub fn from_events(events: &[FakeGpioEvent], pins: HD44780Pins) -> Self {
        let mut ddram = Self::new();
        for (value, register) in transmissions(events, pins) {
            ddram.apply(value, register);
        }
        ddram
    }

    pub fn apply(&mut self, value: u8, register: RegisterSelect) {
        match register {
            RegisterSelect::Command if value & 0x80 != 0 => self.address = value & 0x7F,
            RegisterSelect::Command if value == 0x01 => *self = Self::new(),
            RegisterSelect::Command => {}
            RegisterSelect::Character => {
                for (row, &offset) in Self::ROW_OFFSETS.iter().enumerate() {
                    if (offset..offset + 20).contains(&self.address) {
                        self.rows[row][(self.address - offset) as usize] = value;
                    }
                }
                self.address = self.address.wrapping_add(1) & 0x7F;
            }
        }
    }

    /// Text of the row, 1-based like the line numbers.
    pub fn row(&self, row: usize) -> String {
        self.rows[row - 1].iter().map(|&byte| byte as char).collect()
    }
}
