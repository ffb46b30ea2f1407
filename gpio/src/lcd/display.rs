//! Line-addressed text output on a 20x4 character display.
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::GpioResult;
use log::warn;

/// Characters per line.
pub const LCD_WIDTH: usize = 20;
/// Number of lines.
pub const LCD_LINES: usize = 4;

/// A physical row of the display, identified by the DDRAM address its first cell lives at.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LineAddress {
    Line1,
    Line2,
    Line3,
    Line4,
}

impl LineAddress {
    /// All lines, top to bottom.
    pub const ALL: [LineAddress; LCD_LINES] = [
        LineAddress::Line1,
        LineAddress::Line2,
        LineAddress::Line3,
        LineAddress::Line4,
    ];

    /// DDRAM offset of the first cell.
    ///
    /// Lines 3 and 4 continue lines 1 and 2 in memory, hence the interleaving.
    pub fn offset(self) -> u8 {
        match self {
            LineAddress::Line1 => 0x00,
            LineAddress::Line2 => 0x40,
            LineAddress::Line3 => 0x14,
            LineAddress::Line4 => 0x54,
        }
    }

    /// The set-DDRAM-address command moving the cursor to the start of the line
    /// (`0x80`, `0xC0`, `0x94`, `0xD4`).
    pub fn command(self) -> u8 {
        0x80 | self.offset()
    }

    /// 1-based row number.
    pub fn row(self) -> usize {
        self as usize + 1
    }

    pub fn from_row(row: usize) -> Option<Self> {
        row.checked_sub(1).and_then(|index| Self::ALL.get(index).copied())
    }

    /// The line above, wrapping from the first line to the last.
    pub fn previous(self) -> Self {
        Self::ALL[(self as usize + LCD_LINES - 1) % LCD_LINES]
    }
}

/// How a message is padded to the display width.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

/// Fits `message` into exactly [LCD_WIDTH] characters.
///
/// Messages longer than the display are cut to their first [LCD_WIDTH] characters, whatever the
/// style. Centered messages get the odd space on the right.
pub fn justify(message: &str, style: Justify) -> String {
    let message: String = message.chars().take(LCD_WIDTH).collect();
    let padding = LCD_WIDTH - message.chars().count();
    let (left, right) = match style {
        Justify::Left => (0, padding),
        Justify::Center => (padding / 2, padding - padding / 2),
        Justify::Right => (padding, 0),
    };
    format!("{}{}{}", " ".repeat(left), message, " ".repeat(right))
}

/// The controller's ROM only matches ASCII.
fn rom_code(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        warn!("Non-ASCII character: {}", c);
        b'?'
    }
}

/// A 20x4 character display driven through an [HD44780Driver].
#[derive(Debug)]
pub struct CharDisplay<D: HD44780Driver> {
    driver: D,
}

impl<D: HD44780Driver> CharDisplay<D> {
    pub fn new(driver: D) -> Self {
        CharDisplay { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Runs the controller's startup sequence. See [HD44780Driver::init].
    pub fn init(&mut self) -> GpioResult<()> {
        self.driver.init()
    }

    /// Replaces the whole `line` with `message`, justified according to `style`.
    pub fn write_line(&mut self, message: &str, line: LineAddress, style: Justify) -> GpioResult<()> {
        self.driver.set_ddram_address(line.offset())?;
        for c in justify(message, style).chars() {
            self.driver.send_data(rom_code(c))?;
        }
        Ok(())
    }

    /// Blanks all four lines, top to bottom.
    pub fn clear(&mut self) -> GpioResult<()> {
        for line in LineAddress::ALL {
            self.write_line("", line, Justify::Left)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeGpioDriver;
    use crate::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Pins, RegisterSelect};
    use crate::lcd::hd44780::sim::{transmissions, Ddram};
    use std::sync::Arc;

    const PINS: HD44780Pins = HD44780Pins { rs: 7, e: 8, data: [25, 24, 23, 18] };

    fn fake_display() -> (Arc<FakeGpioDriver>, CharDisplay<GpioHD44780Driver>) {
        let gpio = Arc::new(FakeGpioDriver::new(32));
        let display = CharDisplay::new(GpioHD44780Driver::new_4bit(gpio.clone(), PINS));
        (gpio, display)
    }

    #[test]
    fn justify_pads_to_width() {
        for len in 0..=LCD_WIDTH {
            let message = "x".repeat(len);
            for style in [Justify::Left, Justify::Center, Justify::Right] {
                assert_eq!(justify(&message, style).chars().count(), LCD_WIDTH);
            }

            assert!(justify(&message, Justify::Left).starts_with(&message));
            assert!(justify(&message, Justify::Right).ends_with(&message));

            let centered = justify(&message, Justify::Center);
            let leading = (LCD_WIDTH - len) / 2;
            assert_eq!(&centered[leading..leading + len], message);
            assert!(centered[..leading].chars().all(|c| c == ' '));
        }
    }

    #[test]
    fn justify_center_puts_odd_space_right() {
        assert_eq!(justify("abc", Justify::Center), format!("{}abc{}", " ".repeat(8), " ".repeat(9)));
    }

    #[test]
    fn justify_truncates_long_messages() {
        let long = "abcdefghijklmnopqrstuvwxyz";
        for style in [Justify::Left, Justify::Center, Justify::Right] {
            assert_eq!(justify(long, style), "abcdefghijklmnopqrst");
        }
    }

    #[test]
    fn justify_counts_characters_not_bytes() {
        let justified = justify("żółw", Justify::Right);
        assert_eq!(justified.chars().count(), LCD_WIDTH);
        assert!(justified.ends_with("żółw"));
    }

    #[test]
    fn line_addresses() {
        let commands: Vec<u8> = LineAddress::ALL.iter().map(|line| line.command()).collect();
        assert_eq!(commands, vec![0x80, 0xC0, 0x94, 0xD4]);
        assert_eq!(LineAddress::Line1.previous(), LineAddress::Line4);
        assert_eq!(LineAddress::Line3.previous(), LineAddress::Line2);
        assert_eq!(LineAddress::from_row(4), Some(LineAddress::Line4));
        assert_eq!(LineAddress::from_row(0), None);
        assert_eq!(LineAddress::from_row(5), None);
        assert_eq!(LineAddress::Line2.row(), 2);
    }

    #[test]
    fn write_line_addresses_then_streams_twenty_characters() {
        let (gpio, mut display) = fake_display();
        display.write_line("Hello", LineAddress::Line3, Justify::Right).unwrap();

        let sent = transmissions(&gpio.events(), PINS);
        assert_eq!(sent.len(), 1 + LCD_WIDTH);
        assert_eq!(sent[0], (0x94, RegisterSelect::Command));
        let text: String = sent[1..]
            .iter()
            .map(|&(byte, register)| {
                assert_eq!(register, RegisterSelect::Character);
                byte as char
            })
            .collect();
        assert_eq!(text, justify("Hello", Justify::Right));

        let ddram = Ddram::from_events(&gpio.events(), PINS);
        assert_eq!(ddram.row(3), format!("{}Hello", " ".repeat(15)));
    }

    #[test]
    fn non_ascii_is_replaced() {
        let (gpio, mut display) = fake_display();
        display.write_line("żaba", LineAddress::Line1, Justify::Left).unwrap();

        let ddram = Ddram::from_events(&gpio.events(), PINS);
        assert_eq!(ddram.row(1), justify("?aba", Justify::Left));
    }

    #[test]
    fn clear_blanks_lines_in_order() {
        let (gpio, mut display) = fake_display();
        display.clear().unwrap();

        let sent = transmissions(&gpio.events(), PINS);
        let addresses: Vec<u8> = sent
            .iter()
            .filter(|(_, register)| *register == RegisterSelect::Command)
            .map(|&(byte, _)| byte)
            .collect();
        assert_eq!(addresses, vec![0x80, 0xC0, 0x94, 0xD4]);
        assert!(sent
            .iter()
            .filter(|(_, register)| *register == RegisterSelect::Character)
            .all(|&(byte, _)| byte == b' '));
    }

    #[test]
    fn clear_then_empty_write_is_idempotent() {
        let (gpio, mut display) = fake_display();
        display.write_line("something", LineAddress::Line2, Justify::Center).unwrap();
        display.clear().unwrap();
        let after_clear = Ddram::from_events(&gpio.events(), PINS).row(2);

        display.write_line("", LineAddress::Line2, Justify::Left).unwrap();
        let after_write = Ddram::from_events(&gpio.events(), PINS).row(2);

        assert_eq!(after_clear, " ".repeat(LCD_WIDTH));
        assert_eq!(after_clear, after_write);
    }

    #[test]
    fn init_sends_startup_sequence() {
        let (gpio, mut display) = fake_display();
        display.init().unwrap();

        assert_eq!(
            transmissions(&gpio.events(), PINS),
            [0x33, 0x32, 0x28, 0x0C, 0x06, 0x01]
                .map(|command| (command, RegisterSelect::Command))
                .to_vec()
        );
    }
}
