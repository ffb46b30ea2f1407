mod gpio;

use crate::{GpioError, GpioResult};
pub use gpio::*;
use std::fmt::Debug;
use std::time::Duration;

/// Selects which register of the controller a transmitted byte goes to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegisterSelect {
    /// Instruction register (RS low).
    Command,
    /// Data register (RS high); the byte is a character code.
    Character,
}

impl RegisterSelect {
    /// The level of the RS pin for this register.
    pub fn level(self) -> bool {
        self == RegisterSelect::Character
    }
}

pub trait HD44780Driver: Debug {
    /// Initializes the controller into 4-bit, 2-line mode with the display on, cursor off and
    /// left-to-right entry, then clears it.
    ///
    /// The sequence is fixed: `0x33`, `0x32` to synchronize into 4-bit mode, then function set
    /// (`0x28`), display control (`0x0C`), entry mode (`0x06`) and clear (`0x01`).
    fn init(&mut self) -> GpioResult<()> {
        // Synchronize
        self.send_command(0b00110011)?;
        self.send_command(0b00110010)?;
        self.function_set(false, true, false)?;
        self.set_display_control(true, false, false)?;
        self.set_entry_mode(CursorDirection::Right, false)?;
        self.clear_display()?;
        Ok(())
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(0b00000001)
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> GpioResult<()> {
        let mut command = 0b00000100;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> GpioResult<()> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the function set.
    fn function_set(&mut self, data_length: bool, two_lines: bool, font: bool) -> GpioResult<()> {
        let mut command = 0b00100000;
        if data_length {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if font {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the DDRAM address.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b10000000 | address;
        self.send_command(command)
    }

    /// Sends a command to the HD44780 controller.
    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, RegisterSelect::Command)
    }

    /// Sends a character code to the HD44780 controller.
    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, RegisterSelect::Character)
    }

    // Low-level interface, implemented by the driver implementation.

    /// Transmits one byte to the selected register.
    fn send(&mut self, value: u8, register: RegisterSelect) -> GpioResult<()>;

    /// Blocks for `duration` on the clock the driver uses for its own timing.
    fn delay(&self, duration: Duration);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing/reading data.
    Left,
    /// Moves the cursor to the right after writing/reading data.
    Right,
}
