//! HD44780 LCD module.
//!
//! Only the write side of the 4-bit interface is implemented; the R/W pin of the display is expected
//! to be tied to GND.
pub mod driver;

#[cfg(test)]
pub(crate) mod sim;
