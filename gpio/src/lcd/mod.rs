//! Character LCD support: the HD44780 wire protocol, a 20x4 text display on top of it, animations,
//! and the controller handle tying the display to its backlight.
pub mod animation;
pub mod controller;
pub mod display;
pub mod hd44780;
