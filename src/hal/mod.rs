//! Hardware collaborators.
//!
//! The interpreter and editor never touch hardware directly. They talk to a
//! [`Board`], which bundles:
//! - [`Screen`]: the two-row character display
//! - [`Hardware`]: LEDs, buzzer, analog and digital inputs, timing
//! - [`Keypad`]: the external keyboard
//! - [`ModeSwitch`]: the editing/running mode switch
//!
//! [`sim::SimBoard`] records every call and is what tests and headless runs
//! use. The terminal front panel provides a live implementation.

pub mod display;
pub mod sim;
pub mod tone;

pub use display::{Screen, TextDisplay, COLUMNS, ROWS};
pub use sim::{SimBoard, ModeScript, Notice};
pub use tone::Tone;

use serde::{Serialize, Deserialize};

/// Number of analog input channels.
pub const ANALOG_CHANNELS: usize = 9;

/// Number of digital inputs (push buttons).
pub const DIGITAL_INPUTS: usize = 4;

/// One of the two RGB LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Led {
    /// LD1, the left LED.
    Left,
    /// LD2, the right LED.
    Right,
}

impl Led {
    pub fn index(self) -> usize {
        match self {
            Led::Left => 0,
            Led::Right => 1,
        }
    }
}

/// LED colours selectable by `LD1`/`LD2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LedColour {
    Red,
    Green,
    Blue,
    Orange,
    Violet,
    Turquoise,
    White,
    #[default]
    Off,
}

impl LedColour {
    /// Decode the colour letter of an `LD1`/`LD2` operand.
    /// Unknown letters switch the LED off.
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'R' => LedColour::Red,
            b'G' => LedColour::Green,
            b'B' => LedColour::Blue,
            b'O' => LedColour::Orange,
            b'V' => LedColour::Violet,
            b'T' => LedColour::Turquoise,
            b'W' => LedColour::White,
            _ => LedColour::Off,
        }
    }

    /// Colour letter (`A` for off).
    pub fn letter(self) -> char {
        match self {
            LedColour::Red => 'R',
            LedColour::Green => 'G',
            LedColour::Blue => 'B',
            LedColour::Orange => 'O',
            LedColour::Violet => 'V',
            LedColour::Turquoise => 'T',
            LedColour::White => 'W',
            LedColour::Off => 'A',
        }
    }

    /// Active-low RGB pin pattern (bit 2 = red, bit 1 = green, bit 0 = blue).
    pub fn pin_code(self) -> u8 {
        match self {
            LedColour::Red => 0b011,
            LedColour::Green => 0b101,
            LedColour::Blue => 0b110,
            LedColour::Orange => 0b001,
            LedColour::Violet => 0b010,
            LedColour::Turquoise => 0b100,
            LedColour::White => 0b000,
            LedColour::Off => 0b111,
        }
    }
}

/// Position of the mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Editing,
    Running,
    /// The board has been switched off; every loop unwinds.
    Off,
}

/// LEDs, buzzer, inputs and timing.
pub trait Hardware {
    fn set_led(&mut self, led: Led, colour: LedColour);

    fn set_tone(&mut self, tone: Tone);

    /// Read an 8-bit analog channel. Channels past the last read 0.
    fn read_analog(&mut self, channel: u16) -> u8;

    /// Read a push button. Ports past the last read low.
    fn is_input_high(&mut self, port: u16) -> bool;

    /// Block for `tenths` tenths of a second, returning early if the mode
    /// switch leaves running mode.
    fn wait(&mut self, tenths: u16);

    /// Anchor the wait schedule. Called when running mode starts.
    fn start_timer(&mut self) {}
}

/// The external keyboard.
pub trait Keypad {
    /// The next pressed key, if any. Control keys arrive as the bytes
    /// listed in [`crate::editor::Key`].
    fn next_key(&mut self) -> Option<u8>;
}

/// The mode switch.
pub trait ModeSwitch {
    fn is_editing(&mut self) -> bool;

    fn is_powered(&mut self) -> bool {
        true
    }

    /// Called while the device idles between modes.
    fn idle(&mut self) {}

    fn mode(&mut self) -> Mode {
        if !self.is_powered() {
            Mode::Off
        } else if self.is_editing() {
            Mode::Editing
        } else {
            Mode::Running
        }
    }
}

/// Everything the device needs from its surroundings.
pub trait Board: Screen + Hardware + Keypad + ModeSwitch {}

impl<T: Screen + Hardware + Keypad + ModeSwitch + ?Sized> Board for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_colour_letters() {
        for b in *b"RGBOVTW" {
            assert_eq!(LedColour::from_byte(b).letter() as u8, b);
        }
        assert_eq!(LedColour::from_byte(b'A'), LedColour::Off);
        assert_eq!(LedColour::from_byte(0), LedColour::Off);
        assert_eq!(LedColour::from_byte(b'r'), LedColour::Off);
    }

    #[test]
    fn test_led_pin_codes_are_distinct() {
        let codes: std::collections::HashSet<u8> = b"RGBOVTWA"
            .iter()
            .map(|&b| LedColour::from_byte(b).pin_code())
            .collect();
        assert_eq!(codes.len(), 8);
    }
}
