//! Buzzer notes.
//!
//! `TON` operands name a note as `N[#]O`: a note letter (German naming, `H`
//! for B), an optional `#` for the semitone above and an octave digit 1-7.
//! `TON 0` silences the buzzer.

use serde::{Serialize, Deserialize};

/// Note frequencies at octave 7 in centi-hertz: (letter, natural, sharp).
const NOTES: [(u8, u32, u32); 7] = [
    (b'C', 20930, 22175),
    (b'D', 23493, 24890),
    (b'E', 26370, 27938),
    (b'F', 27938, 29600),
    (b'G', 31360, 33224),
    (b'A', 35200, 37293),
    (b'H', 39511, 41860),
];

/// The highest octave.
pub const TOP_OCTAVE: u8 = 7;

/// A buzzer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Off,
    Note {
        letter: u8,
        sharp: bool,
        octave: u8,
        /// Frequency in hundredths of a hertz.
        centi_hz: u32,
    },
}

impl Tone {
    /// Parse the operand bytes of a `TON` instruction.
    ///
    /// Returns `None` for an unknown note letter or an octave outside 1-7.
    /// A missing octave digit selects octave 0.
    pub fn parse(operands: [u8; 3]) -> Option<Tone> {
        let [letter, d2, d3] = operands;
        if letter == 0 || letter == b'0' {
            return Some(Tone::Off);
        }

        let &(_, natural, raised) = NOTES.iter().find(|(l, _, _)| *l == letter)?;
        let sharp = d2 == b'#';
        let octave_byte = if sharp { d3 } else { d2 };
        let octave = match octave_byte {
            0 | b' ' => 0,
            b'1'..=b'7' => octave_byte - b'0',
            _ => return None,
        };

        let base = if sharp { raised } else { natural };
        Some(Tone::Note {
            letter,
            sharp,
            octave,
            centi_hz: base >> (TOP_OCTAVE - octave),
        })
    }

    /// Frequency in hertz, `None` when silent.
    pub fn frequency_hz(&self) -> Option<f64> {
        match self {
            Tone::Off => None,
            Tone::Note { centi_hz, .. } => Some(*centi_hz as f64 / 100.0),
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, Tone::Off)
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::Off => write!(f, "off"),
            Tone::Note { letter, sharp, octave, centi_hz } => write!(
                f,
                "{}{}{} ({}.{:02} Hz)",
                *letter as char,
                if *sharp { "#" } else { "" },
                octave,
                centi_hz / 100,
                centi_hz % 100
            ),
        }
    }
}
