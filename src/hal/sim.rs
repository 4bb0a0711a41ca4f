//! Simulated board.
//!
//! [`SimBoard`] implements every collaborator trait in memory. It records
//! what the interpreter did (LED changes, tones, display writes,
//! notifications) and replays scripted inputs (keys, mode switch, analog
//! and digital levels). Waits advance a virtual clock.

use crate::hal::display::{Screen, TextDisplay};
use crate::hal::tone::Tone;
use crate::hal::{Hardware, Keypad, Led, LedColour, ModeSwitch, ANALOG_CHANNELS, DIGITAL_INPUTS};
use serde::{Serialize, Deserialize};
use std::collections::VecDeque;

/// How the simulated mode switch behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeScript {
    /// The switch stays where it is.
    Hold { editing: bool },
    /// Running for this many polls, then editing.
    RunFor(u64),
    /// Editing while keys are queued, running afterwards.
    EditWhileKeys,
}

/// A notification screen that was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Editing,
    Running,
    Terminated,
    Error(usize),
}

/// An in-memory board.
#[derive(Debug, Clone)]
pub struct SimBoard {
    pub screen: TextDisplay,
    pub leds: [LedColour; 2],
    pub tone: Tone,
    pub analog: [u8; ANALOG_CHANNELS],
    pub inputs: [bool; DIGITAL_INPUTS],
    pub keys: VecDeque<u8>,
    pub mode: ModeScript,
    /// Mode polls left before the board powers off.
    pub power_budget: Option<u64>,
    /// Every `write_string`/`write_char` as (bytes, column, row).
    pub writes: Vec<(Vec<u8>, usize, usize)>,
    pub notices: Vec<Notice>,
    pub tones: Vec<Tone>,
    /// Virtual time spent in waits, in tenths of a second.
    pub elapsed_tenths: u64,
    polls: u64,
}

impl SimBoard {
    /// A board with its switch held in running mode.
    pub fn running() -> Self {
        Self::with_mode(ModeScript::Hold { editing: false })
    }

    /// A board that runs for `polls` mode polls and then flips to editing.
    pub fn running_for(polls: u64) -> Self {
        Self::with_mode(ModeScript::RunFor(polls))
    }

    /// A board that types `keys` in editing mode, then flips to running.
    pub fn typing(keys: &[u8]) -> Self {
        let mut board = Self::with_mode(ModeScript::EditWhileKeys);
        board.queue_keys(keys);
        board
    }

    pub fn with_mode(mode: ModeScript) -> Self {
        Self {
            screen: TextDisplay::new(),
            leds: [LedColour::Off; 2],
            tone: Tone::Off,
            analog: [0; ANALOG_CHANNELS],
            inputs: [false; DIGITAL_INPUTS],
            keys: VecDeque::new(),
            mode,
            power_budget: None,
            writes: Vec::new(),
            notices: Vec::new(),
            tones: Vec::new(),
            elapsed_tenths: 0,
            polls: 0,
        }
    }

    pub fn queue_keys(&mut self, keys: &[u8]) {
        self.keys.extend(keys.iter().copied());
    }

    /// Number of mode polls so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// All bytes written to the display, concatenated.
    pub fn written_text(&self) -> String {
        self.writes
            .iter()
            .flat_map(|(bytes, _, _)| bytes.iter())
            .map(|&b| if b == 0 { ' ' } else { b as char })
            .collect()
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::running()
    }
}

impl Screen for SimBoard {
    fn write_string(&mut self, bytes: &[u8], column: usize, row: usize) {
        self.writes.push((bytes.to_vec(), column, row));
        self.screen.write_string(bytes, column, row);
    }

    fn write_char(&mut self, ch: u8, column: usize, row: usize) {
        self.writes.push((vec![ch], column, row));
        self.screen.write_char(ch, column, row);
    }

    fn clear(&mut self) {
        self.screen.clear();
    }

    fn draw_pointer(&mut self, row: usize) {
        self.screen.draw_pointer(row);
    }

    fn show_editing_message(&mut self) {
        self.notices.push(Notice::Editing);
        self.screen.show_editing_message();
    }

    fn show_running_message(&mut self) {
        self.notices.push(Notice::Running);
        self.screen.show_running_message();
    }

    fn show_terminated_message(&mut self) {
        self.notices.push(Notice::Terminated);
        self.screen.show_terminated_message();
    }

    fn show_error_message(&mut self, position: usize) {
        self.notices.push(Notice::Error(position));
        self.screen.show_error_message(position);
    }
}

impl Hardware for SimBoard {
    fn set_led(&mut self, led: Led, colour: LedColour) {
        self.leds[led.index()] = colour;
    }

    fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
        self.tones.push(tone);
    }

    fn read_analog(&mut self, channel: u16) -> u8 {
        self.analog.get(channel as usize).copied().unwrap_or(0)
    }

    fn is_input_high(&mut self, port: u16) -> bool {
        self.inputs.get(port as usize).copied().unwrap_or(false)
    }

    fn wait(&mut self, tenths: u16) {
        for _ in 0..tenths {
            if self.is_editing() || !self.is_powered() {
                return;
            }
            self.elapsed_tenths += 1;
        }
    }
}

impl Keypad for SimBoard {
    fn next_key(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }
}

impl ModeSwitch for SimBoard {
    fn is_editing(&mut self) -> bool {
        self.polls += 1;
        match self.mode {
            ModeScript::Hold { editing } => editing,
            ModeScript::RunFor(polls) => self.polls > polls,
            ModeScript::EditWhileKeys => !self.keys.is_empty(),
        }
    }

    fn is_powered(&mut self) -> bool {
        match self.power_budget.as_mut() {
            None => true,
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Mode, ModeSwitch};

    #[test]
    fn test_run_for_flips_to_editing() {
        let mut board = SimBoard::running_for(2);
        assert!(!board.is_editing());
        assert!(!board.is_editing());
        assert!(board.is_editing());
    }

    #[test]
    fn test_edit_while_keys() {
        let mut board = SimBoard::typing(b"A");
        assert_eq!(board.mode(), Mode::Editing);
        assert_eq!(board.next_key(), Some(b'A'));
        assert_eq!(board.mode(), Mode::Running);
    }

    #[test]
    fn test_power_budget() {
        let mut board = SimBoard::running();
        board.power_budget = Some(1);
        assert_eq!(board.mode(), Mode::Running);
        assert_eq!(board.mode(), Mode::Off);
    }

    #[test]
    fn test_wait_advances_clock() {
        let mut board = SimBoard::running();
        board.wait(15);
        assert_eq!(board.elapsed_tenths, 15);
    }

    #[test]
    fn test_wait_interrupted_by_mode_switch() {
        let mut board = SimBoard::running_for(3);
        board.wait(10);
        assert_eq!(board.elapsed_tenths, 3);
    }

    #[test]
    fn test_inputs_out_of_range() {
        let mut board = SimBoard::running();
        board.inputs[3] = true;
        board.analog[8] = 200;
        assert!(board.is_input_high(3));
        assert!(!board.is_input_high(4));
        assert_eq!(board.read_analog(8), 200);
        assert_eq!(board.read_analog(9), 0);
    }

    #[test]
    fn test_records_writes_and_notices() {
        let mut board = SimBoard::running();
        board.write_string(b"005", 0, 0);
        board.show_terminated_message();
        assert!(board.written_text().starts_with("005"));
        assert_eq!(board.notices, vec![Notice::Terminated]);
    }
}
