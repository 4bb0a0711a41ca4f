//! Front panel state and the terminal-backed board.

use crate::config::DeviceConfig;
use crate::cpu::Memory;
use crate::device::{Device, ModeReport, RunOutcome};
use crate::hal::{
    Hardware, Keypad, Led, LedColour, ModeSwitch, Screen, TextDisplay, Tone, ANALOG_CHANNELS,
    DIGITAL_INPUTS,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Stdout;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Analog channel adjusted with PgUp/PgDn.
const KNOB_CHANNEL: usize = 8;

/// Knob step per key press.
const KNOB_STEP: u8 = 8;

/// Minimum time between redraws.
const FRAME: Duration = Duration::from_millis(33);

/// Everything the panel shows and the switches the user controls.
pub struct PanelState {
    pub display: TextDisplay,
    pub leds: [LedColour; 2],
    pub tone: Tone,
    pub analog: [u8; ANALOG_CHANNELS],
    pub inputs: [bool; DIGITAL_INPUTS],
    /// Mode switch position.
    pub editing: bool,
    pub powered: bool,
    /// Keys waiting for the editor.
    pub keys: VecDeque<u8>,
    /// Outcome of the last run or edit.
    pub status: String,
    /// The most recently executed instruction.
    pub trace: Rc<RefCell<Option<String>>>,
}

impl PanelState {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            display: TextDisplay::new(),
            leds: [LedColour::Off; 2],
            tone: Tone::Off,
            analog: config.analog,
            inputs: config.inputs,
            editing: true,
            powered: true,
            keys: VecDeque::new(),
            status: "F2: run/edit  Esc: save and power off".into(),
            trace: Rc::new(RefCell::new(None)),
        }
    }

    /// Apply a terminal key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Esc => self.powered = false,
            KeyCode::F(2) => self.editing = !self.editing,
            KeyCode::F(n @ 5..=8) => {
                let port = (n - 5) as usize;
                self.inputs[port] = !self.inputs[port];
            }
            KeyCode::PageUp => {
                self.analog[KNOB_CHANNEL] = self.analog[KNOB_CHANNEL].saturating_add(KNOB_STEP);
            }
            KeyCode::PageDown => {
                self.analog[KNOB_CHANNEL] = self.analog[KNOB_CHANNEL].saturating_sub(KNOB_STEP);
            }
            // Editor keys arrive only while the switch is on editing
            _ if !self.editing => {}
            KeyCode::Enter => self.keys.push_back(b']'),
            KeyCode::Up => self.keys.push_back(b'^'),
            KeyCode::Insert => self.keys.push_back(b'.'),
            KeyCode::Delete => self.keys.push_back(b','),
            KeyCode::Backspace => self.keys.push_back(b'<'),
            KeyCode::Char(c) if c.is_ascii() => self.keys.push_back(c.to_ascii_uppercase() as u8),
            _ => {}
        }
    }
}

/// A board drawn in the terminal.
///
/// Collaborator calls update [`PanelState`]; mode polls also read pending
/// terminal events and redraw at a bounded rate.
pub struct TerminalBoard {
    pub panel: PanelState,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    tick: Duration,
    poll: Duration,
    anchor: Instant,
    last_draw: Option<Instant>,
    error: Option<std::io::Error>,
}

impl TerminalBoard {
    pub fn new(terminal: Terminal<CrosstermBackend<Stdout>>, config: &DeviceConfig) -> Self {
        Self {
            panel: PanelState::new(config),
            terminal,
            tick: Duration::from_millis(config.tick_ms),
            poll: Duration::from_millis(config.poll_ms),
            anchor: Instant::now(),
            last_draw: None,
            error: None,
        }
    }

    /// The terminal error that powered the board off, if any.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    /// Read pending terminal events and redraw if a frame is due.
    fn pump(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.read_events() {
            self.error = Some(e);
            return;
        }
        if self.last_draw.map_or(true, |t| t.elapsed() >= FRAME) {
            self.redraw();
        }
    }

    fn read_events(&mut self) -> std::io::Result<()> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.panel.handle_key(key);
            }
        }
        Ok(())
    }

    fn redraw(&mut self) {
        let panel = &self.panel;
        if let Err(e) = self.terminal.draw(|frame| super::ui::draw(frame, panel)) {
            self.error = Some(e);
        }
        self.last_draw = Some(Instant::now());
    }

    fn sleep_polling(&mut self, until: Instant) {
        while Instant::now() < until && self.is_powered() {
            std::thread::sleep(self.poll.min(until.saturating_duration_since(Instant::now())));
        }
    }
}

impl Screen for TerminalBoard {
    fn write_char(&mut self, ch: u8, column: usize, row: usize) {
        self.panel.display.write_char(ch, column, row);
    }

    fn clear(&mut self) {
        self.panel.display.clear();
    }

    fn draw_pointer(&mut self, row: usize) {
        self.panel.display.draw_pointer(row);
    }

    fn hold(&mut self, millis: u64) {
        self.redraw();
        self.sleep_polling(Instant::now() + Duration::from_millis(millis));
    }
}

impl Hardware for TerminalBoard {
    fn set_led(&mut self, led: Led, colour: LedColour) {
        self.panel.leds[led.index()] = colour;
    }

    fn set_tone(&mut self, tone: Tone) {
        self.panel.tone = tone;
    }

    fn read_analog(&mut self, channel: u16) -> u8 {
        self.panel.analog.get(channel as usize).copied().unwrap_or(0)
    }

    fn is_input_high(&mut self, port: u16) -> bool {
        self.panel.inputs.get(port as usize).copied().unwrap_or(false)
    }

    fn wait(&mut self, tenths: u16) {
        // Waits are scheduled from the previous deadline, not from now
        self.anchor += self.tick * tenths as u32;
        while Instant::now() < self.anchor {
            if self.is_editing() || !self.is_powered() {
                return;
            }
            std::thread::sleep(self.poll.min(self.anchor.saturating_duration_since(Instant::now())));
        }
    }

    fn start_timer(&mut self) {
        self.anchor = Instant::now();
    }
}

impl Keypad for TerminalBoard {
    fn next_key(&mut self) -> Option<u8> {
        self.pump();
        self.panel.keys.pop_front()
    }
}

impl ModeSwitch for TerminalBoard {
    fn is_editing(&mut self) -> bool {
        self.pump();
        self.panel.editing
    }

    fn is_powered(&mut self) -> bool {
        self.pump();
        self.panel.powered && self.error.is_none()
    }

    fn idle(&mut self) {
        std::thread::sleep(self.poll);
    }
}

fn describe(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Terminated { steps } => format!("Program terminated after {} steps", steps),
        RunOutcome::Interrupted { steps } => format!("Stopped after {} steps", steps),
        RunOutcome::StepLimit { steps } => format!("Step limit reached after {} steps", steps),
        RunOutcome::Faulted { error } => format!("Error: {}", error),
    }
}

/// Run the interactive front panel on `store` until the user powers off.
///
/// Returns the edited program.
pub fn run_front_panel(store: Memory, config: &DeviceConfig) -> std::io::Result<Memory> {
    use crossterm::{
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use std::io::stdout;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let board = TerminalBoard::new(terminal, config);
    let trace = Rc::clone(&board.panel.trace);
    let mut device = Device::new(store, board);

    device.power_on_with(
        |step, regs| {
            *trace.borrow_mut() = Some(format!(
                "{:03} {:<8} R{:02}={}",
                step.position,
                step.instruction.to_string(),
                regs.pointer,
                regs.pointed()
            ));
        },
        |board: &mut TerminalBoard, report| {
            board.panel.status = match report {
                ModeReport::Rejected(e) => format!("Last edit rejected: {}", e),
                ModeReport::Ran(outcome) => describe(outcome),
            };
        },
    );

    let error = device.board.take_error();

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    match error {
        Some(e) => Err(e),
        None => Ok(device.store),
    }
}
