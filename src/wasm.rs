//! WebAssembly bindings.
//!
//! Exposes a headless device on a simulated board: load a listing or an
//! image, run it for a bounded number of steps or feed editor keys, and
//! read back the display, LEDs and registers.

use wasm_bindgen::prelude::*;
use crate::asm::{assemble, image_from_bytes, image_to_bytes};
use crate::asm::disasm::disassemble;
use crate::cpu::{Memory, Registers};
use crate::device::{Device, RunOutcome};
use crate::hal::{ModeScript, SimBoard, ROWS};
use serde::Serialize;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly device wrapper.
#[wasm_bindgen]
pub struct WasmDevice {
    device: Device<Memory, SimBoard>,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    registers: &'a Registers,
    steps: u64,
    display: [String; ROWS],
    leds: String,
    tone: String,
}

#[wasm_bindgen]
impl WasmDevice {
    /// Create a device with an erased program.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            device: Device::new(Memory::new(), SimBoard::running()),
        }
    }

    /// Replace the program with an assembled listing.
    #[wasm_bindgen]
    pub fn load_listing(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.device.store = Memory::from_program(&program)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(program.len())
    }

    /// Replace the program with a binary image.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        self.device.store = image_from_bytes(bytes)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(self.device.store.program().len())
    }

    /// The program as a binary image.
    #[wasm_bindgen]
    pub fn image(&self) -> Result<Vec<u8>, JsError> {
        image_to_bytes(&self.device.store)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// The program as preview-style text.
    #[wasm_bindgen]
    pub fn listing(&self) -> String {
        disassemble(self.device.store.program())
    }

    /// Run from position 0 for at most `max_steps` instructions.
    /// Returns a description of how the run ended.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> String {
        self.device.board.mode = ModeScript::Hold { editing: false };
        self.device.set_step_limit(Some(max_steps as u64));
        match self.device.enter_running_mode() {
            RunOutcome::Terminated { steps } => format!("terminated after {} steps", steps),
            RunOutcome::Interrupted { steps } => format!("interrupted after {} steps", steps),
            RunOutcome::StepLimit { steps } => format!("stopped at step limit ({})", steps),
            RunOutcome::Faulted { error } => format!("error: {}", error),
        }
    }

    /// Start editing at the end of the program.
    #[wasm_bindgen]
    pub fn begin_editing(&mut self) {
        let device = &mut self.device;
        device.editor.begin(&device.store, &mut device.board);
    }

    /// Feed one key to the editor.
    #[wasm_bindgen]
    pub fn press_key(&mut self, key: u8) -> Result<(), JsError> {
        let device = &mut self.device;
        device
            .editor
            .handle_key(key, &mut device.store, &mut device.board)
            .map(|_| ())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// Both display rows.
    #[wasm_bindgen]
    pub fn display_lines(&self) -> js_sys::Array {
        self.device
            .board
            .screen
            .lines()
            .iter()
            .map(|line| JsValue::from_str(line))
            .collect()
    }

    /// LED colour letters, left then right.
    #[wasm_bindgen]
    pub fn leds(&self) -> String {
        self.device.board.leds.iter().map(|c| c.letter()).collect()
    }

    /// Current buzzer setting.
    #[wasm_bindgen]
    pub fn tone(&self) -> String {
        self.device.board.tone.to_string()
    }

    /// Set an analog channel level.
    #[wasm_bindgen]
    pub fn set_analog(&mut self, channel: usize, level: u8) {
        if let Some(slot) = self.device.board.analog.get_mut(channel) {
            *slot = level;
        }
    }

    /// Press or release a push button.
    #[wasm_bindgen]
    pub fn set_input(&mut self, port: usize, pressed: bool) {
        if let Some(slot) = self.device.board.inputs.get_mut(port) {
            *slot = pressed;
        }
    }

    /// Register values.
    #[wasm_bindgen]
    pub fn registers(&self) -> Vec<u16> {
        self.device.cpu.regs.values().to_vec()
    }

    /// Machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        let board = &self.device.board;
        let snapshot = Snapshot {
            registers: &self.device.cpu.regs,
            steps: self.device.cpu.steps,
            display: board.screen.lines(),
            leds: board.leds.iter().map(|c| c.letter()).collect(),
            tone: board.tone.to_string(),
        };
        serde_json::to_string(&snapshot)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a listing and return the instruction count.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let program = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(program.len())
}

/// Disassemble a binary image.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> Result<String, JsError> {
    let mem = image_from_bytes(bytes)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(disassemble(mem.program()))
}
