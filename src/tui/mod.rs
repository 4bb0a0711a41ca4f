//! Terminal front panel.
//!
//! Emulates the physical device in a terminal:
//! - The 16x2 character display with the editor pointer
//! - Both LEDs and the buzzer
//! - Push buttons, the analog knob and the mode switch
//! - The last executed instruction

mod app;
mod ui;

pub use app::{PanelState, TerminalBoard, run_front_panel};
