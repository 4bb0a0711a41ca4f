//! UI rendering for the front panel.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
    style::{Color, Style, Modifier},
};
use crate::hal::{LedColour, ROWS};
use super::app::PanelState;

/// Main draw function.
pub fn draw(frame: &mut Frame, panel: &PanelState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(ROWS as u16 + 2),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(frame.area());

    draw_display(frame, chunks[0], panel);
    draw_outputs(frame, chunks[1], panel);
    draw_inputs(frame, chunks[2], panel);
    draw_status(frame, chunks[3], panel);
    draw_help(frame, chunks[4]);
}

/// Draw the character display with the editor pointer.
fn draw_display(frame: &mut Frame, area: Rect, panel: &PanelState) {
    let lines: Vec<Line> = (0..ROWS)
        .map(|row| {
            let marker = if panel.display.pointer() == Some(row) { "◀" } else { " " };
            Line::from(vec![
                Span::styled(
                    panel.display.line(row),
                    Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
                ),
                Span::styled(marker, Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default()
            .title(" Display ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(paragraph, area);
}

/// Draw both LEDs, the buzzer and the mode switch.
fn draw_outputs(frame: &mut Frame, area: Rect, panel: &PanelState) {
    let mode = if panel.editing { "EDIT" } else { "RUN" };
    let content = Line::from(vec![
        Span::raw("LD1 "),
        Span::styled("●", Style::default().fg(led_color(panel.leds[0]))),
        Span::raw("  LD2 "),
        Span::styled("●", Style::default().fg(led_color(panel.leds[1]))),
        Span::raw("   Buzzer: "),
        Span::styled(panel.tone.to_string(), Style::default().fg(Color::White)),
        Span::raw("   Mode: "),
        Span::styled(mode, Style::default().fg(if panel.editing { Color::Yellow } else { Color::Green })),
    ]);

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Outputs ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw push buttons and analog levels.
fn draw_inputs(frame: &mut Frame, area: Rect, panel: &PanelState) {
    let mut buttons = vec![Span::raw("Buttons: ")];
    for (port, &pressed) in panel.inputs.iter().enumerate() {
        let style = if pressed {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        buttons.push(Span::styled(format!("[{}] ", port), style));
    }

    let levels: Vec<String> = panel.analog.iter().map(|v| format!("{:3}", v)).collect();
    let content = vec![
        Line::from(buttons),
        Line::from(format!("Analog:  {}", levels.join(" "))),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Inputs ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(paragraph, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, panel: &PanelState) {
    let trace = panel.trace.borrow();
    let text = match trace.as_deref() {
        Some(step) => format!("{}  |  {}", panel.status, step),
        None => panel.status.clone(),
    };
    let status = Paragraph::new(text)
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("F2: Edit/Run  F5-F8: Buttons  PgUp/PgDn: Knob  Esc: Save & off"),
        Line::from("Enter: ]  Up: ^  Ins: .  Del: ,  Backspace: <"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Terminal colour for an LED.
fn led_color(colour: LedColour) -> Color {
    match colour {
        LedColour::Red => Color::Red,
        LedColour::Green => Color::Green,
        LedColour::Blue => Color::Blue,
        LedColour::Orange => Color::Rgb(255, 140, 0),
        LedColour::Violet => Color::Magenta,
        LedColour::Turquoise => Color::Cyan,
        LedColour::White => Color::White,
        LedColour::Off => Color::DarkGray,
    }
}
