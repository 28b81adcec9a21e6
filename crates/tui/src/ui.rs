use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use tapbot_core::runner::RunnerState;

use crate::app::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    // -- Left panel: scenario list --

    let (banner_label, banner_bg) = {
        let rs = app.runner_state.lock().unwrap();
        match *rs {
            RunnerState::Running => ("RUNNING (Press S to stop)", Color::Green),
            RunnerState::Stopping => ("STOPPING...", Color::Yellow),
            RunnerState::Stopped => ("STOPPED (Press S to start)", Color::Red),
        }
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(vec![
        Span::styled(" j", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("k", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("space", Style::default().fg(Color::Yellow)),
        Span::raw(" to select, "),
        Span::styled("s", Style::default().fg(Color::Yellow)),
        Span::raw(" to start/stop, "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" to quit:"),
    ]));
    lines.push(Line::from(""));

    {
        let rows = app.state.lock().unwrap();

        for (i, row) in rows.iter().enumerate() {
            let prefix = if i == app.selected { "> " } else { "  " };
            let checkbox = if row.scenario.enabled { "[●]" } else { "[ ]" };

            let mut spans = vec![
                Span::raw(prefix),
                Span::styled(checkbox, Style::default().fg(banner_bg)),
                Span::raw(" "),
                Span::styled(
                    row.scenario.name.clone(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  p{}", row.scenario.priority),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if row.active {
                spans.push(Span::styled(
                    "  ACTIVE",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
            }
            lines.push(Line::from(spans));

            // Status line: stage count and the last emitted event
            let mut detail = format!("    {} stage(s)", row.scenario.stages.len());
            if let Some(ev) = &row.last_event {
                detail.push_str(&format!("  last: {}", ev));
            }
            lines.push(Line::from(Span::styled(
                detail,
                Style::default().fg(Color::Cyan),
            )));
        }
    } // rows lock dropped here

    // Split left panel into banner (1 line) + scenario list
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    let banner_width = left_chunks[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let centered = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_right));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let scenario_list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(scenario_list, left_chunks[1]);

    // -- Right panel: logs --
    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end]
            .iter()
            .map(|m| parse_log_line(m))
            .collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Events ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line for TUI rendering.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let level = parts[0];
    let prefix = parts[1];
    let color_idx: u8 = parts[2].parse().unwrap_or(0);
    let timestamp = parts[3];
    let message = parts[4];

    let prefix_color = match color_idx {
        1 => Color::DarkGray,  // COLOR_GRAY
        2 => Color::LightBlue, // COLOR_BLUE
        _ => Color::White,
    };

    let mut spans = Vec::new();
    spans.push(Span::styled(timestamp, Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw(" "));

    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(
            prefix,
            Style::default().fg(prefix_color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(prefix_color)));

    Line::from(spans)
}
