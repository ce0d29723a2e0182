//! Rendering functions for the TUI layout.
//!
//! The layout consists of vertically stacked areas:
//!
//! 1. **Header** (1 line) -- title, endpoint, and request activity.
//! 2. **Request** (5 lines) -- bordered, wrapping text input.
//! 3. **Automation** (3 lines) -- slider gauge with the live percentage.
//! 4. **Workflow** (fills remaining space) -- pretty-printed workflow.
//! 5. **Run status** (3 lines, only once a run has reported back).
//! 6. **Footer** (1 line) -- key hints.
//!
//! A pending notice is drawn as a centred popup over everything else.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};

use crate::app::{Focus, TuiApp};

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame, app: &TuiApp) {
    let session = app.session();

    let mut constraints = vec![
        Constraint::Length(1), // header
        Constraint::Length(5), // request
        Constraint::Length(3), // automation
        Constraint::Min(3),    // workflow
    ];
    // An empty status reads as no status.
    let run_status = session.run_status().filter(|status| !status.is_empty());
    if run_status.is_some() {
        constraints.push(Constraint::Length(3)); // run status
    }
    constraints.push(Constraint::Length(1)); // footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_request(frame, app, chunks[1]);
    draw_automation(frame, app, chunks[2]);
    draw_workflow(frame, app, chunks[3]);
    if let Some(status) = run_status {
        draw_run_status(frame, status, chunks[4]);
    }
    draw_footer(frame, app, chunks[chunks.len() - 1]);

    if let Some(notice) = session.notice() {
        draw_notice(frame, notice.message());
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Draw the header bar showing the title, endpoint, and activity.
fn draw_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let activity = if app.session().is_busy() {
        Span::styled(" Waiting for service... ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" Ready ", Style::default().fg(Color::Green))
    };

    let header = Line::from(vec![
        Span::styled(
            " AI Orchestrator ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("| Service: "),
        Span::styled(app.endpoint(), Style::default().fg(Color::White)),
        Span::raw(" |"),
        activity,
    ]);

    let header_widget = Paragraph::new(header).style(Style::default().bg(Color::DarkGray));

    frame.render_widget(header_widget, area);
}

// ---------------------------------------------------------------------------
// Request input
// ---------------------------------------------------------------------------

/// Draw the request input and place the cursor when it has focus.
fn draw_request(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let focused = app.focus() == Focus::Request;
    let request = app.session().request();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Request ")
        .border_style(focus_style(focused));

    let inner_width = area.width.saturating_sub(2).max(1);
    let inner_height = area.height.saturating_sub(2).max(1);
    let layout = layout_request(request, app.cursor_pos(), inner_width);
    let scroll = layout.cursor.1.saturating_sub(inner_height - 1);

    let widget = if request.is_empty() {
        Paragraph::new(Span::styled(
            "Describe your analysis workflow...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))
    } else {
        let lines: Vec<Line> = layout.lines.into_iter().map(Line::from).collect();
        Paragraph::new(lines)
            .style(Style::default().fg(Color::White))
            .scroll((scroll, 0))
    };

    frame.render_widget(widget.block(block), area);

    if focused && app.session().notice().is_none() {
        // +1 for the border offset on each axis.
        let (col, row) = layout.cursor;
        frame.set_cursor_position(Position::new(
            area.x + 1 + col,
            area.y + 1 + row - scroll,
        ));
    }
}

/// Request text broken into rows of at most `width` cells, with the caret
/// position as `(column, row)` in cells.
#[derive(Debug, PartialEq)]
struct RequestLayout {
    lines: Vec<String>,
    cursor: (u16, u16),
}

/// Break the request at character boundaries by display width, so the caret
/// lands on the cell it is drawn in even for double-width characters.
fn layout_request(text: &str, cursor_pos: usize, width: u16) -> RequestLayout {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0;
    let mut cursor = None;

    for (i, ch) in text.chars().enumerate() {
        if ch == '\n' {
            if i == cursor_pos {
                cursor = Some((line_width, lines.len()));
            }
            lines.push(std::mem::take(&mut line));
            line_width = 0;
            continue;
        }

        let mut buf = [0u8; 4];
        let ch_width = Span::raw(&*ch.encode_utf8(&mut buf)).width();
        if line_width + ch_width > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line_width = 0;
        }
        if i == cursor_pos {
            cursor = Some((line_width, lines.len()));
        }
        line.push(ch);
        line_width += ch_width;
    }

    let cursor = cursor.unwrap_or(if line_width >= width {
        (0, lines.len() + 1)
    } else {
        (line_width, lines.len())
    });
    lines.push(line);

    let (col, row) = cursor;
    RequestLayout {
        lines,
        cursor: (col as u16, u16::try_from(row).unwrap_or(u16::MAX)),
    }
}

// ---------------------------------------------------------------------------
// Automation slider
// ---------------------------------------------------------------------------

/// Draw the automation level as a gauge labelled with its value.
fn draw_automation(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let focused = app.focus() == Focus::Automation;
    let level = app.session().automation();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Automation Level ")
        .border_style(focus_style(focused));

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .percent(u16::from(level.value()))
        .label(level.to_string());

    frame.render_widget(gauge, area);
}

// ---------------------------------------------------------------------------
// Workflow preview
// ---------------------------------------------------------------------------

/// Draw the generated workflow, or a hint when there is none yet.
fn draw_workflow(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Generated Workflow ")
        .border_style(Style::default().fg(Color::DarkGray));

    let widget = match app.session().workflow_preview() {
        Some(preview) => Paragraph::new(preview)
            .style(Style::default().fg(Color::Green))
            .scroll((app.preview_scroll(), 0)),
        None => Paragraph::new(Span::styled(
            "No workflow generated yet.",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
        )),
    };

    frame.render_widget(widget.block(block), area);
}

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

fn draw_run_status(frame: &mut Frame, status: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Run Status ")
        .border_style(Style::default().fg(Color::DarkGray));

    let widget = Paragraph::new(status)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(widget, area);
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// Draw key hints.  Execute is only offered once a workflow exists.
fn draw_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let key = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut spans = vec![Span::styled(" Enter", key), Span::raw(" generate ")];
    if app.session().can_execute() {
        spans.push(Span::raw("| "));
        spans.push(Span::styled("Ctrl+E", key));
        spans.push(Span::raw(" execute "));
    }
    spans.extend([
        Span::raw("| "),
        Span::styled("Tab", key),
        Span::raw(" request/slider "),
        Span::raw("| "),
        Span::styled("Esc", key),
        Span::raw(" quit "),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ---------------------------------------------------------------------------
// Notice popup
// ---------------------------------------------------------------------------

/// Draw a centred popup with the notice text.
fn draw_notice(frame: &mut Frame, message: &str) {
    let area = centered(frame.area(), 60, 5);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Notice ")
        .border_style(Style::default().fg(Color::Yellow));

    let text = vec![
        Line::from(Span::styled(
            message.to_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

/// A rectangle of at most `width` x `height` centred in `outer`.
fn centered(outer: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(outer.width);
    let height = height.min(outer.height);
    Rect {
        x: outer.x + (outer.width - width) / 2,
        y: outer.y + (outer.height - height) / 2,
        width,
        height,
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
