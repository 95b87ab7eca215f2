use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use nova_core::display::{Bubble, MemoryView};
use nova_core::{ChatRole, Markup, SegmentStyle, UploadStatus};
use crate::app::{App, InputMode, Popup};

/// Drawn after the body of a reply that is still streaming.
pub const TYPING_CURSOR: &str = "▌";

fn segment_style(style: SegmentStyle) -> Style {
    match style {
        SegmentStyle::Plain => Style::default(),
        SegmentStyle::Bold => Style::default().add_modifier(Modifier::BOLD),
        SegmentStyle::Code => Style::default().fg(Color::Yellow).bg(Color::DarkGray),
    }
}

pub fn markup_to_lines(markup: &Markup) -> Vec<Line<'static>> {
    markup
        .lines
        .iter()
        .map(|segments| {
            Line::from(
                segments
                    .iter()
                    .map(|s| Span::styled(s.text.clone(), segment_style(s.style)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

/// Role label, body (or error), and a blank separator line.
pub fn bubble_lines(bubble: &Bubble, cursor_visible: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    lines.push(match bubble.role {
        ChatRole::User => Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        ChatRole::Assistant => Line::from(Span::styled(
            "Nova:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    });

    if let Some(error) = &bubble.error {
        for line in error.split('\n') {
            lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Red))));
        }
    } else {
        let mut body = markup_to_lines(&bubble.body);
        if bubble.typing {
            let cursor = if cursor_visible { TYPING_CURSOR } else { " " };
            let span = Span::styled(cursor, Style::default().fg(Color::Yellow));
            match body.last_mut() {
                Some(last) => last.spans.push(span),
                None => body.push(Line::from(span)),
            }
        }
        lines.extend(body);
    }

    lines.push(Line::default());
    lines
}

/// Rows a set of lines occupies once wrapped to `width` columns.
pub fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(app.input_height()),
        Constraint::Length(1),
    ])
    .areas(area);

    let [chat_area, side_area] = Layout::horizontal([
        Constraint::Percentage(68),
        Constraint::Percentage(32),
    ])
    .areas(body_area);

    let [memory_area, upload_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(side_area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_memory(app, frame, memory_area);
    render_upload(app, frame, upload_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    match app.popup {
        Popup::None => {}
        Popup::ConfirmClear => render_confirm_clear(frame, area),
        Popup::Upload => render_prompt(
            app,
            frame,
            area,
            " Upload a file ",
            "Type or drop a file path. Enter uploads, Esc cancels.",
        ),
        Popup::ProfileName => render_prompt(
            app,
            frame,
            area,
            " Profile name ",
            "Enter saves, Esc cancels.",
        ),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Nova ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::Gray)),
    ];
    if app.controller.session().ephemeral {
        spans.push(Span::styled(" [unsaved session]", Style::default().fg(Color::Yellow)));
    }
    if !app.logging_enabled {
        spans.push(Span::styled(" [logging off]", Style::default().fg(Color::Yellow)));
    }
    if let Some(status) = &app.status_line {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");
    let inner = block.inner(area);

    let text = if app.display.transcript.is_empty() {
        Text::from(Span::styled(
            "Say hello to Nova (press i to type)...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let cursor_visible = app.cursor_visible();
        Text::from(
            app.display
                .transcript
                .iter()
                .flat_map(|bubble| bubble_lines(bubble, cursor_visible))
                .collect::<Vec<_>>(),
        )
    };

    let total = wrapped_height(&text.lines, inner.width);
    app.chat_height = inner.height;
    app.chat_max_scroll = total.saturating_sub(inner.height);
    if app.follow_tail {
        app.chat_scroll = app.chat_max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(app.chat_max_scroll);
    }

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn memory_lines(memory: Option<&MemoryView>) -> Vec<Line<'static>> {
    let Some(memory) = memory else {
        return vec![Line::from(Span::styled("Loading...", Style::default().fg(Color::DarkGray)))];
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Name: ", Style::default().fg(Color::Gray)),
            Span::styled(memory.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::default(),
    ];
    match memory.placeholder_facts() {
        Some(placeholder) => lines.push(Line::from(Span::styled(
            placeholder,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))),
        None => {
            for fact in &memory.facts {
                lines.push(Line::from(vec![
                    Span::styled(format!("• {}: ", fact.key), Style::default().fg(Color::Magenta)),
                    Span::raw(fact.value.clone()),
                ]));
            }
        }
    }
    lines
}

fn render_memory(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Memory ");

    let memory = Paragraph::new(memory_lines(app.display.memory.as_ref()))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(memory, area);
}

fn render_upload(app: &App, frame: &mut Frame, area: Rect) {
    let border = if app.display.drop_highlight {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(" Upload ");

    let status = match &app.display.upload {
        UploadStatus::Idle if app.display.drop_highlight => {
            Span::styled("Drop the file to upload it", Style::default().fg(Color::Green))
        }
        UploadStatus::Idle => {
            Span::styled("Paste a file path or press u", Style::default().fg(Color::DarkGray))
        }
        UploadStatus::InProgress => Span::styled("Uploading...", Style::default().fg(Color::Yellow)),
        UploadStatus::Succeeded(message) => {
            Span::styled(message.clone(), Style::default().fg(Color::Green))
        }
        UploadStatus::Failed(message) => Span::styled(message.clone(), Style::default().fg(Color::Red)),
    };

    let upload = Paragraph::new(Line::from(status))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(upload, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.popup == Popup::None;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_sending() { " Message (waiting for reply) " } else { " Message " };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    let inner = block.inner(area);

    // Keep the cursor row and column in view
    let (row, col) = app.input.cursor_row_col();
    let inner_width = inner.width as usize;
    let inner_height = inner.height.max(1) as usize;
    let row_offset = (row + 1).saturating_sub(inner_height);
    let col_offset = if inner_width == 0 {
        0
    } else if col >= inner_width {
        col - inner_width + 1
    } else {
        0
    };

    let visible: Vec<Line> = app
        .input
        .text
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((
            inner.x + (col - col_offset) as u16,
            inner.y + (row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match (app.popup, app.input_mode) {
        (Popup::None, InputMode::Normal) => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        (Popup::None, InputMode::Editing) => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        _ => (" PROMPT ", Style::default().bg(Color::Magenta).fg(Color::White)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match (app.popup, app.input_mode) {
        (Popup::ConfirmClear, _) => &[(" y ", " clear "), (" n ", " keep ")],
        (Popup::Upload, _) | (Popup::ProfileName, _) => &[(" Enter ", " submit "), (" Esc ", " cancel ")],
        (Popup::None, InputMode::Editing) => &[
            (" Enter ", " send "),
            (" Alt+Enter ", " newline "),
            (" Esc ", " done "),
        ],
        (Popup::None, InputMode::Normal) => &[
            (" i ", " type "),
            (" u ", " upload "),
            (" n ", " name "),
            (" r ", " memory "),
            (" C ", " clear "),
            (" j/k ", " scroll "),
            (" q ", " quit "),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(keys.iter().flat_map(|(key, label)| {
            [Span::styled(*key, key_style), Span::styled(*label, label_style)]
        }))
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_confirm_clear(frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 50, 5);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Clear history ");

    let text = vec![
        Line::from("Delete this conversation's history?"),
        Line::from(Span::styled("y to confirm, n to keep it", Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(text).block(block), popup_area);
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect, title: &str, help: &str) {
    let popup_area = centered(area, 60, 6);
    frame.render_widget(Clear, popup_area);

    let border = if app.popup == Popup::Upload && app.display.drop_highlight {
        Color::Green
    } else {
        Color::Yellow
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title.to_string());

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new(help.to_string())
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Input field with horizontal scrolling
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let cursor = app.prompt.cursor;
    let offset = if width > 0 && cursor >= width { cursor - width + 1 } else { 0 };
    let visible: String = app.prompt.text.chars().skip(offset).take(width).collect();

    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);
    frame.set_cursor_position((input_area.x + (cursor - offset) as u16, input_area.y));
}
