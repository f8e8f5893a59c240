use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};
use salesbot_core::{Message, Sender};
use unicode_width::UnicodeWidthChar;

use crate::app::App;

const USER_COLOR: Color = Color::Cyan;
const BOT_COLOR: Color = Color::Yellow;
const INPUT_PLACEHOLDER: &str = "Type your message...";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let [title_area, status_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(10)]).areas(area);

    let title = Paragraph::new(Line::from(Span::styled(
        format!(" {} ", app.title),
        Style::default().fg(Color::White).bold(),
    )))
    .style(Style::default().bg(Color::Blue));

    let status = Paragraph::new(Line::from(vec![
        Span::styled("● ", Style::default().fg(Color::Green)),
        Span::styled("Online ", Style::default().fg(Color::White)),
    ]))
    .alignment(Alignment::Right)
    .style(Style::default().bg(Color::Blue));

    frame.render_widget(title, title_area);
    frame.render_widget(status, status_area);
}

/// The transcript lines, or `None` when the empty state should show.
pub fn transcript_lines(app: &App) -> Option<Vec<Line<'static>>> {
    let transcript = app.session.transcript();
    if transcript.is_empty() && !app.is_loading() {
        return None;
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for message in transcript {
        push_message(&mut lines, message, &app.title);
    }

    if app.is_loading() {
        lines.push(sender_label(Sender::Bot, &app.title));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(usize::from(app.animation_frame) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Some(lines)
}

fn sender_label(sender: Sender, bot_name: &str) -> Line<'static> {
    match sender {
        Sender::User => Line::from(Span::styled(
            "You",
            Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Right),
        Sender::Bot => Line::from(Span::styled(
            bot_name.to_string(),
            Style::default().fg(BOT_COLOR).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Left),
    }
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &Message, bot_name: &str) {
    lines.push(sender_label(message.sender, bot_name));

    let (alignment, style) = match message.sender {
        Sender::User => (Alignment::Right, Style::default().fg(USER_COLOR)),
        Sender::Bot => (Alignment::Left, Style::default()),
    };
    for text_line in message.text.lines() {
        lines.push(Line::styled(text_line.to_string(), style).alignment(alignment));
    }
    lines.push(Line::default());
}

/// Rows the text occupies once word-wrapped to `width` columns, counted by
/// the same wrapper that renders the transcript.
pub fn wrapped_height(text: &Text, width: u16) -> u16 {
    let rows = Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(width.max(1));
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// The slice of `draft` shown in an input box `width` columns wide, and the
/// cursor's column within it. Widths are display columns, so wide characters
/// take two.
pub fn visible_input(draft: &str, cursor: usize, width: u16) -> (String, u16) {
    let width = usize::from(width);
    let chars: Vec<char> = draft.chars().collect();
    let cursor = cursor.min(chars.len());
    let char_width = |c: &char| UnicodeWidthChar::width(*c).unwrap_or(0);

    // Drop leading characters until the cursor column fits inside the box
    let mut start = 0;
    let mut cursor_x: usize = chars[..cursor].iter().map(char_width).sum();
    while start < cursor && cursor_x >= width {
        cursor_x -= char_width(&chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible: String = chars[start..]
        .iter()
        .take_while(|c| {
            used += char_width(*c);
            used <= width
        })
        .collect();

    (visible, u16::try_from(cursor_x).unwrap_or(0))
}

fn empty_state(height: u16) -> Text<'static> {
    let padding = usize::from(height.saturating_sub(2) / 2);
    let mut lines = vec![Line::default(); padding];
    lines.push(Line::from(Span::styled(
        "Start a conversation with our sales bot!",
        Style::default().fg(Color::Gray).bold(),
    )));
    lines.push(Line::from(Span::styled(
        "Ask about products, pricing, or anything else.",
        Style::default().fg(Color::DarkGray),
    )));
    Text::from(lines).alignment(Alignment::Center)
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.sync_revision();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let Some(lines) = transcript_lines(app) else {
        app.scroll = 0;
        let placeholder = Paragraph::new(empty_state(inner_height)).block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let text = Text::from(lines);
    let total_lines = wrapped_height(&text, inner_width);
    let max_scroll = total_lines.saturating_sub(inner_height);
    app.settle_scroll(max_scroll);

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(chat, area);

    if max_scroll > 0 {
        let mut scrollbar_state =
            ScrollbarState::new(usize::from(max_scroll)).position(usize::from(app.scroll));
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.is_loading();
    let (title, border_color) = if loading {
        (" Waiting for reply... ", Color::DarkGray)
    } else {
        (" Message (Enter to send) ", Color::Yellow)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let draft = app.session.draft();
    if draft.is_empty() {
        let placeholder = Paragraph::new(INPUT_PLACEHOLDER)
            .style(Style::default().fg(Color::DarkGray))
            .block(input_block);
        frame.render_widget(placeholder, area);
        if !loading {
            frame.set_cursor_position((area.x + 1, area.y + 1));
        }
        return;
    }

    // Horizontal scrolling keeps the cursor inside the box
    let (visible_text, cursor_x) = visible_input(draft, app.cursor, area.width.saturating_sub(2));
    let text_color = if loading { Color::DarkGray } else { USER_COLOR };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);
    frame.render_widget(input, area);

    if !loading {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.is_loading() {
        vec![
            Span::styled(" waiting ", Style::default().bg(Color::Yellow).fg(Color::Black)),
            Span::raw(" "),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
        ]
    };
    hints.extend([
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
