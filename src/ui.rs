use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::chat::Role;

/// Colors for the light and dark themes.
struct Palette {
    background: Color,
    text: Color,
    muted: Color,
    user: Color,
    bot: Color,
    border: Color,
}

impl Palette {
    fn for_mode(dark: bool) -> Self {
        if dark {
            Self {
                background: Color::Rgb(0x33, 0x33, 0x33),
                text: Color::Rgb(0xff, 0xff, 0xff),
                muted: Color::Gray,
                user: Color::Cyan,
                bot: Color::Yellow,
                border: Color::Gray,
            }
        } else {
            Self {
                background: Color::Rgb(0xff, 0xff, 0xff),
                text: Color::Rgb(0x29, 0x29, 0x29),
                muted: Color::DarkGray,
                user: Color::Blue,
                bot: Color::Magenta,
                border: Color::DarkGray,
            }
        }
    }
}

/// Render one line of a reply, turning `**bold**` into styled spans and
/// leading `* ` bullets into `• `.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let (bullet, body) = match text.trim_start().strip_prefix("* ") {
        Some(rest) => {
            let indent = text.len() - text.trim_start().len();
            (Some(format!("{}• ", &text[..indent])), rest)
        }
        None => (None, text),
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    if let Some(bullet) = bullet {
        spans.push(Span::raw(bullet));
    }

    let mut rest = body;
    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(len) = after_open.find("**").filter(|&len| len > 0) else {
            break;
        };
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after_open[..len].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[len + 2..];
    }
    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

/// Rows `lines` occupy once wrapped to `width` (an estimate; word wrapping
/// may add a row here and there).
fn wrapped_rows(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let palette = Palette::for_mode(app.dark_mode);
    let area = frame.area();

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        area,
    );

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, &palette, frame, header_area);
    render_chat(app, &palette, frame, chat_area);
    render_input(app, &palette, frame, input_area);
    render_footer(app, &palette, frame, footer_area);
}

fn render_header(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(" Gemini Chat ", Style::default().fg(palette.bot).bold())];

    if app.session.is_awaiting() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        spans.push(Span::styled(
            format!("Generating{}", dots),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        ));
    } else {
        spans.push(Span::styled(
            format!("Ask {} anything", app.preset.display_name()),
            Style::default().fg(palette.text),
        ));
    }

    let queued = app.session.queued();
    if queued > 0 {
        spans.push(Span::styled(
            format!("  [{} queued]", queued),
            Style::default().fg(palette.muted),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(format!(" {} ", app.model()));

    let user_label = Style::default().fg(palette.user).add_modifier(Modifier::BOLD);
    let bot_label = Style::default().fg(palette.bot).add_modifier(Modifier::BOLD);

    let conversation = app.session.conversation();
    let reveal = app.session.pending_reveal();

    let mut lines: Vec<Line> = Vec::new();
    if conversation.is_empty() && reveal.is_none() && !app.session.is_awaiting() {
        lines.push(Line::from(Span::styled(
            "Type a question and press Enter.",
            Style::default().fg(palette.muted),
        )));
    }

    for msg in conversation.messages() {
        match msg.role() {
            Role::User => {
                lines.push(Line::from(Span::styled("You:", user_label)));
                for line in msg.text().lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Role::Bot => {
                lines.push(Line::from(Span::styled("Gemini:", bot_label)));
                for line in msg.text().lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if let Some(reveal) = reveal {
        lines.push(Line::from(Span::styled("Gemini:", bot_label)));
        let italic = Style::default().add_modifier(Modifier::ITALIC);
        for line in reveal.revealed().lines() {
            lines.push(Line::from(Span::styled(line.to_string(), italic)));
        }
    }

    // Store inner height for half-page scrolling
    app.chat_height = area.height.saturating_sub(2);
    let total_rows = wrapped_rows(&lines, area.width.saturating_sub(2));
    let max_scroll = total_rows.saturating_sub(app.chat_height);
    app.chat_scroll = if app.follow_tail {
        max_scroll
    } else {
        app.chat_scroll.min(max_scroll)
    };

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { palette.user } else { palette.border };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask ");

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_view(&app.input, app.cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.text))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Scrolls the input horizontally so the cursor stays visible. Returns the
/// text from the first visible character on and the cursor column, both in
/// display columns so wide characters line up.
fn input_view(input: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let columns = |range: &[char]| Span::raw(range.iter().collect::<String>()).width();

    // Leave one free column for the cursor itself
    let mut start = 0;
    while start < cursor && columns(&chars[start..cursor]) >= width.max(1) {
        start += 1;
    }

    let visible = chars[start..].iter().collect();
    (visible, columns(&chars[start..cursor]) as u16)
}

fn render_footer(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(
            format!(" {} ", status.text),
            Style::default().bg(Color::Green).fg(Color::Black),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(palette.text);

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " commands ")],
        InputMode::Normal => &[
            (" i ", " ask "),
            (" y ", " copy reply "),
            (" s ", " skip "),
            (" t ", " theme "),
            (" m ", " model "),
            (" j/k ", " scroll "),
            (" q ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
