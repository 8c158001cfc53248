use parley_core::{palette::PALETTE_COLUMNS, AccentColor, ChatEntry, Origin, PALETTE};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, Overlay};
use crate::button::Button;

const SWATCH_WIDTH: u16 = 8;
const SWATCH_HEIGHT: u16 = 3;

fn to_color(accent: AccentColor) -> Color {
    Color::Rgb(accent.r, accent.g, accent.b)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Wrap text to fit within `width` display columns, breaking on spaces and
/// splitting words that are wider than a whole line
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.width();

        if current_len > 0 && current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current_line));
            current_len = 0;
        }

        for c in word.chars() {
            let w = char_width(c);
            if current_len > 0 && current_len + w > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            current_line.push(c);
            current_len += w;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// A message bubble: every row padded to the same width so the background
/// reads as one block
fn bubble_lines(text: &str, max_width: usize, style: Style, alignment: Alignment) -> Vec<Line<'static>> {
    let inner = max_width.saturating_sub(2).max(1);
    let wrapped: Vec<String> = text
        .lines()
        .flat_map(|line| wrap_text_to_width(line, inner))
        .collect();
    let width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);

    wrapped
        .into_iter()
        .map(|line| {
            let pad = width - line.width();
            Line::from(Span::styled(format!(" {}{} ", line, " ".repeat(pad)), style))
                .alignment(alignment)
        })
        .collect()
}

fn entry_lines(entry: &ChatEntry, max_width: usize, accent: AccentColor) -> Vec<Line<'static>> {
    let (style, alignment) = match entry.origin() {
        Origin::User => (
            Style::default().bg(to_color(accent)).fg(Color::White),
            Alignment::Right,
        ),
        Origin::Assistant => (
            Style::default().bg(Color::Gray).fg(Color::Black),
            Alignment::Left,
        ),
    };

    let mut lines = bubble_lines(entry.text(), max_width, style, alignment);
    lines.push(
        Line::from(Span::styled(
            entry.time_label(),
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(alignment),
    );
    lines.push(Line::default());
    lines
}

/// Everything shown in the transcript pane, already wrapped to `width`
fn transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let max_width = (width as usize * 3 / 4).max(10);
    let accent = app.picker.accent();
    let mut lines: Vec<Line<'static>> = Vec::new();

    for entry in app.chat.session().entries() {
        lines.extend(entry_lines(entry, max_width, accent));
    }

    if let Some(partial) = app.chat.typing_text().filter(|p| !p.is_empty()) {
        lines.extend(bubble_lines(
            partial,
            max_width,
            Style::default().bg(Color::DarkGray).fg(Color::White),
            Alignment::Left,
        ));
    }

    if app.chat.is_awaiting() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let status = app.status_text();

    let [header_area, chat_area, status_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(if status.is_some() { 1 } else { 0 }),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if let Some(status) = status {
        let line = Paragraph::new(format!(" {}", status)).style(Style::default().fg(Color::Red));
        frame.render_widget(line, status_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    match app.overlay {
        Overlay::ColorPicker => render_color_sheet(app, frame, area),
        Overlay::ApiKey => render_api_key_input(app, frame, area),
        Overlay::None => {
            app.sheet_area = None;
            app.swatch_areas.clear();
        }
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" parley ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} ", app.config.model),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    app.chat_area = Some(area);
    app.chat_height = inner.height;

    let text = if app.chat.session().is_empty() && !app.chat.is_responding() {
        Text::from(Span::styled(
            "Say something to start the conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(transcript_lines(app, inner.width))
    };

    app.fit_scroll(row_count(text.lines.len()));

    let chat = Paragraph::new(text)
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

/// Line count for scroll math; saturates instead of wrapping on huge transcripts
fn row_count(lines: usize) -> u16 {
    u16::try_from(lines).unwrap_or(u16::MAX)
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [plus_area, field_area, send_area] = Layout::horizontal([
        Constraint::Length(5),
        Constraint::Min(0),
        Constraint::Length(10),
    ])
    .areas(area);

    app.plus_area = Some(plus_area);
    app.send_area = Some(send_area);

    frame.render_widget(
        Button::new("+").style(Style::default().fg(to_color(app.picker.accent()))),
        plus_area,
    );

    let editing = app.overlay == Overlay::None;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }));

    // Inner width = total width - 2 (for borders)
    let inner_width = field_area.width.saturating_sub(2) as usize;
    let (scroll_offset, cursor_x) = input_window(&app.input, app.input_cursor, inner_width);

    let input = if app.input.is_empty() {
        Paragraph::new("Enter your message").style(Style::default().fg(Color::DarkGray))
    } else {
        let mut used = 0;
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take_while(|c| {
                used += char_width(*c);
                used <= inner_width
            })
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(input_block), field_area);

    if editing {
        frame.set_cursor_position((field_area.x + cursor_x + 1, field_area.y + 1));
    }

    // Send and stop share one slot; the send arrow dims while there is nothing to send
    let button = if app.chat.is_typing() {
        Button::new("Stop").style(Style::default().fg(Color::Yellow))
    } else {
        let fg = if app.input.trim().is_empty() || app.chat.is_awaiting() {
            Color::DarkGray
        } else {
            Color::White
        };
        Button::new("Send")
            .style(Style::default().fg(fg))
            .correct(app.chat.last_failure().map(|_| false))
    };
    frame.render_widget(button, send_area);
}

/// First visible char and the cursor column, scrolled so the cursor stays
/// inside a field `width` columns wide
fn input_window(input: &str, cursor: usize, width: usize) -> (usize, u16) {
    let before: Vec<usize> = input.chars().take(cursor).map(char_width).collect();
    let mut start = 0;
    let mut column: usize = before.iter().sum();
    while width > 0 && column >= width && start < before.len() {
        column -= before[start];
        start += 1;
    }
    (start, u16::try_from(column).unwrap_or(u16::MAX))
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let hints: Vec<Span> = match app.overlay {
        Overlay::ColorPicker => [
            hint("←↑↓→", "move"),
            hint("Enter", "select"),
            hint("Esc", "close"),
        ]
        .concat(),
        Overlay::ApiKey => [hint("Enter", "save"), hint("Esc", "cancel")].concat(),
        Overlay::None if app.chat.is_typing() => [
            hint("Enter/Esc", "stop"),
            hint("PgUp/PgDn", "scroll"),
            hint("Ctrl+C", "quit"),
        ]
        .concat(),
        Overlay::None if app.chat.is_awaiting() => [
            hint("PgUp/PgDn", "scroll"),
            hint("Ctrl+C", "quit"),
        ]
        .concat(),
        Overlay::None => [
            hint("Enter", "send"),
            hint("Ctrl+O", "color"),
            hint("Ctrl+K", "API key"),
            hint("PgUp/PgDn", "scroll"),
            hint("Ctrl+C", "quit"),
        ]
        .concat(),
    };

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_color_sheet(app: &mut App, frame: &mut Frame, area: Rect) {
    let rows = PALETTE.len().div_ceil(PALETTE_COLUMNS) as u16;
    // border + handle + swatch grid + label
    let sheet_height = (2 + rows * SWATCH_HEIGHT + 1).min(area.height);
    let sheet_area = Rect::new(
        area.x,
        area.y + area.height.saturating_sub(sheet_height),
        area.width,
        sheet_height,
    );
    app.sheet_area = Some(sheet_area);

    frame.render_widget(Clear, sheet_area);

    let block = Block::default()
        .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Gray))
        .title(" Accent color ");
    let inner = block.inner(sheet_area);
    frame.render_widget(block, sheet_area);

    let [handle_area, grid_area, label_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(rows * SWATCH_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new("▬▬▬▬").alignment(Alignment::Center).fg(Color::DarkGray),
        handle_area,
    );

    let grid_width = SWATCH_WIDTH * PALETTE_COLUMNS as u16;
    let grid_x = grid_area.x + grid_area.width.saturating_sub(grid_width) / 2;

    app.swatch_areas.clear();
    for (idx, swatch) in PALETTE.iter().enumerate() {
        let col = (idx % PALETTE_COLUMNS) as u16;
        let row = (idx / PALETTE_COLUMNS) as u16;
        let cell = Rect::new(
            grid_x + col * SWATCH_WIDTH,
            grid_area.y + row * SWATCH_HEIGHT,
            SWATCH_WIDTH,
            SWATCH_HEIGHT,
        )
        .intersection(grid_area);
        app.swatch_areas.push(cell);

        let highlighted = idx == app.picker.highlighted();
        let current = swatch.color == app.picker.accent();
        let border_style = if highlighted {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Black)
        };
        let swatch_block = Block::default()
            .borders(Borders::ALL)
            .border_type(if highlighted { BorderType::Thick } else { BorderType::Plain })
            .border_style(border_style);

        let fill = Paragraph::new(if current { "✓" } else { "" })
            .alignment(Alignment::Center)
            .style(Style::default().bg(to_color(swatch.color)).fg(Color::White))
            .block(swatch_block);
        frame.render_widget(fill, cell);
    }

    let name = PALETTE[app.picker.highlighted()].name;
    frame.render_widget(
        Paragraph::new(name).alignment(Alignment::Center).fg(Color::Gray),
        label_area,
    );
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Enter Gemini API Key ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 5 {
        return;
    }

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(masked_key(&app.api_key_input)).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let char_count = format!("{} characters", app.api_key_input.chars().count());
    frame.render_widget(
        Paragraph::new(char_count).style(Style::default().fg(Color::DarkGray)),
        Rect::new(inner.x, inner.y + 4, inner.width, 1),
    );
}

/// Mask the key with asterisks, showing only the last 4 chars
fn masked_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let masked_len = len - 4;
    let last_four: String = key.chars().skip(masked_len).collect();
    format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Options;
    use parley_core::Config;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc::unbounded_channel;

    fn row_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        assert_eq!(
            wrap_text_to_width("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(
            wrap_text_to_width("abcdefghij xy", 4),
            vec!["abcd", "efgh", "ij", "xy"]
        );
    }

    #[test]
    fn test_wrap_empty_line_keeps_a_row() {
        assert_eq!(wrap_text_to_width("", 10), vec![String::new()]);
    }

    #[test]
    fn test_bubble_rows_share_width() {
        let lines = bubble_lines(
            "hello there friend",
            14,
            Style::default(),
            Alignment::Right,
        );
        let rows: Vec<String> = lines.iter().map(row_text).collect();
        assert_eq!(rows, vec![" hello there ", " friend      "]);
        assert!(lines.iter().all(|l| l.alignment == Some(Alignment::Right)));
    }

    #[test]
    fn test_wide_chars_wrap_by_columns() {
        assert_eq!(wrap_text_to_width("你好世界", 4), vec!["你好", "世界"]);
    }

    #[test]
    fn test_bubble_pads_wide_chars_by_columns() {
        let lines = bubble_lines("你好 ab", 8, Style::default(), Alignment::Left);
        let rows: Vec<String> = lines.iter().map(row_text).collect();
        assert_eq!(rows, vec![" 你好 ", " ab   "]);
        assert!(lines.iter().all(|l| l.width() == 6));
    }

    #[test]
    fn test_input_window_counts_columns() {
        assert_eq!(input_window("abc", 3, 10), (0, 3));
        assert_eq!(input_window("你好", 2, 10), (0, 4));
        // cursor past the field scrolls until it fits again
        assert_eq!(input_window("你好世界", 4, 5), (2, 4));
        assert_eq!(input_window("abcdef", 6, 4), (3, 3));
    }

    fn send_slot_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let area = app.send_area.unwrap();
        let buf = terminal.backend().buffer();
        (area.x..area.x + area.width)
            .map(|x| buf[(x, area.y + 1)].symbol().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_stop_is_not_offered_while_awaiting_reply() {
        let config = Config {
            api_key: Some("test-key".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let (tx, _rx) = unbounded_channel();
        let mut app = App::new(config, Options::default(), tx);
        app.chat.submit("Hi");
        assert!(app.chat.is_awaiting());

        let slot = send_slot_text(&mut app);
        assert!(slot.contains("Send"), "got {slot:?}");
        assert!(!slot.contains("Stop"));
    }

    #[test]
    fn test_row_count_saturates() {
        assert_eq!(row_count(12), 12);
        assert_eq!(row_count(70_000), u16::MAX);
    }

    #[test]
    fn test_masked_key() {
        assert_eq!(masked_key(""), "");
        assert_eq!(masked_key("abc"), "***");
        assert_eq!(masked_key("abcdefgh"), "****...efgh");
    }
}
