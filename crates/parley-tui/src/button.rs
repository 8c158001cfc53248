use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

/// Rounded, bordered label.
///
/// `correct` marks an answer button: `Some(true)` draws it green,
/// `Some(false)` red, `None` leaves the neutral colors.
#[derive(Debug, Clone)]
pub struct Button<'a> {
    title: &'a str,
    correct: Option<bool>,
    style: Style,
}

impl<'a> Button<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            correct: None,
            style: Style::default().fg(Color::White),
        }
    }

    pub fn correct(mut self, correct: Option<bool>) -> Self {
        self.correct = correct;
        self
    }

    /// Base style, overridden by the correct/incorrect color
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Widget for Button<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = match self.correct {
            Some(true) => self.style.fg(Color::Green),
            Some(false) => self.style.fg(Color::Red),
            None => self.style,
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(style);

        Paragraph::new(self.title)
            .alignment(Alignment::Center)
            .style(style)
            .block(block)
            .render(area, buf);
    }
}
