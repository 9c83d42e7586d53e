use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::view::AlertModel;

/// Room for borders and inner padding around the message
const CHROME_WIDTH: u16 = 6;
const CHROME_HEIGHT: u16 = 4;

/// Modal box with a title, a message and one acknowledgement hint
pub struct AlertPopup<'a> {
    model: &'a AlertModel,
}

impl<'a> AlertPopup<'a> {
    pub fn new(model: &'a AlertModel) -> Self {
        Self { model }
    }

    fn content_width(&self) -> u16 {
        let button = button_label(&self.model.button_text);
        self.model
            .message
            .lines()
            .map(|l| l.width())
            .chain([self.model.title.width(), button.width()])
            .max()
            .unwrap_or(0)
            .try_into()
            .unwrap_or(u16::MAX)
    }
}

fn button_label(text: &str) -> String {
    format!("[Enter] {text}")
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

impl Widget for AlertPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let message_lines = self.model.message.lines().count() as u16;
        // message, blank line, button
        let height = message_lines + 2 + CHROME_HEIGHT;
        let width = self.content_width().saturating_add(CHROME_WIDTH);
        let popup = centered_rect(width, height, area);

        let mut lines: Vec<Line> = self
            .model
            .message
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            button_label(&self.model.button_text),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));

        Clear.render(popup, buf);
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(
                        self.model.title.as_str(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ))
                    .title_alignment(Alignment::Center)
                    .padding(ratatui::widgets::Padding::uniform(1)),
            )
            .render(popup, buf);
    }
}
