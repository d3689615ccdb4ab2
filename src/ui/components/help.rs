use ratatui::{
    layout::Constraint::{Length, Percentage},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{BlockExt, Clear, Paragraph, Widget, Wrap},
};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpElementKind {
    Keybind(&'static str, &'static str),
    Text(&'static str),
}

#[macro_export]
macro_rules! help_keybind {
    ($key:expr, $description:expr) => {
        $crate::ui::components::help::HelpElementKind::Keybind($key, $description)
    };
}

#[macro_export]
macro_rules! help_text {
    ($text:expr) => {
        $crate::ui::components::help::HelpElementKind::Text($text)
    };
}

pub const HELP: &[HelpElementKind] = &[
    crate::help_text!("Comments"),
    crate::help_keybind!("Up/Down", "select comment"),
    crate::help_keybind!("Ctrl+R", "reply to selected comment"),
    crate::help_keybind!("Ctrl+L", "like / unlike selected comment"),
    crate::help_keybind!("Enter", "send comment, or pick highlighted mention"),
    crate::help_keybind!("Tab / Shift+Tab", "move mention highlight"),
    crate::help_keybind!("Esc", "close mentions, then cancel reply"),
    crate::help_keybind!("Ctrl+C", "quit"),
    crate::help_text!("Type @ and two characters to search for people to mention."),
];

pub fn help_elements_to_text(elements: &[HelpElementKind], width: u16) -> Text<'static> {
    let mut lines = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            HelpElementKind::Keybind(key, description) => {
                let total_length = (key.len() + description.len()) as u16;
                let padding = width.saturating_sub(total_length).max(1);
                lines.push(Line::from(vec![
                    Span::styled(
                        *key,
                        Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" ".repeat(padding as usize)),
                    Span::raw(*description),
                ]));
            }
            HelpElementKind::Text(text) => {
                let wrapped = textwrap::wrap(text, width.max(1) as usize);
                lines.extend(
                    wrapped
                        .into_iter()
                        .map(|line| Line::from(line.into_owned()).centered()),
                );
            }
        }
    }
    Text::from(lines)
}

/// A centered overlay that clears what is under it. Used for the help screen and for
/// blocking alerts.
pub struct Popup<'a> {
    content: Text<'a>,
    percent: u16,
    block: Option<ratatui::widgets::Block<'a>>,
}

impl<'a> Popup<'a> {
    pub fn new(content: impl Into<Text<'a>>) -> Self {
        Self {
            content: content.into(),
            percent: 0,
            block: None,
        }
    }

    /// Width of the popup as a percentage of the parent area. 0 fills the parent.
    pub fn percent(self, percent: u16) -> Self {
        Self { percent, ..self }
    }

    pub fn block(self, block: ratatui::widgets::Block<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }
}

impl Widget for Popup<'_> {
    fn render(self, area: ratatui::layout::Rect, buf: &mut ratatui::buffer::Buffer) {
        trace!(lines = self.content.height(), "Rendering popup");
        let height = (self.content.height() as u16 + 2).min(area.height);
        let popup_area = if self.percent != 0 {
            area.centered(Percentage(self.percent), Length(height))
        } else {
            area
        };
        let inner = self.block.inner_if_some(popup_area);
        Clear.render(popup_area, buf);
        self.block.render(popup_area, buf);
        Paragraph::new(self.content)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
