use ratatui::buffer::Buffer;
use ratatui::style::{Style, Stylize};
use ratatui::text::Line;
use ratatui::widgets::Widget;
use ratatui_macros::span;
use std::sync::atomic::Ordering;

use crate::ui::components::DumbComponent;
use crate::ui::components::conversation::LOADED_COMMENT_COUNT;
use crate::ui::{AppState, layout::Layout};

pub struct StatusBar {
    target_label: String,
    user_label: String,
}

impl StatusBar {
    pub fn new(app_state: AppState) -> Self {
        Self {
            target_label: format!(" {} ", app_state.target()),
            user_label: format!(" Logged in as {} ", app_state.current_user),
        }
    }

    pub fn render(&mut self, area: Layout, buf: &mut Buffer) {
        let comment_count = LOADED_COMMENT_COUNT.load(Ordering::Relaxed);
        let count_text = format!(" Comments: {} | F1 help ", comment_count);

        Line::from(vec![
            span!(self.user_label.as_str()).style(Style::new().black().on_green()),
            span!(" "),
            span!(self.target_label.as_str()),
        ])
        .render(area.status_bar, buf);
        Line::from(span!(count_text).style(Style::new().black().on_blue()))
            .right_aligned()
            .render(area.status_bar, buf);
    }
}

impl DumbComponent for StatusBar {
    fn render(&mut self, area: Layout, buf: &mut Buffer) {
        self.render(area, buf);
    }
}
