use async_trait::async_trait;
use ratatui::buffer::Buffer;

use crate::errors::AppError;
use crate::ui::{Action, layout::Layout};

pub mod conversation;
pub mod help;
pub mod status_bar;

pub trait DumbComponent {
    fn render(&mut self, area: Layout, buf: &mut Buffer);
}

#[async_trait(?Send)]
pub trait Component {
    fn render(&mut self, area: Layout, buf: &mut Buffer);
    async fn handle_event(&mut self, event: Action) -> Result<(), AppError> {
        let _ = event;
        Ok(())
    }
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }
    fn is_animating(&self) -> bool {
        false
    }
}
