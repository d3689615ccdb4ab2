use ratatui::layout::Rect;
use ratatui_macros::vertical;

const INPUT_HEIGHT: u16 = 5;
const MAX_SUGGESTIONS: u16 = 6;

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub title_bar: Rect,
    pub main_content: Rect,
    pub input: Rect,
    pub status_bar: Rect,
}

impl Layout {
    pub fn new(area: Rect) -> Self {
        let [title_bar, main_content, input, status_bar] =
            vertical![==1, *=1, ==INPUT_HEIGHT, ==1].areas(area);
        Self {
            title_bar,
            main_content,
            input,
            status_bar,
        }
    }

    /// Area for the mention popup: docked to the bottom of the comment list, right
    /// above the compose box.
    pub fn suggestions(&self, rows: usize) -> Rect {
        let height = (rows as u16).clamp(1, MAX_SUGGESTIONS) + 2;
        let height = height.min(self.main_content.height);
        let width = self.main_content.width.min(40);
        Rect {
            x: self.main_content.x + 1,
            y: self.main_content.bottom().saturating_sub(height),
            width: width.saturating_sub(1),
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_screen_top_to_bottom() {
        let layout = Layout::new(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.title_bar, Rect::new(0, 0, 80, 1));
        assert_eq!(layout.main_content, Rect::new(0, 1, 80, 17));
        assert_eq!(layout.input, Rect::new(0, 18, 80, INPUT_HEIGHT));
        assert_eq!(layout.status_bar, Rect::new(0, 23, 80, 1));
    }

    #[test]
    fn suggestions_sit_on_top_of_the_input() {
        let layout = Layout::new(Rect::new(0, 0, 80, 24));
        let popup = layout.suggestions(3);
        assert_eq!(popup.bottom(), layout.input.y);
        assert_eq!(popup.height, 5);
        assert_eq!(layout.suggestions(50).height, MAX_SUGGESTIONS + 2);
    }
}
