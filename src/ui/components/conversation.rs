use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Clear, List, ListItem, ListState, Paragraph, StatefulWidget, Widget,
    },
};
use ratatui_macros::line;
use std::sync::atomic::{AtomicUsize, Ordering};
use throbber_widgets_tui::{BRAILLE_SIX_DOUBLE, Throbber, ThrobberState, WhichUse};
use tracing::{debug, info};

use crate::{
    errors::AppError,
    session::{
        CommentSession, SendOutcome, SessionState, mention::MentionPhase, normalize::Comment,
    },
    ui::{
        Action,
        components::{Component, help::Popup},
        layout::Layout,
    },
};

pub static LOADED_COMMENT_COUNT: AtomicUsize = AtomicUsize::new(0);

pub struct Conversation {
    session: CommentSession,
    list_state: ListState,
    throbber_state: ThrobberState,
    post_throbber_state: ThrobberState,
    input_area: Rect,
}

impl Conversation {
    pub fn new(session: CommentSession) -> Self {
        Self {
            session,
            list_state: ListState::default(),
            throbber_state: ThrobberState::default(),
            post_throbber_state: ThrobberState::default(),
            input_area: Rect::default(),
        }
    }

    pub fn session(&self) -> &CommentSession {
        &self.session
    }

    fn selected_comment_id(&self) -> Option<String> {
        let index = self.list_state.selected()?;
        self.session.comments().get(index).map(|c| c.id.clone())
    }

    fn edit_draft(&mut self, edit: impl FnOnce(&mut String)) {
        let mut draft = self.session.draft().to_string();
        edit(&mut draft);
        self.session.set_draft(draft);
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(alert) = self.session.take_alert() {
            debug!(%alert, "Alert dismissed");
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let panel_open = self.session.mentions().is_panel_visible();
        match key.code {
            KeyCode::Char('r') if ctrl => {
                if let Some(id) = self.selected_comment_id() {
                    self.session.reply_to(&id);
                }
            }
            KeyCode::Char('l') if ctrl => {
                if let Some(id) = self.selected_comment_id()
                    && let Some(state) = self.session.toggle_like(&id)
                {
                    debug!(%id, liked = state.is_liked, count = state.count, "Toggled like");
                }
            }
            KeyCode::Tab if panel_open => self.session.mentions_mut().highlight_next(),
            KeyCode::BackTab if panel_open => self.session.mentions_mut().highlight_prev(),
            KeyCode::Enter
                if panel_open && self.session.mentions().highlighted_candidate().is_some() =>
            {
                self.session.select_highlighted_mention();
            }
            KeyCode::Enter => match self.session.send() {
                SendOutcome::Dispatched => info!("Comment submitted"),
                outcome => debug!(?outcome, "Comment not sent"),
            },
            KeyCode::Esc if panel_open => self.session.mentions_mut().dismiss(),
            KeyCode::Esc => self.session.cancel_reply(),
            KeyCode::Up => self.list_state.select_previous(),
            KeyCode::Down => self.list_state.select_next(),
            KeyCode::Backspace => self.edit_draft(|draft| {
                draft.pop();
            }),
            KeyCode::Char(c) if !ctrl => self.edit_draft(|draft| draft.push(c)),
            _ => {}
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.session.comments().len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            None => self.list_state.select(Some(0)),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    fn render_list(&mut self, area: Rect, buf: &mut Buffer) {
        let width = area.width.saturating_sub(6).max(10) as usize;
        let now = Utc::now();
        let mut block = Block::bordered().border_type(BorderType::Rounded);

        if self.session.state() == SessionState::Loading {
            block.render(area, buf);
            let title_area = Rect {
                x: area.x + 1,
                y: area.y,
                width: 10.min(area.width.saturating_sub(2)),
                height: 1,
            };
            let throbber = Throbber::default()
                .label("Loading")
                .style(Style::new().fg(Color::Cyan))
                .throbber_set(BRAILLE_SIX_DOUBLE)
                .use_type(WhichUse::Spin);
            StatefulWidget::render(throbber, title_area, buf, &mut self.throbber_state);
            return;
        }

        let comments = self.session.comments();
        block = block.title(format!("Comments ({})", comments.len()));
        if comments.is_empty() {
            Paragraph::new(line![Span::styled("No comments yet.", Style::new().dim())])
                .block(block)
                .render(area, buf);
            return;
        }
        let items: Vec<ListItem<'static>> = comments
            .iter()
            .map(|comment| build_comment_item(comment, width, now))
            .collect();
        self.clamp_selection();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        StatefulWidget::render(list, area, buf, &mut self.list_state);
    }

    fn render_input(&mut self, area: Rect, buf: &mut Buffer) {
        self.input_area = area;
        let title = match self.session.reply_target() {
            Some(target) => format!("Replying to @{} (Esc to cancel)", target.author.name),
            None => "Comment (Enter to send)".to_string(),
        };
        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::new().fg(Color::Green));
        if !self.session.is_sending() {
            block = block.title(title);
        }
        let inner_width = area.width.saturating_sub(2) as usize;
        let lines: Vec<Line> = hard_wrap(self.session.draft(), inner_width)
            .into_iter()
            .map(Line::from)
            .collect();
        Paragraph::new(lines).block(block).render(area, buf);

        if self.session.is_sending() {
            let title_area = Rect {
                x: area.x + 1,
                y: area.y,
                width: 10.min(area.width.saturating_sub(2)),
                height: 1,
            };
            let throbber = Throbber::default()
                .label("Sending")
                .style(Style::new().fg(Color::Cyan))
                .throbber_set(BRAILLE_SIX_DOUBLE)
                .use_type(WhichUse::Spin);
            StatefulWidget::render(throbber, title_area, buf, &mut self.post_throbber_state);
        }
    }

    fn render_suggestions(&self, layout: Layout, buf: &mut Buffer) {
        let mentions = self.session.mentions();
        if !mentions.is_panel_visible() {
            return;
        }
        let dim = Style::new().dim();
        let items: Vec<ListItem> = match mentions.phase() {
            MentionPhase::Searching { .. } => vec![ListItem::new(Span::styled("Searching...", dim))],
            _ if mentions.candidates().is_empty() => {
                vec![ListItem::new(Span::styled("No matches", dim))]
            }
            _ => mentions
                .candidates()
                .iter()
                .enumerate()
                .map(|(i, candidate)| {
                    let style = if i == mentions.highlighted() {
                        Style::new().reversed()
                    } else {
                        Style::new()
                    };
                    ListItem::new(Line::from(format!("@{}", candidate.name)).style(style))
                })
                .collect(),
        };
        let area = layout.suggestions(items.len());
        Clear.render(area, buf);
        let list = List::new(items).block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .title("Mentions"),
        );
        Widget::render(list, area, buf);
    }

    fn render_alert(&self, area: Rect, buf: &mut Buffer) {
        let Some(alert) = self.session.alert() else {
            return;
        };
        Popup::new(vec![
            Line::from(alert.to_string()),
            Line::default(),
            Line::from(Span::styled("Press any key to dismiss", Style::new().dim())),
        ])
        .percent(60)
        .block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .border_style(Style::new().fg(Color::Red))
                .title("Error"),
        )
        .render(area, buf);
    }
}

#[async_trait(?Send)]
impl Component for Conversation {
    fn render(&mut self, area: Layout, buf: &mut Buffer) {
        self.render_list(area.main_content, buf);
        self.render_input(area.input, buf);
        self.render_suggestions(area, buf);
        self.render_alert(area.main_content, buf);
    }

    async fn handle_event(&mut self, event: Action) -> Result<(), AppError> {
        match event {
            Action::AppEvent(Event::Key(ref key)) => self.handle_key(key),
            Action::Session(event) => {
                self.session.handle_event(event);
                LOADED_COMMENT_COUNT.store(self.session.comments().len(), Ordering::Relaxed);
            }
            Action::Tick => {
                if self.session.state() == SessionState::Loading {
                    self.throbber_state.calc_next();
                }
                if self.session.is_sending() {
                    self.post_throbber_state.calc_next();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        let inner_width = self.input_area.width.saturating_sub(2);
        let inner_height = self.input_area.height.saturating_sub(2);
        if inner_width == 0 || inner_height == 0 {
            return None;
        }
        let lines = hard_wrap(self.session.draft(), inner_width as usize);
        let last = lines.last().map(|l| l.chars().count()).unwrap_or(0) as u16;
        let (row, col) = if last >= inner_width {
            (lines.len() as u16, 0)
        } else {
            (lines.len().saturating_sub(1) as u16, last)
        };
        Some((
            self.input_area.x + 1 + col,
            self.input_area.y + 1 + row.min(inner_height - 1),
        ))
    }

    fn is_animating(&self) -> bool {
        self.session.state() == SessionState::Loading || self.session.is_sending()
    }
}

fn build_comment_item(comment: &Comment, width: usize, now: DateTime<Utc>) -> ListItem<'static> {
    let like = comment.like_state;
    let mut header = Vec::with_capacity(4);
    if comment.is_reply() {
        header.push(Span::styled("↳ ", Style::new().dim()));
    }
    header.push(Span::styled(
        comment.author.name.clone(),
        Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    header.push(Span::styled(
        format!("  {}", age_label(comment.created_at, now)),
        Style::new().dim(),
    ));
    let (heart, heart_style) = if like.is_liked {
        ("♥", Style::new().fg(Color::Red))
    } else {
        ("♡", Style::new())
    };
    header.push(Span::styled(format!("  {heart} {}", like.count), heart_style));

    let indent = if comment.is_reply() { "    " } else { "  " };
    let mut lines = vec![Line::from(header)];
    let body_width = width.saturating_sub(indent.len()).max(1);
    lines.extend(
        textwrap::wrap(&comment.text, body_width)
            .into_iter()
            .map(|l| Line::from(format!("{indent}{l}"))),
    );
    ListItem::new(lines)
}

/// "now" for missing or sub-minute timestamps, then minutes, hours, and finally the date.
pub fn age_label(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created_at) = created_at else {
        return "now".to_string();
    };
    let elapsed = now.signed_duration_since(created_at);
    if elapsed.num_minutes() < 1 {
        "now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        created_at.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Breaks `text` every `width` characters, keeping spaces so the cursor lines up.
fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
