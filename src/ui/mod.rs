pub mod components;
pub mod layout;

use crate::{
    backend::CommentBackend,
    errors::AppError,
    session::{CommentSession, SessionConfig, SessionEvent},
    ui::components::{
        Component, DumbComponent,
        conversation::Conversation,
        help::{HELP, Popup, help_elements_to_text},
        status_bar::StatusBar,
    },
};
use crossterm::event::{EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{StreamExt, future::FutureExt};
use ratatui::{
    crossterm,
    prelude::*,
    widgets::{Block, BorderType, Paragraph},
};
use ratatui_macros::line;
use std::sync::Arc;
use tokio::{select, sync::mpsc::Sender};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

const TICK_RATE: std::time::Duration = std::time::Duration::from_millis(100);

pub async fn run(
    state: AppState,
    backend: Arc<dyn CommentBackend>,
    config: SessionConfig,
) -> Result<(), AppError> {
    let mut terminal = ratatui::init();
    let (action_tx, action_rx) = tokio::sync::mpsc::channel(100);
    let (session_tx, mut session_rx) = tokio::sync::mpsc::channel::<SessionEvent>(100);

    let forward_tx = action_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = session_rx.recv().await {
            if forward_tx.send(Action::Session(event)).await.is_err() {
                break;
            }
        }
    });

    let session = CommentSession::new(backend, session_tx, config);
    let mut app = App::new(action_tx, action_rx, session, state);
    let result = app.run(&mut terminal).await;
    ratatui::restore();
    result
}

struct App {
    action_tx: tokio::sync::mpsc::Sender<Action>,
    action_rx: tokio::sync::mpsc::Receiver<Action>,
    cancel_action: CancellationToken,
    components: Vec<Box<dyn Component>>,
    dumb_components: Vec<Box<dyn DumbComponent>>,
    title: String,
    in_help: bool,
}

#[derive(Debug, Default, Clone)]
pub struct AppState {
    repo: String,
    owner: String,
    current_user: String,
    issue: String,
}

impl AppState {
    pub fn new(repo: String, owner: String, current_user: String, issue: String) -> Self {
        Self {
            repo,
            owner,
            current_user,
            issue,
        }
    }

    pub fn target(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.issue)
    }
}

impl App {
    fn new(
        action_tx: Sender<Action>,
        action_rx: tokio::sync::mpsc::Receiver<Action>,
        mut session: CommentSession,
        state: AppState,
    ) -> Self {
        session.open(state.issue.clone());
        let conversation = Conversation::new(session);
        let status_bar = StatusBar::new(state.clone());
        Self {
            title: format!("chorus | {}", state.target()),
            in_help: false,
            action_tx,
            action_rx,
            cancel_action: Default::default(),
            components: vec![Box::new(conversation)],
            dumb_components: vec![Box::new(status_bar)],
        }
    }

    async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<impl std::io::Write>>,
    ) -> Result<(), AppError> {
        let ctok = self.cancel_action.clone();
        let action_tx = self.action_tx.clone();
        tokio::spawn(async move {
            let mut tick_interval = tokio::time::interval(TICK_RATE);
            let mut event_stream = EventStream::new();

            loop {
                let event = select! {
                    _ = ctok.cancelled() => break,
                    _ = tick_interval.tick() => Action::Tick,
                    kevent = event_stream.next().fuse() => {
                        match kevent {
                            Some(Ok(kevent)) => Action::AppEvent(kevent),
                            Some(Err(..)) => Action::None,
                            None => break,
                        }
                    }
                };
                if action_tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok::<(), AppError>(())
        });
        self.draw(terminal)?;
        loop {
            let action = self.action_rx.recv().await;
            let consumed =
                matches!(&action, Some(Action::AppEvent(event)) if self.handle_event(event));
            if !consumed && let Some(ref action) = action {
                for component in self.components.iter_mut() {
                    component.handle_event(action.clone()).await?;
                }
            }
            let should_draw = match &action {
                Some(Action::Tick) => self.has_animated_components(),
                Some(Action::None) | None => false,
                _ => true,
            };
            if action.is_none() {
                self.cancel_action.cancel();
            }
            if should_draw {
                self.draw(terminal)?;
            }
            if self.cancel_action.is_cancelled() {
                break;
            }
        }

        Ok(())
    }

    /// Returns true when the event was handled here and must not reach components.
    #[instrument(skip(self))]
    fn handle_event(&mut self, event: &crossterm::event::Event) -> bool {
        let crossterm::event::Event::Key(key) = event else {
            return false;
        };
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if matches!(
            key,
            KeyEvent {
                code: KeyCode::Char('c' | 'q'),
                modifiers: KeyModifiers::CONTROL,
                ..
            }
        ) {
            info!("Quit requested");
            self.cancel_action.cancel();
            return true;
        }
        if key.code == KeyCode::F(1) {
            self.in_help = !self.in_help;
            return true;
        }
        if self.in_help {
            if key.code == KeyCode::Esc {
                self.in_help = false;
            }
            return true;
        }
        false
    }

    fn has_animated_components(&self) -> bool {
        self.components
            .iter()
            .any(|component| component.is_animating())
    }

    fn draw(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<impl std::io::Write>>,
    ) -> Result<(), AppError> {
        terminal.draw(|f| {
            let area = f.area();
            let layout = layout::Layout::new(area);
            for component in self.components.iter() {
                if let Some(p) = component.cursor() {
                    f.set_cursor_position(p);
                }
            }
            let buf = f.buffer_mut();
            let title = Paragraph::new(line![self.title.as_str()].style(Style::new().bold()));
            title.render(layout.title_bar, buf);

            for component in self.components.iter_mut() {
                component.render(layout, buf);
            }
            for component in self.dumb_components.iter_mut() {
                component.render(layout, buf);
            }
            if self.in_help {
                Popup::new(help_elements_to_text(HELP, area.width.saturating_sub(4) / 2))
                    .percent(50)
                    .block(
                        Block::bordered()
                            .title("Help (F1 or Esc to close)")
                            .border_type(BorderType::Rounded),
                    )
                    .render(area, buf);
            }
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Action {
    None,
    Tick,
    AppEvent(crossterm::event::Event),
    Session(SessionEvent),
}
