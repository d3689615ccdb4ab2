use anyhow::anyhow;
use inquire::Password;
use keyring::Entry;
use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::backend::github::GithubBackend;
use crate::errors::AppError;
use crate::session::SessionConfig;
use crate::{logging, ui};

const KEYRING_SERVICE: &str = "chorus";
const KEYRING_USER: &str = "github";

pub struct App {
    pub owner: String,
    pub repo: String,
    pub issue: String,
    config: SessionConfig,
    backend: Arc<GithubBackend>,
}

impl App {
    pub async fn new(cli: cli::Cli) -> Result<Self, AppError> {
        let args = cli.args;
        logging::init(args.log_level)?;
        let (Some(owner), Some(repo), Some(issue)) = (args.owner, args.repo, args.issue) else {
            return Err(anyhow!("owner, repo and issue are required").into());
        };
        let token = match args.token {
            Some(token) => token,
            None => Self::keyring_token()?,
        };
        let backend = GithubBackend::connect(token, owner.clone(), repo.clone()).await?;
        let config = SessionConfig {
            mention_debounce: Duration::from_millis(args.debounce_ms),
            ..Default::default()
        };
        Ok(Self {
            owner,
            repo,
            issue,
            config,
            backend: Arc::new(backend),
        })
    }

    pub async fn run(&mut self) -> Result<(), AppError> {
        info!(owner = %self.owner, repo = %self.repo, issue = %self.issue, "Starting");
        let state = ui::AppState::new(
            self.repo.clone(),
            self.owner.clone(),
            self.backend.current_user().to_string(),
            self.issue.clone(),
        );
        ui::run(state, self.backend.clone(), self.config.clone()).await
    }

    pub fn store_token(token: &str) -> Result<(), AppError> {
        Entry::new(KEYRING_SERVICE, KEYRING_USER)?.set_password(token)?;
        Ok(())
    }

    fn keyring_token() -> Result<String, AppError> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Self::handle_no_token(&entry),
            Err(err) => Err(err.into()),
        }
    }

    fn handle_no_token(entry: &Entry) -> Result<String, AppError> {
        let prompt = Password::new("No token found. Please enter your github token")
            .with_display_toggle_enabled()
            .without_confirmation()
            .with_display_mode(inquire::PasswordDisplayMode::Masked);
        let token = prompt.prompt()?;
        entry.set_password(&token)?;
        Ok(token)
    }
}

pub mod cli;
