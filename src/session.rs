//! Top-level flow: login, then dialog list and chat loops.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{AuthError, AuthSession, AuthState, Authorized, CodeOutcome};
use crate::command::{CHAT_HELP, DIALOG_HELP, DialogCommand, parse_dialog_line};
use crate::config::SessionSettings;
use crate::console::{Console, ConsoleError};
use crate::dialogs::{DialogBrowser, select_by_index};
use crate::dispatch::{ChatContext, CommandDispatcher, Flow};
use crate::listener::UpdateListener;
use crate::media_index::FoundMediaIndex;
use crate::output::{dialog_line, help_lines, title_banner};
use crate::protocol::{ProtocolClient, ProtocolError};
use crate::types::Entity;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Console(#[from] ConsoleError),
    #[error("could not list dialogs: {0}")]
    Dialogs(#[source] ProtocolError),
    #[error("logout failed: {0}")]
    Logout(#[source] ProtocolError),
}

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Quit,
    LoggedOut,
}

pub struct InteractiveSession {
    client: Arc<dyn ProtocolClient>,
    console: Arc<dyn Console>,
    settings: SessionSettings,
}

impl InteractiveSession {
    pub fn new(client: Arc<dyn ProtocolClient>, console: Arc<dyn Console>, settings: SessionSettings) -> Self {
        Self {
            client,
            console,
            settings,
        }
    }

    /// Runs until the user quits or logs out. `phone` is prompted for when a
    /// login code is needed and none was given.
    pub async fn run(&self, phone: Option<&str>) -> Result<SessionExit, SessionError> {
        self.banner("Initialization")?;
        self.print("Connecting to the server...")?;

        let mut auth = AuthSession::new(Arc::clone(&self.client));
        auth.connect().await?;
        let authorized = self.authenticate(&mut auth, phone).await?;
        self.welcome(&authorized).await?;

        let listener = match self.client.subscribe_updates().await {
            Ok(updates) => Some(UpdateListener::spawn(updates, Arc::clone(&self.console))),
            Err(error) => {
                warn!(%error, "live updates unavailable");
                None
            }
        };

        let result = self.browse(&authorized).await;
        if let Some(listener) = listener {
            listener.stop();
        }

        match result {
            Err(SessionError::Console(ConsoleError::Closed)) => {
                info!("input closed, quitting");
                Ok(SessionExit::Quit)
            }
            other => other,
        }
    }

    async fn authenticate(&self, auth: &mut AuthSession, phone: Option<&str>) -> Result<Authorized, SessionError> {
        if !auth.restore().await? {
            let phone = match phone.map(str::trim).filter(|phone| !phone.is_empty()) {
                Some(phone) => phone.to_string(),
                None => self.read_non_empty("Enter your phone").await?,
            };
            self.print("First run. Sending code request...")?;
            auth.ensure_authorized(&phone).await?;
        }

        loop {
            if let Some(authorized) = auth.authorized() {
                return Ok(authorized);
            }
            let state = auth.state().clone();
            match state {
                AuthState::CodeRequested { .. } => {
                    let code = self.read_non_empty("Enter the code you just received").await?;
                    if let CodeOutcome::Invalid(reason) = auth.submit_code(&code).await? {
                        self.print(&format!("Invalid code ({reason}). Please try again."))?;
                    }
                }
                AuthState::PasswordRequired { .. } => {
                    self.print("Two-step verification is enabled.")?;
                    let password = self.console.read_password("Please enter your password").await?;
                    auth.submit_password(&password).await?;
                }
                state => {
                    return Err(AuthError::InvalidState {
                        action: "finish login",
                        state,
                    }
                    .into());
                }
            }
        }
    }

    async fn welcome(&self, authorized: &Authorized) -> Result<(), ConsoleError> {
        let me = match authorized.me() {
            Some(me) => Some(me.clone()),
            None => match self.client.get_me().await {
                Ok(me) => Some(me),
                Err(error) => {
                    warn!(%error, "could not fetch the signed-in user");
                    None
                }
            },
        };
        if let Some(me) = me {
            self.print(&format!("Welcome, {}.", me.display_name()))?;
        }
        Ok(())
    }

    async fn browse(&self, authorized: &Authorized) -> Result<SessionExit, SessionError> {
        let browser = DialogBrowser::new(authorized);
        let dispatcher = CommandDispatcher::new(authorized, Arc::clone(&self.console), self.settings.clone());
        let mut media = FoundMediaIndex::new();

        loop {
            self.banner("Dialogs window")?;
            let dialogs = browser
                .list_top(self.settings.dialog_page_size)
                .await
                .map_err(SessionError::Dialogs)?;
            if dialogs.is_empty() {
                self.print("No dialogs yet.")?;
            }
            for (index, dialog) in dialogs.iter().enumerate() {
                self.print(&dialog_line(index + 1, dialog, self.settings.columns))?;
            }
            self.print("")?;
            self.print("> Who do you want to send messages to?")?;
            self.print("> Available commands:")?;
            for line in help_lines(DIALOG_HELP) {
                self.print(&line)?;
            }
            self.print("")?;

            let peer = loop {
                let line = self.console.read_line("Enter dialog ID or a command").await?;
                match parse_dialog_line(&line) {
                    DialogCommand::Quit => return Ok(SessionExit::Quit),
                    DialogCommand::Logout => {
                        authorized.clone().log_out().await.map_err(SessionError::Logout)?;
                        self.print("Logged out. Bye!")?;
                        return Ok(SessionExit::LoggedOut);
                    }
                    DialogCommand::Select(input) => match select_by_index(&dialogs, &input) {
                        Ok(dialog) => break dialog.entity.clone(),
                        Err(error) => self.print(&format!("Invalid selection: {error}"))?,
                    },
                }
            };

            if self.chat(&dispatcher, &peer, &mut media).await? == Flow::Exit {
                return Ok(SessionExit::Quit);
            }
        }
    }

    async fn chat(
        &self,
        dispatcher: &CommandDispatcher,
        peer: &Entity,
        media: &mut FoundMediaIndex,
    ) -> Result<Flow, SessionError> {
        self.banner(&format!("Chat with \"{}\"", peer.display_name()))?;
        self.print("Available commands:")?;
        for line in help_lines(CHAT_HELP) {
            self.print(&line)?;
        }
        self.print("")?;

        let mut chat = ChatContext { peer, media };
        loop {
            let line = self.console.read_line("Enter a message").await?;
            match dispatcher.dispatch_line(&line, &mut chat).await? {
                Flow::Continue => {}
                flow => return Ok(flow),
            }
        }
    }

    async fn read_non_empty(&self, prompt: &str) -> Result<String, ConsoleError> {
        loop {
            let line = self.console.read_line(prompt).await?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }

    fn banner(&self, title: &str) -> Result<(), ConsoleError> {
        self.print("")?;
        self.print(&title_banner(title, self.settings.columns))
    }

    fn print(&self, line: &str) -> Result<(), ConsoleError> {
        self.console.print(line)
    }
}
