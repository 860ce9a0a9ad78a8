//! Login handshake.
//!
//! `Unauthenticated -> CodeRequested -> (PasswordRequired) -> Authenticated`,
//! with `Aborted` as the terminal failure state. Dialog and message operations
//! need an [`Authorized`] token, which only an authenticated session hands out.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::{ProtocolClient, ProtocolError, SignInOutcome};
use crate::types::Entity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    CodeRequested { phone: String },
    PasswordRequired { phone: String },
    Authenticated,
    Aborted,
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::CodeRequested { .. } => "code requested",
            AuthState::PasswordRequired { .. } => "password required",
            AuthState::Authenticated => "authenticated",
            AuthState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not connect: {0}")]
    Connectivity(#[source] ProtocolError),
    #[error("password rejected: {0}")]
    PasswordRejected(#[source] ProtocolError),
    #[error("login failed: {0}")]
    Protocol(#[source] ProtocolError),
    #[error("cannot {action} while {state}")]
    InvalidState { action: &'static str, state: AuthState },
}

/// What a submitted login code led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOutcome {
    Authenticated,
    PasswordRequired,
    /// The code was rejected; a new one may be submitted.
    Invalid(String),
}

/// Proof of an authenticated session.
#[derive(Clone)]
pub struct Authorized {
    client: Arc<dyn ProtocolClient>,
    me: Option<Entity>,
}

impl Authorized {
    pub fn client(&self) -> &Arc<dyn ProtocolClient> {
        &self.client
    }

    /// The signed-in user, when the login flow returned it.
    pub fn me(&self) -> Option<&Entity> {
        self.me.as_ref()
    }

    /// Invalidates the session on the server and locally.
    pub async fn log_out(self) -> Result<(), ProtocolError> {
        self.client.log_out().await
    }
}

impl fmt::Debug for Authorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorized").field("me", &self.me).finish_non_exhaustive()
    }
}

pub struct AuthSession {
    client: Arc<dyn ProtocolClient>,
    state: AuthState,
    me: Option<Entity>,
}

impl AuthSession {
    pub fn new(client: Arc<dyn ProtocolClient>) -> Self {
        Self {
            client,
            state: AuthState::Unauthenticated,
            me: None,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Opens the transport. Failures abort the session.
    pub async fn connect(&mut self) -> Result<(), AuthError> {
        self.expect_state("connect", |state| matches!(state, AuthState::Unauthenticated))?;
        self.client.connect().await.map_err(|error| {
            self.state = AuthState::Aborted;
            AuthError::Connectivity(error)
        })?;
        debug!("transport connected");
        Ok(())
    }

    /// Moves straight to `Authenticated` when a stored session is still valid.
    pub async fn restore(&mut self) -> Result<bool, AuthError> {
        if self.state == AuthState::Authenticated {
            return Ok(true);
        }
        self.expect_state("restore a session", |state| matches!(state, AuthState::Unauthenticated))?;

        let authorized = self.client.is_authorized().await.map_err(|error| self.abort(error))?;
        if authorized {
            info!("restored stored session");
            self.state = AuthState::Authenticated;
        }
        Ok(authorized)
    }

    /// Reuses a stored session or asks the server to send a login code.
    pub async fn ensure_authorized(&mut self, phone: &str) -> Result<&AuthState, AuthError> {
        if self.restore().await? {
            return Ok(&self.state);
        }

        self.client
            .send_code_request(phone)
            .await
            .map_err(|error| self.abort(error))?;
        info!("login code requested");
        self.state = AuthState::CodeRequested {
            phone: phone.to_string(),
        };
        Ok(&self.state)
    }

    pub async fn submit_code(&mut self, code: &str) -> Result<CodeOutcome, AuthError> {
        let AuthState::CodeRequested { phone } = &self.state else {
            return Err(self.invalid_state("submit a code"));
        };
        let phone = phone.clone();

        match self.client.sign_in(&phone, code.trim()).await {
            Ok(SignInOutcome::Authorized(me)) => {
                info!(user_id = me.id, "signed in");
                self.me = Some(me);
                self.state = AuthState::Authenticated;
                Ok(CodeOutcome::Authenticated)
            }
            Ok(SignInOutcome::PasswordRequired) => {
                debug!("two-factor password required");
                self.state = AuthState::PasswordRequired { phone };
                Ok(CodeOutcome::PasswordRequired)
            }
            Err(ProtocolError::Rejected(reason)) => {
                warn!(%reason, "login code rejected");
                Ok(CodeOutcome::Invalid(reason))
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    pub async fn submit_password(&mut self, password: &str) -> Result<(), AuthError> {
        self.expect_state("submit a password", |state| {
            matches!(state, AuthState::PasswordRequired { .. })
        })?;

        match self.client.check_password(password).await {
            Ok(me) => {
                info!(user_id = me.id, "signed in with password");
                self.me = Some(me);
                self.state = AuthState::Authenticated;
                Ok(())
            }
            Err(error @ (ProtocolError::Connection(_) | ProtocolError::NotConnected)) => Err(self.abort(error)),
            Err(error) => {
                self.state = AuthState::Aborted;
                Err(AuthError::PasswordRejected(error))
            }
        }
    }

    /// `None` until the session is authenticated.
    pub fn authorized(&self) -> Option<Authorized> {
        (self.state == AuthState::Authenticated).then(|| Authorized {
            client: Arc::clone(&self.client),
            me: self.me.clone(),
        })
    }

    fn abort(&mut self, error: ProtocolError) -> AuthError {
        self.state = AuthState::Aborted;
        match error {
            ProtocolError::Connection(_) | ProtocolError::NotConnected => AuthError::Connectivity(error),
            other => AuthError::Protocol(other),
        }
    }

    fn expect_state(&self, action: &'static str, allowed: impl Fn(&AuthState) -> bool) -> Result<(), AuthError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(action))
        }
    }

    fn invalid_state(&self, action: &'static str) -> AuthError {
        AuthError::InvalidState {
            action,
            state: self.state.clone(),
        }
    }
}
