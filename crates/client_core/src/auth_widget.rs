//! Credential form: login/registration submission and logout.
//!
//! The widget owns its form state and reports outcomes only through its
//! [`EventBus`]; it knows nothing about the product list.

use std::sync::Arc;

use shared::domain::{Credentials, User};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    events::{AuthEvent, EventBus},
    transport::CatalogBackend,
};

pub const EMPTY_CREDENTIALS_MESSAGE: &str = "Username and password must not be empty.";
pub const REGISTERED_MESSAGE: &str = "Registration successful. You can now log in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::Register => "Sign up",
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub phase: AuthPhase,
    pub username: String,
    pub password: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

enum SubmitGate {
    Busy,
    Invalid,
    Ready(AuthMode, Credentials),
}

impl AuthFormState {
    /// Clean template for `mode`.
    pub fn fresh(mode: AuthMode) -> Self {
        Self {
            mode,
            phase: AuthPhase::Idle,
            username: String::new(),
            password: String::new(),
            error: None,
            notice: None,
        }
    }

    pub fn submit_enabled(&self) -> bool {
        self.phase == AuthPhase::Idle
    }

    fn begin_submit(&mut self) -> SubmitGate {
        if self.phase == AuthPhase::Submitting {
            return SubmitGate::Busy;
        }
        self.error = None;
        self.notice = None;

        let username = self.username.trim();
        let password = self.password.trim();
        if username.is_empty() || password.is_empty() {
            self.error = Some(EMPTY_CREDENTIALS_MESSAGE.to_string());
            return SubmitGate::Invalid;
        }

        let credentials = Credentials::new(username, password);
        self.phase = AuthPhase::Submitting;
        SubmitGate::Ready(self.mode, credentials)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A submission was already in flight.
    Ignored,
    /// Local validation failed; nothing was sent.
    Rejected,
    Authenticated(User),
    Registered,
    Failed(String),
}

pub struct AuthWidget {
    backend: Arc<dyn CatalogBackend>,
    form: watch::Sender<AuthFormState>,
    events: EventBus<AuthEvent>,
}

impl AuthWidget {
    pub fn new(backend: Arc<dyn CatalogBackend>, event_capacity: usize) -> Self {
        let (form, _) = watch::channel(AuthFormState::fresh(AuthMode::Login));
        Self {
            backend,
            form,
            events: EventBus::new(event_capacity),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<AuthFormState> {
        self.form.subscribe()
    }

    pub fn state(&self) -> AuthFormState {
        self.form.borrow().clone()
    }

    pub fn mode(&self) -> AuthMode {
        self.form.borrow().mode
    }

    pub fn set_username(&self, value: &str) {
        self.form.send_modify(|form| form.username = value.to_string());
    }

    pub fn set_password(&self, value: &str) {
        self.form.send_modify(|form| form.password = value.to_string());
    }

    /// Switches between login and registration with a clean form.
    ///
    /// Returns `false` without changing anything while a submission is in flight.
    pub fn toggle_mode(&self) -> bool {
        let toggled = self.form.send_if_modified(|form| {
            if form.phase == AuthPhase::Submitting {
                return false;
            }
            *form = AuthFormState::fresh(form.mode.toggled());
            true
        });
        if toggled {
            info!(mode = ?self.mode(), "auth form mode changed");
        }
        toggled
    }

    pub fn show_error(&self, message: &str) {
        self.form.send_modify(|form| form.error = Some(message.to_string()));
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let mut gate = SubmitGate::Busy;
        self.form.send_modify(|form| gate = form.begin_submit());

        let (mode, credentials) = match gate {
            SubmitGate::Busy => return SubmitOutcome::Ignored,
            SubmitGate::Invalid => return SubmitOutcome::Rejected,
            SubmitGate::Ready(mode, credentials) => (mode, credentials),
        };
        let _in_flight = InFlight { form: &self.form };

        info!(?mode, username = %credentials.username, "submitting credentials");
        let outcome = match mode {
            AuthMode::Login => match self.backend.login(&credentials).await {
                Ok(user) => SubmitOutcome::Authenticated(user),
                Err(err) => SubmitOutcome::Failed(failure_message(&err)),
            },
            AuthMode::Register => match self.backend.register(&credentials).await {
                Ok(()) => SubmitOutcome::Registered,
                Err(err) => SubmitOutcome::Failed(failure_message(&err)),
            },
        };

        self.form.send_modify(|form| {
            form.phase = AuthPhase::Idle;
            match &outcome {
                SubmitOutcome::Registered => form.notice = Some(REGISTERED_MESSAGE.to_string()),
                SubmitOutcome::Failed(message) => form.error = Some(message.clone()),
                _ => {}
            }
        });

        if let SubmitOutcome::Authenticated(user) = &outcome {
            self.events.publish(AuthEvent::Success { user: user.clone() });
        }
        outcome
    }

    /// Ends the server session, then resets the form and emits `auth-logout`
    /// whether or not the server call succeeded.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.backend.logout().await;
        self.form.send_modify(|form| {
            *form = AuthFormState::fresh(AuthMode::Login);
            if let Err(err) = &result {
                form.error = Some(err.user_message());
            }
        });
        if let Err(err) = &result {
            warn!("logout call failed: {err}");
        }
        self.events.publish(AuthEvent::Logout);
        result
    }
}

/// Puts the form back to `Idle` if the submission future is dropped before it finishes.
struct InFlight<'a> {
    form: &'a watch::Sender<AuthFormState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let released = self.form.send_if_modified(|form| {
            if form.phase != AuthPhase::Submitting {
                return false;
            }
            form.phase = AuthPhase::Idle;
            true
        });
        if released {
            debug!("abandoned credential submission released the form");
        }
    }
}

fn failure_message(err: &ClientError) -> String {
    warn!("credential submission failed: {err}");
    err.user_message()
}

#[cfg(test)]
#[path = "tests/auth_widget_tests.rs"]
mod tests;
