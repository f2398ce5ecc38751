use shared::domain::User;
use tokio::sync::watch;
use tracing::info;

/// Client-visible authentication state for one page instance.
///
/// Created once at page start and shared by the controllers. The cookie that
/// actually authenticates requests lives in the HTTP client and is never read here.
pub struct SessionContext {
    state: watch::Sender<SessionState>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// Bumped on every establish/reset; a changed value means the session a
    /// request started under is gone.
    pub generation: u64,
}

impl SessionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state }
    }

    pub fn establish(&self, user: User) {
        info!(user_id = %user.id, "session established");
        self.state.send_modify(|state| {
            state.user = Some(user);
            state.generation += 1;
        });
    }

    /// Returns whether a session was active.
    pub fn reset(&self) -> bool {
        let mut was_active = false;
        self.state.send_modify(|state| {
            was_active = state.user.take().is_some();
            state.generation += 1;
        });
        if was_active {
            info!("session reset");
        }
        was_active
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().user.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
