//! Visibility of the authenticated surface and recovery from logout or expiry.

use std::sync::Arc;

use shared::domain::User;
use tokio::sync::watch;
use tracing::info;

use crate::{
    catalog_controller::CatalogController,
    events::{AuthEvent, SessionSignal},
    list_widget::ListWidget,
    notifications::NotificationSink,
    session::SessionContext,
};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Admin,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceState {
    pub auth_visible: bool,
    pub catalog_visible: bool,
    pub view_mode: Option<ViewMode>,
}

impl SurfaceState {
    fn signed_out() -> Self {
        Self {
            auth_visible: true,
            catalog_visible: false,
            view_mode: None,
        }
    }

    fn signed_in(user: &User) -> Self {
        let view_mode = if user.role.is_admin() {
            ViewMode::Admin
        } else {
            ViewMode::Standard
        };
        Self {
            auth_visible: false,
            catalog_visible: true,
            view_mode: Some(view_mode),
        }
    }
}

pub struct SessionController {
    session: Arc<SessionContext>,
    list: Arc<ListWidget>,
    catalog: Arc<CatalogController>,
    notifier: Arc<dyn NotificationSink>,
    surfaces: watch::Sender<SurfaceState>,
}

impl SessionController {
    pub fn new(
        session: Arc<SessionContext>,
        list: Arc<ListWidget>,
        catalog: Arc<CatalogController>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (surfaces, _) = watch::channel(SurfaceState::signed_out());
        Self {
            session,
            list,
            catalog,
            notifier,
            surfaces,
        }
    }

    pub fn surfaces(&self) -> SurfaceState {
        *self.surfaces.borrow()
    }

    pub fn watch_surfaces(&self) -> watch::Receiver<SurfaceState> {
        self.surfaces.subscribe()
    }

    pub async fn handle_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::Success { user } => self.on_authenticated(user).await,
            AuthEvent::Logout => self.on_logout(),
        }
    }

    pub fn handle_signal(&self, signal: SessionSignal) {
        match signal {
            SessionSignal::Unauthenticated => self.on_expired(),
        }
    }

    async fn on_authenticated(&self, user: User) {
        info!(user_id = %user.id, role = ?user.role, "showing catalog surface");
        let surfaces = SurfaceState::signed_in(&user);
        self.session.establish(user);
        self.surfaces.send_replace(surfaces);
        // Failures are already surfaced by the controller (toast or signal).
        let _ = self.catalog.load_all().await;
    }

    fn on_logout(&self) {
        info!("logged out; hiding catalog surface");
        self.sign_out(None);
    }

    /// Client-visible teardown only; the server credential is left alone.
    fn on_expired(&self) {
        info!("session expired; returning to auth surface");
        self.sign_out(Some(SESSION_EXPIRED_MESSAGE));
    }

    fn sign_out(&self, notice: Option<&str>) {
        self.session.reset();
        self.list.set_data(Vec::new());
        if let Some(message) = notice {
            self.notifier.error(message);
        }
        // Surfaces flip last so observers see a fully cleared page.
        self.surfaces.send_replace(SurfaceState::signed_out());
    }
}

#[cfg(test)]
#[path = "tests/session_controller_tests.rs"]
mod tests;
