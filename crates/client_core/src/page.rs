//! Page composition and the orchestration loop between widgets and controllers.

use std::sync::Arc;

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    auth_widget::AuthWidget,
    catalog_controller::CatalogController,
    config::ClientSettings,
    error::ClientError,
    events::{AuthEvent, BusEvent, MutationIntent, SessionSignal},
    list_widget::ListWidget,
    notifications::{NotificationSink, ToastSink},
    session::SessionContext,
    session_controller::SessionController,
    transport::{CatalogBackend, HttpBackend},
};

/// Owns every component of one page instance.
pub struct CatalogPage {
    pub session: Arc<SessionContext>,
    pub toasts: Arc<ToastSink>,
    pub auth: Arc<AuthWidget>,
    pub list: Arc<ListWidget>,
    pub catalog: Arc<CatalogController>,
    pub session_controller: Arc<SessionController>,
}

impl CatalogPage {
    pub fn connect(settings: &ClientSettings) -> Result<Self, ClientError> {
        let backend = HttpBackend::new(settings)?;
        info!(base_url = %backend.base_url(), "catalog page connecting");
        Ok(Self::new(Arc::new(backend), settings))
    }

    pub fn new(backend: Arc<dyn CatalogBackend>, settings: &ClientSettings) -> Self {
        let capacity = settings.event_capacity;
        let session = Arc::new(SessionContext::new());
        let toasts = Arc::new(ToastSink::new(settings.toast_ttl));
        let notifier: Arc<dyn NotificationSink> = toasts.clone();

        let auth = Arc::new(AuthWidget::new(Arc::clone(&backend), capacity));
        let list = Arc::new(ListWidget::new(capacity));
        let catalog = Arc::new(CatalogController::new(
            backend,
            Arc::clone(&session),
            Arc::clone(&list),
            Arc::clone(&notifier),
            capacity,
        ));
        let session_controller = Arc::new(SessionController::new(
            Arc::clone(&session),
            Arc::clone(&list),
            Arc::clone(&catalog),
            notifier,
        ));

        Self {
            session,
            toasts,
            auth,
            list,
            catalog,
            session_controller,
        }
    }

    /// Subscribes to every bus and spawns the orchestration loop.
    ///
    /// Subscriptions are taken before this returns, so no event published
    /// afterwards is missed. Each event is handled on its own task: handlers are
    /// not serialized against each other and in-flight requests are never cancelled.
    pub fn start(&self) -> JoinHandle<()> {
        let auth_rx = self.auth.subscribe();
        let list_rx = self.list.subscribe();
        let signal_rx = self.catalog.subscribe_signals();
        tokio::spawn(orchestrate(
            auth_rx,
            list_rx,
            signal_rx,
            Arc::clone(&self.session_controller),
            Arc::clone(&self.catalog),
        ))
    }
}

async fn orchestrate(
    mut auth_rx: broadcast::Receiver<AuthEvent>,
    mut list_rx: broadcast::Receiver<MutationIntent>,
    mut signal_rx: broadcast::Receiver<SessionSignal>,
    session_controller: Arc<SessionController>,
    catalog: Arc<CatalogController>,
) {
    info!("orchestration loop started");
    loop {
        tokio::select! {
            event = auth_rx.recv() => match event {
                Ok(event) => {
                    debug!(kind = %event.kind(), "dispatching auth event");
                    let controller = Arc::clone(&session_controller);
                    tokio::spawn(async move { controller.handle_auth_event(event).await });
                }
                Err(err) => if !keep_listening("auth", err) { break },
            },
            intent = list_rx.recv() => match intent {
                Ok(intent) => {
                    debug!(kind = %intent.kind(), "dispatching mutation intent");
                    let catalog = Arc::clone(&catalog);
                    tokio::spawn(async move {
                        if let Err(err) = catalog.apply_mutation(intent).await {
                            debug!("mutation ended without success: {err}");
                        }
                    });
                }
                Err(err) => if !keep_listening("list", err) { break },
            },
            signal = signal_rx.recv() => match signal {
                Ok(signal) => session_controller.handle_signal(signal),
                Err(err) => if !keep_listening("catalog", err) { break },
            },
        }
    }
    info!("orchestration loop stopped");
}

fn keep_listening(source: &'static str, err: RecvError) -> bool {
    match err {
        RecvError::Lagged(skipped) => {
            warn!(source, skipped, "event subscriber lagged; events dropped");
            true
        }
        RecvError::Closed => false,
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
