//! All catalog HTTP traffic: full loads and mutations followed by a reload.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, NO_SESSION_MESSAGE},
    events::{BusEvent, EventBus, MutationIntent, SessionSignal},
    list_widget::ListWidget,
    notifications::NotificationSink,
    session::SessionContext,
    transport::CatalogBackend,
};

pub struct CatalogController {
    backend: Arc<dyn CatalogBackend>,
    session: Arc<SessionContext>,
    list: Arc<ListWidget>,
    notifier: Arc<dyn NotificationSink>,
    signals: EventBus<SessionSignal>,
}

impl CatalogController {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        session: Arc<SessionContext>,
        list: Arc<ListWidget>,
        notifier: Arc<dyn NotificationSink>,
        event_capacity: usize,
    ) -> Self {
        Self {
            backend,
            session,
            list,
            notifier,
            signals: EventBus::new(event_capacity),
        }
    }

    /// `SessionSignal::Unauthenticated` is published here whenever the API answers 401.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    /// Fetches the canonical list and pushes it into the list widget.
    ///
    /// Failures are surfaced before returning: 401 as a session signal, anything
    /// else as an error toast. The cache is only written on success.
    pub async fn load_all(&self) -> Result<usize, ClientError> {
        self.ensure_session()?;

        match self.backend.list_products().await {
            Ok(items) => {
                let count = items.len();
                self.list.set_data(items);
                debug!(items = count, "catalog reloaded");
                Ok(count)
            }
            Err(err) => {
                if err.requires_reauth() {
                    self.signal_unauthenticated("list_products");
                } else {
                    self.notifier
                        .error(&format!("Could not load products: {}", err.user_message()));
                }
                Err(err)
            }
        }
    }

    /// Sends the mutation once, then reloads the full list unless the API answered 401.
    ///
    /// The returned result describes the mutation itself; reload failures are
    /// surfaced by [`CatalogController::load_all`].
    pub async fn apply_mutation(&self, intent: MutationIntent) -> Result<(), ClientError> {
        self.ensure_session()?;
        let generation = self.session.generation();

        let kind = intent.kind().as_str();
        info!(kind, "applying mutation");
        let (result, success_message, failure_message) = match &intent {
            MutationIntent::Create { item } => (
                self.backend.create_product(item).await,
                "Product created successfully",
                "Could not create product",
            ),
            MutationIntent::Edit { item } => (
                self.backend.update_product(item).await,
                "Product updated successfully",
                "Could not update product",
            ),
            MutationIntent::Delete { id } => (
                self.backend.delete_product(id).await,
                "Product deleted successfully",
                "Could not delete product",
            ),
        };

        // A session torn down while the call was in flight owns the page now.
        let superseded = self.session.generation() != generation;
        match result {
            Err(err) if err.requires_reauth() => {
                if !superseded {
                    self.signal_unauthenticated(kind);
                }
                Err(err)
            }
            Err(err) => {
                warn!(kind, "mutation failed: {err}");
                if superseded {
                    debug!(kind, "session changed during mutation; skipping reload");
                    return Err(err);
                }
                self.notifier
                    .error(&format!("{failure_message}: {}", err.user_message()));
                let _ = self.load_all().await;
                Err(err)
            }
            Ok(()) if superseded => {
                debug!(kind, "session changed during mutation; skipping reload");
                Ok(())
            }
            Ok(()) => {
                if self.load_all().await.is_ok() {
                    self.notifier.success(success_message);
                }
                Ok(())
            }
        }
    }

    fn ensure_session(&self) -> Result<(), ClientError> {
        if self.session.is_active() {
            return Ok(());
        }
        debug!("catalog call refused without a session");
        self.notifier.warning(NO_SESSION_MESSAGE);
        Err(ClientError::NoSession)
    }

    fn signal_unauthenticated(&self, operation: &str) {
        warn!(operation, "catalog api rejected the session");
        self.signals.publish(SessionSignal::Unauthenticated);
    }
}

#[cfg(test)]
#[path = "tests/catalog_controller_tests.rs"]
mod tests;
