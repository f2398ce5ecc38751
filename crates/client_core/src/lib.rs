//! Session and event coordination for the product catalog client.
//!
//! Two self-contained widgets ([`AuthWidget`], [`ListWidget`]) publish typed
//! events; [`SessionController`] and [`CatalogController`] react to them, talk
//! to the API through a [`CatalogBackend`] and push results back. [`CatalogPage`]
//! wires one instance of everything together.

pub mod auth_widget;
pub mod catalog_controller;
pub mod config;
pub mod error;
pub mod events;
pub mod list_widget;
pub mod notifications;
pub mod page;
pub mod session;
pub mod session_controller;
pub mod transport;

pub use auth_widget::{AuthFormState, AuthMode, AuthPhase, AuthWidget, SubmitOutcome};
pub use catalog_controller::CatalogController;
pub use config::{load_settings, ClientSettings};
pub use error::ClientError;
pub use events::{AuthEvent, EventBus, EventKind, MutationIntent, SessionSignal};
pub use list_widget::{FormError, ListError, ListWidget, ProductField, ProductRow};
pub use notifications::{NotificationSink, Toast, ToastBoard, ToastKind, ToastSink};
pub use page::CatalogPage;
pub use session::SessionContext;
pub use session_controller::{SessionController, SurfaceState, ViewMode};
pub use transport::{CatalogBackend, HttpBackend};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
