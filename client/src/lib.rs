/// Duet - two-party messaging client
///
/// A polling messaging client built around a synchronization engine:
/// optimistic local echo, reconciliation against a remote store service,
/// and cancellable per-view polling loops.

pub mod app;
pub mod config;
pub mod error;
pub mod poller;
pub mod profile;
pub mod reconcile;
pub mod session;
pub mod store_client;
pub mod types;
pub mod view;

pub use config::Config;
pub use error::{DuetError, Result};
pub use reconcile::Reconciler;
pub use session::Session;
pub use store_client::StoreClient;
