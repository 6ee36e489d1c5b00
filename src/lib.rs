/// Lumen sync server
///
/// Account, session, and cloud-sync backend for the Lumen focus app's
/// premium tier: magic-link login, a single renewable session per account,
/// entitlement revocation, and whole-snapshot sync.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod mailer;
pub mod metrics;
pub mod server;
pub mod store;
pub mod sync;
pub mod token;
