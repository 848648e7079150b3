#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the shelfmark application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod passkey;
pub mod session;
pub mod settings;

/// Re-export commonly used items
pub use handlers::health;
pub use passkey::{CeremonyError, CeremonyOrchestrator};
pub use session::{SessionManager, SessionService};
pub use settings::ShelfmarkSettings;
