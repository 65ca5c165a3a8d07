pub mod auth;
pub mod common;
pub mod memorization;
pub mod memorized;
pub mod middleware;
pub mod murajaah;
pub mod revision;
pub mod routes;
pub mod state;
pub mod stats;
pub mod surahs;
pub mod types;
pub mod vault;

// Re-export what the binaries need to assemble the server.
pub use middleware::require_auth;
pub use routes::{build_router, ApiDoc};
