//! HTTP server for Voicechain.

pub mod routes;
pub mod server;
pub mod state;

pub use routes::api_router;
pub use server::start_server;
pub use state::AppState;
