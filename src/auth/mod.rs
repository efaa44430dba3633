// Authentication module
// Manages the refresh sub-protocol and the remote auth service

mod manager;
mod refresh;

pub use manager::SessionManager;
pub use refresh::{AuthService, HttpAuthService};
