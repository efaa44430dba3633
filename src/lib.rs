// Session Dispatch - authenticated request dispatch with session refresh

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hooks;
pub mod models;
pub mod request_builder;
pub mod store;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use models::request::{Method, RequestDescription, RequestFlags};
pub use models::response::Response;
