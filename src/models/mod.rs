// Data models for requests, responses and credentials

pub mod auth;
pub mod request;
pub mod response;
