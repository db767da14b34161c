//! Shared building blocks for the users service.
//!
//! Configuration, the error taxonomy, the JSON response envelope, the user
//! record model and HTTP middleware live here so the service crate only
//! carries routing and data access.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
