//! Tubely API Library
//!
//! HTTP handlers, JWT authentication, and application setup for the upload
//! service.

pub mod auth;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
mod utils;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
