//! Revlight Client - HTTP client for the Revlight review backend
//!
//! This crate submits code to the review backend and polls for the
//! asynchronous feedback it produces.

mod backend;
mod client;
mod error;
mod feedback;
mod submit;

pub use client::ReviewClient;
pub use error::{Error, Result};
pub use feedback::FeedbackStatus;
