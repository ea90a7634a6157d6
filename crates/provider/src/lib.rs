//! Transform Provider Client.
//!
//! Wraps an external image-generation service behind the
//! [`TransformProvider`] trait and exposes the two named operations
//! (background removal, studio white background) through
//! [`TransformClient`]. [`GeminiApi`] is the HTTP implementation.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod prompts;

pub use api::GeminiApi;
pub use client::{Transform, TransformClient, TransformProvider};
pub use config::ProviderConfig;
pub use error::ProviderError;
