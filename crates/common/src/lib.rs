//! Shared types for the face verification and media upload services.
//!
//! Both services speak the same JSON envelope on the wire: a `success`
//! wrapper around handler data, and a structured error body carrying the
//! HTTP status, a timestamp and optional per-field diagnostics.

pub mod envelope;

pub use envelope::{ErrorBody, SuccessBody};
