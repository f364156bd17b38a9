//! Common utilities shared across services.
//!
//! This crate provides:
//! - Unified error handling
//! - The structured `Outcome` returned by write operations
//! - Configuration structures

pub mod config;
pub mod error;
pub mod outcome;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
pub use outcome::{FailureKind, Outcome};
