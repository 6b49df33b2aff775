//! Consents

pub mod config;
pub mod data;
mod details;
pub mod errors;
pub mod outcomes;
pub mod records;
mod repository;
pub mod service;

pub use config::{ApprovalMode, ConsentsConfig};
pub use errors::ConsentsServiceError;
pub use service::*;
