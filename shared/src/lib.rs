//! Shared utilities and types for the blob gateway services

pub mod observability;
pub mod types;
