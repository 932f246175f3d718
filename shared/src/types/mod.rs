//! Shared type definitions for the gateway services

pub mod error;

pub use error::CommonError;
