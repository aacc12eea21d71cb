//! Service layer for business logic
//!
//! Shared between the HTTP admin API and tests.

mod experiment_service;

pub use experiment_service::*;
