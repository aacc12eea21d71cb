//! qrlinker - dynamic QR code redirect service
//!
//! Resolves scanned QR tokens to destinations through scheduling and
//! password gates, splits traffic across weighted A/B variants with
//! sticky assignments, and reports two-proportion significance.
//!
//! # Architecture
//! - `experiment`: bucketing, variant selection, significance, winner
//! - `resolver`: scan resolution state machine and unlock tokens
//! - `storage`: SeaORM backend and the resolver's data access trait
//! - `services`: experiment lifecycle management
//! - `api`: HTTP handlers and middleware
//! - `config`: static configuration
//! - `runtime`: application startup and server mode
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod experiment;
pub mod resolver;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
