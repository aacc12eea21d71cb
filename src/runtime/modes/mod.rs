//! Mode routing
//!
//! The binary currently has a single long-running mode (HTTP server);
//! one-shot commands are handled directly in `main`.

pub mod server;

pub use server::run_server;
