//! Scriptbox API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! orchestration) so integration tests and the binary entrypoint can both
//! access them.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod scripting;
pub mod state;
