//! Script execution core.
//!
//! Holds the script record model, the [`store::ScriptStore`] contract, and the
//! [`scripting`] module that binds caller values into a fresh JavaScript scope,
//! evaluates the script and serializes the result back to JSON. Nothing in
//! this crate touches the network or a concrete database.

pub mod error;
pub mod script;
pub mod scripting;
pub mod store;
pub mod types;
