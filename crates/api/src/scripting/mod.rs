//! Application-level script orchestration (store + engine).

pub mod orchestrator;
