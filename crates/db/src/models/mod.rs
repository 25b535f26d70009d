//! Row structs for the `scripts` table.

pub mod script;
