//! CLI command implementations.

pub mod info;
pub mod shuffle;
pub mod verify;
