//! CLI command implementations.

pub mod common;
pub mod config;
pub mod devices;
pub mod effect;
pub mod play;
pub mod render;
pub mod solve;
