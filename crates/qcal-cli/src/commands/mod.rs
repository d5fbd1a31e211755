//! CLI command implementations.

pub mod calibrate;
pub mod common;
pub mod graph;
pub mod nodes;
pub mod order;
pub mod reset;
pub mod restore;
pub mod status;
