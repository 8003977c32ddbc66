//! Shared utilities

pub mod fs;
pub mod logging;
pub mod network;
pub mod validation;
