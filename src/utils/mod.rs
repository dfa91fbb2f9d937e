//! Utility modules: developer logging, JSON conversion, numeric helpers.
pub mod devlog;
pub mod json;
pub mod num;
