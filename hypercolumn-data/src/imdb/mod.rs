//! Image database abstraction and the manifest-backed implementation.

mod database;
mod manifest;

pub use database::*;
pub use manifest::*;
