//! Decoding and in-place patching of World Conqueror 4 save files.
//!
//! [`save`] walks the file once and builds both the model and the
//! [`registry::OffsetRegistry`] of patchable locations. [`patch`] writes
//! through those offsets, and [`core_api`] wraps both behind a session with
//! the higher-level edit recipes.

pub mod core_api;
pub mod error;
pub mod grid;
pub mod layout;
pub mod patch;
pub mod reader;
pub mod registry;
pub mod save;
