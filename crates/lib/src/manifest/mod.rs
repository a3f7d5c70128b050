//! The profile manifest.
//!
//! The manifest is the single source of truth for what a profile contains.
//! It is written into every generation as `manifest.json`; the symlink farm
//! beside it is derived from it and can be rebuilt at any time. Nothing
//! outside this module reads or writes that file.

mod types;

pub use types::*;
