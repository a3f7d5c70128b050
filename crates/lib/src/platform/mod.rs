//! Platform-specific paths and filesystem primitives.

pub mod immutable;
pub mod link;
pub mod paths;
