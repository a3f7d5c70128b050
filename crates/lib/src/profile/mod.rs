//! Profile building and publishing.
//!
//! A profile is a symlink pointing, through a numbered generation link, at an
//! immutable store object built from a manifest. [`build`] produces the
//! object; a [`ProfilePointer`] makes it current.

mod builder;
mod generations;

pub use builder::{BuildError, build};
pub use generations::{Generation, GenerationError, Generations, ProfilePointer};
