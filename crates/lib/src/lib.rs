//! prof-lib: profiles over a content-addressed package store
//!
//! This crate provides the pieces behind `prof`:
//! - `ProfileManifest`: the versioned list of elements installed in a profile
//! - `Matcher`: selection of elements by position, store path or pattern
//! - `profile::build`: projection of a manifest into an immutable store object
//! - `ops`: install, remove, upgrade and info over a `ProfileContext`
//!
//! The store, the resolver, the environment builder and the generation
//! pointer are traits with local filesystem implementations.

pub mod buildenv;
pub mod consts;
pub mod manifest;
pub mod matcher;
pub mod ops;
pub mod platform;
pub mod profile;
pub mod reference;
pub mod resolve;
pub mod store;
pub mod store_lock;
pub mod util;
