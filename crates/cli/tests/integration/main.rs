//! End-to-end tests driving the prof binary against isolated directories.

mod common;
mod profile_tests;
