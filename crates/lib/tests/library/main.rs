//! Library tests exercising profile operations against real directories.

mod common;
mod profile_tests;
