//! Triad CLI library.
//!
//! Argument parsing and command handlers for the `triad` binary.

pub mod cli;
pub mod commands;
pub mod demo;
