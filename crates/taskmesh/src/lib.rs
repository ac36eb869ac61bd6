// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! taskmesh command-line host
//!
//! Drives [`taskmesh_core`] against a JSON snapshot store: users, projects,
//! tasks, dependency edges and order resolution.
//!
//! Every invocation loads the snapshot, runs one command and, if the command
//! changed anything, writes the snapshot back.

// Command output is written to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing initialization.
pub mod tracing;
