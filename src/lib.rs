//! Purpose: Shared library crate used by the `tableio` CLI and tests.
//! Exports: `api` (stable surface), `core` (line reading, parsing, transposition, errors).
//! Role: Loads named numeric tables from ASCII table files and binary matrix stores.
//! Invariants: Tables handed to callers are always row-major.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
