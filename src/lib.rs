//! Purpose: Shared library crate backing the `bloglist` CLI, server, and tests.
//! Exports: `core` (entries, store, errors) and `api` (public surface + remote client).
//! Role: Internal library behind the binary; not yet a stable public SDK.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
