//! Purpose: Library crate for the Steein social-graph API SDK and the `steein` CLI.
//! Exports: `api` (client, responses, typed graph values), `core` (casting engine, errors).
//! Role: Turns raw API replies into typed nodes, paginated edges, and classified errors.
//! Invariants: Casting and classification are pure; only `api::Client` performs I/O.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub(crate) mod json;
