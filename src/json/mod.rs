//! Purpose: Internal decoding boundary for raw API response bodies.
//! Exports: `parse` module with the body decoder used by responses and the CLI.
//! Role: Single seam for body decoding so callsites avoid ad hoc fallbacks.
//! Invariants: Decoding never fails; every body maps to a JSON value.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
