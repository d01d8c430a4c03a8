//! Purpose: Define the public Rust API boundary for the Steein SDK.
//! Exports: Client, configuration, tokens, responses, and typed model views.
//! Role: Stable surface for applications and the `steein` CLI.
//! Invariants: Casting types are re-exported from `core` rather than duplicated.
//! Invariants: No process-wide state; configuration and registries are passed in.

mod client;
mod config;
mod models;
mod response;
mod token;

pub use crate::core::cast::{GraphCaster, is_edge_shaped, is_list_like};
pub use crate::core::classify::{ApiError, ApiErrorKind, classify};
pub use crate::core::edge::{Edge, PageDirection};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::node::{FieldValue, Node};
pub use crate::core::request::{Method, Request};
pub use crate::core::scalar::{Timestamp, cast_scalar};
pub use crate::core::subtype::{Subtype, SubtypeRegistry, SubtypeRegistryBuilder};
pub use client::{Client, HttpRequest, Transport, UreqTransport};
pub use config::{
    Config, ENV_ACCESS_TOKEN, ENV_API_VERSION, ENV_BASE_URL, ENV_CLIENT_ID, ENV_CLIENT_SECRET,
    ENV_TIMEOUT_SECS,
};
pub use models::{Media, PostMedia, User};
pub use response::{RawResponse, Response};
pub use token::{AccessToken, App};

/// Decodes a raw response body the way `Response` does.
pub fn decode_body(raw: &str) -> serde_json::Value {
    crate::json::parse::decode_body(raw)
}
