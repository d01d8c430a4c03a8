// Core modules implementing graph casting, pagination, and error modeling.
pub mod cast;
pub mod classify;
pub mod edge;
pub mod error;
pub mod node;
pub mod request;
pub mod scalar;
pub mod subtype;
pub mod url;
