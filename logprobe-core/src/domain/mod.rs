//! Core domain types
//!
//! These types describe what logs should exist and what a backend reported.
//! They are shared between the clients (which decode backend responses) and
//! the engine (which decides whether delivery succeeded).

pub mod category;
pub mod group;
pub mod request;
pub mod result;
pub mod stream;

pub use category::{GroupingStrategy, LogCategory, ParseError};
pub use group::{GroupKey, LogGroup};
pub use request::{RequestError, VerificationRequest, VerificationRequestBuilder};
pub use result::VerificationResult;
pub use stream::{AuditSubtype, LogStream, NodeSource, StreamIdentity};
