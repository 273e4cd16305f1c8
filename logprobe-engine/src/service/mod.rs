//! Service layer
//!
//! The verification logic proper: which groups must exist
//! ([`GroupClassifier`]), which streams they must hold ([`StreamMatcher`]),
//! and the per-category polling that ties both to a store ([`Verifier`]).

mod classifier;
mod matcher;
mod verifier;

pub use classifier::{Classification, GroupClassifier};
pub use matcher::{MatchReport, StreamMatcher};
pub use verifier::Verifier;
