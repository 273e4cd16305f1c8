//! Scheduler layer for verification
//!
//! Every verification question is answered by polling: a condition is
//! re-evaluated on a fixed interval until it reports success, fails fatally,
//! the deadline passes, or the caller cancels.

pub mod cancel;
pub mod poller;

pub use cancel::CancellationToken;
pub use poller::{Attempt, PollOutcome, poll_until};
