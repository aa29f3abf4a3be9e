//! Change intake: the two producers feeding the apply engine.
//!
//! - [`webhook`]: push path, one notification per inbound HTTP request.
//! - [`poll`]: pull path, periodic batch scan catching missed events.
//!
//! Both producers go through the same per-identity admission gate in the
//! engine, so a webhook-triggered and a poll-triggered reconciliation for
//! the same record never interleave.

mod notification;
pub mod poll;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use notification::{ChangeKind, ChangeNotification};
pub use poll::PollScanner;
