//! Parent/child hierarchy derivation from a designated relation field.
//!
//! Resolution is bounded to one level: a referenced parent's own relation
//! field is treated as sibling data and never walked, so recursion cannot
//! chain.

mod builder;

#[cfg(test)]
mod tests;

pub use builder::{ParentTaskConfig, parent_reference, synthesized_parent_title};
