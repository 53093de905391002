//! Contains implementations of the `Board` trait.

/// A `Board` implementation for antichess built on `shakmaty`.
pub mod antichess;
