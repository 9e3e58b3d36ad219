//! Document repository implementations.

pub mod local;
