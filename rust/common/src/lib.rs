//! # Common dependencies
//!
//! This internal crate simply re-exports dependencies that are commonly used across other internal
//! crates. Rust has a small `std` library (["and that's OK"](https://blog.nindalf.com/posts/rust-stdlib/)).
//! This crate acts as our internal version of a standard library, like [`stdx`](https://github.com/brson/stdx)
//! and others.
//!
//! The primary benefit of this crate us that there is only one place that version numbers for
//! commonly used dependencies need to be updated. Some of these crates are in line to become
//! part of the `std` library (e.g. `once_cell`).

pub use async_trait;
pub use eyre;
pub use itertools;
pub use once_cell;
pub use serde;
pub use serde_json;
pub use serde_with;
pub use serde_yaml;
pub use strum;
pub use thiserror;
pub use tokio;
pub use tokio_util;
pub use tracing;
