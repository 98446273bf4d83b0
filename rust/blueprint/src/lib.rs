//! Blueprint document types.
//!
//! A blueprint declares a set of named resources. Resources do not write
//! down their dependencies explicitly; instead each one advertises metadata
//! labels and a link selector, and it is the job of the `link-engine` crate
//! to turn that bipartite label-selection problem into a dependency graph.
//! This crate only owns the document shape and its (de)serialization.

mod loader;
mod resource;

pub use loader::{load, parse, Format, LoadError, ParseError};
pub use resource::{Blueprint, LinkSelector, Metadata, Resource};
