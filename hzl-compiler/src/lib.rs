//! # HZL Partial State Compiler (hzl-compiler)
//!
//! Compiles declarative additive-synthesis definitions into flat, ordered
//! partial state sets for the renderer.
//!
//! **Stages:**
//! - [`harmonic_series`]: one partial per harmonic, values from constants or
//!   expressions in `harmonic_index`
//! - [`scale`]: one partial per declared note
//! - [`transform`]: combine two compiled sets (flattened Cartesian product)
//! - [`pipeline`]: dispatch a document, resolving virtual set sources through
//!   a [`loader::Loader`]
//!
//! Everything here is synchronous and single-threaded. Any failure aborts
//! the compilation; there is no partial output.

pub mod expression;
pub mod harmonic_series;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod scale;
pub mod transform;

pub use hzl_common::{Error, Result};
pub use loader::{FileLoader, Loader, MemoryLoader};
pub use pipeline::compile;

/// Suffix appended to the name and namespace of a directly expanded set
pub const DERIVED_SUFFIX: &str = "_derived";

/// `C_major` -> `C_major_derived`
pub fn derived_name(name: &str) -> String {
    format!("{}{}", name, DERIVED_SUFFIX)
}
