//! # HZL Common Library
//!
//! Shared code for the HZL partial state compiler:
//! - Error type and `Result` alias
//! - Parameter kinds with their range and merge-rule tables
//! - Partial state and partial state set model
//! - Definition records (harmonic series, scale, transformation, virtual set)
//! - Bootstrap configuration loading

pub mod config;
pub mod definitions;
pub mod error;
pub mod params;
pub mod partials;

pub use definitions::{
    DefinitionRef, Document, HarmonicSeriesDefinition, ScaleDefinition, TransformationDefinition,
    TransformationKind, VirtualPartialStateSetDefinition,
};
pub use error::{Error, Result, ResultExt};
pub use params::ParamKind;
pub use partials::{ParamValue, PartialState, PartialStateSet};
