//! Core models shared by the gffquant crates.
//!
//! Alignment records as they come out of an alignment archive, the fragments
//! derived from merged read pairs, and the annotated features of a GFF
//! database all live here, together with a few small IO helpers.
pub mod consts;
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::CoreError;
