//! Keel: tagged structs in, dialect aware SQL out, rows back into structs.
//!
//! This crate re-exports the runtime of `keel-core` and the `Model` derive. Drivers such as
//! `keel-sqlite` provide the [`Connection`] to run on.
pub use keel_core::*;
pub use keel_macros::Model;
