//! ACMG variant data model
//!
//! This crate provides:
//! - Serde types for variant records, gene and phenotype entries
//! - Criterion results split into engine-owned and reviewer-owned fields
//! - Criterion state, strength and classification enums
//! - The history store trait with typed query filters
//! - In-memory and no-op history stores

pub mod classification;
pub mod criterion;
pub mod history;
pub mod record;
pub mod store;

pub use classification::*;
pub use criterion::*;
pub use history::*;
pub use record::*;
pub use store::*;
