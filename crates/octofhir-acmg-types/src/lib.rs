//! Runtime values for condition evaluation
//!
//! [`Value`] is what variables resolve to and what expressions evaluate to:
//! `None`, booleans, integers, exact decimals, strings, lists and maps, with
//! truthiness and comparison rules matching how curators write conditions.

mod coercion;
mod value;
mod value_serde;

pub use coercion::*;
pub use value::*;
