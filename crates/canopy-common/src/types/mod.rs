//! Core types shared across canopy.

mod value;

pub use value::Value;
