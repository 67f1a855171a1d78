//! Roamly Shared Types
//!
//! Types and errors shared across the Roamly messaging stack.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
