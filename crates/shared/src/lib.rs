//! Wire and domain types for the quiz backend contract.

pub mod domain;
pub mod error;
pub mod protocol;
