//! Computation
//!
//! The arithmetic operations and the TTL memoization layer composed in
//! front of them.

pub mod cache;
pub mod ops;

pub use cache::ComputeCache;
pub use ops::{factorial, fibonacci, integer_value, pow, Operation};
