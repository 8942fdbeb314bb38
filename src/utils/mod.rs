//! Utility helpers: typed arena identity and solve profiling.

pub mod allocator;
pub mod profiling;

pub use allocator::{Arena, Id};
pub use profiling::{ScopedTimer, SolveProfile};
