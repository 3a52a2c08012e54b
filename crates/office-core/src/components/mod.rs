//! ECS Components
//!
//! Per-character components and the world clock resource.

pub mod character;
pub mod clock;

pub use character::*;
pub use clock::*;
