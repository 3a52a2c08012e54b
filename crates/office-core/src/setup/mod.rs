//! World Setup
//!
//! The built-in office layout and seeded roster generation.

pub mod layout;
pub mod roster;

pub use layout::*;
pub use roster::*;
