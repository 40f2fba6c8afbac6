//! CLI command implementations.

pub mod hash;
pub mod index;
pub mod list;
pub mod matching;
