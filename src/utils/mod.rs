// Utility functions

pub mod logger;
pub mod pacing;

pub use logger::*;
pub use pacing::*;
