//! Processing policy decisions.

mod engine;

pub use engine::*;
