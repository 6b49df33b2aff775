//! Approval tokens for human-in-the-loop consent approval.

mod token;

pub use token::*;
