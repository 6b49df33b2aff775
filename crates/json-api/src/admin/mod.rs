//! Admin API key guard.

pub(crate) mod middleware;
