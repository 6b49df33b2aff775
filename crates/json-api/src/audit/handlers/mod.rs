//! Audit Handlers

pub(crate) mod index;
pub(crate) mod verify;
