//! Consent Handlers

pub(crate) mod approve;
pub(crate) mod create;
pub(crate) mod get;
pub(crate) mod index;
pub(crate) mod reject;
pub(crate) mod revoke;
pub(crate) mod revoke_latest;
