//! Consent lifecycle, audit ledger and processing policy.

pub mod approvals;
pub mod context;
pub mod database;
pub mod domain;
pub mod policy;

#[cfg(test)]
mod test;

pub mod uuids;
