//! Consent Ledger Domain Concerns

pub mod audit;
pub mod consents;
