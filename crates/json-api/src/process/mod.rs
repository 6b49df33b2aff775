//! Processing Decisions

pub(crate) mod evaluate;
