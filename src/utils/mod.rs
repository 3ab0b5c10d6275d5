//! Internal utility helpers for query escaping and per-user paths.

pub(crate) mod paths;
pub(crate) mod query;
