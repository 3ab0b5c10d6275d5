//! Output renderers for JSON and markdown.

pub mod json;
pub mod markdown;
