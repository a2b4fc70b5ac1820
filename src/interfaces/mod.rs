//! Adapters between the domain and external formats.

pub mod csv;
pub mod json;
