//! CLI command implementations.

pub mod routes;
pub mod serve;
