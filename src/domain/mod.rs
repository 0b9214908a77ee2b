//! Domain layer for the switchboard gateway
//!
//! Protocol types, routing data and error taxonomy. No I/O lives here.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{CatalogError, RouteError, SessionError, SessionFailure};
