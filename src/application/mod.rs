//! Application layer: request routing and catalog aggregation
//!
//! Both components talk to workers only through the `WorkerRunner` port.

pub mod catalog;
pub mod dispatcher;

pub use catalog::{Catalog, CatalogAggregator};
pub use dispatcher::{Reply, RequestDispatcher, SERVER_NAME, SERVER_VERSION};
