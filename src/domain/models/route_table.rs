//! Immutable tool routing table
//!
//! Built once at startup from configuration and shared by reference with the
//! dispatcher and the catalog aggregator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::domain::error::RouteError;

/// Mapping from tool name to the worker executable that serves it.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, PathBuf>,
    workers: Vec<PathBuf>,
}

impl RouteTable {
    /// Build the table and derive the distinct worker set.
    ///
    /// Workers are ordered by path so catalog output is stable across runs.
    pub fn new<I, S, P>(routes: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<PathBuf>,
    {
        let mut table = BTreeMap::new();
        for (tool, worker) in routes {
            let tool = tool.into();
            let worker = worker.into();
            if tool.trim().is_empty() {
                return Err(RouteError::EmptyToolName);
            }
            if worker.as_os_str().is_empty() {
                return Err(RouteError::EmptyWorkerPath(tool));
            }
            table.insert(tool, worker);
        }

        let workers = table
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self {
            routes: table,
            workers,
        })
    }

    /// Worker that serves `tool`, if any.
    pub fn resolve(&self, tool: &str) -> Option<&Path> {
        self.routes.get(tool).map(PathBuf::as_path)
    }

    /// Distinct worker executables, the catalog aggregation targets.
    pub fn workers(&self) -> &[PathBuf] {
        &self.workers
    }

    /// Every `(tool, worker)` pair, sorted by tool name.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.routes
            .iter()
            .map(|(tool, worker)| (tool.as_str(), worker.as_path()))
    }

    /// Number of routed tools.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no tool is routed.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
