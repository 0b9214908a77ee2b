//! `routes` command: inspect the effective route table.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, table_with_header, CommandOutput};
use crate::domain::models::RouteTable;
use crate::infrastructure::config::ConfigLoader;

/// Arguments for `switchboard routes`
#[derive(Args, Debug)]
pub struct RoutesArgs {
    /// Configuration file (defaults to ./switchboard.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// One tool route as printed by the command
#[derive(Debug, Serialize)]
pub struct RouteOutput {
    /// Tool name clients call
    pub tool: String,
    /// Worker executable serving the tool
    pub worker: String,
}

/// Route table as printed by the command
#[derive(Debug, Serialize)]
pub struct RoutesOutput {
    /// Every configured route, sorted by tool name
    pub routes: Vec<RouteOutput>,
    /// Distinct worker executables
    pub workers: Vec<String>,
}

impl From<&RouteTable> for RoutesOutput {
    fn from(table: &RouteTable) -> Self {
        Self {
            routes: table
                .routes()
                .map(|(tool, worker)| RouteOutput {
                    tool: tool.to_string(),
                    worker: worker.display().to_string(),
                })
                .collect(),
            workers: table
                .workers()
                .iter()
                .map(|worker| worker.display().to_string())
                .collect(),
        }
    }
}

impl CommandOutput for RoutesOutput {
    fn to_human(&self) -> String {
        if self.routes.is_empty() {
            return "No routes configured.".to_string();
        }

        let mut table = table_with_header(&["Tool", "Worker"]);
        for route in &self.routes {
            table.add_row(vec![route.tool.as_str(), route.worker.as_str()]);
        }

        format!(
            "{table}\n{} tool(s) served by {} worker(s)",
            self.routes.len(),
            self.workers.len()
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Load the configuration and print its route table.
pub fn execute(args: RoutesArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load(args.config.as_deref())?;
    let table = ConfigLoader::route_table(&config)?;
    output(&RoutesOutput::from(&table), json_mode);
    Ok(())
}
