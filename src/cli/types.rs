//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use super::commands::routes::RoutesArgs;
use super::commands::serve::ServeArgs;

/// Top-level command line
#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(about = "Switchboard - JSON-RPC tool gateway for stdio workers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Accept client connections and route calls to workers
    Serve(ServeArgs),

    /// Show the configured tool routes and worker set
    Routes(RoutesArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from([
            "switchboard",
            "serve",
            "--config",
            "gateway.yaml",
            "--host",
            "127.0.0.1",
            "--port",
            "9001",
        ]);

        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, Some(PathBuf::from("gateway.yaml")));
                assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
                assert_eq!(args.port, Some(9001));
            }
            Commands::Routes(_) => panic!("Expected serve"),
        }
    }

    #[test]
    fn test_parse_routes_json() {
        let cli = Cli::parse_from(["switchboard", "routes", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Routes(_)));
    }
}
