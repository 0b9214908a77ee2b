//! Switchboard CLI entry point.

use clap::Parser;

use switchboard::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => switchboard::cli::commands::serve::execute(args).await,
        Commands::Routes(args) => switchboard::cli::commands::routes::execute(args, cli.json),
    };

    if let Err(err) = result {
        switchboard::cli::handle_error(err, cli.json);
    }
}
