use clap::Parser;
use demand_matcher::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Match(args) => cli::matching::run(args, cli.config.as_deref()).await,
        Command::Config => cli::show_config::run(cli.config.as_deref()),
    }
}
