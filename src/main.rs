use clap::Parser;
use identity_store::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::admin::run(cli.command).await
}
