use anyhow::Result;
use clap::Parser;

use udpcall_cli::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    udpcall_cli::init_logging(&cli)?;
    udpcall_cli::run(cli).await
}
