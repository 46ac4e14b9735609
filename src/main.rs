use clap::Parser;
use workspace_wizard::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    workspace_wizard::util::init_logging(cli.verbose);

    workspace_wizard::cli::run(cli).await
}
