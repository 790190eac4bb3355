use clap::Parser;
use flightmerge::cli::{Cli, Commands};
use flightmerge::config::Config;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flightmerge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig => {
            print!("{}", Config::generate_default_commented());
            Ok(())
        }
        Commands::Plan { files } => {
            let config = Config::load(cli.config.as_deref())?;
            flightmerge::commands::show_plan(&config, &files)
        }
        Commands::Merge {
            label,
            keep_sources,
            files,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let options = flightmerge::pipeline::BatchOptions {
                label,
                keep_sources,
            };
            flightmerge::commands::run_merge(&config, &files, &options)
        }
    }
}
