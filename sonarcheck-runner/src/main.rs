use clap::Parser;

use sonarcheck_runner::cli::{Cli, Commands};
use sonarcheck_runner::commands;
use sonarcheck_runner::error::RunnerError;
use sonarcheck_runner::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "sonarcheck failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), RunnerError> {
    let config_path = cli.config.as_deref();
    let config = commands::load_config(config_path, cli.log_level, cli.log_format).await?;

    logging::init_tracing(&config.general).map_err(|e| RunnerError::Config(e.to_string()))?;
    sonarcheck_core::metrics::describe_all();
    commands::log_source(config_path);

    let docker_socket = cli.docker_socket.as_deref();
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, docker_socket).await,
        Commands::WaitReady(args) => {
            commands::wait_ready::execute(args, config, docker_socket).await
        }
        Commands::Validate(args) => commands::validate::execute(args, &config).await,
    }
}
