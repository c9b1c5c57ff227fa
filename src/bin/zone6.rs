mod cli;

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use env_logger::Builder;
use log::{error, info};

use zone6::{
    config::{self, ConfigError, RunConfig},
    run,
};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    Builder::new().filter_level(cli.loglevel.into()).init();

    let config = match run_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting resolving zone file {}", cli.zonefile.display());
    match run::run_zonefile(&cli.zonefile, &cli.origin, &config).await {
        Ok(stats) => {
            println!("{}", stats);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_config(cli: &Cli) -> Result<RunConfig, ConfigError> {
    let resolvers = if cli.resolvers.is_empty() {
        info!("No resolvers given, using {}", config::RESOLV_CONF);
        config::system_resolvers()?
    } else {
        cli.resolvers.clone()
    };

    let config = RunConfig {
        resolvers,
        concurrency: cli.concurrent,
        timeout: Duration::from_secs(cli.timeout),
    };
    config.validate()?;
    Ok(config)
}
