use clap::Parser;
use colored::Colorize;

use tracklinker::cli::{Cli, Commands};
use tracklinker::config::{get_config, init_config_from};
use tracklinker::runtime::modes;
use tracklinker::system::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(&cli.config);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server_mode().await,
        command => modes::run_cli(command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_server_mode() -> anyhow::Result<()> {
    let config = get_config();
    // guard 必须活到进程退出
    let _guard = init_logging(&config.logging)?;
    modes::run_server().await
}
