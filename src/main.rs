use std::process::ExitCode;

use clap::Parser;

use awaybot::cli::{self, Cli, Command, ConfigCommand};
use awaybot::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    logging::init();

    let result = match args.command.unwrap_or(Command::Start) {
        Command::Start => cli::handle_start(&args.config).await,
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(&args.config),
        Command::Config(ConfigCommand::Get { key }) => cli::handle_config_get(&args.config, &key),
        Command::Config(ConfigCommand::Set { key, value }) => {
            cli::handle_config_set(&args.config, &key, &value)
        }
        Command::Config(ConfigCommand::Path) => {
            println!("{}", args.config.display());
            Ok(())
        }
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
