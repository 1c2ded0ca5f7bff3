use clap::Parser;
use ovozbot::cli::{self, Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => cli::handle_run(cli.config.as_deref()).await,
        Command::Migrate => cli::handle_migrate(cli.config.as_deref()).await,
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
