use clap::Parser;
use unitcov::cli::{Cli, Commands, execute_list_command, execute_report_command};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List { artifact, package } => {
            execute_list_command(&artifact, &package)?;
        }
        Commands::Report {
            tests,
            artifact,
            level,
            filter,
            json,
        } => {
            execute_report_command(&tests, &artifact, &level, filter, json.as_deref())?;
        }
    }

    Ok(())
}
