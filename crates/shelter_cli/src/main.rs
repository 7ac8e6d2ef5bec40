//! Command-line entry point for the shelter data core.
//!
//! # Responsibility
//! - Load configuration, open one session and run a single command.
//! - Print documents as JSON lines so output can be piped.

use clap::{Parser, Subcommand};
use log::error;
use serde_json::Value;
use shelter_core::{
    core_version, default_log_level, init_logging, init_stderr_logging, RescueCategory,
    ShelterConfig, ShelterContext,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "shelter", version, about = "Query animal shelter outcome records")]
struct Cli {
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute directory for rotated log files; logs go to stderr otherwise.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    /// JSON config file; `AAC_*` environment variables are used otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect, verify credentials and exit.
    Ping,
    /// List rescue filter options.
    Categories,
    /// Print outcome records matching a rescue filter.
    Rescue {
        /// water|mountain|disaster|reset
        category: String,
        /// Fail on unknown categories instead of showing every record.
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    let logging = match cli.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_stderr_logging(level),
    };
    if let Err(err) = logging {
        eprintln!("shelter: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("shelter: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Categories => {
            for category in RescueCategory::ALL {
                println!("{}\t{}", category, category.label());
            }
            Ok(())
        }
        Command::Ping => {
            let context = ShelterContext::init(&load_config(cli)?)?;
            println!(
                "shelter_core version={} namespace={} status=ok",
                core_version(),
                context.repository().session().namespace()
            );
            Ok(())
        }
        Command::Rescue { category, strict } => {
            let category = if *strict {
                category.parse::<RescueCategory>()?
            } else {
                RescueCategory::from_selection(category)
            };
            let context = ShelterContext::init(&load_config(cli)?)?;
            for row in context.rescue_view(category)? {
                println!("{}", Value::Object(row));
            }
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<ShelterConfig, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => ShelterConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => ShelterConfig::from_env()?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_rescue_with_global_flags() {
        let cli = Cli::parse_from(["shelter", "rescue", "water", "--strict", "--log-level", "warn"]);
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
        assert!(matches!(
            cli.command,
            Command::Rescue { ref category, strict: true } if category == "water"
        ));
    }
}
