//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sluice_app::{connector_for, logging_config};
use sluice_config::defaults::DEFAULT_CONFIG_PATH;
use sluice_config::load_from_path;
use sluice_switch::SwitchState;
use sluice_telemetry::GlobalContextGuard;

use crate::client::{CliContext, CliError, CliResult};
use crate::commands::status::handle_status;
use crate::commands::switch::handle_switch;
use crate::commands::watch::handle_watch;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sluice-cli", version, about = "Inspect and toggle Deluge switches")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "SLUICE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the YAML configuration file"
    )]
    config: PathBuf,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        short,
        global = true,
        help = "Log at the configured level instead of warnings only"
    )]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Update every switch once and print its state.
    Status,
    /// Switch an entity on, then print its refreshed state.
    TurnOn(EntityArgs),
    /// Switch an entity off, then print its refreshed state.
    TurnOff(EntityArgs),
    /// Run the host and print events until Ctrl-C.
    Watch,
}

#[derive(Args, Debug, PartialEq, Eq)]
struct EntityArgs {
    /// Entity display name, e.g. "Deluge Switch".
    entity: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let config = load_from_path(&cli.config)?;
    let mut logging = logging_config(&config.logging);
    if !cli.verbose {
        logging.level = "warn";
    }
    sluice_telemetry::init_logging(&logging).map_err(CliError::failure)?;
    let _context = GlobalContextGuard::new("cli");

    let ctx = CliContext {
        connector: connector_for(&config),
        config,
        output: cli.output,
    };

    match cli.command {
        Command::Status => handle_status(&ctx).await,
        Command::TurnOn(args) => handle_switch(&ctx, &args.entity, SwitchState::On).await,
        Command::TurnOff(args) => handle_switch(&ctx, &args.entity, SwitchState::Off).await,
        Command::Watch => handle_watch(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_turn_on_with_global_flags() {
        let cli = Cli::try_parse_from([
            "sluice-cli",
            "turn-on",
            "Deluge Switch",
            "--output",
            "json",
            "--config",
            "/etc/sluice.yaml",
        ])
        .expect("arguments parse");
        assert_eq!(
            cli.command,
            Command::TurnOn(EntityArgs {
                entity: "Deluge Switch".into()
            })
        );
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("/etc/sluice.yaml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn rejects_unknown_output_format() {
        let parsed = Cli::try_parse_from(["sluice-cli", "--output", "xml", "status"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn entity_argument_is_required() {
        assert!(Cli::try_parse_from(["sluice-cli", "turn-off"]).is_err());
    }

    #[test]
    #[serial]
    #[allow(unsafe_code)]
    fn config_path_reads_environment() {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var("SLUICE_CONFIG", "/srv/sluice.yaml") };
        let cli = Cli::try_parse_from(["sluice-cli", "status"]).expect("arguments parse");
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::remove_var("SLUICE_CONFIG") };
        assert_eq!(cli.config, PathBuf::from("/srv/sluice.yaml"));
        assert_eq!(cli.command, Command::Status);
    }

    #[tokio::test]
    #[serial]
    async fn invalid_config_exits_with_validation_code() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("sluice.yaml");
        fs::write(&path, "deluge:\n  username: u\n")?;
        let cli = Cli::try_parse_from([
            "sluice-cli",
            "--config",
            path.to_str().unwrap_or_default(),
            "status",
        ])?;
        let err = dispatch(cli).await.expect_err("host is missing");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("deluge.host"));
        Ok(())
    }
}
