//! `tally` -- CLI binary for the tally chat activity tracker.
//!
//! Provides the following subcommands:
//!
//! - `tally serve` -- Run the Slack receiver and count messages.
//! - `tally config show` -- Print the resolved configuration.

use clap::{Parser, Subcommand};

mod commands;

/// Slack activity tracker.
#[derive(Parser)]
#[command(name = "tally", about = "Slack activity tracker", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP receiver.
    Serve(commands::serve::ServeArgs),

    /// Show resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

/// Subcommands for `tally config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the full resolved configuration (secrets blanked).
    Show {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await?,
        Commands::Config { action } => match action {
            ConfigCmd::Show { config } => {
                let cfg = commands::load_config(config.as_deref())?;
                commands::config_cmd::config_show(&cfg);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_without_error() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_help_contains_binary_name() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("tally"));
    }

    #[test]
    fn cli_has_all_subcommands() {
        let cmd = Cli::command();
        let sub_names: Vec<&str> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(sub_names.contains(&"serve"));
        assert!(sub_names.contains(&"config"));
    }

    #[test]
    fn cli_verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["tally", "serve", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn cli_serve_parses_config_and_port() {
        let cli = Cli::try_parse_from(["tally", "serve", "--config", "/tmp/tally.json", "--port", "8080"])
            .unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config.as_deref(), Some("/tmp/tally.json"));
                assert_eq!(args.port, Some(8080));
            }
            Commands::Config { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn cli_serve_rejects_bad_port() {
        assert!(Cli::try_parse_from(["tally", "serve", "--port", "99999"]).is_err());
    }

    #[test]
    fn cli_config_show_parses() {
        assert!(Cli::try_parse_from(["tally", "config", "show"]).is_ok());
        assert!(Cli::try_parse_from(["tally", "config", "show", "-c", "x.json"]).is_ok());
    }
}
