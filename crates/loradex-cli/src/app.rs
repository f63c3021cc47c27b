//! The `loradex` application: logging setup and command dispatch.

use crate::cli::{CliArgs, Command};
use crate::config::LoradexConfig;
use crate::{config_handlers, handlers};
use loradex_core::Result;
use tracing_subscriber::EnvFilter;

/// Name the binary reports in `version` output.
pub const BIN_NAME: &str = "loradex";

// ============================================================================
// LoradexCli
// ============================================================================

/// The CLI application: a loaded configuration plus identity strings.
#[derive(Debug, Clone)]
pub struct LoradexCli {
    name: String,
    config: LoradexConfig,
    version: String,
}

impl LoradexCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = LoradexConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    /// Create an application around an already loaded configuration.
    pub fn new(config: LoradexConfig) -> Self {
        Self {
            name: BIN_NAME.to_string(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LoradexConfig {
        &self.config
    }

    /// Initialise tracing-based logging on stderr.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments, printing the command output.
    pub fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);
        let output = self.execute(args.config.as_deref(), args.command)?;
        println!("{output}");
        Ok(())
    }

    /// Execute one command and return its output.
    pub fn execute(&self, config_path: Option<&str>, command: Option<Command>) -> Result<String> {
        tracing::debug!(?command, "dispatching");
        match command {
            Some(Command::Stats { snapshot }) => handlers::cmd_stats(&snapshot),
            Some(Command::Show {
                snapshot,
                key,
                column,
            }) => handlers::cmd_show(&snapshot, &key, column.as_deref()),
            Some(Command::Query(query)) => handlers::cmd_query(&self.config, query),
            Some(Command::Copy { src, dest, force }) => handlers::cmd_copy(&src, &dest, force),
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(config_path, config_cmd.command)
            }
            Some(Command::Version) => Ok(format!("{} {}", self.name, self.version)),
            None => Ok(format!(
                "{} {}: use --help for usage",
                self.name, self.version
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
