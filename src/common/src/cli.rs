use clap::{Args, Subcommand};
use tracing_subscriber::EnvFilter;

/// CLI arguments shared by every invocation mode
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

impl CommonArgs {
    /// Log level implied by the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Subcommands available on the job binary
#[derive(Subcommand, Debug, Clone, Default, PartialEq, Eq)]
pub enum CommonCommands {
    /// Run the cleanup job (default behavior)
    #[default]
    Run,
    /// Show the resolved cleanup configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate the cleanup configuration and exit
    Validate,
}

/// Initialize logging based on CLI arguments.
///
/// `RUST_LOG` takes precedence over the verbosity flags. Output goes to
/// stderr so stdout only carries the job report.
pub fn init_logging(args: &CommonArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
