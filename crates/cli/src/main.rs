// mdmcheck - validates the MDM profiles Microsoft Defender relies on (macOS)

mod check;
mod config;
mod exit_codes;
mod payloads;
mod render;
mod sources;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use config::ColorMode;
use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "mdmcheck")]
#[command(about = "Validates MDM profiles for Defender")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Print debug logging to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare installed profiles with the expected template
    #[command(after_help = "\
Examples:
  mdmcheck check
  mdmcheck check --template mdatp.mobileconfig
  mdmcheck check --in profiles.xml --tcc MDMOverrides.plist --json
  mdmcheck check --output report.json --color never")]
    Check {
        /// Template file (default: config, then mdatp.mobileconfig next to the binary, then download)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Read exported profiles from this file instead of running `profiles show`
        #[arg(long = "in", value_name = "FILE")]
        installed: Option<PathBuf>,

        /// Read TCC overrides from this file instead of the system store
        #[arg(long, value_name = "FILE")]
        tcc: Option<PathBuf>,

        /// Output JSON to stdout instead of the human report
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Colour the human report
        #[arg(long, value_enum)]
        color: Option<ColorMode>,

        /// Config file (default: <config_dir>/mdmcheck/config.toml)
        #[arg(long, env = "MDMCHECK_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List the payloads found in a profiles export or a template
    #[command(after_help = "\
Examples:
  mdmcheck payloads profiles.xml
  mdmcheck payloads mdatp.mobileconfig --template --json")]
    Payloads {
        /// Document to read
        file: PathBuf,

        /// Treat the document as a template (flat items)
        #[arg(long)]
        template: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("MDMCHECK_COMMIT"), ")",
        "\nengine:  mdmcheck-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("MDMCHECK_TARGET"),
        "\nbuild:   ", env!("MDMCHECK_BUILD_PROFILE"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "off" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { template, installed, tcc, json, output, color, config } => {
            check::cmd_check(check::CheckArgs {
                template,
                installed,
                overrides: tcc,
                json,
                output,
                color,
                config,
            })
        }
        Commands::Payloads { file, template, json } => payloads::cmd_payloads(file, template, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
