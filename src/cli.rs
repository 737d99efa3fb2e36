//! Command-line surface of `fix-partition-1008`.

use clap::{ArgGroup, Parser};

use crate::config::{Target, DEFAULT_DB_PATH};
use crate::error::{RepairError, Result};
use crate::orchestrator::Mode;

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "PCM_REPAIR_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "fix-partition-1008",
    about = "Repair Android Auto device states in the PCM5 (MH2P) persistence database",
    group(ArgGroup::new("mode").required(true).multiple(false).args(["list", "dry_run", "fix"]))
)]
pub struct Cli {
    /// Show paired devices and which ones need fixing.
    #[arg(long)]
    pub list: bool,

    /// Preview the repair without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Repair the device list and write it back.
    #[arg(long)]
    pub fix: bool,

    /// Path to the persistence database.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Skip the file backup before writing (fix mode only).
    #[arg(long)]
    pub no_backup: bool,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.list {
            Mode::List
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Fix {
                backup: !self.no_backup,
            }
        }
    }

    pub fn target(&self) -> Target {
        Target::default()
    }
}

/// Parse `args` (program name first).
///
/// A help request comes back as the clap error so the caller can print it and
/// exit 0; every other parse failure is `InvalidArguments`.
pub fn parse_args<I, T>(args: I) -> std::result::Result<Cli, ParseOutcome>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| {
        use clap::error::ErrorKind;
        match err.kind() {
            ErrorKind::DisplayHelp => ParseOutcome::Informational(err),
            _ => ParseOutcome::Invalid(err),
        }
    })
}

/// Why argument parsing did not produce a [`Cli`].
#[derive(Debug)]
pub enum ParseOutcome {
    Informational(clap::Error),
    Invalid(clap::Error),
}

impl ParseOutcome {
    pub fn into_error(self) -> Result<()> {
        match self {
            Self::Informational(_) => Ok(()),
            Self::Invalid(err) => Err(RepairError::InvalidArguments(
                err.to_string().trim_end().to_string(),
            )),
        }
    }
}
