use std::io;
use std::process::ExitCode;

use pcm5_pairing_repair::cli::{parse_args, Cli, ParseOutcome, LOG_ENV};
use pcm5_pairing_repair::storage::SqliteStore;
use pcm5_pairing_repair::{
    exit_status, run, FileCopyBackup, Outcome, Reporter, Result, StorageSchema,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(cli: &Cli, report: &mut Reporter<io::StdoutLock<'_>>) -> Result<Outcome> {
    let mut store = SqliteStore::open(&cli.db_path, StorageSchema::default())?;
    let backup = FileCopyBackup::new(&cli.db_path);
    run(&mut store, &backup, report, &cli.target(), cli.mode())
}

fn main() -> ExitCode {
    init_tracing();

    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(outcome) => {
            let message = match &outcome {
                ParseOutcome::Informational(err) | ParseOutcome::Invalid(err) => err,
            };
            if message.print().is_err() {
                return ExitCode::FAILURE;
            }
            let status = match outcome.into_error() {
                Ok(()) => 0,
                Err(e) => exit_status(&Err(e)),
            };
            return ExitCode::from(status);
        }
    };

    let mode = cli.mode();
    let stdout = io::stdout();
    let mut report = Reporter::new(stdout.lock());
    if let Err(e) = report.banner(&cli.db_path, mode) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = execute(&cli, &mut report);
    let status = exit_status(&result);
    if let Err(e) = &result {
        error!(error = %e, "run failed");
    }
    if let Err(e) = report.footer(mode, &result, status) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::from(status)
}
