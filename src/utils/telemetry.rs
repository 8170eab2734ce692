use std::io::IsTerminal as _;

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

use crate::Args;

/// Set up structured logging for the workload process.
///
/// Logs go to stderr (or to the `--output` file) so the sampled timing
/// lines on stdout stay machine-consumable. `RUST_LOG` overrides the
/// default level; `--verbose` bumps the default to DEBUG.
pub fn init_tracing(args: &Args) -> Result<(), BoxError> {
    let default_level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let (make_writer, ansi) = match args.output.as_deref() {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .context("open log file")?;
            (BoxMakeWriter::new(file), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    };

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(ansi)
        .with_env_filter(env_filter)
        .with_writer(make_writer);

    if args.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::debug!("tracing initialised");
    Ok(())
}
