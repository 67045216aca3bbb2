mod cli;
mod error;
mod report;

use crate::cli::Args;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use sweep_archive::{ExternalLister, Scrubber};
use sweep_config::Config;
use sweep_library::error::ErrorKind as LibraryErrorKind;
use sweep_library::{ActiveDownloads, Context, RunOutcome, StaticSource, reconcile};
use sweep_storage::{FsHandle, LocalFilesystem, ReadOnlyFilesystem};
use sweep_transmission::TransmissionSource;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse before installing the subscriber so --help prints without logs.
    let args = Args::parse();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(?args, "Parsed arguments");

    let started = Instant::now();
    match run(args).await {
        Ok(outcome) => {
            println!("{}", report::summary(&outcome, started.elapsed()));
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::error!("{err:?}");
            eprintln!("sweep: {}", *err);
            ExitCode::from(err.exit_code())
        },
    }
}

async fn run(args: Args) -> Result<RunOutcome> {
    let mut config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    config.dev |= args.dev;
    let ctx = context(&config, args.dry_run)?;
    tracing::info!(
        staging = %ctx.directories.staging.display(),
        archive = %ctx.directories.archive.display(),
        graveyard = %ctx.directories.graveyard.display(),
        trash = %ctx.directories.trash.display(),
        dry_run = args.dry_run,
        "Starting reconciliation"
    );

    let source = active_source(&args, &config).await?;
    let active = source.fetch().await.or_raise(|| ErrorKind::Fetch)?;
    tracing::info!(source = source.name(), count = active.len(), "Fetched active downloads");

    let stop = Arc::new(AtomicBool::new(false));
    let signal = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; finishing the current object");
                stop.store(true, Ordering::SeqCst);
            }
        })
    };

    let outcome = tokio::task::spawn_blocking(move || reconcile(&ctx, &active, &stop, report::on_event))
        .await
        .map_err(|e| ErrorKind::Setup(e.to_string()))?;
    signal.abort();
    match outcome {
        Ok(outcome) => Ok(outcome),
        Err(err) if matches!(&*err, LibraryErrorKind::Listing(_)) => Err(err).or_raise(|| ErrorKind::Listing),
        Err(err) => Err(err).or_raise(|| ErrorKind::Setup("reconciliation failed".to_string())),
    }
}

fn context(config: &Config, dry_run: bool) -> Result<Context> {
    let directories = config.directories().or_raise(|| ErrorKind::Config)?;
    let compare = config.compare_mode().or_raise(|| ErrorKind::Config)?;

    let mut fs: FsHandle = Arc::new(LocalFilesystem::new());
    if dry_run {
        tracing::info!("Dry run: nothing will be moved or deleted");
        fs = Arc::new(ReadOnlyFilesystem::new(fs));
    }

    let lister = match &config.lister.program {
        Some(program) => ExternalLister::new(program),
        None => ExternalLister::discover().or_raise(|| ErrorKind::Setup("no archive listing tool".to_string()))?,
    }
    .with_args(config.lister.args.iter().cloned())
    .with_timeout(config.lister.timeout());
    tracing::debug!(program = %lister.program().display(), "Using archive listing tool");

    Ok(Context {
        directories,
        scrubber: Scrubber::new(Arc::new(lister), fs.clone()),
        fs,
        compare,
        proceed_when_idle: config.proceed_when_idle,
    })
}

async fn active_source(args: &Args, config: &Config) -> Result<Box<dyn ActiveDownloads>> {
    if !args.has_static_active() {
        let transmission = &config.transmission;
        let mut source = TransmissionSource::new(&transmission.url, transmission.timeout())
            .or_raise(|| ErrorKind::Setup("could not create Transmission client".to_string()))?;
        if let Some(username) = &transmission.username {
            source = source.with_credentials(username, transmission.password.clone());
        }
        return Ok(Box::new(source));
    }
    let mut source = match &args.active_file {
        Some(path) => StaticSource::from_file(path).await.or_raise(|| ErrorKind::Fetch)?,
        None => StaticSource::default(),
    };
    source.extend(args.active.iter().cloned());
    Ok(Box::new(source))
}
