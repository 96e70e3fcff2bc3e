//! Runs the postmaster consumer loop against the configured store.
//!
//! Usage:
//!
//! ```text
//! postmaster [--config <path>] [--iteration <n>] [--type <type>] [--show-details]
//! ```
//!
//! Without `--config` the built-in defaults apply and messages are kept in
//! memory. Progress lines are written to stdout; diagnostics go through
//! `tracing` on stderr.

use camino::Utf8PathBuf;
use clap::Parser;
use mockable::{Clock, DefaultClock};
use postmaster::backend::{Backend, BackendError, QueueDispatcherBackend};
use postmaster::config::{ConfigError, PostmasterConfig};
use postmaster::consumer::{
    ConsumerLoop, ConsumerLoopError, ConsumerLoopSettings, LoopReport, ProgressSink,
};
use postmaster::dispatch::{HandlerRegistry, LoggerConsumer, RegistryError};
use postmaster::message::adapters::memory::InMemoryMessageStore;
use postmaster::message::adapters::postgres::PostgresMessageStore;
use postmaster::message::ports::{MessageStore, MessageStoreError};
use postmaster::telemetry::init_tracing;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

/// Message type handled by the built-in logger consumer.
const LOGGER_TYPE: &str = "logger";

#[derive(Debug, Parser)]
#[command(name = "postmaster", about = "Consume queued messages")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Number of messages to handle before exiting (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    iteration: u64,

    /// Only consume messages of this type
    #[arg(long = "type")]
    message_type: Option<String>,

    /// Print the summary returned by consumers
    #[arg(short = 'd', long)]
    show_details: bool,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] MessageStoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Loop(#[from] ConsumerLoopError),
    #[error("failed to write progress: {0}")]
    Output(#[from] io::Error),
}

/// Writes timestamped progress lines to stdout.
struct StdoutProgress {
    clock: DefaultClock,
}

impl ProgressSink for StdoutProgress {
    fn report(&self, report: &LoopReport) {
        let stamp = self.clock.utc().format("%Y-%m-%d %H:%M:%S");
        let mut out = io::stdout().lock();
        if let Err(err) = writeln!(out, "[{stamp}] {report}") {
            warn!(error = %err, "progress line dropped");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        let mut stderr = io::stderr().lock();
        // Nothing else can report this failure.
        if writeln!(stderr, "failed to initialise logging: {err}").is_err() {
            return ExitCode::FAILURE;
        }
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "postmaster stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), DriverError> {
    let config = match cli.config.as_deref() {
        Some(path) => PostmasterConfig::load(path)?,
        None => PostmasterConfig::default(),
    };
    let registry = Arc::new(
        HandlerRegistry::builder()
            .register(LOGGER_TYPE, Arc::new(LoggerConsumer), 0)
            .build()?,
    );
    list_listeners(&registry)?;

    writeln!(io::stdout().lock(), "Retrieving backend")?;
    let backend = match config.store.database_url.as_deref() {
        Some(url) => {
            build_backend(
                Arc::new(PostgresMessageStore::connect(url)?),
                &config,
                &registry,
            )
            .await?
        }
        None => build_backend(Arc::new(InMemoryMessageStore::new()), &config, &registry).await?,
    };

    let mut settings = ConsumerLoopSettings::new()
        .with_iteration_cap(cli.iteration)
        .with_details(cli.show_details);
    if let Some(message_type) = cli.message_type {
        settings = settings.with_message_type(message_type);
    }

    let progress = Arc::new(StdoutProgress {
        clock: DefaultClock,
    });
    ConsumerLoop::new(backend, registry, Arc::new(DefaultClock), settings)
        .with_progress(progress)
        .run()
        .await?;
    Ok(())
}

fn list_listeners(registry: &HandlerRegistry) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "Checking listeners")?;
    for message_type in registry.types() {
        writeln!(out, " - {message_type}")?;
        for handler in registry.handlers_for(message_type) {
            writeln!(out, "   > {}", handler.name())?;
        }
    }
    Ok(())
}

/// Routes each registered type to a store backend filtered to that type.
///
/// The default route polls every type the configuration admits. Completed
/// messages past the configured retention are purged once, through the
/// default route, before the dispatcher is returned.
async fn build_backend<S>(
    store: Arc<S>,
    config: &PostmasterConfig,
    registry: &HandlerRegistry,
) -> Result<Arc<dyn Backend>, BackendError>
where
    S: MessageStore + 'static,
{
    let clock = Arc::new(DefaultClock);
    let default: Arc<dyn Backend> =
        Arc::new(config.store_backend(Arc::clone(&store), Arc::clone(&clock)));
    default.cleanup().await?;
    let dispatcher = registry.types().fold(
        QueueDispatcherBackend::new().with_default(default),
        |dispatcher, message_type| {
            let routed: Arc<dyn Backend> = Arc::new(config.store_backend_for_type(
                Arc::clone(&store),
                Arc::clone(&clock),
                message_type,
            ));
            dispatcher.with_route(message_type, routed)
        },
    );
    Ok(Arc::new(dispatcher))
}
