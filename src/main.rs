mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::EnvFilter;

use browser_actions::crash::{CrashClient, CrashSink, NullCrashSink};
use browser_actions::storage::{HttpBucketStorage, ObjectStorage};
use browser_actions::{server, Dispatcher, Result, ServiceConfig};

use cli::Commands;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Cli) -> Result<()> {
    let config = ServiceConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let dispatcher = Arc::new(build_dispatcher(config)?);
            server::serve(dispatcher, port).await
        }
    }
}

fn build_dispatcher(config: ServiceConfig) -> Result<Dispatcher> {
    let crash_sink: Arc<dyn CrashSink> = match &config.crash_token {
        Some(token) => Arc::new(CrashClient::with_endpoint(token, &config.crash_endpoint)?),
        None => Arc::new(NullCrashSink),
    };

    let storage: Option<Arc<dyn ObjectStorage>> = match &config.storage {
        Some(storage_config) => Some(Arc::new(HttpBucketStorage::new(storage_config)?)),
        None => None,
    };

    let engine = build_engine()?;
    Ok(Dispatcher::new(config, engine, crash_sink, storage))
}

#[cfg(feature = "chromium")]
fn build_engine() -> Result<Arc<dyn browser_actions::engine::AutomationEngine>> {
    Ok(Arc::new(browser_actions::engine::chromium::ChromiumEngine::new()))
}

#[cfg(not(feature = "chromium"))]
fn build_engine() -> Result<Arc<dyn browser_actions::engine::AutomationEngine>> {
    Err(browser_actions::ActionError::config(
        "No automation engine compiled in; rebuild with the `chromium` feature",
    ))
}
