//! kongverge: reconcile one Kong Admin API resource at a time.
//!
//! Reads a desired record from a JSON file, drives the engine against the
//! Admin API and prints the resulting state as JSON on stdout. Logs go to
//! stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kongverge_admin::{AdminConfig, KongAdminClient, DEFAULT_ADMIN_URI};
use kongverge_engine::config::DEFAULT_RETRY_TIMEOUT_SECS;
use kongverge_engine::{Engine, EngineConfig, ResourceKind, Shutdown, MAX_PAGE_SIZE};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Kong Admin API reconciler
#[derive(Parser, Debug)]
#[command(name = "kongverge", version, about)]
struct Cli {
    /// Admin API address
    #[arg(long, env = "KONG_ADMIN_ADDR", default_value = DEFAULT_ADMIN_URI)]
    admin_addr: String,

    /// Basic auth username
    #[arg(long, env = "KONG_ADMIN_USERNAME")]
    admin_username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "KONG_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Value for the `apikey` header
    #[arg(long, env = "KONG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Value for the `kong-admin-token` header
    #[arg(long, env = "KONG_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "TLS_SKIP_VERIFY")]
    tls_skip_verify: bool,

    /// Track plugin config strictly unless the desired record overrides it
    #[arg(long, env = "STRICT_PLUGINS_MATCH")]
    strict_plugins_match: bool,

    /// Adopt an existing resource when create hits a unique constraint
    #[arg(long, env = "KONG_UPSERT_RESOURCES")]
    upsert_resources: bool,

    /// Retry failed creates until the retry timeout elapses
    #[arg(long, env = "KONG_RETRY_ON_ERROR")]
    retry_on_error: bool,

    /// Total time budget for a create, in seconds
    #[arg(long, env = "KONG_RETRY_TIMEOUT", default_value_t = DEFAULT_RETRY_TIMEOUT_SECS)]
    retry_timeout: u64,

    /// Page size used when scanning for a resource to adopt
    #[arg(long, default_value_t = MAX_PAGE_SIZE)]
    page_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a resource, or adopt an existing one when upsert is enabled
    Create {
        /// Resource kind (service, route, plugin, consumer)
        kind: ResourceKind,

        /// JSON file holding the desired record
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Read a resource and print its state
    Read {
        kind: ResourceKind,

        /// Resource ID
        id: String,

        /// Desired record, consulted for per-instance settings
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Push desired attributes to an existing resource
    Update {
        kind: ResourceKind,

        /// Resource ID
        id: String,

        /// JSON file holding the desired record
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete a resource
    Delete {
        kind: ResourceKind,

        /// Resource ID
        id: String,
    },

    /// Bring an existing resource under management
    Import {
        kind: ResourceKind,

        /// Resource ID
        id: String,
    },
}

impl Cli {
    fn admin_config(&self) -> AdminConfig {
        AdminConfig {
            admin_uri: self.admin_addr.clone(),
            username: self.admin_username.clone(),
            password: self.admin_password.clone(),
            api_key: self.api_key.clone(),
            admin_token: self.admin_token.clone(),
            tls_skip_verify: self.tls_skip_verify,
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            upsert_resources: self.upsert_resources,
            retry_on_error: self.retry_on_error,
            retry_timeout_secs: self.retry_timeout,
            strict_plugins_match: self.strict_plugins_match,
            page_size: self.page_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kongverge=info,kongverge_engine=info,kongverge_admin=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let engine_config = cli.engine_config();
    engine_config
        .validate()
        .context("Invalid engine configuration")?;
    let admin_config = cli.admin_config();
    if admin_config.tls_skip_verify {
        warn!("TLS certificate verification is disabled");
    }
    info!("Admin API: {}", admin_config.admin_uri);

    let client = KongAdminClient::new(&admin_config).context("Failed to create admin client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let engine = Engine::new(Arc::new(client), engine_config)
        .with_shutdown(Shutdown::from_watch(shutdown_rx));

    let output = commands::run(&engine, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn shutdown_signal() {
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = signal::ctrl_c() => info!("Received SIGINT, cancelling"),
        _ = terminate => info!("Received SIGTERM, cancelling"),
    }
}
