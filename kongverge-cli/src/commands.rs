//! Subcommand execution.

use std::path::Path;

use anyhow::{Context, Result};
use kongverge_admin::KongAdminClient;
use kongverge_engine::{
    Consumer, DesiredRecord, Engine, Plugin, Reconciler, Resource, ResourceKind, Route, Service,
};
use serde_json::{json, Value};
use tracing::info;

use crate::Commands;

impl Commands {
    fn kind(&self) -> ResourceKind {
        match self {
            Commands::Create { kind, .. }
            | Commands::Read { kind, .. }
            | Commands::Update { kind, .. }
            | Commands::Delete { kind, .. }
            | Commands::Import { kind, .. } => *kind,
        }
    }
}

/// Run a subcommand and return the JSON document to print.
pub async fn run(engine: &Engine<KongAdminClient>, command: Commands) -> Result<Value> {
    match command.kind() {
        ResourceKind::Service => execute::<Service>(engine, command).await,
        ResourceKind::Route => execute::<Route>(engine, command).await,
        ResourceKind::Plugin => execute::<Plugin>(engine, command).await,
        ResourceKind::Consumer => execute::<Consumer>(engine, command).await,
    }
}

async fn execute<R: Resource>(
    engine: &Engine<KongAdminClient>,
    command: Commands,
) -> Result<Value> {
    let reconciler = engine.reconciler::<R>();

    match command {
        Commands::Create { file, .. } => {
            let desired = load_desired(&file).await?;
            let outcome = reconciler.create(&desired).await?;
            Ok(json!({
                "id": outcome.id,
                "provenance": outcome.provenance.to_string(),
                "state": reconciler.state(&outcome.record, Some(&desired)),
            }))
        }
        Commands::Read { id, file, .. } => {
            let desired = match file {
                Some(file) => Some(load_desired(&file).await?),
                None => None,
            };
            let state = reconciler
                .read(&id)
                .await?
                .map(|record| reconciler.state(&record, desired.as_ref()));
            if state.is_none() {
                info!("{} {} is gone; drop it from state", R::KIND, id);
            }
            Ok(json!({ "id": id, "state": state }))
        }
        Commands::Update { id, file, .. } => {
            let desired = load_desired(&file).await?;
            let outcome = reconciler.update(&id, &desired).await?;
            Ok(json!({
                "id": outcome.id,
                "provenance": outcome.provenance.to_string(),
                "state": reconciler.state(&outcome.record, Some(&desired)),
            }))
        }
        Commands::Delete { id, .. } => {
            reconciler.delete(&id).await?;
            Ok(json!({ "id": id, "deleted": true }))
        }
        Commands::Import { id, .. } => {
            let record = reconciler.import(&id).await?;
            Ok(json!({ "id": id, "state": reconciler.state(&record, None) }))
        }
    }
}

async fn load_desired(path: &Path) -> Result<DesiredRecord> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    DesiredRecord::from_json(&value)
        .with_context(|| format!("Invalid desired record in {}", path.display()))
}
