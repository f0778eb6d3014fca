//! apigw-swagger: reconcile a Swagger-defined REST API against the store.
//!
//! Each invocation runs one lifecycle event:
//! - create: import the definition and bind the new id
//! - read: check the bound REST API still exists
//! - update: replace the definition of the bound REST API
//! - delete: remove the bound REST API
//! - apply: read, then create or update
//!
//! The bound id is kept in a JSON state file between invocations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use reqwest::Url;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apigw_swagger::host::{self, LifecycleEvent};
use apigw_swagger::retry::RetryPolicy;
use apigw_swagger::{
    ApiGatewayClient, DesiredConfiguration, Presence, RestApiReconciler, StateFile, UpdateMode,
};

/// apigw Swagger API reconciler
#[derive(Parser, Debug)]
#[command(name = "apigw-swagger", version, about)]
struct Args {
    /// Definition store endpoint (e.g., http://localhost:4566)
    #[arg(long)]
    endpoint: Url,

    /// File the REST API id is kept in between runs
    #[arg(long, default_value = "apigw-swagger.state.json")]
    state_file: PathBuf,

    /// How long delete keeps retrying transient failures, in seconds
    #[arg(long, default_value = "300")]
    delete_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the definition as a new REST API
    Create(DefinitionArgs),
    /// Check that the bound REST API still exists
    Read,
    /// Replace the definition of the bound REST API
    Update(DefinitionArgs),
    /// Delete the bound REST API
    Delete,
    /// Create when absent, update when present
    Apply(DefinitionArgs),
}

#[derive(ClapArgs, Debug)]
struct DefinitionArgs {
    /// Path to the Swagger/OpenAPI document
    #[arg(long)]
    swagger: PathBuf,

    /// Ask the store to fail on definition warnings
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    fail_on_warnings: Option<bool>,

    /// Update mode: overwrite (default) or merge
    #[arg(long, default_value = "overwrite")]
    update_mode: UpdateMode,
}

impl DefinitionArgs {
    async fn load(&self) -> Result<DesiredConfiguration> {
        let body = tokio::fs::read(&self.swagger)
            .await
            .with_context(|| format!("Failed to read {}", self.swagger.display()))?;
        Ok(DesiredConfiguration {
            definition_body: body,
            fail_on_warnings: self.fail_on_warnings,
            update_mode: self.update_mode,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apigw_swagger=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("Definition store endpoint: {}", args.endpoint);

    let event = match &args.command {
        Command::Create(d) => LifecycleEvent::Create(d.load().await?),
        Command::Read => LifecycleEvent::Read,
        Command::Update(d) => LifecycleEvent::Update(d.load().await?),
        Command::Delete => LifecycleEvent::Delete,
        Command::Apply(d) => LifecycleEvent::Apply(d.load().await?),
    };

    let reconciler = RestApiReconciler::new(ApiGatewayClient::new(args.endpoint.clone()))
        .with_delete_retry(RetryPolicy::new(Duration::from_secs(
            args.delete_timeout_secs,
        )));
    let state_file = StateFile::new(args.state_file);

    let outcome = host::run_event(&reconciler, &state_file, event).await?;

    println!(
        "{}",
        json!({
            "id": outcome.state.id,
            "present": outcome.presence == Presence::Present,
        })
    );
    Ok(())
}
