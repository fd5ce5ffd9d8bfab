//! CLI runner - executes commands

use crate::catalog::{precoro_streams, Catalog};
use crate::cli::commands::{Cli, Commands};
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::graph::StreamGraph;
use crate::http::{HttpClient, RequestConfig};
use crate::output::JsonLinesSink;
use crate::state::StateManager;
use serde_json::{json, Value};
use tracing::info;

/// Path requested by `check`
const CHECK_PATH: &str = "/taxes";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Discover => self.discover(),
            Commands::Read { .. } => self.read(&self.cli.command.selected_streams()).await,
        }
    }

    /// Load configuration; inline JSON takes precedence over the file
    fn load_config(&self) -> Result<TapConfig> {
        if let Some(json_str) = &self.cli.config_json {
            return TapConfig::from_json(json_str);
        }

        match &self.cli.config {
            Some(path) => TapConfig::from_file(path),
            None => Err(Error::config(
                "Config not specified (use --config or --config-json)",
            )),
        }
    }

    /// Load state; inline JSON takes precedence over the file
    fn load_state(&self) -> Result<StateManager> {
        let state = if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)?
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)?
        } else {
            StateManager::in_memory()
        };

        Ok(match &self.cli.state_out {
            Some(path) => state.persist_to(path),
            None => state,
        })
    }

    /// Print one JSON message on stdout
    fn output_message(&self, msg: &Value) {
        println!("{msg}");
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = HttpClient::from_tap_config(&config)?;

        info!("Checking connection to {}", config.api_url);
        let status = match client.get_json(CHECK_PATH, &RequestConfig::new()).await {
            Ok(_) => json!({"status": "SUCCEEDED", "message": "Connection successful"}),
            Err(e) => json!({
                "status": "FAILED",
                "message": format!("Connection failed ({}): {e}", e.reason())
            }),
        };

        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }));
        Ok(())
    }

    /// Print the catalog
    fn discover(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = Catalog::from_definitions(&precoro_streams(&config)?);

        let rendered = serde_json::to_string_pretty(&catalog)?;
        println!("{rendered}");
        Ok(())
    }

    /// Run the stream graph, writing messages to stdout
    async fn read(&self, streams: &[String]) -> Result<()> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let client = HttpClient::from_tap_config(&config)?;

        let graph = StreamGraph::new(precoro_streams(&config)?, client, state)?
            .with_start_date(config.start_date.clone())
            .select(streams)?;

        let mut sink = JsonLinesSink::stdout();
        let summary = graph.run(&mut sink).await?;
        graph.state().save().await?;

        info!(
            "Read finished: {} records from {} stream(s)",
            summary.total_records(),
            summary.streams.len()
        );

        match summary.failures.into_iter().next() {
            Some(failure) => Err(failure.error.in_stream(failure.stream)),
            None => Ok(()),
        }
    }
}
