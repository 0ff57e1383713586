//! CLI route: single route table and run context.

use crate::app::Services;
use crate::cli::parse::Commands;
use crate::cli::presentation::{format_journey_text, format_response_body};
use crate::config::{ConfigLoader, DriftConfig};
use crate::error::DriftError;
use crate::server::{self, AppState};
use crate::types::{Journey, Point};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime context for CLI execution: workspace root and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: DriftConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, DriftError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, DriftError> {
        match command {
            Commands::Serve => self.handle_serve().await,
            Commands::Launch { lon, lat, server } => {
                self.handle_launch(Point::new(*lon, *lat), server.as_deref())
                    .await
            }
            Commands::Cancel { id, server } => self.handle_cancel(id, server.as_deref()).await,
            Commands::Show { id, server, json } => {
                self.handle_show(id, server.as_deref(), *json).await
            }
        }
    }

    async fn handle_serve(&self) -> Result<String, DriftError> {
        let (services, due) = Services::from_config(&self.config, &self.workspace_root)?;
        services.resume_pending().await?;

        let (stop, stopped) = oneshot::channel::<()>();
        let dispatcher = services.dispatcher.clone();
        let pump = tokio::spawn(async move {
            dispatcher
                .run(due, async {
                    let _ = stopped.await;
                })
                .await
        });

        let state = AppState {
            route_function: services.route_function.clone(),
            journeys: services.journeys.clone(),
        };
        let result = server::serve(state, &self.config.server.bind).await;

        // Retriggers not yet due are rebuilt from the store on the next start
        let _ = stop.send(());
        if let Err(e) = pump.await {
            warn!(error = %e, "Retrigger dispatcher task ended abnormally");
        }
        result.map(|_| "Server stopped".to_string())
    }

    async fn handle_launch(&self, origin: Point, server: Option<&str>) -> Result<String, DriftError> {
        let url = format!("{}/api/bottles", self.server_base(server));
        let response = http_client()?
            .post(&url)
            .json(&json!({ "origin": origin }))
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;
        let (status, body) = read_json(response).await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }
        info!(lon = origin.lon, lat = origin.lat, "Bottle launched");
        Ok(format_response_body(&body))
    }

    async fn handle_cancel(&self, id: &str, server: Option<&str>) -> Result<String, DriftError> {
        let url = format!("{}/api/bottles/{}", self.server_base(server), id);
        let response = http_client()?
            .delete(&url)
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(format!("Bottle {} cancelled", id)),
            status => {
                let (_, body) = read_json(response).await?;
                Err(rejected(status, &body))
            }
        }
    }

    async fn handle_show(
        &self,
        id: &str,
        server: Option<&str>,
        raw: bool,
    ) -> Result<String, DriftError> {
        let url = format!("{}/api/bottles/{}", self.server_base(server), id);
        let response = http_client()?
            .get(&url)
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;
        let (status, body) = read_json(response).await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }
        if raw {
            return serde_json::to_string_pretty(&body)
                .map_err(|e| DriftError::Server(e.to_string()));
        }
        let journey: Journey = serde_json::from_value(body)
            .map_err(|e| DriftError::Server(format!("Server returned an invalid journey: {}", e)))?;
        Ok(format_journey_text(&journey))
    }

    fn server_base(&self, server: Option<&str>) -> String {
        server
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.config.server.base_url())
    }
}

fn http_client() -> Result<Client, DriftError> {
    Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .map_err(|e| DriftError::Config(format!("Failed to create HTTP client: {}", e)))
}

fn request_failed(url: &str, e: reqwest::Error) -> DriftError {
    DriftError::Server(format!("Request to {} failed: {}", url, e))
}

async fn read_json(response: reqwest::Response) -> Result<(StatusCode, Value), DriftError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| DriftError::Server(format!("Failed to read response: {}", e)))?;
    if text.trim().is_empty() {
        return Ok((status, Value::Null));
    }
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

fn rejected(status: StatusCode, body: &Value) -> DriftError {
    let detail = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    DriftError::Server(format!("Server responded {}: {}", status.as_u16(), detail))
}
