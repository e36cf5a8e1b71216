//! Service entry point: configuration, wiring, and the HTTP listener.

use std::sync::Arc;
use std::time::Duration;

use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::EnvFilter;

use estate_desk::adapters::http::{api_router, cors_layer, AppState};
use estate_desk::adapters::model::{GeminiClient, GeminiConfig};
use estate_desk::application::agents::{
    Agent, AmenitiesAgent, ClosingAgent, NegotiationAgent, PropertySearchAgent,
};
use estate_desk::application::{DispatchOrchestrator, Orchestrator, PipelineOrchestrator};
use estate_desk::config::{AppConfig, OrchestratorMode};
use estate_desk::ports::ModelClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.server.log_level.clone()))
        .init();

    // Fail fast: a missing API key must stop the process, not a request.
    config.validate()?;

    let api_key = config
        .model
        .api_key
        .clone()
        .expect("validated configuration carries an API key");
    let client: Arc<dyn ModelClient> = Arc::new(GeminiClient::new(
        GeminiConfig::new(api_key)
            .with_model(config.model.model.clone())
            .with_base_url(config.model.base_url.clone())
            .with_timeout(config.model.timeout()),
    ));
    tracing::info!(model = %config.model.model, "model client ready");

    let orchestrator = match config.orchestrator_mode {
        OrchestratorMode::Dispatch => {
            let pause = config.model.greeting_pause();
            let roster: Vec<Arc<dyn Agent>> = vec![
                Arc::new(PropertySearchAgent::new(client.clone()).with_greeting_pause(pause)),
                Arc::new(AmenitiesAgent::new(client.clone()).with_greeting_pause(pause)),
                Arc::new(NegotiationAgent::new(client.clone()).with_greeting_pause(pause)),
                Arc::new(ClosingAgent::new(client.clone()).with_greeting_pause(pause)),
            ];
            Orchestrator::Dispatch(DispatchOrchestrator::new(client, roster))
        }
        OrchestratorMode::Pipeline => {
            Orchestrator::Pipeline(PipelineOrchestrator::new(client))
        }
    };

    let state = AppState::new(Arc::new(orchestrator));
    let app = api_router(state)
        .layer(cors_layer(&config.server.cors_origins_list()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    tracing::info!(%addr, mode = ?config.orchestrator_mode, "estate-desk listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
