//! HTTP front end: trigger training and serve predictions

mod pages;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{run_blocking, Pipeline};
use crate::prediction::{Predictor, RefitSettings};
use crate::source::DocumentSource;
use crate::storage::ArtifactStore;

/// Shared handler state
pub struct AppState {
    config: PipelineConfig,
    source: Arc<dyn DocumentSource>,
    /// Held for the duration of a `/train` request
    train_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: PipelineConfig, source: Arc<dyn DocumentSource>) -> Self {
        Self {
            config,
            source,
            train_lock: Mutex::new(()),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/train", get(train))
        .route("/predict", get(predict_form).post(predict))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until the process stops
pub async fn serve(config: PipelineConfig, source: Arc<dyn DocumentSource>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Serving on http://{}", listener.local_addr()?);
    serve_on(listener, Arc::new(AppState::new(config, source))).await
}

/// Serve on an already bound listener
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(pages::INDEX)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn train(State(state): State<Arc<AppState>>) -> String {
    let Ok(_guard) = state.train_lock.try_lock() else {
        warn!("Rejected /train: a training run is already in progress");
        return "Training failed: a training run is already running".to_string();
    };

    let pipeline = Pipeline::new(state.config.clone(), state.source.clone());
    match pipeline.run().await {
        Ok(report) => {
            info!("{}", report.message());
            report.message()
        }
        Err(e) => {
            error!("Training could not start: {}", e);
            format!("Training failed: {}", e)
        }
    }
}

async fn predict_form() -> Html<&'static str> {
    Html(pages::PREDICT_FORM)
}

async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // Model loading and the forest walk are blocking work
    let result = run_blocking(move || run_prediction(&state, &body)).await;
    match result {
        Ok(predictions) => Json(json!({ "predictions": predictions })).into_response(),
        Err(e) => {
            let message = e.user_message();
            warn!("Prediction failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}

fn run_prediction(state: &AppState, body: &[u8]) -> crate::Result<Vec<Value>> {
    let input: Value = serde_json::from_slice(body).map_err(|e| {
        PipelineError::invalid_input(format!("request body is not JSON: {}", e)).with_source(e)
    })?;
    let store = ArtifactStore::new(state.config.artifact_root.clone());
    let refit = RefitSettings {
        schema_path: &state.config.schema_path,
        steps: &state.config.feature_steps,
    };
    Predictor::from_latest(&store, &refit)?.predict_value(&input)
}
