use crate::spaceapi_logic::health::HealthInfo;
use crate::spaceapi_logic::picture::PictureManager;
use axum::{
    Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use lib_common::core::StatusReader;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    reader: StatusReader,
    pictures: Arc<PictureManager>,
    health: Arc<HealthInfo>,
    oas3_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(
        reader: StatusReader,
        pictures: PictureManager,
        health: HealthInfo,
        oas3_path: PathBuf,
    ) -> Self {
        Self {
            reader,
            pictures: Arc::new(pictures),
            health: Arc::new(health),
            oas3_path: Arc::new(oas3_path),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([HeaderName::from_static("x-requested-with"), header::CONTENT_TYPE]);

    Router::new()
        .route("/json", get(json_handler))
        .route("/text", get(text_handler))
        .route("/state.png", get(picture_handler))
        .route("/health", get(health_handler))
        .route("/oas3", get(oas3_handler))
        .layer(cors)
        .with_state(app_state)
}

pub async fn run(
    port: u16,
    app_state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("HTTP server shutting down.");
        })
        .await?;
    Ok(())
}

/// Serializes with four-space indentation.
fn to_indented_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn json_response<T: Serialize>(value: &T) -> Response {
    match to_indented_json(value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn json_handler(State(state): State<AppState>) -> Response {
    json_response(&state.reader.document())
}

async fn text_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        state.reader.state_token(),
    )
}

async fn picture_handler(State(state): State<AppState>) -> Response {
    match state.pictures.get_image().await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static("image/png"))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            log::error!(
                "Failed to load state image {}: {}",
                state.pictures.current_path().display(),
                e
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    json_response(&state.health.report(chrono::Local::now()))
}

async fn oas3_handler(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.oas3_path.as_path()).await {
        Ok(oas3) => ([(header::CONTENT_TYPE, "text/plain")], oas3).into_response(),
        Err(e) => {
            log::error!(
                "Failed to read OpenAPI document {}: {}",
                state.oas3_path.display(),
                e
            );
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
