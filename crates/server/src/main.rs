use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use shared::protocol::{ActionFailed, ActionReceived};
use tracing::{error, info};

mod api;
mod app_state;
mod config;

use api::{action_route, decode_payload, render_index_page, PayloadError};
use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let index_html = render_index_page(&settings.site_url, &settings.contract_address)?;
    let state = AppState {
        index_html,
        max_action_body_bytes: settings.max_action_body_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, site_url = %settings.site_url, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(action_route(), any(frame_action))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn frame_action(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("POST"))],
        )
            .into_response();
    }

    match read_action_payload(&headers, body, state.max_action_body_bytes).await {
        Ok(payload) => {
            info!(%payload, "frame action payload");
            (StatusCode::OK, Json(ActionReceived::new(payload))).into_response()
        }
        Err(err) => {
            error!(error = %err, "action handler error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionFailed::new(err.to_string())),
            )
                .into_response()
        }
    }
}

async fn read_action_payload(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<serde_json::Value, PayloadError> {
    let bytes = axum::body::to_bytes(body, limit).await?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    decode_payload(content_type, &bytes)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
