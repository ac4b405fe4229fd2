use std::sync::Arc;

use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::api::AppState;

const INDEX_PAGE: &str = "index.html";

/// JSON summary for API clients, the HTML test page for everyone else.
pub async fn root(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let wants_json = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        return Json(json!({
            "message": "WayForPay Test App",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "testInterface": "GET / (HTML interface)",
                "createPayment": "POST /create-payment",
                "webhook": "POST /webhook/wayforpay",
            }
        }))
        .into_response();
    }

    let path = state.config.public_dir.join(INDEX_PAGE);

    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Test page is unavailable");
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}
