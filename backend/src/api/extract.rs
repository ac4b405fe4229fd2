use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::de::DeserializeOwned;
use shared::PaymentResponse;
use tracing::warn;

/**
Body extractor for `/create-payment`. JSON and urlencoded forms are both
accepted; a request with any other content type reads as an empty object, so
the handler's own validation decides what to answer.
 */
pub struct JsonOrForm<T>(pub T);

enum BodyKind {
    Json,
    Form,
    Empty,
}

fn body_kind(request: &Request) -> BodyKind {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::Form
    } else if content_type.starts_with("application/json") || content_type.contains("+json") {
        BodyKind::Json
    } else {
        BodyKind::Empty
    }
}

fn reject(reason: String) -> Response {
    warn!(%reason, "Rejected unreadable request body");

    (StatusCode::BAD_REQUEST, Json(PaymentResponse::failed(reason))).into_response()
}

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send + 'static,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match body_kind(&request) {
            BodyKind::Json => {
                let Json(value) = Json::<T>::from_request(request, state)
                    .await
                    .map_err(|err| reject(err.body_text()))?;

                Ok(JsonOrForm(value))
            }

            BodyKind::Form => {
                let Form(value) = Form::<T>::from_request(request, state)
                    .await
                    .map_err(|err| reject(err.body_text()))?;

                Ok(JsonOrForm(value))
            }

            BodyKind::Empty => serde_json::from_str("{}")
                .map(JsonOrForm)
                .map_err(|err| reject(err.to_string())),
        }
    }
}
