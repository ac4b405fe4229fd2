use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::AppState;
use crate::external_services::wayforpay::{TransactionStatus, WebhookPayload};

#[derive(Serialize)]
struct WebhookError {
    error: String,
}

/// Verifies a WayForPay callback and answers with the gateway's signed ack.
/// The transaction status only changes what gets logged.
pub async fn wayforpay_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    info!(body = %String::from_utf8_lossy(&body), "Received webhook");

    let payload = match state.gateway.parse_and_verify_incoming_webhook(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "Error processing webhook");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookError {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    log_transaction_status(&payload);

    Json(state.gateway.prepare_signed_webhook_response(&payload)).into_response()
}

fn log_transaction_status(payload: &WebhookPayload) {
    let order_reference = &payload.order_reference;

    match payload.status() {
        TransactionStatus::Approved => info!(
            %order_reference,
            amount = %payload.amount,
            currency = %payload.currency,
            "Payment approved"
        ),
        TransactionStatus::Declined => info!(
            %order_reference,
            reason_code = payload.reason_code,
            reason = %payload.reason,
            "Payment declined"
        ),
        status => info!(%order_reference, %status, "Payment status"),
    }
}
