pub mod extract;
pub mod index;
pub mod payments;
pub mod security;
pub mod webhooks;

use std::sync::Arc;

use axum::handler::HandlerWithoutStateExt;
use axum::http::{Method, StatusCode};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::MainConfig;
use crate::invoice_handler::PaymentGateway;

pub struct AppState {
    pub config: Arc<MainConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let public = ServeDir::new(&state.config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/", get(index::root))
        .route("/create-payment", post(payments::create_payment))
        .route("/webhook/wayforpay", post(webhooks::wayforpay_webhook))
        .fallback_service(public)
        .layer(cors())
        .layer(middleware::from_fn(security::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api::{router, AppState};
    use crate::config::test_config;
    use crate::external_services::wayforpay::{SignedAck, WebhookPayload};
    use crate::external_services::GatewayError;
    use crate::invoice_handler::{CreatedInvoice, InvoiceRequest, PaymentGateway};

    pub(crate) enum InvoiceBehaviour {
        Create(CreatedInvoice),
        Fail,
    }

    /// Canned gateway; webhooks carrying `"merchantSignature": "valid"` pass verification.
    pub(crate) struct FakeGateway {
        pub invoice: InvoiceBehaviour,
        pub ack: SignedAck,
        pub requests: Mutex<Vec<InvoiceRequest>>,
    }

    impl FakeGateway {
        pub fn new(invoice: InvoiceBehaviour) -> Self {
            Self {
                invoice,
                ack: SignedAck {
                    order_reference: "order_1_abc".to_string(),
                    status: "accept".to_string(),
                    time: 1700000100,
                    signature: "0123456789abcdef0123456789abcdef".to_string(),
                },
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_invoice_url(&self, request: &InvoiceRequest) -> Result<CreatedInvoice, GatewayError> {
            self.requests.lock().unwrap().push(request.clone());

            match &self.invoice {
                InvoiceBehaviour::Create(created) => Ok(created.clone()),
                InvoiceBehaviour::Fail => Err(GatewayError::UnexpectedStatus(
                    reqwest::StatusCode::BAD_GATEWAY,
                )),
            }
        }

        fn parse_and_verify_incoming_webhook(&self, body: &[u8]) -> Result<WebhookPayload, GatewayError> {
            let mut value: Value = serde_json::from_slice(body)?;
            let signature = value
                .as_object_mut()
                .and_then(|body| body.remove("merchantSignature"));

            if signature != Some(Value::from("valid")) {
                return Err(GatewayError::InvalidSignature);
            }

            Ok(serde_json::from_value(value)?)
        }

        fn prepare_signed_webhook_response(&self, _payload: &WebhookPayload) -> SignedAck {
            self.ack.clone()
        }
    }

    pub(crate) fn app(gateway: Arc<FakeGateway>) -> Router {
        router(Arc::new(AppState {
            config: Arc::new(test_config()),
            gateway,
        }))
    }

    pub(crate) async fn send(app: Router, request: Request<Body>) -> (Response<Body>, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes().to_vec();

        (Response::from_parts(parts, Body::empty()), bytes)
    }
}
