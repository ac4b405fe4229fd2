use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use shared::{CreatePayment, PaymentLink, PaymentResponse};
use tracing::{error, info, warn};

use crate::api::extract::JsonOrForm;
use crate::api::AppState;
use crate::external_services::wayforpay::REASON_CODE_OK;
use crate::invoice_handler::{generate_order_reference, CreatedInvoice, Invoice, InvoiceRequest};

pub const INVALID_AMOUNT: &str = "Amount is required and must be greater than 0";
const LINK_FAILED: &str = "Failed to create payment link";
const PAYMENT_FAILED: &str = "Failed to create payment";
const DEFAULT_REASON: &str = "Ok";

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    JsonOrForm(payload): JsonOrForm<CreatePayment>,
) -> (StatusCode, Json<PaymentResponse>) {
    let Some(amount) = payload.amount.filter(|amount| amount.is_positive()) else {
        warn!(amount = ?payload.amount, "Rejected payment without a positive amount");
        return (StatusCode::BAD_REQUEST, Json(PaymentResponse::failed(INVALID_AMOUNT)));
    };

    let request = InvoiceRequest::from_payment(
        &payload,
        amount,
        generate_order_reference(),
        &state.config.default_currency,
    );

    info!(?request, "Creating payment");

    match state.gateway.create_invoice_url(&request).await {
        Ok(CreatedInvoice::Created(invoice)) => {
            info!(order_reference = %request.order_reference, "Payment link created");
            (
                StatusCode::OK,
                Json(PaymentResponse::created(payment_link(request, invoice))),
            )
        }

        Ok(CreatedInvoice::Rejected { error }) => {
            warn!(order_reference = %request.order_reference, %error, "Gateway refused the invoice");
            (
                StatusCode::BAD_REQUEST,
                Json(PaymentResponse::failed_with(error, LINK_FAILED)),
            )
        }

        Err(err) => {
            error!(order_reference = %request.order_reference, error = %err, "Error creating payment");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PaymentResponse::failed_with(err.to_string(), PAYMENT_FAILED)),
            )
        }
    }
}

/// Empty reason and zero code count as missing.
fn payment_link(request: InvoiceRequest, invoice: Invoice) -> PaymentLink {
    PaymentLink {
        order_reference: request.order_reference,
        amount: request.amount,
        currency: request.currency,
        product_name: request.product_name.into_iter().next().unwrap_or_default(),
        invoice_url: invoice.invoice_url,
        qr_code: invoice.qr_code,
        reason: invoice
            .reason
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string()),
        reason_code: invoice
            .reason_code
            .filter(|code| *code != 0)
            .unwrap_or(REASON_CODE_OK),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use shared::Amount;

    use super::INVALID_AMOUNT;
    use crate::api::test_support::{app, send, FakeGateway, InvoiceBehaviour};
    use crate::invoice_handler::{CreatedInvoice, Invoice};

    fn created(invoice: Invoice) -> Arc<FakeGateway> {
        Arc::new(FakeGateway::new(InvoiceBehaviour::Create(CreatedInvoice::Created(invoice))))
    }

    fn invoice() -> Invoice {
        Invoice {
            invoice_url: Some("https://secure.wayforpay.com/invoice/i1".to_string()),
            qr_code: Some("https://secure.wayforpay.com/qr/i1".to_string()),
            reason: Some("Ok".to_string()),
            reason_code: Some(1100),
        }
    }

    fn json_request(body: Value) -> Request<Body> {
        Request::post("/create-payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(gateway: Arc<FakeGateway>, request: Request<Body>) -> (StatusCode, Value) {
        let (response, body) = send(app(gateway), request).await;

        (response.status(), serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn rejects_missing_or_non_positive_amounts() {
        for body in [json!({}), json!({ "amount": 0 }), json!({ "amount": -5 }), json!({ "amount": "abc" })] {
            let gateway = created(invoice());

            let (status, body) = call(gateway.clone(), json_request(body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "success": false, "message": INVALID_AMOUNT }));
            assert!(gateway.requests.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn body_without_content_type_is_validated_as_empty() {
        let request = Request::post("/create-payment").body(Body::from("amount=5")).unwrap();

        let (status, body) = call(created(invoice()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], INVALID_AMOUNT);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let request = Request::post("/create-payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"amount\": "))
            .unwrap();

        let (status, body) = call(created(invoice()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn creates_payment_link() {
        let gateway = created(invoice());

        let (status, body) = call(
            gateway.clone(),
            json_request(json!({
                "amount": 100,
                "customerEmail": "jane@example.com",
                "customerName": "Jane Doe"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["amount"], json!(100));
        assert_eq!(data["currency"], "UAH");
        assert_eq!(data["productName"], "Test Product");
        assert_eq!(data["invoiceUrl"], "https://secure.wayforpay.com/invoice/i1");
        assert_eq!(data["qrCode"], "https://secure.wayforpay.com/qr/i1");
        assert_eq!(data["reason"], "Ok");
        assert_eq!(data["reasonCode"], 1100);

        let requests = gateway.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(data["orderReference"], sent.order_reference.as_str());
        assert!(sent.order_reference.starts_with("order_"));
        assert_eq!(sent.product_price, vec![Amount::new(100.0)]);
        assert_eq!(sent.client_email.as_deref(), Some("jane@example.com"));
        assert_eq!(sent.client_first_name.as_deref(), Some("Jane"));
        assert_eq!(sent.client_last_name.as_deref(), Some("Doe"));
    }

    #[tokio::test]
    async fn accepts_urlencoded_form() {
        let gateway = created(invoice());
        let request = Request::post("/create-payment")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("amount=12.5&currency=USD&productName=Mug&customerName=Solo"))
            .unwrap();

        let (status, body) = call(gateway.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["amount"], json!(12.5));
        assert_eq!(body["data"]["currency"], "USD");
        assert_eq!(body["data"]["productName"], "Mug");

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].client_first_name.as_deref(), Some("Solo"));
        assert_eq!(requests[0].client_last_name.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn defaults_reason_and_code() {
        let gateway = created(Invoice {
            invoice_url: Some("https://secure.wayforpay.com/invoice/i2".to_string()),
            ..Invoice::default()
        });

        let (status, body) = call(gateway, json_request(json!({ "amount": 1 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["reason"], "Ok");
        assert_eq!(body["data"]["reasonCode"], 1100);
        assert!(body["data"].get("qrCode").is_none());
    }

    #[tokio::test]
    async fn echoes_gateway_refusal() {
        let gateway = Arc::new(FakeGateway::new(InvoiceBehaviour::Create(CreatedInvoice::Rejected {
            error: "Duplicate Order ID".to_string(),
        })));

        let (status, body) = call(gateway, json_request(json!({ "amount": 10 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Duplicate Order ID",
                "message": "Failed to create payment link"
            })
        );
    }

    #[tokio::test]
    async fn gateway_failure_is_internal_error() {
        let gateway = Arc::new(FakeGateway::new(InvoiceBehaviour::Fail));

        let (status, body) = call(gateway, json_request(json!({ "amount": 10 }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to create payment");
        assert_eq!(body["error"], "Unsupported response code: 502 Bad Gateway");
    }

    #[tokio::test]
    async fn order_references_are_distinct() {
        let gateway = created(invoice());

        for _ in 0..20 {
            let (status, _) = call(gateway.clone(), json_request(json!({ "amount": 1 }))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let requests = gateway.requests.lock().unwrap();
        let mut references: Vec<_> = requests.iter().map(|r| r.order_reference.clone()).collect();
        references.sort();
        references.dedup();
        assert_eq!(references.len(), 20);
    }
}
