use async_trait::async_trait;
use chrono::Utc;
use shared::{Amount, CreatePayment};
use uuid::Uuid;

use crate::external_services::wayforpay::{SignedAck, WebhookPayload};
use crate::external_services::GatewayError;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ORDER_FRAGMENT_LEN: usize = 6;

/**
Everything the HTTP layer needs from a payment gateway. Signing, signature
checks and the gateway's own HTTP calls live behind this trait.
 */
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice_url(&self, request: &InvoiceRequest) -> Result<CreatedInvoice, GatewayError>;

    /// Fails when the body is malformed or its signature does not match.
    fn parse_and_verify_incoming_webhook(&self, body: &[u8]) -> Result<WebhookPayload, GatewayError>;

    fn prepare_signed_webhook_response(&self, payload: &WebhookPayload) -> SignedAck;
}

/**
Single order as handed to the gateway. Product lists are parallel arrays.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRequest {
    pub order_reference: String,
    pub amount: Amount,
    pub currency: String,
    pub product_name: Vec<String>,
    pub product_count: Vec<u32>,
    pub product_price: Vec<Amount>,
    pub client_email: Option<String>,
    pub client_first_name: Option<String>,
    pub client_last_name: Option<String>,
}

impl InvoiceRequest {
    /// One line item of quantity 1 priced at the whole amount.
    pub fn from_payment(
        payment: &CreatePayment,
        amount: Amount,
        order_reference: String,
        default_currency: &str,
    ) -> Self {
        let (client_first_name, client_last_name) = match payment.customer_name() {
            Some(name) => {
                let (first, last) = split_customer_name(name);
                (Some(first), Some(last))
            }
            None => (None, None),
        };

        Self {
            order_reference,
            amount,
            currency: payment
                .currency
                .clone()
                .unwrap_or_else(|| default_currency.to_string()),
            product_name: vec![payment.product_name().to_string()],
            product_count: vec![1],
            product_price: vec![amount],
            client_email: payment.customer_email().map(str::to_string),
            client_first_name,
            client_last_name,
        }
    }
}

/// Splits on the first space; no space means an empty last name. Extra spaces
/// between the two parts are dropped.
pub fn split_customer_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

/// `order_<unix millis>_<base36 fragment>`. Unique with overwhelming probability, not guaranteed.
pub fn generate_order_reference() -> String {
    format!("order_{}_{}", Utc::now().timestamp_millis(), random_fragment())
}

fn random_fragment() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut fragment = String::with_capacity(ORDER_FRAGMENT_LEN);

    for _ in 0..ORDER_FRAGMENT_LEN {
        fragment.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }

    fragment
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invoice {
    pub invoice_url: Option<String>,
    pub qr_code: Option<String>,
    pub reason: Option<String>,
    pub reason_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreatedInvoice {
    Created(Invoice),
    /**
    The gateway answered but refused to issue the invoice
     */
    Rejected { error: String },
}
