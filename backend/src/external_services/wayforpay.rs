use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use shared::Amount;

/// `reasonCode` WayForPay returns for a successful operation.
pub const REASON_CODE_OK: i64 = 1100;

const TRANSACTION_TYPE_CREATE_INVOICE: &str = "CREATE_INVOICE";
const MERCHANT_AUTH_TYPE: &str = "SimpleSignature";
const API_VERSION: u8 = 1;
const ACK_STATUS_ACCEPT: &str = "accept";

#[skip_serializing_none]
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
/**
https://wiki.wayforpay.com/en/view/852498
 */
struct CreateInvoiceParams<'a> {
    /**
    Always `CREATE_INVOICE`
     */
    transaction_type: &'static str,

    merchant_account: &'a str,

    /**
    `SimpleSignature`: HMAC-MD5 with the merchant secret key
     */
    merchant_auth_type: &'static str,

    merchant_domain_name: &'a str,

    merchant_signature: String,

    api_version: u8,

    /**
    URL WayForPay posts the transaction result to
     */
    service_url: Option<&'a str>,

    order_reference: &'a str,

    /**
    Unix seconds
     */
    order_date: i64,

    amount: Amount,

    currency: &'a str,

    product_name: &'a [String],

    product_price: &'a [Amount],

    product_count: &'a [u32],

    client_first_name: Option<&'a str>,

    client_last_name: Option<&'a str>,

    client_email: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceResponse {
    reason: Option<String>,

    /**
    1100 on success, anything else is a refusal
     */
    reason_code: Option<i64>,

    /**
    Hosted payment page
     */
    invoice_url: Option<String>,

    qr_code: Option<String>,
}

/**
Transaction state reported in a webhook
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    InProcessing,
    WaitingAuthComplete,
    Approved,
    Pending,
    Expired,
    Refunded,
    Voided,
    Declined,
    RefundInProcessing,
    Other(String),
}

impl TransactionStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "InProcessing" => TransactionStatus::InProcessing,
            "WaitingAuthComplete" => TransactionStatus::WaitingAuthComplete,
            "Approved" => TransactionStatus::Approved,
            "Pending" => TransactionStatus::Pending,
            "Expired" => TransactionStatus::Expired,
            "Refunded" => TransactionStatus::Refunded,
            "Voided" => TransactionStatus::Voided,
            "Declined" => TransactionStatus::Declined,
            "RefundInProcessing" => TransactionStatus::RefundInProcessing,
            other => TransactionStatus::Other(other.to_string()),
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TransactionStatus::InProcessing => "InProcessing",
            TransactionStatus::WaitingAuthComplete => "WaitingAuthComplete",
            TransactionStatus::Approved => "Approved",
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Expired => "Expired",
            TransactionStatus::Refunded => "Refunded",
            TransactionStatus::Voided => "Voided",
            TransactionStatus::Declined => "Declined",
            TransactionStatus::RefundInProcessing => "RefundInProcessing",
            TransactionStatus::Other(raw) => raw,
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawIncomingWebhook {
    merchant_signature: Option<String>,

    #[serde(flatten)]
    payload: WebhookPayload,
}

/**
Webhook body after its signature has been checked.
https://wiki.wayforpay.com/en/view/852102
 */
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub merchant_account: String,

    pub order_reference: String,

    pub amount: Amount,

    pub currency: String,

    /**
    Bank authorization code, empty for failed payments
     */
    #[serde(default)]
    pub auth_code: String,

    /**
    Masked card number
     */
    #[serde(default)]
    pub card_pan: String,

    pub transaction_status: String,

    #[serde(default)]
    pub reason: String,

    pub reason_code: i64,

    pub email: Option<String>,

    pub phone: Option<String>,

    /**
    Unix seconds
     */
    pub created_date: Option<i64>,

    /**
    Unix seconds
     */
    pub processing_date: Option<i64>,

    pub card_type: Option<String>,

    pub issuer_bank_country: Option<String>,

    pub issuer_bank_name: Option<String>,

    pub payment_system: Option<String>,

    pub fee: Option<f64>,

    /**
    Token for recurring charges, present only when requested
     */
    pub rec_token: Option<String>,
}

impl WebhookPayload {
    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_raw(&self.transaction_status)
    }

    fn signature_fields(&self) -> [String; 8] {
        [
            self.merchant_account.clone(),
            self.order_reference.clone(),
            self.amount.to_string(),
            self.currency.clone(),
            self.auth_code.clone(),
            self.card_pan.clone(),
            self.transaction_status.clone(),
            self.reason_code.to_string(),
        ]
    }
}

/**
Answer WayForPay expects to every webhook. Without it the gateway keeps
redelivering the notification.
 */
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedAck {
    pub order_reference: String,

    /**
    Always `accept`
     */
    pub status: String,

    /**
    Unix seconds
     */
    pub time: i64,

    pub signature: String,
}

pub(crate) mod handler {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::{RequestBuilder, Response, StatusCode};
    use tracing::debug;

    use crate::config::MainConfig;
    use crate::external_services::wayforpay::{
        CreateInvoiceParams, CreateInvoiceResponse, RawIncomingWebhook, SignedAck, WebhookPayload,
        ACK_STATUS_ACCEPT, API_VERSION, MERCHANT_AUTH_TYPE, REASON_CODE_OK,
        TRANSACTION_TYPE_CREATE_INVOICE,
    };
    use crate::external_services::{sign, validate_signature, GatewayError};
    use crate::invoice_handler::{CreatedInvoice, Invoice, InvoiceRequest, PaymentGateway};

    pub struct WayForPayHandler {
        config: Arc<MainConfig>,
        client: reqwest::Client,
    }

    impl WayForPayHandler {
        pub fn new(config: Arc<MainConfig>) -> Result<Self, GatewayError> {
            let client = reqwest::Client::builder().timeout(config.timeout()).build()?;

            Ok(Self { config, client })
        }

        fn create_invoice_params<'a>(
            &'a self,
            request: &'a InvoiceRequest,
            order_date: i64,
        ) -> CreateInvoiceParams<'a> {
            let mut fields = vec![
                self.config.merchant_account.clone(),
                self.config.merchant_domain_name.clone(),
                request.order_reference.clone(),
                order_date.to_string(),
                request.amount.to_string(),
                request.currency.clone(),
            ];
            fields.extend(request.product_name.iter().cloned());
            fields.extend(request.product_count.iter().map(|c| c.to_string()));
            fields.extend(request.product_price.iter().map(|p| p.to_string()));

            CreateInvoiceParams {
                transaction_type: TRANSACTION_TYPE_CREATE_INVOICE,
                merchant_account: &self.config.merchant_account,
                merchant_auth_type: MERCHANT_AUTH_TYPE,
                merchant_domain_name: &self.config.merchant_domain_name,
                merchant_signature: sign(&self.config.merchant_secret_key, &fields),
                api_version: API_VERSION,
                service_url: Some(self.config.service_url.as_str()).filter(|url| !url.is_empty()),
                order_reference: &request.order_reference,
                order_date,
                amount: request.amount,
                currency: &request.currency,
                product_name: &request.product_name,
                product_price: &request.product_price,
                product_count: &request.product_count,
                client_first_name: request.client_first_name.as_deref(),
                client_last_name: request.client_last_name.as_deref(),
                client_email: request.client_email.as_deref(),
            }
        }

        fn create_invoice_request(&self, request: &InvoiceRequest, order_date: i64) -> RequestBuilder {
            let params = self.create_invoice_params(request, order_date);

            debug!(order_reference = %request.order_reference, "Sending CREATE_INVOICE to WayForPay");

            self.client.post(&self.config.api_url).json(&params)
        }

        async fn proceed_create_invoice_response(
            &self,
            response: Response,
        ) -> Result<CreatedInvoice, GatewayError> {
            match response.status() {
                StatusCode::OK => {
                    let bytes = response.bytes().await?;
                    let body: CreateInvoiceResponse = serde_json::from_slice(&bytes)?;

                    Ok(created_invoice_from(body))
                }

                code => Err(GatewayError::UnexpectedStatus(code)),
            }
        }

        pub(crate) fn verify_webhook(&self, body: &[u8]) -> Result<WebhookPayload, GatewayError> {
            let raw: RawIncomingWebhook = serde_json::from_slice(body)?;

            let Some(signature) = raw.merchant_signature else {
                return Err(GatewayError::FieldMissing("merchantSignature"));
            };

            let payload = raw.payload;

            if !self.config.merchant_account.is_empty()
                && payload.merchant_account != self.config.merchant_account
            {
                return Err(GatewayError::MerchantMismatch(payload.merchant_account));
            }

            if !validate_signature(
                &signature,
                &self.config.merchant_secret_key,
                &payload.signature_fields(),
            ) {
                return Err(GatewayError::InvalidSignature);
            }

            Ok(payload)
        }

        pub(crate) fn signed_ack_at(&self, payload: &WebhookPayload, time: i64) -> SignedAck {
            let time_field = time.to_string();
            let signature = sign(
                &self.config.merchant_secret_key,
                &[payload.order_reference.as_str(), ACK_STATUS_ACCEPT, time_field.as_str()],
            );

            SignedAck {
                order_reference: payload.order_reference.clone(),
                status: ACK_STATUS_ACCEPT.to_string(),
                time,
                signature,
            }
        }
    }

    fn created_invoice_from(body: CreateInvoiceResponse) -> CreatedInvoice {
        match body.reason_code {
            Some(REASON_CODE_OK) => CreatedInvoice::Created(Invoice {
                invoice_url: body.invoice_url,
                qr_code: body.qr_code,
                reason: body.reason,
                reason_code: body.reason_code,
            }),

            code => CreatedInvoice::Rejected {
                error: body
                    .reason
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| format!("Unexpected reason code: {code:?}")),
            },
        }
    }

    #[async_trait]
    impl PaymentGateway for WayForPayHandler {
        async fn create_invoice_url(&self, request: &InvoiceRequest) -> Result<CreatedInvoice, GatewayError> {
            let response = self
                .create_invoice_request(request, Utc::now().timestamp())
                .send()
                .await?;

            self.proceed_create_invoice_response(response).await
        }

        fn parse_and_verify_incoming_webhook(&self, body: &[u8]) -> Result<WebhookPayload, GatewayError> {
            self.verify_webhook(body)
        }

        fn prepare_signed_webhook_response(&self, payload: &WebhookPayload) -> SignedAck {
            self.signed_ack_at(payload, Utc::now().timestamp())
        }
    }

}
