pub mod wayforpay;

use hmac::{Hmac, Mac};
use md5::Md5;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacMd5 = Hmac<Md5>;

/// Lowercase hex HMAC-MD5 over the fields joined with `;`.
fn sign<S: AsRef<str>>(secret: &str, fields: &[S]) -> String {
    let mut mac =
        HmacMd5::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            mac.update(b";");
        }
        mac.update(field.as_ref().as_bytes());
    }

    hex::encode(mac.finalize().into_bytes())
}

fn validate_signature<S: AsRef<str>>(provided_signature: &str, secret: &str, fields: &[S]) -> bool {
    let expected = sign(secret, fields);
    let provided = provided_signature.to_ascii_lowercase();

    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Missing field: {0:?}")]
    FieldMissing(&'static str),

    #[error("Unknown merchant account: {0:?}")]
    MerchantMismatch(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Can't connect to WayForPay servers: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unsupported response code: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}
