use std::fmt::{Display, Formatter};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const DEFAULT_PRODUCT_NAME: &str = "Test Product";

/// Largest magnitude that still prints as an integer, same cutoff as a JS number.
const INTEGER_DISPLAY_LIMIT: f64 = 1e15;

/**
Payment amount. Renders like a JavaScript number: `100`, `12.5`, never `100.0`.
The same text goes into JSON bodies and into gateway signature strings, so the
two always agree.
 */
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    pub fn new(value: f64) -> Self {
        Amount(value)
    }

    pub fn is_positive(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    fn as_integer(self) -> Option<i64> {
        (self.0.fract() == 0.0 && self.0.abs() < INTEGER_DISPLAY_LIMIT).then_some(self.0 as i64)
    }

    fn from_value(value: Value) -> Option<Self> {
        let number = match value {
            Value::Number(num) => num.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };

        number.is_finite().then_some(Amount(number))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.as_integer() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_integer() {
            Some(v) => serializer.serialize_i64(v),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Amount::from_value(Deserialize::deserialize(deserializer)?)
            .ok_or_else(|| de::Error::custom("Wrong type, expected numeric amount"))
    }
}

/// Anything that is not a number or a numeric string reads as "no amount".
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Amount>, D::Error> {
    Ok(Amount::from_value(Deserialize::deserialize(deserializer)?))
}

/**
Body of `POST /create-payment`. Accepted as JSON or as an urlencoded form.
 */
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    #[serde(default, deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /**
    Full name, split on the first space into first and last name
     */
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

impl CreatePayment {
    pub fn product_name(&self) -> &str {
        non_empty(&self.product_name).unwrap_or(DEFAULT_PRODUCT_NAME)
    }

    pub fn customer_email(&self) -> Option<&str> {
        non_empty(&self.customer_email)
    }

    pub fn customer_name(&self) -> Option<&str> {
        non_empty(&self.customer_name)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/**
Data returned for a successfully created invoice link
 */
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub order_reference: String,
    pub amount: Amount,
    pub currency: String,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub reason: String,
    pub reason_code: i64,
}

/**
Response of `POST /create-payment`, success and failure alike
 */
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PaymentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PaymentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentResponse {
    pub fn created(data: PaymentLink) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn failed_with(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::failed(message)
        }
    }
}
