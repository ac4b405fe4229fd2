use std::fmt::{Debug, Formatter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/**
Process configuration, read once at startup and shared read-only afterwards.
Every field is optional in the environment; missing merchant credentials only
produce a warning so the test page can still be served.
 */
#[derive(Deserialize, Clone)]
pub struct MainConfig {
    #[serde(rename = "wayforpay_merchant_account", default)]
    pub merchant_account: String,
    #[serde(rename = "wayforpay_merchant_secret_key", default)]
    pub merchant_secret_key: String,
    #[serde(rename = "wayforpay_merchant_domain_name", default)]
    pub merchant_domain_name: String,
    /**
    Callback URL WayForPay posts transaction updates to
     */
    #[serde(rename = "wayforpay_service_url", default)]
    pub service_url: String,
    #[serde(rename = "wayforpay_api_url", default = "default_api_url")]
    pub api_url: String,
    #[serde(rename = "wayforpay_default_currency", default = "default_currency")]
    pub default_currency: String,
    #[serde(rename = "wayforpay_timeout_secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

fn default_api_url() -> String {
    "https://api.wayforpay.com/api".to_string()
}

fn default_currency() -> String {
    "UAH".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_public_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/public"))
}

impl MainConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env::<MainConfig>()
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn warn_on_missing_credentials(&self) {
        let required = [
            ("WAYFORPAY_MERCHANT_ACCOUNT", &self.merchant_account),
            ("WAYFORPAY_MERCHANT_SECRET_KEY", &self.merchant_secret_key),
            ("WAYFORPAY_MERCHANT_DOMAIN_NAME", &self.merchant_domain_name),
            ("WAYFORPAY_SERVICE_URL", &self.service_url),
        ];

        for (name, value) in required {
            if value.is_empty() {
                warn!(variable = name, "Merchant setting is empty, gateway calls will fail");
            }
        }
    }
}

impl Debug for MainConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainConfig")
            .field("merchant_account", &self.merchant_account)
            .field("merchant_secret_key", &"***")
            .field("merchant_domain_name", &self.merchant_domain_name)
            .field("service_url", &self.service_url)
            .field("api_url", &self.api_url)
            .field("default_currency", &self.default_currency)
            .field("timeout_secs", &self.timeout_secs)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("public_dir", &self.public_dir)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> MainConfig {
    envy::from_iter::<_, MainConfig>([
        ("WAYFORPAY_MERCHANT_ACCOUNT".to_string(), "test_merch_n1".to_string()),
        (
            "WAYFORPAY_MERCHANT_SECRET_KEY".to_string(),
            "flk3409refn54t54t*FNJRET".to_string(),
        ),
        ("WAYFORPAY_MERCHANT_DOMAIN_NAME".to_string(), "www.market.ua".to_string()),
        (
            "WAYFORPAY_SERVICE_URL".to_string(),
            "https://example.test/webhook/wayforpay".to_string(),
        ),
    ])
    .expect("test config is valid")
}
