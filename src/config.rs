use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::time::Duration;

/// Credentials and endpoints for the hosted payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    /// Shared secret appended to the canonical string when signing.
    pub passphrase: String,
    /// The buyer's browser is redirected here with the signed field set.
    pub process_url: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gateway: GatewayConfig,
    /// Abuse guard: checkout totals above this value are rejected outright.
    pub checkout_ceiling: Decimal,
    /// Withdrawal requests below this floor are rejected.
    pub minimum_withdrawal: Decimal,
    /// Deadline for the order-creation call during checkout.
    pub store_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl EngineConfig {
    /// Reads configuration from the environment, falling back to sandbox defaults.
    pub fn from_env() -> Self {
        Self {
            gateway: GatewayConfig {
                merchant_id: env_or("MERCHANT_ID", "10000100"),
                merchant_key: env_or("MERCHANT_KEY", "46f0cd694581a"),
                passphrase: env_or("GATEWAY_PASSPHRASE", "sandbox-passphrase"),
                process_url: env_or(
                    "GATEWAY_PROCESS_URL",
                    "https://sandbox.gateway.example/eng/process",
                ),
                return_url: env_or("CHECKOUT_RETURN_URL", "https://shop.example/checkout/return"),
                cancel_url: env_or("CHECKOUT_CANCEL_URL", "https://shop.example/checkout/cancel"),
                notify_url: env_or("GATEWAY_NOTIFY_URL", "https://shop.example/gateway/notify"),
            },
            checkout_ceiling: env::var("CHECKOUT_CEILING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(dec!(1_000_000)),
            minimum_withdrawal: env::var("MINIMUM_WITHDRAWAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(dec!(50)),
            store_timeout: Duration::from_secs(
                env::var("ORDER_STORE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }

    /// Fails closed when any gateway credential or endpoint is unusable.
    pub fn validate(&self) -> Result<()> {
        let gateway = &self.gateway;
        if gateway.merchant_id.trim().is_empty() {
            return Err(EngineError::Configuration("MERCHANT_ID is not set".into()));
        }
        if gateway.merchant_key.trim().is_empty() {
            return Err(EngineError::Configuration("MERCHANT_KEY is not set".into()));
        }
        if gateway.passphrase.trim().is_empty() {
            return Err(EngineError::Configuration(
                "GATEWAY_PASSPHRASE is not set".into(),
            ));
        }
        for (name, url) in [
            ("GATEWAY_PROCESS_URL", &gateway.process_url),
            ("CHECKOUT_RETURN_URL", &gateway.return_url),
            ("CHECKOUT_CANCEL_URL", &gateway.cancel_url),
            ("GATEWAY_NOTIFY_URL", &gateway.notify_url),
        ] {
            if !url.starts_with("http") {
                return Err(EngineError::Configuration(format!(
                    "{name} is not a valid URL: {url}"
                )));
            }
        }
        if self.checkout_ceiling <= Decimal::ZERO {
            return Err(EngineError::Configuration(
                "CHECKOUT_CEILING must be positive".into(),
            ));
        }
        if self.minimum_withdrawal < Decimal::ZERO {
            return Err(EngineError::Configuration(
                "MINIMUM_WITHDRAWAL must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::from_env();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_merchant_key_rejected() {
        let mut config = EngineConfig::from_env();
        config.gateway.merchant_key = String::new();
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_notify_url_rejected() {
        let mut config = EngineConfig::from_env();
        config.gateway.notify_url = "not-a-url".to_string();
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let mut config = EngineConfig::from_env();
        config.checkout_ceiling = Decimal::ZERO;
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }
}
