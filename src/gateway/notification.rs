use crate::domain::ids::{OrderId, PaymentRef};
use crate::error::{EngineError, Result};
use crate::gateway::signature;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Declared payment status for a successful capture.
pub const STATUS_COMPLETE: &str = "COMPLETE";

/// An inbound gateway notification.
///
/// Structurally mirrors the outbound request plus gateway-assigned transaction
/// metadata. Untrusted until `verify` passes; every accessor treats the field
/// map as hostile input.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    fields: BTreeMap<String, String>,
}

impl PaymentNotification {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Gateway-assigned transaction id, if present.
    pub fn transaction_id(&self) -> Option<&str> {
        self.fields.get("txn_id").map(String::as_str)
    }

    /// The payment identifier minted at checkout, if echoed back.
    pub fn payment_ref(&self) -> Option<PaymentRef> {
        self.fields
            .get("m_payment_id")
            .filter(|v| !v.is_empty())
            .map(|v| PaymentRef::from(v.as_str()))
    }

    pub fn payment_status(&self) -> Option<&str> {
        self.fields.get("payment_status").map(String::as_str)
    }

    /// The custom order reference carried through the gateway.
    pub fn order_id(&self) -> Result<OrderId> {
        self.fields
            .get("custom_str1")
            .filter(|v| !v.is_empty())
            .map(|v| OrderId::from(v.as_str()))
            .ok_or_else(|| {
                EngineError::Validation("notification carries no order reference".to_string())
            })
    }

    /// The gross amount the notification claims was paid.
    pub fn amount_gross(&self) -> Result<Decimal> {
        let raw = self.fields.get("amount_gross").ok_or_else(|| {
            EngineError::Validation("notification carries no gross amount".to_string())
        })?;
        raw.parse().map_err(|_| {
            EngineError::Validation(format!("unparseable gross amount: {raw}"))
        })
    }

    /// Verifies the gateway signature over this notification's own fields.
    pub fn verify(&self, passphrase: &str) -> Result<()> {
        let claimed = self.fields.get(signature::SIGNATURE_FIELD).ok_or_else(|| {
            EngineError::Signature("notification carries no signature".to_string())
        })?;
        if signature::verify(&self.fields, passphrase, claimed)? {
            Ok(())
        } else {
            Err(EngineError::Signature(
                "notification signature mismatch".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signed_notification(passphrase: &str) -> PaymentNotification {
        let mut fields = BTreeMap::from([
            ("m_payment_id".to_string(), "ref-001".to_string()),
            ("txn_id".to_string(), "1089250".to_string()),
            ("payment_status".to_string(), STATUS_COMPLETE.to_string()),
            ("amount_gross".to_string(), "115.00".to_string()),
            ("custom_str1".to_string(), "order-1".to_string()),
            ("custom_str2".to_string(), "buyer-7".to_string()),
        ]);
        let digest = signature::sign(&fields, passphrase).unwrap();
        fields.insert(signature::SIGNATURE_FIELD.to_string(), digest);
        PaymentNotification::new(fields)
    }

    #[test]
    fn test_accessors() {
        let notification = signed_notification("secret");
        assert_eq!(notification.order_id().unwrap(), OrderId::from("order-1"));
        assert_eq!(notification.amount_gross().unwrap(), dec!(115.00));
        assert_eq!(notification.transaction_id(), Some("1089250"));
        assert_eq!(notification.payment_status(), Some(STATUS_COMPLETE));
    }

    #[test]
    fn test_verify_accepts_genuine_signature() {
        let notification = signed_notification("secret");
        assert!(notification.verify("secret").is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let notification = signed_notification("secret");
        assert!(matches!(
            notification.verify("other"),
            Err(EngineError::Signature(_))
        ));
    }

    #[test]
    fn test_verify_rejects_missing_signature() {
        let notification = PaymentNotification::new(BTreeMap::from([(
            "amount_gross".to_string(),
            "10.00".to_string(),
        )]));
        assert!(matches!(
            notification.verify("secret"),
            Err(EngineError::Signature(_))
        ));
    }

    #[test]
    fn test_missing_order_reference() {
        let notification = PaymentNotification::new(BTreeMap::from([(
            "amount_gross".to_string(),
            "10.00".to_string(),
        )]));
        assert!(matches!(
            notification.order_id(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_unparseable_amount() {
        let notification = PaymentNotification::new(BTreeMap::from([(
            "amount_gross".to_string(),
            "lots".to_string(),
        )]));
        assert!(matches!(
            notification.amount_gross(),
            Err(EngineError::Validation(_))
        ));
    }
}
