use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Identity of an order record.
    OrderId
);
opaque_id!(
    /// Identity of a selling store (tenant).
    StoreId
);
opaque_id!(BuyerId);
opaque_id!(SellerId);
opaque_id!(ProductId);
opaque_id!(
    /// Unique per checkout attempt; carried to the gateway as `m_payment_id`.
    PaymentRef
);
opaque_id!(WithdrawalId);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl PaymentRef {
    /// A random idempotency token. Deliberately not derived from the buyer id or a
    /// timestamp, which collide under rapid repeated checkouts.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl WithdrawalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
