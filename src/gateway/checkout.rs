use crate::config::EngineConfig;
use crate::domain::ids::{BuyerId, OrderId, PaymentRef, ProductId, StoreId};
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::domain::ports::OrderStoreRef;
use crate::error::{EngineError, Result};
use crate::gateway::signature;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Gateway cap on the buyer name fields.
const NAME_MAX_LEN: usize = 100;

/// One cart entry as submitted at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub buyer_id: BuyerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub store_id: StoreId,
    pub lines: Vec<CartLine>,
    pub shipping_address: String,
    pub billing_address: String,
    pub delivery_charge: Decimal,
    pub declared_total: Decimal,
}

/// A fully signed, redirect-ready payment request.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub order_id: OrderId,
    pub redirect_url: String,
    pub fields: BTreeMap<String, String>,
}

/// Validates a checkout, creates the pending order and assembles the signed
/// gateway payload.
pub struct PaymentIntentBuilder {
    config: EngineConfig,
    orders: OrderStoreRef,
}

impl PaymentIntentBuilder {
    pub fn new(config: EngineConfig, orders: OrderStoreRef) -> Self {
        Self { config, orders }
    }

    pub async fn build(&self, request: CheckoutRequest) -> Result<PaymentIntent> {
        self.config.validate()?;
        let total = self.validated_total(&request)?;

        let order_id = OrderId::generate();
        let payment_ref = PaymentRef::generate();
        let lines = request
            .lines
            .iter()
            .map(|line| {
                Ok(OrderLine {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price: Amount::new(line.unit_price)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let order = Order {
            id: order_id.clone(),
            buyer_id: request.buyer_id.clone(),
            store_id: request.store_id.clone(),
            lines: Vec::new(),
            shipping_address: request.shipping_address.clone(),
            billing_address: request.billing_address.clone(),
            delivery_charge: Balance::new(request.delivery_charge),
            total_amount: total,
            status: OrderStatus::Pending,
            payment_ref: payment_ref.clone(),
            created_at: Utc::now(),
        };

        // No signed payload leaves this function unless the order is durably
        // created. A hung store degrades to an explicit error instead of an
        // indefinitely hung checkout.
        match tokio::time::timeout(self.config.store_timeout, self.orders.create_order(order))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(EngineError::OrderCreation(e.to_string())),
            Err(_) => {
                return Err(EngineError::OrderCreation(
                    "order store did not respond within the deadline".to_string(),
                ));
            }
        }

        // Items are persisted out of band; the checkout response does not wait
        // for them. Orders with a missing item set are picked up by
        // reconciliation.
        let store = Arc::clone(&self.orders);
        let pending_id = order_id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.create_order_items(&pending_id, lines).await {
                warn!(order_id = %pending_id, error = %e, "line-item persistence failed");
            }
        });

        let fields = self.gateway_fields(&request, &order_id, &payment_ref, total)?;
        Ok(PaymentIntent {
            order_id,
            redirect_url: self.config.gateway.process_url.clone(),
            fields,
        })
    }

    /// Fail-closed input validation. The declared total must match the cart
    /// contents exactly; it is captured into the order and never recomputed.
    fn validated_total(&self, request: &CheckoutRequest) -> Result<Amount> {
        if request.lines.is_empty() {
            return Err(EngineError::Validation(
                "checkout requires at least one cart line".to_string(),
            ));
        }
        for line in &request.lines {
            if line.quantity == 0 {
                return Err(EngineError::Validation(format!(
                    "cart line {} has zero quantity",
                    line.product_id
                )));
            }
            if line.unit_price <= Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "cart line {} has a non-positive price",
                    line.product_id
                )));
            }
        }
        if request.shipping_address.trim().is_empty() || request.billing_address.trim().is_empty()
        {
            return Err(EngineError::Validation(
                "shipping and billing addresses are required".to_string(),
            ));
        }
        if request.delivery_charge < Decimal::ZERO {
            return Err(EngineError::Validation(
                "delivery charge must not be negative".to_string(),
            ));
        }

        let total = Amount::new(request.declared_total)?;
        if request.declared_total > self.config.checkout_ceiling {
            return Err(EngineError::Validation(format!(
                "total {} exceeds the checkout ceiling",
                request.declared_total
            )));
        }
        let computed: Decimal = request
            .lines
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum::<Decimal>()
            + request.delivery_charge;
        if computed != request.declared_total {
            return Err(EngineError::Validation(format!(
                "declared total {} does not match cart contents {}",
                request.declared_total, computed
            )));
        }
        Ok(total)
    }

    fn gateway_fields(
        &self,
        request: &CheckoutRequest,
        order_id: &OrderId,
        payment_ref: &PaymentRef,
        total: Amount,
    ) -> Result<BTreeMap<String, String>> {
        let gateway = &self.config.gateway;
        let mut fields = BTreeMap::from([
            ("merchant_id".to_string(), gateway.merchant_id.clone()),
            ("merchant_key".to_string(), gateway.merchant_key.clone()),
            ("return_url".to_string(), gateway.return_url.clone()),
            ("cancel_url".to_string(), gateway.cancel_url.clone()),
            ("notify_url".to_string(), gateway.notify_url.clone()),
            ("name_first".to_string(), sanitize_name(&request.first_name)),
            ("name_last".to_string(), sanitize_name(&request.last_name)),
            ("email_address".to_string(), request.email.clone()),
            ("m_payment_id".to_string(), payment_ref.to_string()),
            ("amount".to_string(), total.to_gateway_string()),
            ("item_name".to_string(), format!("Order {order_id}")),
            ("item_description".to_string(), item_summary(&request.lines)),
            ("custom_str1".to_string(), order_id.to_string()),
            ("custom_str2".to_string(), request.buyer_id.to_string()),
        ]);
        let digest = signature::sign(&fields, &gateway.passphrase)?;
        fields.insert(signature::SIGNATURE_FIELD.to_string(), digest);
        Ok(fields)
    }
}

/// Letters and spaces only, length-capped, per the gateway's field rules.
fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphabetic() || *c == ' ')
        .take(NAME_MAX_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

fn item_summary(lines: &[CartLine]) -> String {
    let units: u32 = lines.iter().map(|line| line.quantity).sum();
    format!("{} item(s) across {} product(s)", units, lines.len())
}
