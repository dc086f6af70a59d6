use marketledger::application::settlement::{SettlementOutcome, SettlementProcessor};
use marketledger::application::withdrawals::WithdrawalService;
use marketledger::config::EngineConfig;
use marketledger::domain::ids::{BuyerId, ProductId, SellerId, StoreId};
use marketledger::domain::money::Balance;
use marketledger::domain::order::OrderStatus;
use marketledger::domain::ports::{LedgerStore, LedgerStoreRef, NotifierRef, OrderStoreRef};
use marketledger::domain::withdrawal::BankDetails;
use marketledger::gateway::checkout::{CartLine, CheckoutRequest, PaymentIntentBuilder};
use marketledger::gateway::notification::PaymentNotification;
use marketledger::gateway::signature;
use marketledger::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryOrderStore};
use marketledger::infrastructure::notifier::LoggingNotifier;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Platform {
    builder: PaymentIntentBuilder,
    processor: SettlementProcessor,
    withdrawals: WithdrawalService,
    ledger: Arc<InMemoryLedgerStore>,
    passphrase: String,
}

fn platform() -> Platform {
    let config = EngineConfig::from_env();
    let passphrase = config.gateway.passphrase.clone();
    let orders: OrderStoreRef = Arc::new(InMemoryOrderStore::new());
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let notifier: NotifierRef = Arc::new(LoggingNotifier);

    let builder = PaymentIntentBuilder::new(config.clone(), orders.clone());
    let processor = SettlementProcessor::new(
        config.clone(),
        orders,
        ledger.clone() as LedgerStoreRef,
        notifier.clone(),
    );
    let withdrawals = WithdrawalService::new(config, ledger.clone() as LedgerStoreRef, notifier);
    Platform {
        builder,
        processor,
        withdrawals,
        ledger,
        passphrase,
    }
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        buyer_id: BuyerId::from("buyer-7"),
        first_name: "Thandi".to_string(),
        last_name: "Mokoena".to_string(),
        email: "thandi@example.com".to_string(),
        store_id: StoreId::from("store-1"),
        lines: vec![CartLine {
            product_id: ProductId::from("p-1"),
            quantity: 1,
            unit_price: dec!(110.00),
        }],
        shipping_address: "12 Long Street, Cape Town".to_string(),
        billing_address: "12 Long Street, Cape Town".to_string(),
        delivery_charge: dec!(5.00),
        declared_total: dec!(115.00),
    }
}

/// Builds the webhook payload the gateway would send back for an intent.
fn gateway_echo(
    intent_fields: &BTreeMap<String, String>,
    amount: &str,
    passphrase: &str,
) -> PaymentNotification {
    let mut fields = BTreeMap::from([
        (
            "m_payment_id".to_string(),
            intent_fields["m_payment_id"].clone(),
        ),
        ("txn_id".to_string(), "1089250".to_string()),
        ("payment_status".to_string(), "COMPLETE".to_string()),
        ("amount_gross".to_string(), amount.to_string()),
        ("custom_str1".to_string(), intent_fields["custom_str1"].clone()),
        ("custom_str2".to_string(), intent_fields["custom_str2"].clone()),
    ]);
    let digest = signature::sign(&fields, passphrase).unwrap();
    fields.insert(signature::SIGNATURE_FIELD.to_string(), digest);
    PaymentNotification::new(fields)
}

#[tokio::test]
async fn test_checkout_to_settled_balance() {
    let p = platform();

    let intent = p.builder.build(checkout_request()).await.unwrap();
    assert_eq!(intent.fields["amount"], "115.00");

    let notification = gateway_echo(&intent.fields, "115.00", &p.passphrase);
    assert_eq!(
        p.processor.handle_notification(&notification).await.unwrap(),
        SettlementOutcome::Applied
    );
    // Gateways redeliver; the second copy must be a no-op.
    assert_eq!(
        p.processor.handle_notification(&notification).await.unwrap(),
        SettlementOutcome::Duplicate
    );

    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        p.processor
            .advance_order(&intent.order_id, status)
            .await
            .unwrap();
    }

    let row = p
        .ledger
        .financial_for_order(&intent.order_id)
        .await
        .unwrap()
        .expect("settled order must have a financial row");
    assert_eq!(row.gross_amount, dec!(115.00));
    assert_eq!(row.vat_amount, dec!(15.00));
    assert_eq!(row.net_amount, dec!(100.00));
    assert_eq!(row.marketplace_fee, dec!(9.00));
    assert_eq!(row.seller_profit, dec!(91.00));

    let account = p
        .ledger
        .get_or_create_account(&StoreId::from("store-1"))
        .await
        .unwrap();
    assert_eq!(account.available_balance, Balance::new(dec!(91.00)));
    assert_eq!(account.total_earnings, Balance::new(dec!(91.00)));
    assert!(account.invariant_holds());
}

#[tokio::test]
async fn test_forged_amount_never_settles() {
    let p = platform();
    let intent = p.builder.build(checkout_request()).await.unwrap();

    // Signed correctly, but for the wrong amount.
    let forged = gateway_echo(&intent.fields, "1.00", &p.passphrase);
    assert!(p.processor.handle_notification(&forged).await.is_err());

    // The order never left pending, so fulfillment cannot reach delivery.
    assert!(
        p.processor
            .advance_order(&intent.order_id, OrderStatus::Processing)
            .await
            .is_err()
    );
    assert!(
        p.ledger
            .financial_for_order(&intent.order_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_settled_funds_flow_through_withdrawal() {
    let p = platform();
    let intent = p.builder.build(checkout_request()).await.unwrap();

    let notification = gateway_echo(&intent.fields, "115.00", &p.passphrase);
    p.processor.handle_notification(&notification).await.unwrap();
    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        p.processor
            .advance_order(&intent.order_id, status)
            .await
            .unwrap();
    }

    // 91.00 available; withdraw 60 of it.
    let withdrawal = p
        .withdrawals
        .request(
            StoreId::from("store-1"),
            SellerId::from("seller-1"),
            dec!(60.00),
            BankDetails::default(),
        )
        .await
        .unwrap();
    p.withdrawals.approve(&withdrawal.id).await.unwrap();

    let account = p
        .ledger
        .get_or_create_account(&StoreId::from("store-1"))
        .await
        .unwrap();
    assert_eq!(account.total_earnings, Balance::new(dec!(91.00)));
    assert_eq!(account.available_balance, Balance::new(dec!(31.00)));
    assert_eq!(account.total_withdrawn, Balance::new(dec!(60.00)));
    assert!(account.invariant_holds());
}
