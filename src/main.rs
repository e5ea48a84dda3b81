use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn, Instrument};

use storefront::{
    setup_tracing, CheckoutDetails, ItemSnapshot, PaymentMethod, PaymentType, Product, ShippingAddress, ShopConfig,
    ShopSystem,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = ShopConfig::load().context("loading configuration")?;
    info!("Starting storefront demo");

    let system = ShopSystem::new(&config);

    // Seed the catalog the way the product sync would
    let mut headphones = Product::new("6501", "Wireless Headphones", 89.99, 5);
    headphones.regular_price = 129.99;
    headphones.rating = 4.6;
    let charger = Product::new("6502", "USB-C Charger", 19.99, 40);
    system
        .catalog
        .sync_products(vec![headphones.clone(), charger.clone()])
        .instrument(tracing::info_span!("catalog_sync"))
        .await?;

    // Two shoppers want the same headphones
    let span = tracing::info_span!("cart_building");
    async {
        system.cart.add_item("alice", &ItemSnapshot::from(&headphones), 2).await?;
        system.cart.add_item("alice", &ItemSnapshot::from(&charger), 1).await?;
        system.cart.add_item("alice", &ItemSnapshot::from(&headphones), 1).await?;
        system.cart.add_item("bob", &ItemSnapshot::from(&headphones), 4).await?;
        system.favorites.add("bob", &headphones).await?;

        let mut home = ShippingAddress::new("addr_1", "alice", "Alice", "Calle Arce 12", "San Salvador", Utc::now());
        home.is_default = true;
        system.addresses.save(&home).await?;
        let mut card = PaymentMethod::new("pay_1", "alice", PaymentType::CreditCard, Utc::now());
        card.card_number = "4111111111111234".to_string();
        card.is_default = true;
        system.payments.save(&card).await?;
        anyhow::Ok(())
    }
    .instrument(span)
    .await?;

    let alice_cart = system.cart.list_items("alice").await?;
    let quote = system.orders.quote(&alice_cart);
    info!(
        items = alice_cart.len(),
        subtotal = quote.subtotal,
        total = quote.total,
        "Alice's cart"
    );

    let alice_details = CheckoutDetails {
        shipping_address: system.addresses.default_for("alice").await?,
        payment_method: system.payments.default_for("alice").await?,
    };

    // Both check out at once; there are only 5 headphones
    let (alice, bob) = tokio::join!(
        system.orders.checkout_with("alice", alice_details).instrument(tracing::info_span!("checkout", user = "alice")),
        system.orders.checkout("bob").instrument(tracing::info_span!("checkout", user = "bob")),
    );
    for (user, outcome) in [("alice", alice), ("bob", bob)] {
        match outcome {
            Ok(order) => info!(user, order_id = %order.order_id, total = order.totals.total, "Order placed"),
            Err(e) => warn!(user, error = %e, "Checkout failed"),
        }
    }

    let remaining = system.inventory.check_stock(&headphones.sku).await?;
    info!(sku = %headphones.sku, remaining, "Headphones left");

    if let Err(e) = system.shutdown().await {
        error!(error = %e, "Shutdown failed");
        return Err(e.into());
    }

    info!("Demo completed successfully");
    Ok(())
}
