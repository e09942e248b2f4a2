//! Pantry sync demo
//!
//! Starts the synchronization core against a real backend and file cache,
//! applies a few mutations, and prints what happened.
//!
//! # Running
//!
//! ```bash
//! PANTRY_API_URL=http://localhost:3000 PANTRY_API_TOKEN=... cargo run --bin pantry-demo
//! ```
//!
//! Without a reachable backend the demo still works: the seed falls back to the
//! cache in `.pantry-cache/` and remote syncs are logged as failures.

use chrono::Utc;
use pantry_sync::model::{EntityId, ExpenseRecord, Product, ShoppingItem, ShoppingList};
use pantry_sync::{App, AppAction, SyncConfig};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pantry_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    pantry_sync::metrics::describe_metrics();

    let config = SyncConfig::from_env()?;
    let app = App::from_config(&config)?;

    app.start().await?;
    let (products, lists) = app
        .store()
        .state(|s| (s.products.len(), s.shopping_lists.len()))
        .await;
    tracing::info!(products, lists, "Initial load complete");

    let product = Product::new(EntityId::generate(), "Rice")
        .with_category("grains")
        .with_price(38_000.0)
        .with_stock(12);
    let product_id = product.id.clone();
    let list_id = EntityId::generate();

    app.send(AppAction::AddProduct(product)).await?;
    app.send(AppAction::AddToCart {
        product_id: product_id.clone(),
        quantity: 2,
    })
    .await?;
    app.send(AppAction::ToggleFavorite { id: product_id }).await?;
    app.send(AppAction::AddShoppingList(ShoppingList::new(list_id.clone(), "Weekly")))
        .await?;
    app.send(AppAction::AddShoppingItem {
        list_id,
        item: ShoppingItem::new(EntityId::generate(), "Milk"),
    })
    .await?;
    app.send(AppAction::AddExpense(ExpenseRecord::new(
        EntityId::generate(),
        Utc::now().date_naive(),
        76_000.0,
    )))
    .await?;

    if let Err(error) = app.flush(config.request_timeout() * 2).await {
        tracing::warn!(%error, "Some remote syncs are still pending");
    }

    let stats = app.sync_stats();
    tracing::info!(
        local_writes = stats.local_writes,
        remote_syncs = stats.remote_syncs,
        remote_failures = stats.remote_failures,
        superseded = stats.superseded,
        "Sync summary"
    );

    let health = app.health();
    tracing::info!(status = %health.status, "Health");
    for check in &health.checks {
        println!(
            "{:<6} {:<10} {}",
            check.component,
            check.status,
            check.message.as_deref().unwrap_or("")
        );
    }

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
