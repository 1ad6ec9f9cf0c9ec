use std::error::Error;
use std::sync::Arc;

use storefront::catalog::CatalogService;
use storefront::executable_utils::{
    AppState, initialize_executable, initialize_tracing, run_backend,
};
use storefront::lifecycle::OrderLifecycle;
use storefront::stats::StatisticsAggregator;
use storefront::storage::MongoStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);

    let storage = Arc::new(
        MongoStorage::new(&config.common.database_url, &config.common.database_name).await?,
    );

    let lifecycle = Arc::new(OrderLifecycle::new(storage.clone(), storage.clone()));
    let catalog = Arc::new(CatalogService::new(storage.clone(), storage.clone()));
    let statistics = Arc::new(StatisticsAggregator::new(storage));

    run_backend(config.backend, AppState::new(lifecycle, catalog, statistics)).await
}
