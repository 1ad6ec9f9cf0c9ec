use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use clap::Parser;
use http::header;
use serde::Deserialize;
use serde_json::json;
use std::{error::Error, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use common::config::{BackendConfig, Config};

use crate::catalog::{CatalogService, ProductInput, ReviewInput};
use crate::error::StoreError;
use crate::lifecycle::{
    OrderLifecycle, PlaceOrderRequest, ResolveReturnRequest, SubmitReturnRequest,
};
use crate::stats::StatisticsAggregator;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config/total_config.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let mut config = Config::load(&args.config)?;

    // Deployment overrides win over the file.
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.common.database_url = url;
    }

    Ok(config)
}

pub fn initialize_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<OrderLifecycle>,
    pub catalog: Arc<CatalogService>,
    pub statistics: Arc<StatisticsAggregator>,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<OrderLifecycle>,
        catalog: Arc<CatalogService>,
        statistics: Arc<StatisticsAggregator>,
    ) -> Self {
        Self {
            lifecycle,
            catalog,
            statistics,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::Validation(_) | StoreError::Precondition(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Storage(_) | StoreError::Internal(_) => {
                error!(error = %self, "Request failed in storage layer");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn run_backend(
    config: BackendConfig,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);

    tracing::info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/orders/place", post(place_order))
        .route("/api/orders", get(list_orders))
        .route("/api/orders/update-dates", post(update_order_dates))
        .route(
            "/api/orders/{order_id}",
            get(fetch_order).patch(update_order_status).delete(cancel_order),
        )
        .route(
            "/api/orders/{order_id}/return",
            post(submit_return).patch(resolve_return),
        )
        .route("/api/admin/statistics", get(fetch_statistics))
        .route("/api/products", get(list_products))
        .route("/api/products/{product_id}", get(fetch_product))
        .route(
            "/api/products/{product_id}/reviews",
            get(list_reviews).post(add_review),
        )
        .route("/api/admin/products", post(create_product).put(update_product))
        .route("/api/admin/products/{product_id}", delete(delete_product))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin("http://localhost:3000".parse::<header::HeaderValue>().unwrap())
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, StoreError> {
    // At checkout an unknown product is invalid input naming the bad id,
    // not a missing resource.
    let order = state
        .lifecycle
        .place_order(request)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(message) => StoreError::Validation(message),
            other => other,
        })?;
    Ok(Json(json!({
        "message": "Order placed successfully",
        "order": order,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(rename = "returnRequests")]
    pub return_requests: Option<String>,
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, StoreError> {
    let pending_returns_only = query.return_requests.as_deref() == Some("true");
    let orders = state.lifecycle.list_orders(pending_returns_only).await?;
    Ok(Json(orders))
}

async fn fetch_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let order = state.lifecycle.get_order(&order_id).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, StoreError> {
    let order = state
        .lifecycle
        .advance_status(&order_id, &request.status)
        .await?;
    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    state.lifecycle.cancel_order(&order_id).await?;
    Ok(Json(json!({ "message": "Order cancelled successfully" })))
}

async fn submit_return(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<SubmitReturnRequest>,
) -> Result<impl IntoResponse, StoreError> {
    let message = state.lifecycle.submit_return(&order_id, request).await?;
    Ok(Json(json!({ "message": message })))
}

async fn resolve_return(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<ResolveReturnRequest>,
) -> Result<impl IntoResponse, StoreError> {
    let order = state.lifecycle.resolve_return(&order_id, request).await?;

    let return_request = order
        .return_request
        .as_ref()
        .map(|request| json!({ "status": request.status, "type": request.kind }));
    let resolved_as = order
        .return_request
        .as_ref()
        .map(|request| request.status.to_string())
        .unwrap_or_default();

    Ok(Json(json!({
        "message": format!("Return/replacement request {} successfully", resolved_as),
        "order": {
            "id": order.id.to_hex(),
            "status": order.status,
            "returnRequest": return_request,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatesRequest {
    pub order_id: String,
}

async fn update_order_dates(
    State(state): State<AppState>,
    Json(request): Json<UpdateDatesRequest>,
) -> Result<impl IntoResponse, StoreError> {
    let order = state.lifecycle.refresh_dates(&request.order_id).await?;
    Ok(Json(json!({
        "message": "Order dates updated successfully",
        "order": order,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub month: Option<String>,
    pub year: Option<String>,
}

async fn fetch_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, StoreError> {
    let (Some(month), Some(year)) = (query.month, query.year) else {
        return Err(StoreError::validation("Month and year are required"));
    };
    let month: u32 = month
        .parse()
        .map_err(|_| StoreError::validation("Invalid month or year"))?;
    let year: i32 = year
        .parse()
        .map_err(|_| StoreError::validation("Invalid month or year"))?;

    let report = state.statistics.monthly_report(month, year).await?;
    Ok(Json(report))
}

async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, StoreError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products))
}

async fn fetch_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let product = state.catalog.get_product(&product_id).await?;
    Ok(Json(product))
}

async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse, StoreError> {
    let product = state.catalog.create_product(input).await?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub product: ProductInput,
}

async fn update_product(
    State(state): State<AppState>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, StoreError> {
    let id = request
        .id
        .ok_or_else(|| StoreError::validation("Product ID is required"))?;
    let product = state.catalog.update_product(&id, request.product).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    state.catalog.delete_product(&product_id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let reviews = state.catalog.list_reviews(&product_id).await?;
    Ok(Json(reviews))
}

async fn add_review(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(input): Json<ReviewInput>,
) -> Result<impl IntoResponse, StoreError> {
    let review = state.catalog.add_review(&product_id, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
