use crate::error::StoreError;
use crate::model::mongo_model::{Order, Product, Review};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

/// Order persistence seam. The lifecycle engine and statistics aggregator
/// receive an implementation by injection; nothing in the crate holds a
/// process-wide connection.
#[async_trait]
pub trait OrderStorage: Send + Sync {
    async fn insert_order(&self, order: Order) -> Result<ObjectId, StoreError>;

    async fn get_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError>;

    /// All orders, newest first. With `pending_returns_only`, restricted to
    /// delivered orders carrying a pending return/replacement request.
    async fn list_orders(&self, pending_returns_only: bool) -> Result<Vec<Order>, StoreError>;

    /// Persist the full order document under its id, last-write-wins.
    async fn save_order(&self, order: Order) -> Result<(), StoreError>;

    /// Delivered orders whose order date falls inside `[start, end]`.
    async fn find_delivered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
pub trait CatalogStorage: Send + Sync {
    async fn insert_product(&self, product: Product) -> Result<ObjectId, StoreError>;

    async fn get_product(&self, id: ObjectId) -> Result<Option<Product>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn save_product(&self, product: Product) -> Result<(), StoreError>;

    /// Returns whether a document was actually removed.
    async fn delete_product(&self, id: ObjectId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ReviewStorage: Send + Sync {
    async fn insert_review(&self, review: Review) -> Result<ObjectId, StoreError>;

    async fn find_review(
        &self,
        product_id: ObjectId,
        user_id: ObjectId,
    ) -> Result<Option<Review>, StoreError>;

    /// Newest first, capped at `limit`.
    async fn list_reviews(
        &self,
        product_id: ObjectId,
        limit: i64,
    ) -> Result<Vec<Review>, StoreError>;

    /// Every review of a product, for recomputing the derived rating fields.
    async fn all_reviews(&self, product_id: ObjectId) -> Result<Vec<Review>, StoreError>;
}
