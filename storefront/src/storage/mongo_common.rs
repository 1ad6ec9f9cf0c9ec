use crate::error::StoreError;
use crate::model::mongo_model::{Order, Product, Review, bson_datetime};
use crate::storage::common::{CatalogStorage, OrderStorage, ReviewStorage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

/// MongoDB-backed implementation of every storage trait, one handle per
/// process, injected into the engines at startup.
#[derive(Clone)]
pub struct MongoStorage {
    pub client: Client,
    pub database: Database,
}

impl MongoStorage {
    pub async fn new(conn_str: &str, db_name: &str) -> Result<Self, StoreError> {
        info!("Connecting to mongo database {}", db_name);
        let client = Client::with_uri_str(conn_str).await?;
        let database = client.database(db_name);
        info!("Connected to mongo");

        Ok(Self { client, database })
    }

    fn orders(&self) -> Collection<Order> {
        self.database.collection("orders")
    }

    fn products(&self) -> Collection<Product> {
        self.database.collection("products")
    }

    fn reviews(&self) -> Collection<Review> {
        self.database.collection("reviews")
    }

    fn inserted_object_id(
        result: mongodb::results::InsertOneResult,
    ) -> Result<ObjectId, StoreError> {
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Internal("inserted id is not an ObjectId".to_string()))
    }
}

#[async_trait]
impl OrderStorage for MongoStorage {
    async fn insert_order(&self, order: Order) -> Result<ObjectId, StoreError> {
        let result = self.orders().insert_one(&order).await?;
        debug!("Inserted order {}", order.id);
        Self::inserted_object_id(result)
    }

    async fn get_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError> {
        let order = self.orders().find_one(doc! { "_id": id }).await?;
        Ok(order)
    }

    async fn list_orders(&self, pending_returns_only: bool) -> Result<Vec<Order>, StoreError> {
        let filter = if pending_returns_only {
            doc! { "returnRequest.status": "pending", "status": "delivered" }
        } else {
            doc! {}
        };

        let cursor = self
            .orders()
            .find(filter)
            .sort(doc! { "orderDate": -1 })
            .await?;
        let orders = cursor.try_collect().await?;
        Ok(orders)
    }

    async fn save_order(&self, order: Order) -> Result<(), StoreError> {
        let result = self
            .orders()
            .replace_one(doc! { "_id": order.id }, &order)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::not_found(format!(
                "Order not found: {}",
                order.id.to_hex()
            )));
        }
        Ok(())
    }

    async fn find_delivered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let filter = doc! {
            "status": "delivered",
            "orderDate": {
                "$gte": bson_datetime(start),
                "$lte": bson_datetime(end),
            },
        };

        let cursor = self.orders().find(filter).await?;
        let orders: Vec<Order> = cursor.try_collect().await?;
        debug!("Found {} delivered orders in range", orders.len());
        Ok(orders)
    }
}

#[async_trait]
impl CatalogStorage for MongoStorage {
    async fn insert_product(&self, product: Product) -> Result<ObjectId, StoreError> {
        let result = self.products().insert_one(&product).await?;
        debug!("Inserted product {}", product.id);
        Self::inserted_object_id(result)
    }

    async fn get_product(&self, id: ObjectId) -> Result<Option<Product>, StoreError> {
        let product = self.products().find_one(doc! { "_id": id }).await?;
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let cursor = self.products().find(doc! {}).await?;
        let products = cursor.try_collect().await?;
        Ok(products)
    }

    async fn save_product(&self, product: Product) -> Result<(), StoreError> {
        let result = self
            .products()
            .replace_one(doc! { "_id": product.id }, &product)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::not_found(format!(
                "Product not found: {}",
                product.id.to_hex()
            )));
        }
        Ok(())
    }

    async fn delete_product(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = self.products().delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl ReviewStorage for MongoStorage {
    async fn insert_review(&self, review: Review) -> Result<ObjectId, StoreError> {
        let result = self.reviews().insert_one(&review).await?;
        Self::inserted_object_id(result)
    }

    async fn find_review(
        &self,
        product_id: ObjectId,
        user_id: ObjectId,
    ) -> Result<Option<Review>, StoreError> {
        let review = self
            .reviews()
            .find_one(doc! { "productId": product_id, "userId": user_id })
            .await?;
        Ok(review)
    }

    async fn list_reviews(
        &self,
        product_id: ObjectId,
        limit: i64,
    ) -> Result<Vec<Review>, StoreError> {
        let cursor = self
            .reviews()
            .find(doc! { "productId": product_id })
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .await?;
        let reviews = cursor.try_collect().await?;
        Ok(reviews)
    }

    async fn all_reviews(&self, product_id: ObjectId) -> Result<Vec<Review>, StoreError> {
        let cursor = self
            .reviews()
            .find(doc! { "productId": product_id })
            .await?;
        let reviews = cursor.try_collect().await?;
        Ok(reviews)
    }
}
