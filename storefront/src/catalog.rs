use crate::error::StoreError;
use crate::model::REVIEW_PAGE_LIMIT;
use crate::model::mongo_model::{Product, Review, bson_datetime};
use crate::storage::{CatalogStorage, ReviewStorage};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i64,
    pub images: Vec<String>,
    pub colors: Vec<String>,
    #[serde(default)]
    pub specifications: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub user_id: String,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
}

/// Catalog and review operations: admin product CRUD plus customer reviews
/// with the derived rating fields recomputed on every insert.
pub struct CatalogService {
    catalog: Arc<dyn CatalogStorage>,
    reviews: Arc<dyn ReviewStorage>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStorage>, reviews: Arc<dyn ReviewStorage>) -> Self {
        Self { catalog, reviews }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.catalog.list_products().await
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Product, StoreError> {
        let id = parse_product_id(product_id)?;
        self.catalog
            .get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product not found"))
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        validate_product(&input)?;

        let now = bson_datetime(Utc::now());
        let product = Product {
            id: ObjectId::new(),
            name: input.name,
            description: input.description,
            price: input.price,
            category: input.category,
            stock: input.stock,
            images: input.images,
            colors: input.colors,
            rating: 0.0,
            total_reviews: 0,
            specifications: input.specifications,
            created_at: now,
            updated_at: now,
        };

        self.catalog.insert_product(product.clone()).await?;
        info!("Created product {} ({})", product.name, product.id);
        Ok(product)
    }

    /// Full overwrite of the editable fields; the derived rating fields and
    /// creation timestamp are kept as-is.
    pub async fn update_product(
        &self,
        product_id: &str,
        input: ProductInput,
    ) -> Result<Product, StoreError> {
        validate_product(&input)?;

        let mut product = self.get_product(product_id).await?;
        product.name = input.name;
        product.description = input.description;
        product.price = input.price;
        product.category = input.category;
        product.stock = input.stock;
        product.images = input.images;
        product.colors = input.colors;
        product.specifications = input.specifications;
        product.updated_at = bson_datetime(Utc::now());

        self.catalog.save_product(product.clone()).await?;
        debug!("Updated product {}", product.id);
        Ok(product)
    }

    /// Orders keep their snapshots, so deleting a product never rewrites
    /// order history.
    pub async fn delete_product(&self, product_id: &str) -> Result<(), StoreError> {
        let id = parse_product_id(product_id)?;
        if !self.catalog.delete_product(id).await? {
            return Err(StoreError::not_found("Product not found"));
        }
        info!("Deleted product {}", id);
        Ok(())
    }

    pub async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>, StoreError> {
        let id = parse_product_id(product_id)?;
        self.reviews.list_reviews(id, REVIEW_PAGE_LIMIT).await
    }

    pub async fn add_review(
        &self,
        product_id: &str,
        input: ReviewInput,
    ) -> Result<Review, StoreError> {
        let id = parse_product_id(product_id)?;
        let user_id = ObjectId::parse_str(&input.user_id)
            .map_err(|_| StoreError::validation(format!("Invalid user ID: {}", input.user_id)))?;

        let mut product = self
            .catalog
            .get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product not found"))?;

        if input.user_name.trim().is_empty() {
            return Err(StoreError::validation("Missing required fields"));
        }
        if !(1..=5).contains(&input.rating) {
            return Err(StoreError::validation("Rating must be between 1 and 5"));
        }
        let comment_len = input.comment.chars().count();
        if !(3..=1000).contains(&comment_len) {
            return Err(StoreError::validation(
                "Comment must be between 3 and 1000 characters",
            ));
        }
        if self.reviews.find_review(id, user_id).await?.is_some() {
            return Err(StoreError::validation(
                "You have already reviewed this product",
            ));
        }

        let review = Review {
            id: ObjectId::new(),
            product_id: id,
            user_id,
            user_name: input.user_name,
            rating: input.rating,
            comment: input.comment,
            created_at: bson_datetime(Utc::now()),
        };
        self.reviews.insert_review(review.clone()).await?;

        // Derived fields are recomputed from the full review set rather than
        // maintained incrementally.
        let all = self.reviews.all_reviews(id).await?;
        product.rating = mean_rating(&all);
        product.total_reviews = all.len() as i64;
        self.catalog.save_product(product).await?;

        info!("Review added for product {}", id);
        Ok(review)
    }
}

fn parse_product_id(product_id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(product_id)
        .map_err(|_| StoreError::validation(format!("Invalid product ID: {}", product_id)))
}

fn validate_product(input: &ProductInput) -> Result<(), StoreError> {
    if input.name.trim().is_empty()
        || input.description.trim().is_empty()
        || input.category.trim().is_empty()
    {
        return Err(StoreError::validation(
            "Name, description and category are required",
        ));
    }
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(StoreError::validation("Price must be greater than zero"));
    }
    if input.stock < 0 {
        return Err(StoreError::validation("Stock cannot be negative"));
    }
    if input.images.is_empty() {
        return Err(StoreError::validation("At least one image is required"));
    }
    if input.colors.is_empty() {
        return Err(StoreError::validation("At least one color is required"));
    }
    Ok(())
}

/// Mean of all review ratings, rounded to one decimal. Zero reviews rate as
/// zero rather than NaN.
fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: i32 = reviews.iter().map(|review| review.rating).sum();
    let mean = f64::from(sum) / reviews.len() as f64;
    (mean * 10.0).round() / 10.0
}
