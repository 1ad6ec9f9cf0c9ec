use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{OrderStatus, PaymentMethod, PaymentStatus, ReturnKind, ReturnStatus};

pub fn bson_datetime(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

pub fn chrono_datetime(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// Contact snapshot embedded in the order at checkout. Intentionally a copy,
/// not a reference: later profile edits must not rewrite order history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUser {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

/// One line of an order. Name and price are snapshotted from the catalog at
/// placement time and never re-joined against the live product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ObjectId,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[serde(rename = "type")]
    pub kind: ReturnKind,
    pub reason: String,
    pub status: ReturnStatus,
    pub request_date: BsonDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_date: Option<BsonDateTime>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: OrderUser,
    pub products: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_date: BsonDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<BsonDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_request: Option<ReturnRequest>,
}

impl Order {
    pub fn total_from_items(&self) -> f64 {
        self.products.iter().map(OrderItem::line_total).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i64,
    pub images: Vec<String>,
    pub colors: Vec<String>,
    pub rating: f64,
    pub total_reviews: i64,
    #[serde(default)]
    pub specifications: HashMap<String, String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub product_id: ObjectId,
    pub user_id: ObjectId,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: BsonDateTime,
}
