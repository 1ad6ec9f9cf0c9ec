use crate::error::StoreError;
use crate::model::mongo_model::{
    Order, OrderItem, OrderUser, ReturnRequest, bson_datetime, chrono_datetime,
};
use crate::model::{
    CANCELLATION_WINDOW_HOURS, OrderStatus, PaymentMethod, PaymentStatus, ReturnKind,
    ReturnStatus, within_window_days, within_window_hours,
};
use crate::storage::{CatalogStorage, OrderStorage};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use strum_macros::{Display as EnumDisplay, EnumString};
use tracing::{debug, info, warn};

/// Admin decision on an embedded return/replacement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ReturnResolution {
    Approved,
    Picked,
    Completed,
    Rejected,
}

/// Everything that can move an order to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Admin sets an explicit target status (permissive base path).
    SetStatus(OrderStatus),
    /// Customer cancels a pending order.
    Cancel,
    /// Admin resolves the embedded return request.
    Resolve(ReturnKind, ReturnResolution),
}

/// Side effects that accompany a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionEffects {
    pub stamp_delivery_date: bool,
    pub stamp_picked_date: bool,
    pub refund_payment: bool,
}

/// The single transition table shared by the admin status path, customer
/// cancellation, and the return-request flow.
///
/// The `SetStatus` arm stays as permissive as the storefront it replaces:
/// any target is accepted, but a transition outside the canonical forward
/// path is logged so the asymmetry with the guarded return flow is visible
/// instead of silent.
pub fn transition(
    current: OrderStatus,
    action: OrderAction,
) -> Result<(OrderStatus, TransitionEffects), StoreError> {
    match action {
        OrderAction::SetStatus(target) => {
            if current != target && !current.is_forward_transition(target) {
                warn!(
                    "Out-of-table status transition {} -> {} accepted on the permissive base path",
                    current, target
                );
            }
            let effects = TransitionEffects {
                stamp_delivery_date: target == OrderStatus::Delivered,
                ..TransitionEffects::default()
            };
            Ok((target, effects))
        }
        OrderAction::Cancel => {
            if current != OrderStatus::Pending {
                return Err(StoreError::precondition(
                    "Only pending orders can be cancelled",
                ));
            }
            Ok((OrderStatus::Cancelled, TransitionEffects::default()))
        }
        OrderAction::Resolve(kind, resolution) => {
            let (next, effects) = match (kind, resolution) {
                (ReturnKind::Return, ReturnResolution::Approved) => {
                    (OrderStatus::ReturnApproved, TransitionEffects::default())
                }
                (ReturnKind::Replacement, ReturnResolution::Approved) => {
                    (OrderStatus::ReplacementApproved, TransitionEffects::default())
                }
                (ReturnKind::Return, ReturnResolution::Picked) => (
                    OrderStatus::ReturnInProgress,
                    TransitionEffects {
                        stamp_picked_date: true,
                        ..TransitionEffects::default()
                    },
                ),
                (ReturnKind::Replacement, ReturnResolution::Picked) => (
                    OrderStatus::ReplacementInProgress,
                    TransitionEffects {
                        stamp_picked_date: true,
                        ..TransitionEffects::default()
                    },
                ),
                (ReturnKind::Return, ReturnResolution::Completed) => (
                    OrderStatus::Returned,
                    TransitionEffects {
                        refund_payment: true,
                        ..TransitionEffects::default()
                    },
                ),
                (ReturnKind::Replacement, ReturnResolution::Completed) => {
                    (OrderStatus::Replaced, TransitionEffects::default())
                }
                (_, ReturnResolution::Rejected) => {
                    (OrderStatus::Delivered, TransitionEffects::default())
                }
            };
            Ok((next, effects))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user: OrderUser,
    pub products: Vec<OrderLineRequest>,
    pub payment_method: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReturnRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReturnRequest {
    pub status: Option<String>,
    pub admin_response: Option<String>,
    pub picked_date: Option<DateTime<Utc>>,
}

/// Validates and applies every order mutation: placement, the admin status
/// path, customer cancellation, and the return/replacement workflow.
pub struct OrderLifecycle {
    orders: Arc<dyn OrderStorage>,
    catalog: Arc<dyn CatalogStorage>,
}

impl OrderLifecycle {
    pub fn new(orders: Arc<dyn OrderStorage>, catalog: Arc<dyn CatalogStorage>) -> Self {
        Self { orders, catalog }
    }

    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, StoreError> {
        let user = request.user;
        if [&user.name, &user.email, &user.address, &user.phone]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(StoreError::validation("Missing required user information"));
        }
        if request.products.is_empty() {
            return Err(StoreError::validation("No products in order"));
        }

        let payment_method: PaymentMethod = request
            .payment_method
            .parse()
            .map_err(|_| StoreError::validation("Invalid payment method"))?;

        // Snapshot name and price from the live catalog; an unknown product
        // fails the whole order, never a partial one.
        let mut items = Vec::with_capacity(request.products.len());
        for line in &request.products {
            if line.quantity < 1 {
                return Err(StoreError::validation("Quantity must be at least 1"));
            }
            let product_id = ObjectId::parse_str(&line.product_id)
                .map_err(|_| StoreError::validation(format!("Invalid product ID: {}", line.product_id)))?;
            let product = self
                .catalog
                .get_product(product_id)
                .await?
                .ok_or_else(|| {
                    StoreError::not_found(format!("Product not found: {}", line.product_id))
                })?;

            items.push(OrderItem {
                product_id,
                name: product.name,
                price: product.price,
                quantity: line.quantity,
            });
        }

        let payment_status = if payment_method == PaymentMethod::Cod {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Paid
        };

        let order = Order {
            id: ObjectId::new(),
            user,
            total_amount: items.iter().map(OrderItem::line_total).sum(),
            products: items,
            status: OrderStatus::Pending,
            payment_method,
            payment_status,
            order_date: bson_datetime(Utc::now()),
            delivery_date: None,
            return_request: None,
        };

        self.orders.insert_order(order.clone()).await?;
        info!("Placed order {} for {}", order.id, order.user.email);
        Ok(order)
    }

    /// Admin status path. Accepts any target status; stamping the delivery
    /// date happens exactly once, on the first transition to `delivered`.
    pub async fn advance_status(&self, order_id: &str, target: &str) -> Result<Order, StoreError> {
        let target: OrderStatus = target
            .parse()
            .map_err(|_| StoreError::validation(format!("Invalid status: {}", target)))?;

        let mut order = self.require_order(order_id).await?;
        let (next, effects) = transition(order.status, OrderAction::SetStatus(target))?;

        if effects.stamp_delivery_date && order.delivery_date.is_none() {
            order.delivery_date = Some(bson_datetime(Utc::now()));
        }
        order.status = next;

        self.orders.save_order(order.clone()).await?;
        debug!("Order {} advanced to {}", order.id, order.status);
        Ok(order)
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, StoreError> {
        let mut order = self.require_order(order_id).await?;
        let (next, _) = transition(order.status, OrderAction::Cancel)?;

        let placed = chrono_datetime(order.order_date);
        if !within_window_hours(placed, Utc::now(), CANCELLATION_WINDOW_HOURS) {
            return Err(StoreError::precondition(
                "Orders can only be cancelled within 24 hours of placing",
            ));
        }

        order.status = next;
        self.orders.save_order(order.clone()).await?;
        info!("Order {} cancelled", order.id);
        Ok(order)
    }

    pub async fn submit_return(
        &self,
        order_id: &str,
        request: SubmitReturnRequest,
    ) -> Result<String, StoreError> {
        let kind: ReturnKind = request
            .kind
            .parse()
            .map_err(|_| StoreError::validation("Invalid request type"))?;

        let mut order = self.require_order(order_id).await?;

        if order.status != OrderStatus::Delivered {
            return Err(StoreError::precondition(
                "Only delivered orders can be returned or replaced",
            ));
        }
        if order.return_request.is_some() {
            return Err(StoreError::precondition(
                "A return/replacement request already exists for this order",
            ));
        }

        let now = Utc::now();
        // An order can only reach `delivered` with a stamped delivery date;
        // if demo data lacks one, the full window remains open.
        let delivered = order.delivery_date.map(chrono_datetime).unwrap_or(now);
        if !within_window_days(delivered, now, kind.window_days()) {
            return Err(StoreError::precondition(format!(
                "{} requests must be made within {} days of delivery",
                kind.label(),
                kind.window_days()
            )));
        }

        order.return_request = Some(ReturnRequest {
            kind,
            reason: request.reason,
            status: ReturnStatus::Pending,
            request_date: bson_datetime(now),
            admin_response: None,
            picked_date: None,
        });

        self.orders.save_order(order.clone()).await?;
        info!("{} request submitted for order {}", kind.label(), order.id);
        Ok(format!("{} request submitted successfully", kind.label()))
    }

    pub async fn resolve_return(
        &self,
        order_id: &str,
        request: ResolveReturnRequest,
    ) -> Result<Order, StoreError> {
        let status = request
            .status
            .as_deref()
            .ok_or_else(|| StoreError::validation("Status is required"))?;
        let resolution: ReturnResolution = status
            .parse()
            .map_err(|_| StoreError::validation("Invalid status provided"))?;

        let mut order = self.require_order(order_id).await?;
        let Some(mut return_request) = order.return_request.take() else {
            return Err(StoreError::not_found(
                "No return request found for this order",
            ));
        };

        match resolution {
            ReturnResolution::Approved => {
                if return_request.status != ReturnStatus::Pending {
                    return Err(StoreError::precondition(
                        "Only pending requests can be approved",
                    ));
                }
                return_request.status = ReturnStatus::Approved;
                return_request.admin_response = Some(
                    request
                        .admin_response
                        .filter(|response| !response.trim().is_empty())
                        .unwrap_or_else(|| "Request approved".to_string()),
                );
            }
            ReturnResolution::Picked => {
                return_request.status = ReturnStatus::Picked;
            }
            ReturnResolution::Completed => {
                return_request.status = ReturnStatus::Completed;
            }
            ReturnResolution::Rejected => {
                let response = request
                    .admin_response
                    .filter(|response| !response.trim().is_empty())
                    .ok_or_else(|| StoreError::validation("A rejection reason is required"))?;
                return_request.status = ReturnStatus::Rejected;
                return_request.admin_response = Some(response);
            }
        }

        let (next, effects) = transition(
            order.status,
            OrderAction::Resolve(return_request.kind, resolution),
        )?;
        if effects.stamp_picked_date {
            return_request.picked_date =
                Some(bson_datetime(request.picked_date.unwrap_or_else(Utc::now)));
        }
        if effects.refund_payment {
            order.payment_status = PaymentStatus::Refunded;
        }
        order.status = next;
        order.return_request = Some(return_request);

        self.orders.save_order(order.clone()).await?;
        info!(
            "Return request on order {} resolved as {}",
            order.id, resolution
        );
        Ok(order)
    }

    /// Demo/test convenience mirroring the storefront's date-refresh tool:
    /// pulls the order date up to now and backfills a missing delivery date
    /// on delivered orders so the window rules can be exercised.
    pub async fn refresh_dates(&self, order_id: &str) -> Result<Order, StoreError> {
        let mut order = self.require_order(order_id).await?;

        let now = Utc::now();
        order.order_date = bson_datetime(now);
        if order.status == OrderStatus::Delivered && order.delivery_date.is_none() {
            order.delivery_date = Some(bson_datetime(now));
        }

        self.orders.save_order(order.clone()).await?;
        Ok(order)
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order, StoreError> {
        self.require_order(order_id).await
    }

    pub async fn list_orders(&self, pending_returns_only: bool) -> Result<Vec<Order>, StoreError> {
        self.orders.list_orders(pending_returns_only).await
    }

    async fn require_order(&self, order_id: &str) -> Result<Order, StoreError> {
        let id = ObjectId::parse_str(order_id)
            .map_err(|_| StoreError::validation(format!("Invalid order ID: {}", order_id)))?;
        self.orders
            .get_order(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order not found"))
    }
}
