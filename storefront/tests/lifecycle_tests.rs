
use chrono::{Duration, Utc};
use mocks::{
    MockCatalog, MockOrders, delivered_order, order_with_status, pending_return, test_product,
    test_user,
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use storefront::error::StoreError;
use storefront::lifecycle::{
    OrderLifecycle, OrderLineRequest, PlaceOrderRequest, ResolveReturnRequest,
    SubmitReturnRequest,
};
use storefront::model::mongo_model::{Order, bson_datetime};
use storefront::model::{OrderStatus, PaymentStatus, ReturnKind, ReturnStatus};

fn engine(orders: MockOrders, catalog: MockCatalog) -> OrderLifecycle {
    OrderLifecycle::new(Arc::new(orders), Arc::new(catalog))
}

fn place_request(lines: Vec<OrderLineRequest>, payment_method: &str) -> PlaceOrderRequest {
    PlaceOrderRequest {
        user: test_user(),
        products: lines,
        payment_method: payment_method.to_string(),
    }
}

fn resolve(status: &str, admin_response: Option<&str>) -> ResolveReturnRequest {
    ResolveReturnRequest {
        status: Some(status.to_string()),
        admin_response: admin_response.map(str::to_string),
        picked_date: None,
    }
}

#[tokio::test]
async fn place_order_snapshots_catalog_prices_and_computes_total() {
    let tractor = test_product("Compact Tractor", 100.0);
    let rotavator = test_product("Rotavator", 50.0);
    let tractor_id = tractor.id;
    let rotavator_id = rotavator.id;

    let mut catalog = MockCatalog::new();
    catalog.expect_get_product().returning(move |id| {
        if id == tractor_id {
            Ok(Some(tractor.clone()))
        } else {
            Ok(Some(rotavator.clone()))
        }
    });

    let mut orders = MockOrders::new();
    orders
        .expect_insert_order()
        .withf(|order: &Order| {
            order.status == OrderStatus::Pending
                && order.payment_status == PaymentStatus::Paid
                && order.total_amount == 250.0
                && order.products.len() == 2
                && order.products[0].name == "Compact Tractor"
                && order.products[0].price == 100.0
        })
        .times(1)
        .returning(|order| Ok(order.id));

    let order = engine(orders, catalog)
        .place_order(place_request(
            vec![
                OrderLineRequest {
                    product_id: tractor_id.to_hex(),
                    quantity: 2,
                },
                OrderLineRequest {
                    product_id: rotavator_id.to_hex(),
                    quantity: 1,
                },
            ],
            "upi",
        ))
        .await
        .unwrap();

    assert_eq!(order.total_amount, 250.0);
    assert_eq!(order.delivery_date, None);
}

#[tokio::test]
async fn place_order_with_unknown_product_fails_whole_order() {
    let missing_id = ObjectId::new();

    let mut catalog = MockCatalog::new();
    catalog.expect_get_product().returning(|_| Ok(None));

    // No insert expectation: a partial order would panic the mock.
    let orders = MockOrders::new();

    let err = engine(orders, catalog)
        .place_order(place_request(
            vec![OrderLineRequest {
                product_id: missing_id.to_hex(),
                quantity: 1,
            }],
            "card",
        ))
        .await
        .unwrap_err();

    match err {
        StoreError::NotFound(message) => assert!(message.contains(&missing_id.to_hex())),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn cod_orders_start_with_pending_payment() {
    let tractor = test_product("Compact Tractor", 100.0);
    let tractor_id = tractor.id;

    let mut catalog = MockCatalog::new();
    catalog
        .expect_get_product()
        .returning(move |_| Ok(Some(tractor.clone())));

    let mut orders = MockOrders::new();
    orders
        .expect_insert_order()
        .withf(|order: &Order| order.payment_status == PaymentStatus::Pending)
        .times(1)
        .returning(|order| Ok(order.id));

    engine(orders, catalog)
        .place_order(place_request(
            vec![OrderLineRequest {
                product_id: tractor_id.to_hex(),
                quantity: 1,
            }],
            "cod",
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn place_order_rejects_missing_contact_fields_and_bad_payment() {
    let lifecycle = engine(MockOrders::new(), MockCatalog::new());

    let mut request = place_request(
        vec![OrderLineRequest {
            product_id: ObjectId::new().to_hex(),
            quantity: 1,
        }],
        "upi",
    );
    request.user.address = "  ".to_string();
    assert!(matches!(
        lifecycle.place_order(request).await,
        Err(StoreError::Validation(_))
    ));

    let empty_cart = place_request(vec![], "upi");
    assert!(matches!(
        lifecycle.place_order(empty_cart).await,
        Err(StoreError::Validation(_))
    ));

    let bad_payment = place_request(
        vec![OrderLineRequest {
            product_id: ObjectId::new().to_hex(),
            quantity: 1,
        }],
        "cheque",
    );
    match lifecycle.place_order(bad_payment).await.unwrap_err() {
        StoreError::Validation(message) => assert_eq!(message, "Invalid payment method"),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_within_window_sets_cancelled() {
    let order = order_with_status(OrderStatus::Pending);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));
    orders
        .expect_save_order()
        .withf(|order: &Order| order.status == OrderStatus::Cancelled)
        .times(1)
        .returning(|_| Ok(()));

    engine(orders, MockCatalog::new())
        .cancel_order(&order_id.to_hex())
        .await
        .unwrap();
}

#[tokio::test]
async fn cancel_after_24_hours_fails() {
    let mut order = order_with_status(OrderStatus::Pending);
    order.order_date = bson_datetime(Utc::now() - Duration::hours(25));
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));

    let err = engine(orders, MockCatalog::new())
        .cancel_order(&order_id.to_hex())
        .await
        .unwrap_err();

    match err {
        StoreError::Precondition(message) => assert!(message.contains("24 hours")),
        other => panic!("expected Precondition, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_is_rejected_outside_pending() {
    for status in [
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        let order = order_with_status(status);
        let order_id = order.id;

        let mut orders = MockOrders::new();
        orders
            .expect_get_order()
            .returning(move |_| Ok(Some(order.clone())));

        let err = engine(orders, MockCatalog::new())
            .cancel_order(&order_id.to_hex())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Precondition(_)));
    }
}

#[tokio::test]
async fn cancel_of_unknown_order_is_not_found() {
    let mut orders = MockOrders::new();
    orders.expect_get_order().returning(|_| Ok(None));

    let err = engine(orders, MockCatalog::new())
        .cancel_order(&ObjectId::new().to_hex())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn advancing_to_delivered_stamps_delivery_date_once() {
    let order = order_with_status(OrderStatus::Processing);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));
    orders
        .expect_save_order()
        .withf(|order: &Order| {
            order.status == OrderStatus::Delivered && order.delivery_date.is_some()
        })
        .times(1)
        .returning(|_| Ok(()));

    let updated = engine(orders, MockCatalog::new())
        .advance_status(&order_id.to_hex(), "delivered")
        .await
        .unwrap();
    let first_stamp = updated.delivery_date.unwrap();

    // A second pass through `delivered` must keep the original stamp.
    let mut orders = MockOrders::new();
    let second = updated.clone();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(second.clone())));
    orders
        .expect_save_order()
        .withf(move |order: &Order| order.delivery_date == Some(first_stamp))
        .times(1)
        .returning(|_| Ok(()));

    engine(orders, MockCatalog::new())
        .advance_status(&order_id.to_hex(), "delivered")
        .await
        .unwrap();
}

#[tokio::test]
async fn advancing_to_an_unknown_status_is_rejected() {
    let err = engine(MockOrders::new(), MockCatalog::new())
        .advance_status(&ObjectId::new().to_hex(), "shipped")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn return_within_window_attaches_pending_request() {
    let order = delivered_order(5);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));
    orders
        .expect_save_order()
        .withf(|order: &Order| {
            order
                .return_request
                .as_ref()
                .is_some_and(|request| {
                    request.kind == ReturnKind::Return && request.status == ReturnStatus::Pending
                })
        })
        .times(1)
        .returning(|_| Ok(()));

    let message = engine(orders, MockCatalog::new())
        .submit_return(
            &order_id.to_hex(),
            SubmitReturnRequest {
                kind: "return".to_string(),
                reason: "Gearbox noise".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(message, "Return request submitted successfully");
}

#[tokio::test]
async fn return_window_expires_after_14_days() {
    let order = delivered_order(15);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));

    let err = engine(orders, MockCatalog::new())
        .submit_return(
            &order_id.to_hex(),
            SubmitReturnRequest {
                kind: "return".to_string(),
                reason: "Too late".to_string(),
            },
        )
        .await
        .unwrap_err();

    match err {
        StoreError::Precondition(message) => assert!(message.contains("14 days")),
        other => panic!("expected Precondition, got {other:?}"),
    }
}

#[tokio::test]
async fn replacement_window_runs_30_days() {
    let order = delivered_order(20);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));
    orders.expect_save_order().times(1).returning(|_| Ok(()));

    engine(orders, MockCatalog::new())
        .submit_return(
            &order_id.to_hex(),
            SubmitReturnRequest {
                kind: "replacement".to_string(),
                reason: "Cracked housing".to_string(),
            },
        )
        .await
        .unwrap();

    let stale = delivered_order(31);
    let stale_id = stale.id;
    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(stale.clone())));

    let err = engine(orders, MockCatalog::new())
        .submit_return(
            &stale_id.to_hex(),
            SubmitReturnRequest {
                kind: "replacement".to_string(),
                reason: "Cracked housing".to_string(),
            },
        )
        .await
        .unwrap_err();
    match err {
        StoreError::Precondition(message) => assert!(message.contains("30 days")),
        other => panic!("expected Precondition, got {other:?}"),
    }
}

#[tokio::test]
async fn second_return_request_is_rejected_even_after_rejection() {
    let mut order = delivered_order(2);
    let mut request = pending_return(ReturnKind::Return);
    request.status = ReturnStatus::Rejected;
    order.return_request = Some(request);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));

    let err = engine(orders, MockCatalog::new())
        .submit_return(
            &order_id.to_hex(),
            SubmitReturnRequest {
                kind: "return".to_string(),
                reason: "Second attempt".to_string(),
            },
        )
        .await
        .unwrap_err();

    match err {
        StoreError::Precondition(message) => assert!(message.contains("already exists")),
        other => panic!("expected Precondition, got {other:?}"),
    }
}

#[tokio::test]
async fn return_requires_a_delivered_order() {
    let order = order_with_status(OrderStatus::Processing);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));

    let err = engine(orders, MockCatalog::new())
        .submit_return(
            &order_id.to_hex(),
            SubmitReturnRequest {
                kind: "return".to_string(),
                reason: "Not delivered yet".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Precondition(_)));
}

#[tokio::test]
async fn rejection_without_reason_fails_and_with_reason_reverts_to_delivered() {
    let mut order = delivered_order(3);
    order.return_request = Some(pending_return(ReturnKind::Return));
    let order_id = order.id;

    let mut orders = MockOrders::new();
    let lookup = order.clone();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(lookup.clone())));

    let err = engine(orders, MockCatalog::new())
        .resolve_return(&order_id.to_hex(), resolve("rejected", None))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let mut orders = MockOrders::new();
    let lookup = order.clone();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(lookup.clone())));
    orders
        .expect_save_order()
        .withf(|order: &Order| {
            order.status == OrderStatus::Delivered
                && order.return_request.as_ref().is_some_and(|request| {
                    request.status == ReturnStatus::Rejected
                        && request.admin_response.as_deref() == Some("Damage was caused by misuse")
                })
        })
        .times(1)
        .returning(|_| Ok(()));

    engine(orders, MockCatalog::new())
        .resolve_return(
            &order_id.to_hex(),
            resolve("rejected", Some("Damage was caused by misuse")),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn approval_moves_order_into_kind_specific_status() {
    for (kind, expected) in [
        (ReturnKind::Return, OrderStatus::ReturnApproved),
        (ReturnKind::Replacement, OrderStatus::ReplacementApproved),
    ] {
        let mut order = delivered_order(3);
        order.return_request = Some(pending_return(kind));
        let order_id = order.id;

        let mut orders = MockOrders::new();
        orders
            .expect_get_order()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_save_order()
            .withf(move |order: &Order| {
                order.status == expected
                    && order.return_request.as_ref().is_some_and(|request| {
                        request.status == ReturnStatus::Approved
                            && request.admin_response.as_deref() == Some("Request approved")
                    })
            })
            .times(1)
            .returning(|_| Ok(()));

        engine(orders, MockCatalog::new())
            .resolve_return(&order_id.to_hex(), resolve("approved", None))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn only_pending_requests_can_be_approved() {
    let mut order = delivered_order(3);
    let mut request = pending_return(ReturnKind::Return);
    request.status = ReturnStatus::Approved;
    order.return_request = Some(request);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));

    let err = engine(orders, MockCatalog::new())
        .resolve_return(&order_id.to_hex(), resolve("approved", None))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Precondition(_)));
}

#[tokio::test]
async fn pickup_stamps_date_and_moves_to_in_progress() {
    let mut order = delivered_order(3);
    order.status = OrderStatus::ReturnApproved;
    let mut request = pending_return(ReturnKind::Return);
    request.status = ReturnStatus::Approved;
    order.return_request = Some(request);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));
    orders
        .expect_save_order()
        .withf(|order: &Order| {
            order.status == OrderStatus::ReturnInProgress
                && order.return_request.as_ref().is_some_and(|request| {
                    request.status == ReturnStatus::Picked && request.picked_date.is_some()
                })
        })
        .times(1)
        .returning(|_| Ok(()));

    engine(orders, MockCatalog::new())
        .resolve_return(&order_id.to_hex(), resolve("picked", None))
        .await
        .unwrap();
}

#[tokio::test]
async fn completed_return_refunds_payment_but_replacement_does_not() {
    for (kind, expected_status, expected_payment) in [
        (
            ReturnKind::Return,
            OrderStatus::Returned,
            PaymentStatus::Refunded,
        ),
        (
            ReturnKind::Replacement,
            OrderStatus::Replaced,
            PaymentStatus::Paid,
        ),
    ] {
        let mut order = delivered_order(3);
        let mut request = pending_return(kind);
        request.status = ReturnStatus::Picked;
        order.return_request = Some(request);
        let order_id = order.id;

        let mut orders = MockOrders::new();
        orders
            .expect_get_order()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_save_order()
            .withf(move |order: &Order| {
                order.status == expected_status && order.payment_status == expected_payment
            })
            .times(1)
            .returning(|_| Ok(()));

        engine(orders, MockCatalog::new())
            .resolve_return(&order_id.to_hex(), resolve("completed", None))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn resolving_with_missing_or_invalid_status_is_rejected() {
    let lifecycle = engine(MockOrders::new(), MockCatalog::new());

    let err = lifecycle
        .resolve_return(
            &ObjectId::new().to_hex(),
            ResolveReturnRequest {
                status: None,
                admin_response: None,
                picked_date: None,
            },
        )
        .await
        .unwrap_err();
    match err {
        StoreError::Validation(message) => assert_eq!(message, "Status is required"),
        other => panic!("expected Validation, got {other:?}"),
    }

    let err = lifecycle
        .resolve_return(&ObjectId::new().to_hex(), resolve("shipped", None))
        .await
        .unwrap_err();
    match err {
        StoreError::Validation(message) => assert_eq!(message, "Invalid status provided"),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn resolving_without_a_return_request_is_not_found() {
    let order = delivered_order(3);
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));

    let err = engine(orders, MockCatalog::new())
        .resolve_return(&order_id.to_hex(), resolve("approved", None))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn refresh_dates_backfills_delivery_date_for_delivered_orders() {
    let mut order = order_with_status(OrderStatus::Delivered);
    order.order_date = bson_datetime(Utc::now() - Duration::days(40));
    assert!(order.delivery_date.is_none());
    let order_id = order.id;

    let mut orders = MockOrders::new();
    orders
        .expect_get_order()
        .returning(move |_| Ok(Some(order.clone())));
    orders
        .expect_save_order()
        .withf(|order: &Order| order.delivery_date.is_some())
        .times(1)
        .returning(|_| Ok(()));

    let refreshed = engine(orders, MockCatalog::new())
        .refresh_dates(&order_id.to_hex())
        .await
        .unwrap();
    assert!(refreshed.delivery_date.is_some());
}
