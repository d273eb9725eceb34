//! Live integration tests for runmate-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/runmate-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use rust_decimal::Decimal;
use runmate_core::{
    NewProduct, OrderStatus, PaymentStatus, ProductPatch, RequestedItem, ShippingAddress,
    UserPatch, CHECKOUT_PAYMENT_METHOD, DEFAULT_PAYMENT_METHOD, MAX_AMOUNT,
};
use runmate_db::{
    check_availability, create_order_from_session, create_review, delete_order, delete_product,
    delete_review, delete_user, get_order, get_product, get_product_detail, get_user,
    insert_product, insert_user, list_orders, list_products, list_users, place_order,
    remove_product_photo, seed_catalog, update_order_status, update_product, update_review,
    update_user, DbError, NewOrder, NewReview, NewUser, OrderListFilters, ProductFilters,
    StatusUpdate, UserFilters,
};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_user(pool: &PgPool, email: &str) -> Uuid {
    insert_user(
        pool,
        &NewUser {
            email,
            name: "Test Runner",
            password_hash: Some("hash"),
            is_social: false,
            is_admin: false,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("insert_test_user failed for '{email}': {e}"))
    .id
}

async fn insert_test_product(pool: &PgPool, owner: Uuid, name: &str, price: Decimal, stock: i32) -> Uuid {
    insert_product(
        pool,
        owner,
        &NewProduct {
            name: name.to_string(),
            description: format!("{name} description"),
            category: "Shoes".to_string(),
            price,
            stock,
            photos: vec![],
        },
    )
    .await
    .unwrap_or_else(|e| panic!("insert_test_product failed for '{name}': {e}"))
    .id
}

async fn stock_of(pool: &PgPool, id: Uuid) -> i32 {
    get_product(pool, id)
        .await
        .expect("get_product failed")
        .expect("product missing")
        .stock
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "1 Track Lane".to_string(),
        city: "Boulder".to_string(),
        state: "CO".to_string(),
        zip_code: "80301".to_string(),
        country: "US".to_string(),
    }
}

fn item(product_id: Uuid, quantity: i32) -> RequestedItem {
    RequestedItem {
        product_id,
        quantity,
    }
}

fn direct_order<'a>(
    user_id: Uuid,
    items: &'a [RequestedItem],
    address: &'a ShippingAddress,
) -> NewOrder<'a> {
    NewOrder {
        user_id,
        items,
        shipping_address: address,
        payment_method: DEFAULT_PAYMENT_METHOD,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_session_id: None,
    }
}

/// Places a single-line order and walks it to `delivered`, returning
/// `(order_id, order_item_id)`.
async fn delivered_order(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> (Uuid, Uuid) {
    let items = [item(product_id, 1)];
    let address = address();
    let order = place_order(pool, &direct_order(user_id, &items, &address))
        .await
        .expect("place_order failed");

    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        update_order_status(
            pool,
            order.id,
            StatusUpdate {
                status: Some(status),
                payment_status: None,
            },
        )
        .await
        .expect("update_order_status failed");
    }

    (order.id, order.items[0].id)
}

// ---------------------------------------------------------------------------
// Section 1: Order placement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn place_order_snapshots_prices_and_computes_total(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let shoes = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let socks = insert_test_product(&pool, user, "Race Socks", Decimal::new(550, 2), 10).await;

    let items = [item(shoes, 2), item(socks, 3)];
    let address = address();
    let order = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect("place_order failed");

    assert_eq!(order.total_amount, Decimal::new(3650, 2));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.payment_method, DEFAULT_PAYMENT_METHOD);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_name, "Tempo Trainer");
    assert_eq!(stock_of(&pool, shoes).await, 8);
    assert_eq!(stock_of(&pool, socks).await, 7);

    update_product(
        &pool,
        shoes,
        &ProductPatch {
            price: Some(Decimal::new(9900, 2)),
            name: Some("Tempo Trainer 2".to_string()),
            ..ProductPatch::default()
        },
    )
    .await
    .expect("update_product failed");

    let reloaded = get_order(&pool, order.id)
        .await
        .expect("get_order failed")
        .expect("order missing");
    assert_eq!(reloaded.total_amount, Decimal::new(3650, 2));
    assert_eq!(reloaded.items[0].unit_price, Decimal::new(1000, 2));
    assert_eq!(reloaded.items[0].product_name, "Tempo Trainer");
}

#[sqlx::test(migrations = "../../migrations")]
async fn insufficient_stock_leaves_every_product_untouched(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let plenty = insert_test_product(&pool, user, "Gel Pack", Decimal::new(250, 2), 50).await;
    let scarce = insert_test_product(&pool, user, "Carbon Racer", Decimal::new(25000, 2), 3).await;

    let items = [item(plenty, 4), item(scarce, 5)];
    let address = address();
    let err = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect_err("ordering 5 of 3 should fail");

    match err {
        DbError::InsufficientStock {
            product_id,
            product_name,
            available,
        } => {
            assert_eq!(product_id, scarce);
            assert_eq!(product_name, "Carbon Racer");
            assert_eq!(available, 3);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(&pool, scarce).await, 3);
    assert_eq!(stock_of(&pool, plenty).await, 50);

    let page = list_orders(
        &pool,
        &OrderListFilters {
            limit: 10,
            ..OrderListFilters::default()
        },
    )
    .await
    .expect("list_orders failed");
    assert_eq!(page.total, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_product_is_not_found(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let items = [item(Uuid::new_v4(), 1)];
    let address = address();

    let err = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect_err("unknown product should fail");
    assert!(matches!(err, DbError::NotFound { entity: "product", .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_item_list_is_rejected(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let address = address();

    let err = place_order(&pool, &direct_order(user, &[], &address))
        .await
        .expect_err("empty order should fail");
    assert!(matches!(err, DbError::InvalidValue(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_total_beyond_money_column_is_rejected(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let buyer = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, owner, "Gold Spike", MAX_AMOUNT, 5).await;
    let items = [item(product, 2)];
    let address = address();

    let err = place_order(&pool, &direct_order(buyer, &items, &address))
        .await
        .expect_err("oversized total should fail");
    assert!(
        matches!(err, DbError::InvalidValue(ref e) if e.to_string().contains("order total")),
        "unexpected error: {err}"
    );
    assert_eq!(stock_of(&pool, product).await, 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_orders_never_oversell(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Limited Spikes", Decimal::new(8000, 2), 3).await;
    let address = address();
    let items = [item(product, 2)];

    let first = direct_order(user, &items, &address);
    let second = direct_order(user, &items, &address);
    let (a, b) = tokio::join!(place_order(&pool, &first), place_order(&pool, &second));

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one of two competing orders should succeed"
    );
    assert_eq!(stock_of(&pool, product).await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn check_availability_does_not_reserve(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Visor", Decimal::new(1800, 2), 2).await;

    let lines = check_availability(&pool, &[item(product, 2)])
        .await
        .expect("check_availability failed");
    assert_eq!(lines[0].product_name, "Visor");
    assert_eq!(lines[0].unit_price, Decimal::new(1800, 2));
    assert_eq!(stock_of(&pool, product).await, 2);

    let err = check_availability(&pool, &[item(product, 3)])
        .await
        .expect_err("3 of 2 should fail");
    assert!(matches!(err, DbError::InsufficientStock { available: 2, .. }));
}

// ---------------------------------------------------------------------------
// Section 2: Checkout session reconciliation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn confirming_a_session_twice_returns_the_same_order(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(12000, 2), 5).await;
    let items = [item(product, 2)];
    let address = address();
    let new_order = NewOrder {
        payment_method: CHECKOUT_PAYMENT_METHOD,
        status: OrderStatus::Processing,
        payment_status: PaymentStatus::Paid,
        ..direct_order(user, &items, &address)
    };

    let first = create_order_from_session(&pool, "cs_test_123", &new_order)
        .await
        .expect("first confirmation failed");
    let second = create_order_from_session(&pool, "cs_test_123", &new_order)
        .await
        .expect("second confirmation failed");

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.order.id, second.order.id);
    assert_eq!(first.order.status, OrderStatus::Processing);
    assert_eq!(first.order.payment_status, PaymentStatus::Paid);
    assert_eq!(first.order.payment_session_id.as_deref(), Some("cs_test_123"));
    assert_eq!(stock_of(&pool, product).await, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_confirmations_create_one_order(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(12000, 2), 5).await;
    let items = [item(product, 1)];
    let address = address();
    let new_order = NewOrder {
        payment_method: CHECKOUT_PAYMENT_METHOD,
        status: OrderStatus::Processing,
        payment_status: PaymentStatus::Paid,
        ..direct_order(user, &items, &address)
    };

    let (a, b) = tokio::join!(
        create_order_from_session(&pool, "cs_race", &new_order),
        create_order_from_session(&pool, "cs_race", &new_order)
    );
    let a = a.expect("first confirmation failed");
    let b = b.expect("second confirmation failed");

    assert_eq!(a.order.id, b.order.id);
    assert_ne!(a.created, b.created);
    assert_eq!(stock_of(&pool, product).await, 4);
}

// ---------------------------------------------------------------------------
// Section 3: Status transitions and deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_pending_order_restores_stock(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let a = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let b = insert_test_product(&pool, user, "Race Socks", Decimal::new(550, 2), 10).await;
    let items = [item(a, 2), item(b, 3)];
    let address = address();
    let order = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect("place_order failed");

    let deleted = delete_order(&pool, order.id).await.expect("delete_order failed");
    assert_eq!(deleted.id, order.id);
    assert_eq!(stock_of(&pool, a).await, 10);
    assert_eq!(stock_of(&pool, b).await, 10);
    assert!(get_order(&pool, order.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_shipped_order_is_rejected(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let items = [item(product, 1)];
    let address = address();
    let order = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect("place_order failed");

    for status in [OrderStatus::Processing, OrderStatus::Shipped] {
        update_order_status(
            &pool,
            order.id,
            StatusUpdate {
                status: Some(status),
                payment_status: None,
            },
        )
        .await
        .expect("transition failed");
    }

    let err = delete_order(&pool, order.id)
        .await
        .expect_err("shipped order must not be deletable");
    assert!(matches!(
        err,
        DbError::OrderNotDeletable {
            status: OrderStatus::Shipped,
            ..
        }
    ));
    assert_eq!(stock_of(&pool, product).await, 9);
}

#[sqlx::test(migrations = "../../migrations")]
async fn cancelling_restores_stock_once(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let items = [item(product, 4)];
    let address = address();
    let order = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect("place_order failed");
    assert_eq!(stock_of(&pool, product).await, 6);

    let outcome = update_order_status(
        &pool,
        order.id,
        StatusUpdate {
            status: Some(OrderStatus::Cancelled),
            payment_status: None,
        },
    )
    .await
    .expect("cancel failed");
    assert!(outcome.status_changed);
    assert_eq!(outcome.previous_status, OrderStatus::Pending);
    assert_eq!(stock_of(&pool, product).await, 10);

    delete_order(&pool, order.id).await.expect("delete_order failed");
    assert_eq!(stock_of(&pool, product).await, 10);
}

#[sqlx::test(migrations = "../../migrations")]
async fn backward_transition_is_rejected(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let (order_id, _) = delivered_order(&pool, user, product).await;

    let err = update_order_status(
        &pool,
        order_id,
        StatusUpdate {
            status: Some(OrderStatus::Pending),
            payment_status: None,
        },
    )
    .await
    .expect_err("delivered -> pending must fail");
    assert!(matches!(
        err,
        DbError::InvalidOrderTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn same_status_with_payment_change_is_not_a_status_change(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let items = [item(product, 1)];
    let address = address();
    let order = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect("place_order failed");

    let outcome = update_order_status(
        &pool,
        order.id,
        StatusUpdate {
            status: Some(OrderStatus::Pending),
            payment_status: Some(PaymentStatus::Paid),
        },
    )
    .await
    .expect("update failed");

    assert!(!outcome.status_changed);
    assert_eq!(outcome.order.status, OrderStatus::Pending);
    assert_eq!(outcome.order.payment_status, PaymentStatus::Paid);
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_orders_filters_by_user(pool: PgPool) {
    let alice = insert_test_user(&pool, "alice@runmate.test").await;
    let bob = insert_test_user(&pool, "bob@runmate.test").await;
    let product = insert_test_product(&pool, alice, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let items = [item(product, 1)];
    let address = address();

    for user in [alice, alice, bob] {
        place_order(&pool, &direct_order(user, &items, &address))
            .await
            .expect("place_order failed");
    }

    let mine = list_orders(
        &pool,
        &OrderListFilters {
            user_id: Some(alice),
            limit: 10,
            ..OrderListFilters::default()
        },
    )
    .await
    .expect("list_orders failed");
    assert_eq!(mine.total, 2);
    assert!(mine.items.iter().all(|o| o.user_id == alice));
    assert!(mine.items.iter().all(|o| o.items.len() == 1));

    let all = list_orders(
        &pool,
        &OrderListFilters {
            limit: 1,
            ..OrderListFilters::default()
        },
    )
    .await
    .expect("list_orders failed");
    assert_eq!(all.total, 3);
    assert_eq!(all.items.len(), 1);
}

// ---------------------------------------------------------------------------
// Section 4: Reviews and rating aggregate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn rating_aggregate_tracks_reviews(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let product = insert_test_product(&pool, owner, "Tempo Trainer", Decimal::new(1000, 2), 10).await;

    let mut review_ids = Vec::new();
    for (i, rating) in [5_i16, 3, 4].into_iter().enumerate() {
        let reviewer = insert_test_user(&pool, &format!("reviewer{i}@runmate.test")).await;
        let (order_id, order_item_id) = delivered_order(&pool, reviewer, product).await;
        let review = create_review(
            &pool,
            &NewReview {
                user_id: reviewer,
                order_id,
                order_item_id,
                rating,
                comment: "solid shoe",
            },
        )
        .await
        .expect("create_review failed");
        review_ids.push(review.id);
    }

    let detail = get_product_detail(&pool, product)
        .await
        .expect("get_product_detail failed")
        .expect("product missing");
    assert_eq!(detail.product.rating, Decimal::new(4, 0));
    assert_eq!(detail.product.num_reviews, 3);
    assert_eq!(detail.reviews.len(), 3);
    assert_eq!(detail.reviews[0].user_name.as_deref(), Some("Test Runner"));

    delete_review(&pool, review_ids[1]).await.expect("delete_review failed");
    let after = get_product(&pool, product).await.unwrap().unwrap();
    assert_eq!(after.rating, Decimal::new(450, 2));
    assert_eq!(after.num_reviews, 2);

    update_review(&pool, review_ids[0], 1, "sole wore out")
        .await
        .expect("update_review failed")
        .expect("review missing");
    let updated = get_product(&pool, product).await.unwrap().unwrap();
    assert_eq!(updated.rating, Decimal::new(250, 2));

    for id in [review_ids[0], review_ids[2]] {
        delete_review(&pool, id).await.expect("delete_review failed");
    }
    let empty = get_product(&pool, product).await.unwrap().unwrap();
    assert_eq!(empty.rating, Decimal::ZERO);
    assert_eq!(empty.num_reviews, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn repeating_mean_is_stored_unrounded(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let product = insert_test_product(&pool, owner, "Tempo Trainer", Decimal::new(1000, 2), 10).await;

    for (i, rating) in [5_i16, 4, 4].into_iter().enumerate() {
        let reviewer = insert_test_user(&pool, &format!("reviewer{i}@runmate.test")).await;
        let (order_id, order_item_id) = delivered_order(&pool, reviewer, product).await;
        create_review(
            &pool,
            &NewReview {
                user_id: reviewer,
                order_id,
                order_item_id,
                rating,
                comment: "good grip",
            },
        )
        .await
        .expect("create_review failed");
    }

    let stored = get_product(&pool, product).await.unwrap().unwrap();
    assert_eq!(stored.rating, Decimal::from(13) / Decimal::from(3));
    assert_eq!(stored.num_reviews, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_review_of_same_item_is_rejected(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let (order_id, order_item_id) = delivered_order(&pool, user, product).await;
    let review = NewReview {
        user_id: user,
        order_id,
        order_item_id,
        rating: 5,
        comment: "great",
    };

    create_review(&pool, &review).await.expect("first review failed");
    let err = create_review(&pool, &review)
        .await
        .expect_err("second review must fail");
    assert!(matches!(err, DbError::AlreadyReviewed { order_item_id: id } if id == order_item_id));

    let order = get_order(&pool, order_id).await.unwrap().unwrap();
    assert!(order.items[0].is_reviewed);
    let product = get_product(&pool, product).await.unwrap().unwrap();
    assert_eq!(product.num_reviews, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn review_requires_delivered_order_owned_by_reviewer(pool: PgPool) {
    let buyer = insert_test_user(&pool, "buyer@runmate.test").await;
    let stranger = insert_test_user(&pool, "stranger@runmate.test").await;
    let product = insert_test_product(&pool, buyer, "Tempo Trainer", Decimal::new(1000, 2), 10).await;

    let items = [item(product, 1)];
    let address = address();
    let pending = place_order(&pool, &direct_order(buyer, &items, &address))
        .await
        .expect("place_order failed");
    let err = create_review(
        &pool,
        &NewReview {
            user_id: buyer,
            order_id: pending.id,
            order_item_id: pending.items[0].id,
            rating: 4,
            comment: "too early",
        },
    )
    .await
    .expect_err("pending order must not be reviewable");
    assert!(matches!(err, DbError::NotFound { .. }));

    let (order_id, order_item_id) = delivered_order(&pool, buyer, product).await;
    let err = create_review(
        &pool,
        &NewReview {
            user_id: stranger,
            order_id,
            order_item_id,
            rating: 1,
            comment: "not mine",
        },
    )
    .await
    .expect_err("stranger must not review");
    assert!(matches!(err, DbError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Section 5: Catalog
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn list_products_filters_and_paginates(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    insert_test_product(&pool, owner, "Tempo Trainer", Decimal::new(12000, 2), 5).await;
    insert_test_product(&pool, owner, "Trail Runner", Decimal::new(14000, 2), 5).await;
    insert_test_product(&pool, owner, "Race Socks", Decimal::new(1500, 2), 5).await;

    let page = list_products(
        &pool,
        &ProductFilters {
            search: Some("runner"),
            limit: 10,
            ..ProductFilters::default()
        },
    )
    .await
    .expect("list_products failed");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Trail Runner");

    let cheap = list_products(
        &pool,
        &ProductFilters {
            max_price: Some(Decimal::new(13000, 2)),
            limit: 1,
            ..ProductFilters::default()
        },
    )
    .await
    .expect("list_products failed");
    assert_eq!(cheap.total, 2);
    assert_eq!(cheap.items.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_product_keeps_order_snapshots(pool: PgPool) {
    let user = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, user, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let items = [item(product, 1)];
    let address = address();
    let order = place_order(&pool, &direct_order(user, &items, &address))
        .await
        .expect("place_order failed");

    assert!(delete_product(&pool, product).await.expect("delete_product failed"));

    let reloaded = get_order(&pool, order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.items[0].product_id, None);
    assert_eq!(reloaded.items[0].product_name, "Tempo Trainer");

    // The product is gone, so deleting the pending order restores nothing.
    delete_order(&pool, order.id).await.expect("delete_order failed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn photos_append_then_remove(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let product = insert_test_product(&pool, owner, "Tempo Trainer", Decimal::new(1000, 2), 1).await;

    update_product(
        &pool,
        product,
        &ProductPatch {
            photos: Some(vec!["a.jpg".to_string(), "b.jpg".to_string()]),
            ..ProductPatch::default()
        },
    )
    .await
    .expect("update_product failed");

    let row = remove_product_photo(&pool, product, "a.jpg")
        .await
        .expect("remove_product_photo failed")
        .expect("product missing");
    assert_eq!(row.photos, vec!["b.jpg".to_string()]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_catalog_is_idempotent(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let products = vec![NewProduct {
        name: "Tempo Trainer".to_string(),
        description: "Daily trainer".to_string(),
        category: "Shoes".to_string(),
        price: Decimal::new(12000, 2),
        stock: 5,
        photos: vec![],
    }];

    let first = seed_catalog(&pool, owner, &products).await.expect("seed failed");
    let second = seed_catalog(&pool, owner, &products).await.expect("reseed failed");

    assert_eq!(first.inserted, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 1);
}

// ---------------------------------------------------------------------------
// Section 6: Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn list_users_searches_name_and_email(pool: PgPool) {
    for email in ["ava@trailclub.test", "ben@trailclub.test", "cara@roadies.test"] {
        insert_test_user(&pool, email).await;
    }

    let page = list_users(
        &pool,
        &UserFilters {
            search: Some(" TrailClub "),
            limit: 1,
            offset: 0,
        },
    )
    .await
    .expect("list_users failed");
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);

    let by_name = list_users(
        &pool,
        &UserFilters {
            search: Some("test runner"),
            limit: 10,
            offset: 0,
        },
    )
    .await
    .expect("list_users failed");
    assert_eq!(by_name.total, 3);

    let wildcard = list_users(
        &pool,
        &UserFilters {
            search: Some("_"),
            limit: 10,
            offset: 0,
        },
    )
    .await
    .expect("list_users failed");
    assert_eq!(wildcard.total, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_user_changes_only_given_fields(pool: PgPool) {
    let user = insert_test_user(&pool, "user@runmate.test").await;
    insert_test_user(&pool, "taken@runmate.test").await;

    let row = update_user(
        &pool,
        user,
        &UserPatch {
            name: Some("Sam Strider".to_string()),
            ..UserPatch::default()
        },
    )
    .await
    .expect("update_user failed")
    .expect("user missing");
    assert_eq!(row.name, "Sam Strider");
    assert_eq!(row.email, "user@runmate.test");
    assert!(!row.is_admin);

    let err = update_user(
        &pool,
        user,
        &UserPatch {
            email: Some("taken@runmate.test".to_string()),
            ..UserPatch::default()
        },
    )
    .await
    .expect_err("duplicate email must fail");
    assert!(matches!(err, DbError::EmailTaken { ref email } if email == "taken@runmate.test"));

    let missing = update_user(&pool, Uuid::new_v4(), &UserPatch::default())
        .await
        .expect("update_user failed");
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_user_refuses_owners_and_open_orders(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let buyer = insert_test_user(&pool, "buyer@runmate.test").await;
    let product = insert_test_product(&pool, owner, "Tempo Trainer", Decimal::new(1000, 2), 10).await;
    let items = [item(product, 2)];
    let address = address();
    place_order(&pool, &direct_order(buyer, &items, &address))
        .await
        .expect("place_order failed");

    let err = delete_user(&pool, owner).await.expect_err("owner must stay");
    assert!(matches!(err, DbError::UserNotDeletable { id, ref reason } if id == owner && reason.contains("product")));

    let err = delete_user(&pool, buyer).await.expect_err("buyer must stay");
    assert!(matches!(err, DbError::UserNotDeletable { ref reason, .. } if reason.contains("open order")));

    assert!(get_user(&pool, buyer).await.unwrap().is_some());
    assert_eq!(stock_of(&pool, product).await, 8);
    assert!(delete_user(&pool, Uuid::new_v4()).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_user_drops_reviews_and_recomputes_rating(pool: PgPool) {
    let owner = insert_test_user(&pool, "owner@runmate.test").await;
    let product = insert_test_product(&pool, owner, "Tempo Trainer", Decimal::new(1000, 2), 10).await;

    let mut reviewers = Vec::new();
    for (i, rating) in [5_i16, 2].into_iter().enumerate() {
        let reviewer = insert_test_user(&pool, &format!("reviewer{i}@runmate.test")).await;
        let (order_id, order_item_id) = delivered_order(&pool, reviewer, product).await;
        create_review(
            &pool,
            &NewReview {
                user_id: reviewer,
                order_id,
                order_item_id,
                rating,
                comment: "fits well",
            },
        )
        .await
        .expect("create_review failed");
        reviewers.push((reviewer, order_id));
    }
    assert_eq!(
        get_product(&pool, product).await.unwrap().unwrap().rating,
        Decimal::new(35, 1)
    );

    let (leaver, leaver_order) = reviewers[1];
    let row = delete_user(&pool, leaver)
        .await
        .expect("delete_user failed")
        .expect("user missing");
    assert_eq!(row.email, "reviewer1@runmate.test");

    let stored = get_product(&pool, product).await.unwrap().unwrap();
    assert_eq!(stored.rating, Decimal::from(5));
    assert_eq!(stored.num_reviews, 1);
    assert!(get_order(&pool, leaver_order).await.unwrap().is_none());
    assert!(get_user(&pool, leaver).await.unwrap().is_none());
}
