//! Database operations for `orders` and `order_items`.
//!
//! Every operation that touches stock runs in one transaction. Product rows
//! are locked in id order before any check, and decrements are conditional on
//! `stock >= quantity`, so stock never goes negative and concurrent purchases
//! of the same product serialize.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use runmate_core::{
    order_total, validate_requested_items, Order, OrderItem, OrderStatus, PaymentStatus,
    RequestedItem, ShippingAddress,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbError, Page};

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, payment_status, payment_method, \
     ship_street, ship_city, ship_state, ship_zip_code, ship_country, payment_session_id, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `orders` table. Status columns are stored as text and
/// parsed when the row is assembled into an [`Order`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_zip_code: String,
    pub ship_country: String,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `order_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub is_reviewed: bool,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DbError> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items: items
                .into_iter()
                .map(|item| OrderItem {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    is_reviewed: item.is_reviewed,
                })
                .collect(),
            total_amount: self.total_amount,
            status: self.status.parse()?,
            payment_status: self.payment_status.parse()?,
            payment_method: self.payment_method,
            shipping_address: ShippingAddress {
                street: self.ship_street,
                city: self.ship_city,
                state: self.ship_state,
                zip_code: self.ship_zip_code,
                country: self.ship_country,
            },
            payment_session_id: self.payment_session_id,
            created_at: self.created_at,
        })
    }
}

/// Locked product state used for availability checks.
#[derive(Debug, Clone, sqlx::FromRow)]
struct StockRow {
    id: Uuid,
    name: String,
    price: Decimal,
    stock: i32,
}

/// A requested item resolved against the catalog: the name and unit price
/// that will be snapshotted into the order line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: Uuid,
    pub items: &'a [RequestedItem],
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: &'a str,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderListFilters {
    /// Restricts the listing to one user's orders; `None` lists every order.
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone)]
pub struct StatusUpdateOutcome {
    pub order: Order,
    pub previous_status: OrderStatus,
    /// `true` only when the fulfilment status actually moved.
    pub status_changed: bool,
}

/// Result of reconciling a checkout session.
#[derive(Debug, Clone)]
pub struct SessionOrder {
    pub order: Order,
    /// `false` when an order for the session already existed.
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Availability and placement
// ---------------------------------------------------------------------------

/// Resolves requested items against the catalog without reserving anything.
///
/// # Errors
///
/// Returns [`DbError::InvalidValue`] for an empty list or a quantity below 1,
/// [`DbError::NotFound`] for an unknown product, and
/// [`DbError::InsufficientStock`] if any product cannot cover the requested
/// quantity.
pub async fn check_availability(
    pool: &PgPool,
    items: &[RequestedItem],
) -> Result<Vec<PricedLine>, DbError> {
    validate_requested_items(items)?;
    let ids = sorted_product_ids(items);
    let rows = sqlx::query_as::<_, StockRow>(
        "SELECT id, name, price, stock FROM products WHERE id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    resolve_lines(items, &rows)
}

/// Places an order: checks every item, snapshots names and prices, inserts the
/// order and decrements stock, all in one transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] or [`DbError::InsufficientStock`] without
/// touching any stock, [`DbError::InvalidValue`] for invalid input, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn place_order(pool: &PgPool, new_order: &NewOrder<'_>) -> Result<Order, DbError> {
    validate_requested_items(new_order.items)?;
    new_order.shipping_address.validate()?;

    let mut tx = pool.begin().await?;
    let order = insert_order_reserving_stock(&mut tx, new_order).await?;
    tx.commit().await?;

    Ok(order)
}

/// Creates the order for a confirmed checkout session exactly once.
///
/// Concurrent confirmations of the same session serialize on a transaction
/// advisory lock keyed by the session id; whichever commits first creates the
/// order and the others return it. The unique index on
/// `orders.payment_session_id` backs this up.
///
/// # Errors
///
/// Same as [`place_order`].
pub async fn create_order_from_session(
    pool: &PgPool,
    session_id: &str,
    new_order: &NewOrder<'_>,
) -> Result<SessionOrder, DbError> {
    if let Some(order) = get_order_by_session_id(pool, session_id).await? {
        return Ok(SessionOrder {
            order,
            created: false,
        });
    }

    validate_requested_items(new_order.items)?;
    new_order.shipping_address.validate()?;

    let new_order = NewOrder {
        payment_session_id: Some(session_id),
        ..new_order.clone()
    };

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    if let Some(order) = fetch_order_by_session_id(&mut tx, session_id).await? {
        tx.commit().await?;
        return Ok(SessionOrder {
            order,
            created: false,
        });
    }

    match insert_order_reserving_stock(&mut tx, &new_order).await {
        Ok(order) => {
            tx.commit().await?;
            Ok(SessionOrder {
                order,
                created: true,
            })
        }
        Err(err) if err.is_unique_violation() => {
            drop(tx);
            let order = get_order_by_session_id(pool, session_id)
                .await?
                .ok_or(err)?;
            Ok(SessionOrder {
                order,
                created: false,
            })
        }
        Err(err) => Err(err),
    }
}

async fn insert_order_reserving_stock(
    conn: &mut PgConnection,
    new_order: &NewOrder<'_>,
) -> Result<Order, DbError> {
    let ids = sorted_product_ids(new_order.items);
    let locked = sqlx::query_as::<_, StockRow>(
        "SELECT id, name, price, stock FROM products \
         WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let lines = resolve_lines(new_order.items, &locked)?;
    let total = order_total(lines.iter().map(|l| (l.unit_price, l.quantity)))?;
    let order_id = Uuid::new_v4();
    let address = new_order.shipping_address;

    let order_row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders \
             (id, user_id, total_amount, status, payment_status, payment_method, \
              ship_street, ship_city, ship_state, ship_zip_code, ship_country, payment_session_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(new_order.user_id)
    .bind(total)
    .bind(new_order.status.as_str())
    .bind(new_order.payment_status.as_str())
    .bind(new_order.payment_method)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.zip_code)
    .bind(&address.country)
    .bind(new_order.payment_session_id)
    .fetch_one(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (position, line) in (0_i32..).zip(&lines) {
        let item = sqlx::query_as::<_, OrderItemRow>(
            "INSERT INTO order_items \
                 (id, order_id, position, product_id, product_name, quantity, unit_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, order_id, product_id, product_name, quantity, unit_price, is_reviewed",
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(position)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);

        let decremented = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;

        if decremented.rows_affected() == 0 {
            let available = locked
                .iter()
                .find(|row| row.id == line.product_id)
                .map_or(0, |row| row.stock);
            return Err(DbError::InsufficientStock {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                available,
            });
        }
    }

    order_row.into_order(items)
}

/// Matches requested items to product rows, in request order, and checks the
/// total requested per product against its stock.
fn resolve_lines(items: &[RequestedItem], rows: &[StockRow]) -> Result<Vec<PricedLine>, DbError> {
    let by_id: HashMap<Uuid, &StockRow> = rows.iter().map(|row| (row.id, row)).collect();

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let row = by_id
            .get(&item.product_id)
            .ok_or_else(|| DbError::not_found("product", item.product_id))?;
        lines.push(PricedLine {
            product_id: row.id,
            product_name: row.name.clone(),
            unit_price: row.price,
            quantity: item.quantity,
        });
    }

    let mut requested: BTreeMap<Uuid, i64> = BTreeMap::new();
    for line in &lines {
        *requested.entry(line.product_id).or_default() += i64::from(line.quantity);
    }
    for line in &lines {
        let row = by_id[&line.product_id];
        if requested[&line.product_id] > i64::from(row.stock) {
            return Err(DbError::InsufficientStock {
                product_id: row.id,
                product_name: row.name.clone(),
                available: row.stock,
            });
        }
    }

    Ok(lines)
}

fn sorted_product_ids(items: &[RequestedItem]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails or [`DbError::InvalidValue`] if
/// a stored status is unrecognised.
pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<Option<Order>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_order(&mut conn, id, false).await
}

/// Returns the order created for a checkout session, if any.
///
/// # Errors
///
/// Same as [`get_order`].
pub async fn get_order_by_session_id(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<Order>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_order_by_session_id(&mut conn, session_id).await
}

/// Lists orders newest first, one page at a time.
///
/// # Errors
///
/// Same as [`get_order`].
pub async fn list_orders(
    pool: &PgPool,
    filters: &OrderListFilters,
) -> Result<Page<Order>, DbError> {
    const WHERE_CLAUSE: &str =
        "WHERE ($1::UUID IS NULL OR user_id = $1) AND ($2::TEXT IS NULL OR status = $2)";

    let status = filters.status.map(OrderStatus::as_str);

    let total: i64 = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM orders {WHERE_CLAUSE}"
    ))
    .bind(filters.user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders {WHERE_CLAUSE} \
         ORDER BY created_at DESC, id \
         LIMIT $3 OFFSET $4"
    ))
    .bind(filters.user_id)
    .bind(status)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, product_name, quantity, unit_price, is_reviewed \
         FROM order_items WHERE order_id = ANY($1) \
         ORDER BY order_id, position",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
    for item in item_rows {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    let items = rows
        .into_iter()
        .map(|row| {
            let items = items_by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page { items, total })
}

async fn fetch_order(
    conn: &mut PgConnection,
    id: Uuid,
    for_update: bool,
) -> Result<Option<Order>, DbError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let items = fetch_items(conn, row.id).await?;
            row.into_order(items).map(Some)
        }
        None => Ok(None),
    }
}

async fn fetch_order_by_session_id(
    conn: &mut PgConnection,
    session_id: &str,
) -> Result<Option<Order>, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let items = fetch_items(conn, row.id).await?;
            row.into_order(items).map(Some)
        }
        None => Ok(None),
    }
}

async fn fetch_items(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderItemRow>, DbError> {
    let items = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, product_name, quantity, unit_price, is_reviewed \
         FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

// ---------------------------------------------------------------------------
// Transitions and deletion
// ---------------------------------------------------------------------------

/// Applies a status and/or payment-status change.
///
/// Status moves must follow [`OrderStatus::can_transition_to`]; requesting the
/// current status is accepted and leaves it untouched. Moving to `cancelled`
/// puts every line's quantity back into stock in the same transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist,
/// [`DbError::InvalidOrderTransition`] for a move the graph forbids, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn update_order_status(
    pool: &PgPool,
    id: Uuid,
    update: StatusUpdate,
) -> Result<StatusUpdateOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let current = fetch_order(&mut tx, id, true)
        .await?
        .ok_or_else(|| DbError::not_found("order", id))?;
    let previous_status = current.status;

    let next_status = match update.status {
        Some(next) if next == previous_status => previous_status,
        Some(next) if previous_status.can_transition_to(next) => next,
        Some(next) => {
            return Err(DbError::InvalidOrderTransition {
                id,
                from: previous_status,
                to: next,
            });
        }
        None => previous_status,
    };
    let status_changed = next_status != previous_status;

    if status_changed && next_status == OrderStatus::Cancelled {
        restore_stock(&mut tx, id).await?;
    }

    let payment_status = update.payment_status.unwrap_or(current.payment_status);
    sqlx::query(
        "UPDATE orders SET status = $2, payment_status = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(next_status.as_str())
    .bind(payment_status.as_str())
    .execute(&mut *tx)
    .await?;

    let order = fetch_order(&mut tx, id, false)
        .await?
        .ok_or_else(|| DbError::not_found("order", id))?;
    tx.commit().await?;

    Ok(StatusUpdateOutcome {
        order,
        previous_status,
        status_changed,
    })
}

/// Deletes a pending or cancelled order and returns it as it was.
///
/// Pending orders give their quantities back to stock. Cancelled orders
/// already did so when they were cancelled.
///
/// # Errors
///
/// Returns [`DbError::NotFound`], [`DbError::OrderNotDeletable`] for any
/// other status, or [`DbError::Sqlx`] if a statement fails.
pub async fn delete_order(pool: &PgPool, id: Uuid) -> Result<Order, DbError> {
    let mut tx = pool.begin().await?;

    let order = fetch_order(&mut tx, id, true)
        .await?
        .ok_or_else(|| DbError::not_found("order", id))?;

    if !order.status.is_deletable() {
        return Err(DbError::OrderNotDeletable {
            id,
            status: order.status,
        });
    }
    if order.status == OrderStatus::Pending {
        restore_stock(&mut tx, id).await?;
    }

    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(order)
}

/// Adds each line's quantity back to its product. Lines whose product has
/// since been deleted are skipped.
async fn restore_stock(conn: &mut PgConnection, order_id: Uuid) -> Result<(), DbError> {
    sqlx::query(
        "SELECT id FROM products \
         WHERE id IN (SELECT product_id FROM order_items WHERE order_id = $1) \
         ORDER BY id FOR UPDATE",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE products p SET stock = p.stock + r.quantity, updated_at = NOW() \
         FROM ( \
             SELECT product_id, SUM(quantity)::INTEGER AS quantity \
             FROM order_items \
             WHERE order_id = $1 AND product_id IS NOT NULL \
             GROUP BY product_id \
         ) r \
         WHERE p.id = r.product_id",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_row(id: Uuid, name: &str, price: Decimal, stock: i32) -> StockRow {
        StockRow {
            id,
            name: name.to_string(),
            price,
            stock,
        }
    }

    #[test]
    fn resolve_lines_keeps_request_order_and_snapshots_price() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![
            stock_row(a, "Tempo Trainer", Decimal::new(1000, 2), 10),
            stock_row(b, "Race Socks", Decimal::new(550, 2), 10),
        ];
        let items = [
            RequestedItem {
                product_id: b,
                quantity: 3,
            },
            RequestedItem {
                product_id: a,
                quantity: 2,
            },
        ];

        let lines = resolve_lines(&items, &rows).unwrap();
        assert_eq!(lines[0].product_name, "Race Socks");
        assert_eq!(lines[1].unit_price, Decimal::new(1000, 2));
        assert_eq!(
            order_total(lines.iter().map(|l| (l.unit_price, l.quantity))).unwrap(),
            Decimal::new(3650, 2)
        );
    }

    #[test]
    fn resolve_lines_reports_unknown_product() {
        let missing = Uuid::new_v4();
        let err = resolve_lines(
            &[RequestedItem {
                product_id: missing,
                quantity: 1,
            }],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "product", ref id } if *id == missing.to_string()));
    }

    #[test]
    fn resolve_lines_sums_duplicate_lines_before_checking_stock() {
        let a = Uuid::new_v4();
        let rows = vec![stock_row(a, "Gel Pack", Decimal::new(250, 2), 5)];
        let items = [
            RequestedItem {
                product_id: a,
                quantity: 3,
            },
            RequestedItem {
                product_id: a,
                quantity: 3,
            },
        ];

        let err = resolve_lines(&items, &rows).unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { available: 5, .. }));
    }

    #[test]
    fn sorted_product_ids_dedups() {
        let a = Uuid::new_v4();
        let items = [
            RequestedItem {
                product_id: a,
                quantity: 1,
            },
            RequestedItem {
                product_id: a,
                quantity: 2,
            },
        ];
        assert_eq!(sorted_product_ids(&items), vec![a]);
    }
}
