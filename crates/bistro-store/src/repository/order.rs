//! # Order Repository
//!
//! Database operations for submitted orders.
//!
//! ## Idempotent Append
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Why append is INSERT OR IGNORE                          │
//! │                                                                         │
//! │  The same OrderCreated event can reach the kitchen more than once      │
//! │  (duplicate delivery, loopback + echo, import after sync). Appending   │
//! │  is keyed by order id: an existing id is left untouched and reported   │
//! │  as not-inserted. Distinct orders always carry distinct UUIDs, so      │
//! │  this only ever collapses duplicates, never real concurrent orders.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use bistro_core::{CartItem, Order, OrderStatus};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Returns all orders, newest first.
    pub async fn all(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, items_json, status, total_cents, chef_note, created_at
            FROM orders
            ORDER BY created_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    /// Returns all non-terminal orders, newest first. This is the snapshot
    /// source for join-time catch-up.
    pub async fn active(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, items_json, status, total_cents, chef_note, created_at
            FROM orders
            WHERE status != ?1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(OrderStatus::Completed)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    /// Gets an order by id.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_name, items_json, status, total_cents, chef_note, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    /// Appends an order, idempotent on id.
    ///
    /// Returns `true` if the order was inserted, `false` if an order with the
    /// same id already existed (the existing row is left untouched).
    pub async fn append(&self, order: &Order) -> StoreResult<bool> {
        let items_json = serde_json::to_string(&order.items)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO orders
                (id, customer_name, items_json, status, total_cents, chef_note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(items_json)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(&order.chef_note)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(id = %order.id, inserted, "Appended order");
        Ok(inserted)
    }

    /// Sets an order's status.
    pub async fn set_status(&self, id: &str, status: OrderStatus) -> StoreResult<()> {
        debug!(id = %id, status = %status, "Setting order status");

        let result = sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }

        Ok(())
    }

    /// Sets the chef's note, first-write-wins.
    ///
    /// Returns `true` if the note was written, `false` if one already existed
    /// (the existing note is kept).
    pub async fn set_chef_note(&self, id: &str, note: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE orders SET chef_note = ?2 WHERE id = ?1 AND chef_note IS NULL")
                .bind(id)
                .bind(note)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // No row written: either the note already exists or the order doesn't.
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::not_found("order", id)),
        }
    }

    /// Permanently removes all terminal orders. Returns how many were purged.
    pub async fn purge_terminal(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM orders WHERE status = ?1")
            .bind(OrderStatus::Completed)
            .execute(&self.pool)
            .await?;

        debug!(purged = result.rows_affected(), "Purged terminal orders");
        Ok(result.rows_affected())
    }

    /// Merges orders by id: an incoming order unconditionally replaces the
    /// local order with the same id (last-import-wins, no freshness check),
    /// everything else is kept. The import path.
    pub async fn merge(&self, orders: &[Order]) -> StoreResult<()> {
        debug!(count = orders.len(), "Merging orders");

        let mut tx = self.pool.begin().await?;

        for order in orders {
            let items_json = serde_json::to_string(&order.items)?;
            sqlx::query(
                r#"
                INSERT INTO orders
                    (id, customer_name, items_json, status, total_cents, chef_note, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    customer_name = excluded.customer_name,
                    items_json = excluded.items_json,
                    status = excluded.status,
                    total_cents = excluded.total_cents,
                    chef_note = excluded.chef_note,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&order.id)
            .bind(&order.customer_name)
            .bind(items_json)
            .bind(order.status)
            .bind(order.total_cents)
            .bind(&order.chef_note)
            .bind(order.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Counts all orders (diagnostics).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Maps a database row to an Order.
fn row_to_order(row: &SqliteRow) -> StoreResult<Order> {
    let items_json: String = row.try_get("items_json")?;
    let items: Vec<CartItem> = serde_json::from_str(&items_json)?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Order {
        id: row.try_get("id")?,
        customer_name: row.try_get("customer_name")?,
        items,
        status: row.try_get("status")?,
        created_at,
        total_cents: row.try_get("total_cents")?,
        chef_note: row.try_get("chef_note")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
