//! # Menu Repository
//!
//! Database operations for the kitchen's catalog.
//!
//! ## Seeding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   First-Access Seeding                                  │
//! │                                                                         │
//! │  menu().all()                                                          │
//! │       │                                                                 │
//! │       ├── meta['menu_seeded'] present? ──► just read                   │
//! │       │                                                                 │
//! │       └── absent ──► insert default catalog, set flag, then read       │
//! │                                                                         │
//! │  The flag (not emptiness) gates seeding, so an operator who deletes    │
//! │  every dish keeps an empty menu instead of getting the defaults back.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use bistro_core::{Category, MenuItem};

/// Key in the `meta` table recording that the default catalog was installed.
const SEEDED_KEY: &str = "menu_seeded";

/// The fixed default catalog installed on first access.
pub fn default_catalog() -> Vec<MenuItem> {
    vec![
        MenuItem {
            id: "1".into(),
            name: "Dad's Famous Burger".into(),
            description: "A juicy beef patty with secret sauce, caramelized onions, and cheddar cheese.".into(),
            price_cents: 1299,
            category: Category::Main,
            image_url: Some("https://picsum.photos/400/300?random=1".into()),
            is_generated: false,
        },
        MenuItem {
            id: "2".into(),
            name: "Mom's Mac & Cheese".into(),
            description: "Creamy, cheesy goodness baked with a crispy breadcrumb topping.".into(),
            price_cents: 850,
            category: Category::Starter,
            image_url: Some("https://picsum.photos/400/300?random=2".into()),
            is_generated: false,
        },
        MenuItem {
            id: "3".into(),
            name: "Magic Sparkle Water".into(),
            description: "Refreshing sparkling water with a hint of lemon and lime.".into(),
            price_cents: 200,
            category: Category::Drink,
            image_url: Some("https://picsum.photos/400/300?random=3".into()),
            is_generated: false,
        },
        MenuItem {
            id: "4".into(),
            name: "Super Sundae".into(),
            description: "Vanilla ice cream with chocolate syrup, sprinkles, and a cherry on top.".into(),
            price_cents: 500,
            category: Category::Dessert,
            image_url: Some("https://picsum.photos/400/300?random=4".into()),
            is_generated: false,
        },
    ]
}

/// Repository for menu database operations.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Returns the full menu in insertion order, seeding the default catalog
    /// on first access.
    pub async fn all(&self) -> StoreResult<Vec<MenuItem>> {
        self.seed_if_first_access().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, image_url, is_generated
            FROM menu_items
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    /// Inserts or replaces a menu item by id. Replacement is whole-value:
    /// there are no partial field updates.
    pub async fn upsert(&self, item: &MenuItem) -> StoreResult<()> {
        debug!(id = %item.id, name = %item.name, "Upserting menu item");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO menu_items (id, name, description, price_cents, category, image_url, is_generated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                price_cents = excluded.price_cents,
                category = excluded.category,
                image_url = excluded.image_url,
                is_generated = excluded.is_generated
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price_cents)
        .bind(item.category)
        .bind(&item.image_url)
        .bind(item.is_generated)
        .execute(&mut *tx)
        .await?;

        // Any explicit write counts as seeded state.
        mark_seeded(&mut tx).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Deletes a menu item by id.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        debug!(id = %id, "Deleting menu item");

        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("menu item", id));
        }

        Ok(())
    }

    /// Replaces the whole collection in one transaction. This is the
    /// application path for a replicated full-menu snapshot.
    pub async fn replace_all(&self, items: &[MenuItem]) -> StoreResult<()> {
        debug!(count = items.len(), "Replacing menu");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM menu_items").execute(&mut *tx).await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO menu_items (id, name, description, price_cents, category, image_url, is_generated)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.price_cents)
            .bind(item.category)
            .bind(&item.image_url)
            .bind(item.is_generated)
            .execute(&mut *tx)
            .await?;
        }

        // A replicated menu is authoritative, even when empty.
        mark_seeded(&mut tx).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Merges items by id: an incoming item replaces the local item with the
    /// same id, everything else is kept. The import path.
    pub async fn merge(&self, items: &[MenuItem]) -> StoreResult<()> {
        debug!(count = items.len(), "Merging menu items");

        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO menu_items (id, name, description, price_cents, category, image_url, is_generated)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    price_cents = excluded.price_cents,
                    category = excluded.category,
                    image_url = excluded.image_url,
                    is_generated = excluded.is_generated
                "#,
            )
            .bind(&item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.price_cents)
            .bind(item.category)
            .bind(&item.image_url)
            .bind(item.is_generated)
            .execute(&mut *tx)
            .await?;
        }

        mark_seeded(&mut tx).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Counts menu items (diagnostics).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Installs the default catalog if the menu has never been written.
    async fn seed_if_first_access(&self) -> StoreResult<()> {
        let seeded: Option<String> =
            sqlx::query_scalar("SELECT value FROM meta WHERE key = ?1")
                .bind(SEEDED_KEY)
                .fetch_optional(&self.pool)
                .await?;

        if seeded.is_some() {
            return Ok(());
        }

        info!("Seeding default catalog on first menu access");

        let mut tx = self.pool.begin().await?;
        for item in default_catalog() {
            sqlx::query(
                r#"
                INSERT INTO menu_items (id, name, description, price_cents, category, image_url, is_generated)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.price_cents)
            .bind(item.category)
            .bind(&item.image_url)
            .bind(item.is_generated)
            .execute(&mut *tx)
            .await?;
        }
        mark_seeded(&mut tx).await?;
        tx.commit().await?;

        Ok(())
    }
}

/// Records the seeded flag inside an open transaction.
async fn mark_seeded(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> StoreResult<()> {
    sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES (?1, '1')")
        .bind(SEEDED_KEY)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Maps a database row to a MenuItem.
fn row_to_item(row: &SqliteRow) -> StoreResult<MenuItem> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price_cents: row.try_get("price_cents")?,
        category: row.try_get("category")?,
        image_url: row.try_get("image_url")?,
        is_generated: row.try_get("is_generated")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_access_seeds_default_catalog() {
        let db = db().await;
        let menu = db.menu().all().await.unwrap();

        assert_eq!(menu.len(), 4);
        assert_eq!(menu[0].name, "Dad's Famous Burger");
        assert_eq!(menu[0].price_cents, 1299);
    }

    #[tokio::test]
    async fn test_emptied_menu_stays_empty() {
        let db = db().await;
        let menu = db.menu().all().await.unwrap();

        for item in &menu {
            db.menu().delete(&item.id).await.unwrap();
        }

        // No re-seed: the flag, not emptiness, gates seeding.
        assert!(db.menu().all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let db = db().await;
        db.menu().all().await.unwrap();

        let mut burger = default_catalog().remove(0);
        burger.price_cents = 1399;
        db.menu().upsert(&burger).await.unwrap();

        let menu = db.menu().all().await.unwrap();
        assert_eq!(menu.len(), 4);
        assert_eq!(
            menu.iter().find(|i| i.id == "1").unwrap().price_cents,
            1399
        );
    }

    #[tokio::test]
    async fn test_replace_all_is_authoritative() {
        let db = db().await;
        db.menu().all().await.unwrap();

        db.menu().replace_all(&[]).await.unwrap();
        assert!(db.menu().all().await.unwrap().is_empty());

        let catalog = default_catalog();
        db.menu().replace_all(&catalog[..2]).await.unwrap();
        assert_eq!(db.menu().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_item_errors() {
        let db = db().await;
        db.menu().all().await.unwrap();

        let err = db.menu().delete("no-such-id").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
