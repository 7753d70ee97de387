//! # Portable Snapshots
//!
//! Manual export/import of the whole store as a compact "sync code" the
//! family can paste between devices when no peer connection is available.
//!
//! ## Format
//! ```text
//! {menu: [...], orders: [...]}  --serde_json-->  bytes  --base64-->  code
//! ```
//! The code is opaque to callers; the only promise is that `export` and
//! `import` agree with each other.
//!
//! ## Fail-Closed Import
//! The entire code is decoded and parsed before anything is written. A
//! malformed code yields [`StoreError::ImportDecode`] and the store is left
//! exactly as it was.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::pool::Database;
use bistro_core::{MenuItem, Order};

// =============================================================================
// Snapshot Payload
// =============================================================================

/// The portable state payload: both collections, whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub menu: Vec<MenuItem>,
    pub orders: Vec<Order>,
}

impl StateSnapshot {
    /// Encodes the snapshot as a portable code.
    pub fn encode(&self) -> StoreResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(BASE64.encode(json))
    }

    /// Decodes a portable code. Any failure — bad base64, bad JSON, wrong
    /// shape — is reported as `ImportDecode`.
    pub fn decode(code: &str) -> StoreResult<StateSnapshot> {
        let bytes = BASE64
            .decode(code.trim())
            .map_err(|e| StoreError::ImportDecode(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| StoreError::ImportDecode(e.to_string()))
    }
}

// =============================================================================
// Database Surface
// =============================================================================

impl Database {
    /// Serializes the current menu and orders into a portable code.
    pub async fn export_snapshot(&self) -> StoreResult<String> {
        let snapshot = StateSnapshot {
            menu: self.menu().all().await?,
            orders: self.orders().all().await?,
        };

        info!(
            menu_items = snapshot.menu.len(),
            orders = snapshot.orders.len(),
            "Exporting snapshot"
        );

        snapshot.encode()
    }

    /// Merges a portable code into the current state.
    ///
    /// Merge is by id on both collections: an imported value unconditionally
    /// replaces the local value with the same id (last-import-wins — there is
    /// deliberately no freshness or version check), everything else is kept.
    /// Orders come back newest-first on the next read regardless of the order
    /// they arrived in.
    pub async fn import_snapshot(&self, code: &str) -> StoreResult<()> {
        // Decode everything before touching the store.
        let snapshot = StateSnapshot::decode(code)?;

        info!(
            menu_items = snapshot.menu.len(),
            orders = snapshot.orders.len(),
            "Importing snapshot"
        );

        self.menu().merge(&snapshot.menu).await?;
        self.orders().merge(&snapshot.orders).await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use bistro_core::{CartItem, Category, OrderStatus};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn order(customer: &str) -> Order {
        let item = MenuItem::new("9", "Super Sundae", "Ice cream", 500, Category::Dessert);
        Order::new(customer, vec![CartItem::from_menu_item(&item)])
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let source = db().await;
        source.menu().all().await.unwrap(); // seed
        let o = order("Maya");
        source.orders().append(&o).await.unwrap();
        source.orders().set_status(&o.id, OrderStatus::Preparing).await.unwrap();

        let code = source.export_snapshot().await.unwrap();

        let target = db().await;
        target.menu().all().await.unwrap(); // seed the fresh store too
        target.import_snapshot(&code).await.unwrap();

        let menu = target.menu().all().await.unwrap();
        let orders = target.orders().all().await.unwrap();
        assert_eq!(menu, source.menu().all().await.unwrap());
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, o.id);
        assert_eq!(orders[0].status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_import_fails_closed_on_garbage() {
        let db = db().await;
        db.menu().all().await.unwrap();
        db.orders().append(&order("Maya")).await.unwrap();

        let menu_before = db.menu().all().await.unwrap();
        let orders_before = db.orders().all().await.unwrap();

        for bad in ["not base64 at all!!", "aGVsbG8=", ""] {
            let err = db.import_snapshot(bad).await.unwrap_err();
            assert!(matches!(err, StoreError::ImportDecode(_)), "code: {bad}");
        }

        assert_eq!(db.menu().all().await.unwrap(), menu_before);
        assert_eq!(db.orders().all().await.unwrap(), orders_before);
    }

    #[tokio::test]
    async fn test_import_merges_by_id() {
        let db = db().await;
        db.menu().all().await.unwrap();

        let kept = order("Kept Local");
        db.orders().append(&kept).await.unwrap();

        let incoming = order("From Other Device");
        let code = StateSnapshot {
            menu: vec![],
            orders: vec![incoming.clone()],
        }
        .encode()
        .unwrap();

        db.import_snapshot(&code).await.unwrap();

        let orders = db.orders().all().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().any(|o| o.id == kept.id));
        assert!(orders.iter().any(|o| o.id == incoming.id));
        // Empty imported menu merges nothing away.
        assert_eq!(db.menu().count().await.unwrap(), 4);
    }
}
