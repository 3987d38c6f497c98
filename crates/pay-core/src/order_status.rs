//! # Order Status Ports
//!
//! The order entity lives outside this crate. Settlement talks to it through
//! two ports:
//!
//! - [`OrderStatusUpdater`]: persists the settled status (upsert by order id)
//! - [`OrderLookup`]: optional read side used to cross-check a callback's
//!   amount against the stored order
//!
//! [`InMemoryOrderStore`] implements both for tests and the demo server.

use crate::error::PaymentResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Success => "SUCCESS",
            OrderStatus::Failed => "FAILED",
        }
    }

    /// Whether a gateway has already reported a final result
    pub fn is_final(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the storefront knows about an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Amount due in minor units
    pub amount: u64,
    pub status: OrderStatus,
}

/// Persists payment status on the order.
///
/// Implementations must be idempotent per order id: gateways deliver
/// callbacks at least once and every delivery reaches this method. The
/// updater owns the final-state rule: once an order is `SUCCESS` or
/// `FAILED`, a later delivery must not move it to another status.
#[async_trait]
pub trait OrderStatusUpdater: Send + Sync {
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> PaymentResult<()>;
}

/// Reads the stored order for a callback's transaction ref
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn find_order(&self, order_id: &str) -> PaymentResult<Option<OrderSnapshot>>;
}

#[derive(Debug, Clone)]
struct OrderRecord {
    amount: Option<u64>,
    status: OrderStatus,
    updates: u32,
}

/// A thread-safe in-memory order store.
///
/// Uses `Arc<RwLock<HashMap<..>>>` so clones share the same orders.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, OrderRecord>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new order awaiting payment.
    ///
    /// Returns `false` and leaves the stored order untouched when the id is
    /// already known.
    pub async fn register(&self, order_id: impl Into<String>, amount: u64) -> bool {
        let mut orders = self.orders.write().await;
        match orders.entry(order_id.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(OrderRecord {
                    amount: Some(amount),
                    status: OrderStatus::Pending,
                    updates: 0,
                });
                true
            }
        }
    }

    /// Current status of an order
    pub async fn status(&self, order_id: &str) -> Option<OrderStatus> {
        let orders = self.orders.read().await;
        orders.get(order_id).map(|o| o.status)
    }

    /// Number of status updates delivered for an order
    pub async fn update_count(&self, order_id: &str) -> u32 {
        let orders = self.orders.read().await;
        orders.get(order_id).map(|o| o.updates).unwrap_or(0)
    }
}

#[async_trait]
impl OrderStatusUpdater for InMemoryOrderStore {
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> PaymentResult<()> {
        let mut orders = self.orders.write().await;
        let record = orders
            .entry(order_id.to_string())
            .or_insert_with(|| OrderRecord {
                amount: None,
                status: OrderStatus::Pending,
                updates: 0,
            });
        record.updates += 1;
        if record.status.is_final() && record.status != status {
            warn!(
                "Order {} is already {}; ignoring {}",
                order_id, record.status, status
            );
            return Ok(());
        }
        record.status = status;
        Ok(())
    }
}

#[async_trait]
impl OrderLookup for InMemoryOrderStore {
    async fn find_order(&self, order_id: &str) -> PaymentResult<Option<OrderSnapshot>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).and_then(|o| {
            o.amount.map(|amount| OrderSnapshot {
                amount,
                status: o.status,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_find() {
        let store = InMemoryOrderStore::new();
        store.register("ord-1", 100_000).await;

        let snapshot = store.find_order("ord-1").await.unwrap().unwrap();
        assert_eq!(snapshot.amount, 100_000);
        assert_eq!(snapshot.status, OrderStatus::Pending);
        assert!(store.find_order("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_is_upsert() {
        let store = InMemoryOrderStore::new();
        store.register("ord-1", 500).await;

        store.update_status("ord-1", OrderStatus::Success).await.unwrap();
        store.update_status("ord-1", OrderStatus::Success).await.unwrap();

        assert_eq!(store.status("ord-1").await, Some(OrderStatus::Success));
        assert_eq!(store.update_count("ord-1").await, 2);

        // Unknown ids are created, but have no amount to look up
        store.update_status("ord-2", OrderStatus::Failed).await.unwrap();
        assert_eq!(store.status("ord-2").await, Some(OrderStatus::Failed));
        assert!(store.find_order("ord-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_keeps_existing_order() {
        let store = InMemoryOrderStore::new();
        assert!(store.register("1", 100_000).await);
        store.update_status("1", OrderStatus::Success).await.unwrap();

        assert!(!store.register("1", 1).await);

        let snapshot = store.find_order("1").await.unwrap().unwrap();
        assert_eq!(snapshot.amount, 100_000);
        assert_eq!(snapshot.status, OrderStatus::Success);
    }

    #[tokio::test]
    async fn test_final_status_is_not_overwritten() {
        let store = InMemoryOrderStore::new();
        store.register("ord-1", 500).await;

        store.update_status("ord-1", OrderStatus::Success).await.unwrap();
        store.update_status("ord-1", OrderStatus::Failed).await.unwrap();
        store.update_status("ord-1", OrderStatus::Pending).await.unwrap();
        assert_eq!(store.status("ord-1").await, Some(OrderStatus::Success));
        assert_eq!(store.update_count("ord-1").await, 3);

        store.register("ord-2", 500).await;
        store.update_status("ord-2", OrderStatus::Pending).await.unwrap();
        store.update_status("ord-2", OrderStatus::Failed).await.unwrap();
        assert_eq!(store.status("ord-2").await, Some(OrderStatus::Failed));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(OrderStatus::Success.to_string(), "SUCCESS");
        assert!(OrderStatus::Failed.is_final());
        assert!(!OrderStatus::Pending.is_final());
    }
}
