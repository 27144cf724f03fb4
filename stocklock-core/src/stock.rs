//! Stock deduction guarded by the quorum lock.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{DeductError, StoreError};
use crate::guard::LockGuard;
use crate::infrastructure::CounterStore;
use crate::manager::DistributedLockManager;
use crate::types::Counter;

pub const DEFAULT_PRODUCT_NAME: &str = "Test Product";
pub const DEFAULT_PRODUCT_STOCK: u64 = 100;

pub struct StockService {
    locks: Arc<DistributedLockManager>,
    store: Box<dyn CounterStore>,
}

impl StockService {
    pub fn new(locks: Arc<DistributedLockManager>, store: Box<dyn CounterStore>) -> Self {
        Self { locks, store }
    }

    pub fn locks(&self) -> &DistributedLockManager {
        &self.locks
    }

    /// Remove `quantity` from the stock of product `id`.
    ///
    /// Only one call per `id` runs the load/check/save sequence at a time,
    /// across every process sharing the same lock nodes. Returns the
    /// counter as saved.
    pub fn deduct(&self, id: u64, quantity: u64) -> Result<Counter, DeductError> {
        if quantity == 0 {
            return Err(DeductError::InvalidQuantity);
        }

        let resource = Counter::resource_key(id);
        let mut guard = self
            .locks
            .lock(&resource)
            .map_err(DeductError::LockUnavailable)?;

        // The guard releases on every path out of here
        let outcome = self.deduct_locked(&mut guard, id, quantity);
        match &outcome {
            Ok(counter) => debug!(id, quantity, remaining = counter.value, "Stock deducted"),
            Err(err) => debug!(id, quantity, error = %err, "Stock deduction rejected"),
        }
        outcome
    }

    fn deduct_locked(
        &self,
        guard: &mut LockGuard<'_>,
        id: u64,
        quantity: u64,
    ) -> Result<Counter, DeductError> {
        let mut counter = self.store.load(id)?;

        if counter.value < quantity {
            return Err(DeductError::InsufficientStock {
                id,
                available: counter.value,
                requested: quantity,
            });
        }

        self.ensure_lease(guard)?;

        counter.value -= quantity;
        self.store.save(&counter).map_err(DeductError::from)
    }

    /// Writing after the lease ran out would be unprotected, so refuse.
    /// Extend first when the remaining window is below the threshold.
    fn ensure_lease(&self, guard: &mut LockGuard<'_>) -> Result<(), DeductError> {
        let resource = guard.lock().resource.clone();
        if !guard.is_valid() {
            warn!(resource = %resource, "Lease expired before write");
            return Err(DeductError::LeaseExpired(resource));
        }

        let threshold = self.locks.config().extension_threshold_ms;
        if guard.remaining_ms() < threshold {
            let ttl = guard.lock().ttl;
            if let Err(err) = guard.extend(ttl) {
                warn!(resource = %resource, error = %err, "Lease could not be extended before write");
                return Err(DeductError::LeaseExpired(resource));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: u64) -> Result<Counter, StoreError> {
        self.store.load(id)
    }

    pub fn list(&self) -> Result<Vec<Counter>, StoreError> {
        self.store.list()
    }

    /// Drop every product and recreate the default one.
    pub fn reset_products(&self) -> Result<Counter, StoreError> {
        self.store.clear()?;
        let now = self.locks.clock().now_ms();
        let product = self.store.insert(Counter::new(
            0,
            DEFAULT_PRODUCT_NAME,
            DEFAULT_PRODUCT_STOCK,
            now,
        ))?;
        info!(id = product.id, stock = product.value, "Products reset");
        Ok(product)
    }

    pub fn clear_products(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        info!("Products cleared");
        Ok(())
    }

    /// Add a product with the given stock.
    pub fn create_product(&self, name: &str, stock: u64) -> Result<Counter, StoreError> {
        let now = self.locks.clock().now_ms();
        self.store.insert(Counter::new(0, name, stock, now))
    }
}
