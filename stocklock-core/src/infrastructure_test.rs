#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::client;
    use crate::clock::{Clock, ManualClock};
    use crate::error::{NodeError, StoreError};
    use crate::infrastructure::{CounterStore, LockNode};
    use crate::infrastructure_in_memory::{InMemoryCounterStore, InMemoryLockNode};
    use crate::types::Counter;

    fn node(clock: &Arc<ManualClock>) -> InMemoryLockNode {
        InMemoryLockNode::new("n0", Arc::clone(clock) as Arc<dyn Clock>)
    }

    // =========================================================================
    // In-memory lock node
    // =========================================================================

    #[test]
    fn set_only_if_absent() {
        let clock = Arc::new(ManualClock::new(1000));
        let node = node(&clock);

        assert!(node.try_set("r", "a", 5000).unwrap());
        assert!(!node.try_set("r", "b", 5000).unwrap());
        assert_eq!(node.holder("r").as_deref(), Some("a"));
    }

    #[test]
    fn expired_key_can_be_taken() {
        let clock = Arc::new(ManualClock::new(1000));
        let node = node(&clock);
        node.try_set("r", "a", 5000).unwrap();

        // Acquire at t=1000, ttl=5000 -> expires at 6000
        clock.set(5999);
        assert!(!node.try_set("r", "b", 5000).unwrap());
        clock.set(6000);
        assert!(node.try_set("r", "b", 5000).unwrap());
        assert_eq!(node.holder("r").as_deref(), Some("b"));
    }

    #[test]
    fn delete_requires_matching_token() {
        let clock = Arc::new(ManualClock::new(1000));
        let node = node(&clock);
        node.try_set("r", "a", 5000).unwrap();

        assert!(!node.try_delete("r", "b").unwrap());
        assert_eq!(node.holder("r").as_deref(), Some("a"));
        assert!(node.try_delete("r", "a").unwrap());
        assert_eq!(node.holder("r"), None);
        assert!(!node.try_delete("r", "a").unwrap());
    }

    #[test]
    fn delete_after_expiry_reports_nothing_deleted() {
        let clock = Arc::new(ManualClock::new(1000));
        let node = node(&clock);
        node.try_set("r", "a", 100).unwrap();
        clock.advance(100);

        assert!(!node.try_delete("r", "a").unwrap());
        assert_eq!(node.live_keys(), 0);
    }

    #[test]
    fn extend_requires_live_matching_token() {
        let clock = Arc::new(ManualClock::new(1000));
        let node = node(&clock);
        node.try_set("r", "a", 1000).unwrap();

        assert!(!node.try_extend("r", "b", 5000).unwrap());
        clock.advance(900);
        assert!(node.try_extend("r", "a", 5000).unwrap());
        clock.advance(4000);
        assert_eq!(node.holder("r").as_deref(), Some("a"));

        clock.advance(1000);
        assert!(!node.try_extend("r", "a", 5000).unwrap());
    }

    #[test]
    fn unavailable_node_errors_on_every_call() {
        let clock = Arc::new(ManualClock::new(1000));
        let node = node(&clock);
        node.set_available(false);

        assert_eq!(
            node.try_set("r", "a", 100).unwrap_err(),
            NodeError::Unreachable("n0".into())
        );
        assert!(node.try_delete("r", "a").is_err());
        assert!(node.try_extend("r", "a", 100).is_err());
        assert!(node.ping().is_err());

        node.set_available(true);
        assert!(node.ping().is_ok());
    }

    // =========================================================================
    // In-memory counter store
    // =========================================================================

    #[test]
    fn counter_store_assigns_ids_and_versions() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1000));
        let store = InMemoryCounterStore::new(clock);

        let a = store.insert(Counter::new(0, "a", 10, 1000)).unwrap();
        let b = store.insert(Counter::new(0, "b", 20, 1000)).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let mut loaded = store.load(1).unwrap();
        loaded.value = 9;
        let saved = store.save(&loaded).unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.load(1).unwrap().value, 9);
    }

    #[test]
    fn counter_store_rejects_stale_write() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1000));
        let store = InMemoryCounterStore::new(clock);
        store.insert(Counter::new(0, "a", 10, 1000)).unwrap();

        let first = store.load(1).unwrap();
        let second = store.load(1).unwrap();
        store.save(&first).unwrap();

        assert_eq!(
            store.save(&second).unwrap_err(),
            StoreError::StaleWrite { id: 1, expected: 0 }
        );
    }

    #[test]
    fn counter_store_missing_id() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1000));
        let store = InMemoryCounterStore::new(clock);
        assert_eq!(store.load(7).unwrap_err(), StoreError::NotFound(7));
        assert_eq!(
            store.save(&Counter::new(7, "x", 1, 0)).unwrap_err(),
            StoreError::NotFound(7)
        );
    }

    // =========================================================================
    // Backend specs
    // =========================================================================

    #[test]
    fn parses_memory_node_list() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let nodes = client::parse_nodes("memory, memory,memory", clock).unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["memory-0", "memory-1", "memory-2"]);
    }

    #[test]
    fn rejects_unknown_or_empty_node_specs() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        assert!(client::parse_nodes("", Arc::clone(&clock)).is_err());
        assert!(client::parse_nodes("memory,etcd://x", Arc::clone(&clock)).is_err());
        assert!(client::parse_storage("postgres://x", clock).is_err());
    }

    #[test]
    fn open_service_in_memory() {
        let service =
            client::open_service(crate::config::LockConfig::default(), "memory", "memory").unwrap();
        let product = service.reset_products().unwrap();
        assert_eq!(service.deduct(product.id, 1).unwrap().value, 99);
    }

    // =========================================================================
    // SQLite
    // =========================================================================

    #[cfg(feature = "sqlite")]
    mod sqlite {
        use std::sync::Arc;

        use crate::clock::{Clock, ManualClock};
        use crate::error::StoreError;
        use crate::infrastructure::{CounterStore, LockNode};
        use crate::infrastructure_sqlite::{SqliteCounterStore, SqliteLockNode};
        use crate::types::Counter;

        #[test]
        fn lock_node_primitives() {
            let clock = Arc::new(ManualClock::new(1000));
            let node = SqliteLockNode::open(":memory:", Arc::clone(&clock) as Arc<dyn Clock>).unwrap();

            assert!(node.try_set("r", "a", 5000).unwrap());
            assert!(!node.try_set("r", "b", 5000).unwrap());
            assert!(!node.try_delete("r", "b").unwrap());
            assert!(node.try_extend("r", "a", 5000).unwrap());
            assert!(node.try_delete("r", "a").unwrap());
            assert!(node.try_set("r", "b", 5000).unwrap());
            assert!(node.ping().is_ok());
        }

        #[test]
        fn lock_node_expiry() {
            let clock = Arc::new(ManualClock::new(1000));
            let node = SqliteLockNode::open(":memory:", Arc::clone(&clock) as Arc<dyn Clock>).unwrap();

            node.try_set("r", "a", 100).unwrap();
            clock.advance(100);
            assert!(!node.try_extend("r", "a", 100).unwrap());
            assert!(!node.try_delete("r", "a").unwrap());
            assert!(node.try_set("r", "b", 100).unwrap());
        }

        #[test]
        fn counter_store_round_trip() {
            let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1000));
            let store = SqliteCounterStore::open(":memory:", clock).unwrap();

            let product = store.insert(Counter::new(0, "Test Product", 100, 1000)).unwrap();
            assert_eq!(product.id, 1);

            let mut loaded = store.load(1).unwrap();
            loaded.value = 99;
            let saved = store.save(&loaded).unwrap();
            assert_eq!(saved.value, 99);
            assert_eq!(saved.version, 1);

            assert_eq!(
                store.save(&loaded).unwrap_err(),
                StoreError::StaleWrite { id: 1, expected: 0 }
            );

            store.clear().unwrap();
            assert!(store.list().unwrap().is_empty());
            assert_eq!(store.load(1).unwrap_err(), StoreError::NotFound(1));
            let again = store.insert(Counter::new(0, "Test Product", 100, 1000)).unwrap();
            assert_eq!(again.id, 1);
        }
    }
}
