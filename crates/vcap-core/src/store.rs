//! Owned holder of the current snapshot.
//!
//! Readers always observe either the previous complete snapshot or the new
//! complete snapshot. A failed refresh leaves the current snapshot in place.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::aggregate::CapabilityAggregator;
use crate::refresh::{refresh, RefreshError, RefreshReport};
use crate::snapshot::CapabilitySnapshot;
use crate::source::DocumentSource;

/// A published snapshot together with its publish sequence number.
#[derive(Debug)]
pub struct Published {
    /// 1 for the first snapshot, incremented on every publish.
    pub generation: u64,
    pub snapshot: Arc<CapabilitySnapshot>,
}

/// Swap-on-refresh snapshot cell.
///
/// The generation travels in the same cell as the snapshot, so a reader
/// never pairs a new snapshot with a stale generation.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<Published>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if one has been published.
    pub fn load(&self) -> Option<Arc<CapabilitySnapshot>> {
        self.current
            .load()
            .as_ref()
            .map(|published| Arc::clone(&published.snapshot))
    }

    /// Current snapshot and its generation, read together.
    pub fn load_published(&self) -> Option<Arc<Published>> {
        self.current.load_full()
    }

    /// Number of snapshots published so far.
    pub fn generation(&self) -> u64 {
        self.current
            .load()
            .as_ref()
            .map_or(0, |published| published.generation)
    }

    /// Replace the current snapshot wholesale.
    pub fn publish(&self, snapshot: CapabilitySnapshot) -> Arc<CapabilitySnapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = self.current.rcu(|current| {
            let generation = current.as_ref().map_or(0, |p| p.generation) + 1;
            Some(Arc::new(Published {
                generation,
                snapshot: Arc::clone(&snapshot),
            }))
        });
        let generation = previous.as_ref().map_or(0, |p| p.generation) + 1;
        debug!(generation, fingerprint = %snapshot.fingerprint(), "published snapshot");
        snapshot
    }

    /// Refresh from `source` and publish on success.
    pub fn refresh_from<S>(
        &self,
        source: &S,
        aggregator: &CapabilityAggregator,
    ) -> Result<RefreshReport, RefreshError>
    where
        S: DocumentSource + ?Sized,
    {
        match refresh(source, aggregator) {
            Ok(report) => {
                self.publish(report.snapshot.clone());
                Ok(report)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    has_previous = self.current.load().is_some(),
                    "refresh failed, keeping current snapshot"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;

    const CAPS: &str = "<domainCapabilities><cpu><mode name='custom'>\
<model usable='yes'>Haswell</model></mode></cpu></domainCapabilities>";

    fn good_source() -> StaticSource {
        StaticSource::new(CAPS)
            .with_feature("Haswell", "<cpu><feature policy='require' name='vmx'/></cpu>")
    }

    #[test]
    fn test_empty_store() {
        let store = SnapshotStore::new();
        assert!(store.load().is_none());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let store = SnapshotStore::new();
        let first = store.publish(CapabilitySnapshot::empty());
        let reader = store.load().unwrap();

        store
            .refresh_from(&good_source(), &CapabilityAggregator::default())
            .unwrap();

        // The reader keeps its complete old view.
        assert!(reader.is_empty());
        assert!(Arc::ptr_eq(&first, &reader));
        assert!(store.load().unwrap().model("Haswell").is_some());
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_previous() {
        let store = SnapshotStore::new();
        store
            .refresh_from(&good_source(), &CapabilityAggregator::default())
            .unwrap();
        let before = store.load().unwrap();

        let broken = StaticSource::new("<domainCapabilities>");
        assert!(store
            .refresh_from(&broken, &CapabilityAggregator::default())
            .is_err());

        let after = store.load().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_generation_travels_with_snapshot() {
        let store = SnapshotStore::new();
        assert!(store.load_published().is_none());

        store.publish(CapabilitySnapshot::empty());
        let first = store.load_published().unwrap();
        assert_eq!(first.generation, 1);
        assert!(first.snapshot.is_empty());

        store
            .refresh_from(&good_source(), &CapabilityAggregator::default())
            .unwrap();
        let second = store.load_published().unwrap();
        assert_eq!(second.generation, 2);
        assert!(second.snapshot.model("Haswell").is_some());
        assert!(Arc::ptr_eq(&second.snapshot, &store.load().unwrap()));

        // The earlier pair is untouched by the later publish.
        assert_eq!(first.generation, 1);
        assert!(first.snapshot.is_empty());
    }

    #[test]
    fn test_concurrent_publishers_get_distinct_generations() {
        let store = Arc::new(SnapshotStore::new());

        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.publish(CapabilitySnapshot::empty());
                        let published = store.load_published().unwrap();
                        assert!(published.generation >= 1 && published.generation <= 100);
                    }
                })
            })
            .collect();
        for publisher in publishers {
            publisher.join().unwrap();
        }

        assert_eq!(store.generation(), 100);
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(SnapshotStore::new());
        store.publish(CapabilitySnapshot::empty());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let snapshot = store.load().unwrap();
                        // Either the empty snapshot or the full one, never a mix.
                        assert!(
                            snapshot.is_empty() || snapshot.supported_features().len() == 1
                        );
                    }
                })
            })
            .collect();

        store
            .refresh_from(&good_source(), &CapabilityAggregator::default())
            .unwrap();

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
