//! In-process transaction → meeting registry.
//!
//! Each transaction id owns a slot guarded by its own async mutex. Holding a
//! slot's guard is the only way to read-then-write a record, so two requests
//! for the same transaction run their verify/create sequence one after the
//! other while requests for different transactions proceed in parallel.
//!
//! Contents live for the process lifetime only.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::record::{MeetingRecord, TransactionId};

type Slot = Arc<Mutex<Option<MeetingRecord>>>;
type Slots = Arc<DashMap<String, Slot>>;

#[derive(Default)]
pub struct MeetingRegistry {
    slots: Slots,
}

/// Exclusive access to one transaction's slot.
///
/// Dropping the guard releases the lock and removes the slot from the
/// registry when it is empty and nobody else holds or waits on it.
pub struct SlotGuard {
    key: String,
    slots: Slots,
    guard: OwnedMutexGuard<Option<MeetingRecord>>,
}

impl SlotGuard {
    pub fn record(&self) -> Option<&MeetingRecord> {
        self.guard.as_ref()
    }

    /// Replace whatever is cached with `record`.
    pub fn insert(&mut self, record: MeetingRecord) {
        *self.guard = Some(record);
    }

    pub fn evict(&mut self) -> Option<MeetingRecord> {
        self.guard.take()
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.guard.is_some() {
            return;
        }
        // The map and this guard each hold one reference; any other holder is
        // a waiter that will reuse the slot.
        let ours = OwnedMutexGuard::mutex(&self.guard);
        self.slots.remove_if(&self.key, |_, slot| {
            Arc::ptr_eq(slot, ours) && Arc::strong_count(slot) == 2
        });
    }
}

impl MeetingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the slot for `id`, creating an empty one if needed.
    pub async fn lock(&self, id: &TransactionId) -> SlotGuard {
        let slot = self
            .slots
            .entry(id.as_str().to_string())
            .or_default()
            .value()
            .clone();
        self.guard_for(id, slot).await
    }

    /// Lock the slot for `id` only if one exists. Never creates a slot.
    pub async fn lock_existing(&self, id: &TransactionId) -> Option<SlotGuard> {
        let slot = self.slots.get(id.as_str())?.value().clone();
        Some(self.guard_for(id, slot).await)
    }

    async fn guard_for(&self, id: &TransactionId, slot: Slot) -> SlotGuard {
        SlotGuard {
            key: id.as_str().to_string(),
            slots: self.slots.clone(),
            guard: slot.lock_owned().await,
        }
    }

    /// Snapshot of the cached record, without verification.
    pub async fn peek(&self, id: &TransactionId) -> Option<MeetingRecord> {
        let slot = self.slots.get(id.as_str())?.value().clone();
        let record = slot.lock().await.clone();
        record
    }

    /// Number of transactions with a slot (occupied or being worked on).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn tx(id: &str) -> TransactionId {
        TransactionId::parse(Some(id)).unwrap()
    }

    fn record(tx_id: &str, meeting_id: &str) -> MeetingRecord {
        MeetingRecord {
            meeting_id: meeting_id.into(),
            join_url: format!("https://x/{}", meeting_id),
            start_url: format!("https://x/s{}", meeting_id),
            topic: format!("Meeting for Transaction: {}", tx_id),
            transaction_id: tx_id.into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_replaces_record() {
        let registry = MeetingRegistry::new();

        let mut slot = registry.lock(&tx("T1")).await;
        slot.insert(record("T1", "1"));
        slot.insert(record("T1", "2"));
        drop(slot);

        assert_eq!(registry.peek(&tx("T1")).await.unwrap().meeting_id, "2");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_lock_existing_does_not_create() {
        let registry = MeetingRegistry::new();
        assert!(registry.lock_existing(&tx("nope")).await.is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_empty_slot_dropped_with_guard() {
        let registry = MeetingRegistry::new();

        let mut slot = registry.lock(&tx("T1")).await;
        slot.insert(record("T1", "1"));
        drop(slot);

        let mut slot = registry.lock_existing(&tx("T1")).await.unwrap();
        assert_eq!(slot.evict().unwrap().meeting_id, "1");
        drop(slot);

        assert!(registry.is_empty());
        assert!(registry.peek(&tx("T1")).await.is_none());
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let registry = Arc::new(MeetingRegistry::new());

        let first = registry.lock(&tx("T1")).await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let slot = registry.lock(&tx("T1")).await;
                slot.record().map(|r| r.meeting_id.clone())
            })
        };

        // The contender cannot observe the slot until the first guard goes away.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        let mut first = first;
        first.insert(record("T1", "42"));
        drop(first);

        assert_eq!(contender.await.unwrap().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_empty_slot_kept_while_someone_waits() {
        let registry = Arc::new(MeetingRegistry::new());

        let first = registry.lock(&tx("T1")).await;
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let mut slot = registry.lock(&tx("T1")).await;
                slot.insert(record("T1", "7"));
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The waiter holds the slot, so releasing an empty guard keeps it.
        drop(first);
        waiter.await.unwrap();

        assert_eq!(registry.peek(&tx("T1")).await.unwrap().meeting_id, "7");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_lock_holder_leaves_no_slot() {
        let registry = Arc::new(MeetingRegistry::new());

        let holder = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _slot = registry.lock(&tx("T1")).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.len(), 1);

        holder.abort();
        assert!(holder.await.unwrap_err().is_cancelled());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let registry = MeetingRegistry::new();
        let _a = registry.lock(&tx("A")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), registry.lock(&tx("B"))).await;
        assert!(b.is_ok());
    }
}
