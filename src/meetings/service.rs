use std::sync::Arc;

use super::record::{MeetingRecord, TransactionId};
use super::registry::{MeetingRegistry, SlotGuard};
use super::state::{self, Verdict};
use crate::errors::AppError;
use crate::middleware::metrics::{self, LookupOutcome};
use crate::zoom::MeetingProvider;

/// Get-or-create / get for transaction meetings, reconciling the local
/// registry against the provider on every read.
#[derive(Clone)]
pub struct MeetingService {
    registry: Arc<MeetingRegistry>,
    provider: Arc<dyn MeetingProvider>,
}

impl MeetingService {
    pub fn new(registry: Arc<MeetingRegistry>, provider: Arc<dyn MeetingProvider>) -> Self {
        Self { registry, provider }
    }

    pub fn registry(&self) -> &MeetingRegistry {
        &self.registry
    }

    /// Return the live meeting for `transaction_id`, creating one when none is
    /// cached or the cached one was deleted at the provider.
    ///
    /// The locked verify/create sequence runs on its own task, so a caller
    /// that goes away mid-create still gets the new meeting recorded.
    pub async fn get_or_create(
        &self,
        transaction_id: Option<&str>,
    ) -> Result<MeetingRecord, AppError> {
        let id = TransactionId::parse(transaction_id)?;
        let this = self.clone();

        tokio::spawn(async move { this.ensure(id).await })
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("meeting task failed: {}", e)))?
    }

    /// Return the live cached meeting for `transaction_id`. Never creates.
    pub async fn get(&self, transaction_id: Option<&str>) -> Result<MeetingRecord, AppError> {
        let id = TransactionId::parse(transaction_id)?;

        let Some(mut slot) = self.registry.lock_existing(&id).await else {
            metrics::record_lookup(LookupOutcome::Miss);
            return Err(AppError::NotFound("Meeting not found".to_string()));
        };

        match self.reconcile(&mut slot).await? {
            Some(record) => Ok(record),
            None => Err(AppError::NotFound("Meeting no longer exists".to_string())),
        }
    }

    async fn ensure(&self, id: TransactionId) -> Result<MeetingRecord, AppError> {
        let mut slot = self.registry.lock(&id).await;

        match self.reconcile(&mut slot).await? {
            Some(record) => Ok(record),
            None => self.create(&id, &mut slot).await,
        }
    }

    /// Verify a cached record against the provider. `Ok(None)` means the slot
    /// is (now) empty; ambiguous failures leave the slot untouched.
    async fn reconcile(&self, slot: &mut SlotGuard) -> Result<Option<MeetingRecord>, AppError> {
        let Some(cached) = slot.record().cloned() else {
            metrics::record_lookup(LookupOutcome::Miss);
            return Ok(None);
        };

        let remote = self.provider.get_meeting(&cached.meeting_id).await;
        match state::verify(cached, remote) {
            Ok(Verdict::Verified(record)) => {
                metrics::record_lookup(LookupOutcome::Hit);
                tracing::debug!(
                    transaction_id = %slot.key(),
                    meeting_id = %record.meeting_id,
                    "cached meeting verified"
                );
                Ok(Some(record))
            }
            Ok(Verdict::Stale(record)) => {
                metrics::record_lookup(LookupOutcome::Stale);
                tracing::info!(
                    transaction_id = %slot.key(),
                    meeting_id = %record.meeting_id,
                    "cached meeting gone at provider, evicting"
                );
                slot.evict();
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = %slot.key(),
                    "meeting verification failed, keeping cached record: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn create(
        &self,
        id: &TransactionId,
        slot: &mut SlotGuard,
    ) -> Result<MeetingRecord, AppError> {
        let meeting = self.provider.create_meeting(&id.meeting_topic()).await?;
        let record = MeetingRecord::from_resource(id, meeting);

        slot.insert(record.clone());
        metrics::record_meeting_created();
        tracing::info!(
            transaction_id = %id,
            meeting_id = %record.meeting_id,
            "meeting created"
        );
        Ok(record)
    }
}
