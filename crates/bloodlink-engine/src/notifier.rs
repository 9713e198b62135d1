use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use bloodlink_gateway::MessagingGateway;
use bloodlink_types::models::{BloodRequest, DonorId};

use crate::error::EngineError;
use crate::messages;
use crate::ranker::Candidate;
use crate::store::Store;

/// Sends offers to ranked donors, one at a time and in rank order.
#[derive(Clone)]
pub struct Notifier {
    store: Store,
    gateway: Arc<dyn MessagingGateway>,
    pacing: Duration,
}

impl Notifier {
    pub fn new(store: Store, gateway: Arc<dyn MessagingGateway>, pacing: Duration) -> Self {
        Self {
            store,
            gateway,
            pacing,
        }
    }

    /// Offer the request to each candidate. A donor who cannot be reached is
    /// logged and skipped. The donors reached are merged into the request's
    /// notified set, even when none were, and returned in rank order.
    pub async fn notify(
        &self,
        request: &BloodRequest,
        candidates: &[Candidate],
    ) -> Result<Vec<DonorId>, EngineError> {
        let mut notified = Vec::with_capacity(candidates.len());

        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let donor = &candidate.donor;
            let text = messages::offer(request, donor, candidate.tier);
            let actions = messages::offer_actions(request.id, donor.id);

            match self.gateway.send_message(donor.user, &text, &actions).await {
                Ok(_) => notified.push(donor.id),
                Err(e) => warn!(
                    "Failed to notify donor {} about request {}: {}",
                    donor.id, request.id, e
                ),
            }
        }

        let request_id = request.id;
        let merged = notified.clone();
        let added = self
            .store
            .call(move |db| db.merge_notified_donors(request_id, &merged))
            .await?;

        info!(
            "Request {}: notified {}/{} donors ({} new)",
            request.id,
            notified.len(),
            candidates.len(),
            added
        );
        Ok(notified)
    }
}
