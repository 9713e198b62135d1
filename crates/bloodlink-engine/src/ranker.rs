use tracing::{debug, info};

use bloodlink_types::models::{BloodRequest, Donor, RequestStatus};

use crate::compatibility::{compatible_recipient_types, donor_types_for};
use crate::error::EngineError;
use crate::location::LocationTier;
use crate::store::Store;

/// Active requests offered to a newly registered donor.
pub const RECENT_REQUEST_LIMIT: usize = 3;

/// A ranked donor together with the tier that placed them.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub donor: Donor,
    pub tier: LocationTier,
}

/// Order donors for a request: exact-location donors first, then same
/// division, then everyone else. Within a tier the input order is kept.
/// Restricted and incompatible donors are dropped.
pub fn rank_donors(request: &BloodRequest, donors: Vec<Donor>) -> Vec<Candidate> {
    let compatible = donor_types_for(&request.blood_group);

    let mut candidates: Vec<Candidate> = donors
        .into_iter()
        .filter(|d| !d.is_restricted && compatible.contains(&d.blood_type))
        .map(|donor| {
            let tier = LocationTier::classify(
                &donor.division,
                &donor.district,
                &request.division,
                &request.district,
            );
            debug!("Donor {} is a {:?} match for request {}", donor.id, tier, request.id);
            Candidate { donor, tier }
        })
        .collect();

    // sort_by_key is stable
    candidates.sort_by_key(|c| c.tier);
    candidates
}

/// Requests a donor can serve, nearest first: same district, then same
/// division. Requests elsewhere are not offered. Input order (newest first)
/// is kept within a tier.
pub fn matching_requests_for_donor(
    donor: &Donor,
    requests: Vec<BloodRequest>,
    limit: usize,
) -> Vec<(BloodRequest, LocationTier)> {
    if donor.is_restricted {
        return vec![];
    }
    let recipients = compatible_recipient_types(donor.blood_type);

    let mut matches: Vec<(BloodRequest, LocationTier)> = requests
        .into_iter()
        .filter(|r| r.status == RequestStatus::Active)
        .filter(|r| r.blood_type().is_some_and(|t| recipients.contains(&t)))
        .filter_map(|r| {
            let tier =
                LocationTier::classify(&donor.division, &donor.district, &r.division, &r.district);
            (tier != LocationTier::None).then_some((r, tier))
        })
        .collect();

    matches.sort_by_key(|(_, tier)| *tier);
    matches.truncate(limit);
    matches
}

/// Fetch compatible donors from the registry and rank them.
pub async fn rank_for_request(
    store: &Store,
    request: &BloodRequest,
) -> Result<Vec<Candidate>, EngineError> {
    let types = donor_types_for(&request.blood_group);
    if types.is_empty() {
        info!(
            "Request {} has blood group {:?} with no compatible donors",
            request.id, request.blood_group
        );
        return Ok(vec![]);
    }

    let donors = store.call(move |db| db.get_donors_by_blood_types(types)).await?;
    let ranked = rank_donors(request, donors);

    info!(
        "Request {}: {} candidates ({} exact, {} division)",
        request.id,
        ranked.len(),
        ranked.iter().filter(|c| c.tier == LocationTier::Exact).count(),
        ranked.iter().filter(|c| c.tier == LocationTier::Division).count(),
    );
    Ok(ranked)
}

/// Up to `limit` active requests the donor could serve.
pub async fn requests_for_donor(
    store: &Store,
    donor: &Donor,
    limit: usize,
) -> Result<Vec<(BloodRequest, LocationTier)>, EngineError> {
    let requests = store.call(|db| db.get_active_requests()).await?;
    Ok(matching_requests_for_donor(donor, requests, limit))
}
