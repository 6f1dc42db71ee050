use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Claim, ClaimId, ClaimStatus, Contractor, ContractorId, Estimate, EstimateId, EstimateStatus,
    MatchRequest, MatchRequestId, MatchRequestStatus,
};
use super::repository::{AssignmentCommit, MatchingRepository, RepositoryError};

#[derive(Default)]
struct MemoryState {
    claims: HashMap<ClaimId, Claim>,
    contractors: Vec<Contractor>,
    match_requests: BTreeMap<MatchRequestId, MatchRequest>,
    estimates: BTreeMap<EstimateId, Estimate>,
    request_sequence: u64,
    estimate_sequence: u64,
}

impl MemoryState {
    fn open_projects(&self, contractor_id: &ContractorId) -> u32 {
        self.claims
            .values()
            .filter(|claim| claim.assigned_contractor_id.as_ref() == Some(contractor_id))
            .filter(|claim| {
                !matches!(
                    claim.status,
                    ClaimStatus::Completed | ClaimStatus::Cancelled
                )
            })
            .count() as u32
    }

    fn with_workload(&self, contractor: &Contractor) -> Contractor {
        let mut contractor = contractor.clone();
        contractor.open_projects = contractor
            .open_projects
            .saturating_add(self.open_projects(&contractor.id));
        contractor
    }

    fn request_for(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Option<&MatchRequest> {
        self.match_requests.values().find(|request| {
            &request.claim_id == claim_id && &request.contractor_id == contractor_id
        })
    }
}

/// Process-local store; every operation runs under one lock, so the
/// conditional writes are atomic with respect to each other.
#[derive(Default, Clone)]
pub struct InMemoryMatchingRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryMatchingRepository {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("repository mutex poisoned")
    }

    pub fn insert_claim(&self, claim: Claim) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state.claims.contains_key(&claim.id) {
            return Err(RepositoryError::Conflict);
        }
        state.claims.insert(claim.id.clone(), claim);
        Ok(())
    }

    pub fn insert_contractor(&self, contractor: Contractor) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state
            .contractors
            .iter()
            .any(|existing| existing.id == contractor.id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.contractors.push(contractor);
        Ok(())
    }

    /// Every estimate recorded for the claim, oldest first.
    pub fn estimates_for(&self, claim_id: &ClaimId) -> Vec<Estimate> {
        let state = self.lock();
        let mut estimates: Vec<Estimate> = state
            .estimates
            .values()
            .filter(|estimate| &estimate.claim_id == claim_id)
            .cloned()
            .collect();
        estimates.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        estimates
    }
}

impl MatchingRepository for InMemoryMatchingRepository {
    fn active_contractors(&self) -> Result<Vec<Contractor>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .contractors
            .iter()
            .filter(|contractor| contractor.is_active())
            .map(|contractor| state.with_workload(contractor))
            .collect())
    }

    fn fetch_contractor(&self, id: &ContractorId) -> Result<Option<Contractor>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .contractors
            .iter()
            .find(|contractor| &contractor.id == id)
            .map(|contractor| state.with_workload(contractor)))
    }

    fn fetch_claim(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        Ok(self.lock().claims.get(id).cloned())
    }

    fn update_claim_status(
        &self,
        id: &ClaimId,
        status: ClaimStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let claim = state.claims.get_mut(id).ok_or(RepositoryError::NotFound)?;
        claim.status = status;
        Ok(())
    }

    fn assign_contractor_if_unassigned(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.lock();
        let claim = state
            .claims
            .get_mut(claim_id)
            .ok_or(RepositoryError::NotFound)?;
        if claim.assigned_contractor_id.is_some() {
            return Ok(false);
        }
        claim.assigned_contractor_id = Some(contractor_id.clone());
        Ok(true)
    }

    fn create_match_request(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        created_at: DateTime<Utc>,
    ) -> Result<MatchRequest, RepositoryError> {
        let mut state = self.lock();
        if !state.claims.contains_key(claim_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.request_for(claim_id, contractor_id).is_some() {
            return Err(RepositoryError::Conflict);
        }

        state.request_sequence += 1;
        let request = MatchRequest {
            id: MatchRequestId(format!("mr-{:06}", state.request_sequence)),
            claim_id: claim_id.clone(),
            contractor_id: contractor_id.clone(),
            status: MatchRequestStatus::Sent,
            created_at,
            responded_at: None,
        };
        state
            .match_requests
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn update_match_request_status(
        &self,
        id: &MatchRequestId,
        status: MatchRequestStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let request = state
            .match_requests
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if request.status.is_terminal() {
            return Err(RepositoryError::Conflict);
        }
        request.status = status;
        request.responded_at = responded_at;
        Ok(())
    }

    fn match_requests(&self, claim_id: &ClaimId) -> Result<Vec<MatchRequest>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .match_requests
            .values()
            .filter(|request| &request.claim_id == claim_id)
            .cloned()
            .collect())
    }

    fn fetch_match_request_for(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        Ok(self.lock().request_for(claim_id, contractor_id).cloned())
    }

    fn reset_for_rematch(&self, claim_id: &ClaimId) -> Result<Option<usize>, RepositoryError> {
        let mut state = self.lock();
        let claim = state
            .claims
            .get_mut(claim_id)
            .ok_or(RepositoryError::NotFound)?;
        if claim.assigned_contractor_id.is_some() {
            return Ok(None);
        }
        claim.status = ClaimStatus::Submitted;

        let before = state.match_requests.len();
        state
            .match_requests
            .retain(|_, request| &request.claim_id != claim_id);
        let removed = before - state.match_requests.len();

        for estimate in state.estimates.values_mut() {
            if &estimate.claim_id == claim_id && estimate.status == EstimateStatus::Pending {
                estimate.status = EstimateStatus::Rejected;
            }
        }

        Ok(Some(removed))
    }

    fn create_estimate(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        amount_cents: u64,
        scope: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<Estimate, RepositoryError> {
        let mut state = self.lock();
        if !state.claims.contains_key(claim_id) {
            return Err(RepositoryError::NotFound);
        }

        state.estimate_sequence += 1;
        let estimate = Estimate {
            id: EstimateId(format!("est-{:06}", state.estimate_sequence)),
            claim_id: claim_id.clone(),
            contractor_id: contractor_id.clone(),
            amount_cents,
            scope: scope.to_string(),
            status: EstimateStatus::Pending,
            submitted_at,
        };
        state.estimates.insert(estimate.id.clone(), estimate.clone());
        Ok(estimate)
    }

    fn fetch_estimate(&self, id: &EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        Ok(self.lock().estimates.get(id).cloned())
    }

    fn commit_assignment(&self, commit: &AssignmentCommit) -> Result<bool, RepositoryError> {
        let mut state = self.lock();

        let claim = state
            .claims
            .get(&commit.claim_id)
            .ok_or(RepositoryError::NotFound)?;
        if claim.assigned_contractor_id.is_some() {
            return Ok(false);
        }

        let estimate = state
            .estimates
            .get(&commit.estimate_id)
            .ok_or(RepositoryError::NotFound)?;
        if estimate.claim_id != commit.claim_id || estimate.contractor_id != commit.contractor_id
        {
            return Err(RepositoryError::NotFound);
        }
        if estimate.status != EstimateStatus::Pending {
            return Err(RepositoryError::Conflict);
        }

        let winning_request = state
            .request_for(&commit.claim_id, &commit.contractor_id)
            .ok_or(RepositoryError::NotFound)?;
        if winning_request.status != MatchRequestStatus::Sent {
            return Err(RepositoryError::Conflict);
        }
        let winning_request = winning_request.id.clone();

        // Checks are done; nothing below can fail.
        for estimate in state.estimates.values_mut() {
            if estimate.claim_id != commit.claim_id {
                continue;
            }
            estimate.status = if estimate.id == commit.estimate_id {
                EstimateStatus::Accepted
            } else {
                EstimateStatus::Rejected
            };
        }

        if let Some(claim) = state.claims.get_mut(&commit.claim_id) {
            claim.assigned_contractor_id = Some(commit.contractor_id.clone());
        }

        for request in state.match_requests.values_mut() {
            if request.claim_id != commit.claim_id {
                continue;
            }
            if request.id == winning_request {
                request.status = MatchRequestStatus::Accepted;
                request.responded_at = Some(commit.decided_at);
            } else if request.status == MatchRequestStatus::Sent {
                request.status = MatchRequestStatus::Declined;
                request.responded_at = Some(commit.decided_at);
            }
        }

        Ok(true)
    }
}
