//! Contractor responses to invitations and the homeowner's final pick.
//!
//! Match requests move `sent -> accepted | declined | expired` and never leave
//! a terminal state. Opening an accept link only clears the contractor to quote;
//! the claim is assigned when the homeowner accepts an estimate, and that step
//! goes through `MatchingRepository::commit_assignment` as one conditional write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    ClaimId, ContractorId, Estimate, EstimateId, EstimateStatus, MatchRequest,
    MatchRequestStatus,
};
use super::invitation::{decline_notice, estimate_accepted_notice, estimate_submitted_notice};
use super::repository::{
    AssignmentCommit, MatchingRepository, NotificationSender, RepositoryError,
};
use super::service::{MatchingService, MatchingServiceError};
use super::tokens::{TokenAction, TokenPayload};

/// Closed set of results surfaced to whoever followed a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    Success,
    Declined,
    Expired,
    AlreadyFilled,
    Error,
}

impl ResponseOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            ResponseOutcome::Success => "success",
            ResponseOutcome::Declined => "declined",
            ResponseOutcome::Expired => "expired",
            ResponseOutcome::AlreadyFilled => "already_filled",
            ResponseOutcome::Error => "error",
        }
    }
}

fn terminal_outcome(status: MatchRequestStatus, action: TokenAction) -> Option<ResponseOutcome> {
    match (status, action) {
        (MatchRequestStatus::Sent, _) => None,
        (MatchRequestStatus::Accepted, TokenAction::Accept) => Some(ResponseOutcome::Success),
        (MatchRequestStatus::Accepted, TokenAction::Decline) => {
            Some(ResponseOutcome::AlreadyFilled)
        }
        (MatchRequestStatus::Declined, _) => Some(ResponseOutcome::Declined),
        (MatchRequestStatus::Expired, _) => Some(ResponseOutcome::Expired),
    }
}

impl<R, N> MatchingService<R, N>
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    /// Handle a visit to a signed accept link.
    pub fn accept_invitation(&self, token: &str) -> ResponseOutcome {
        let now = self.clock.now();
        let Some(payload) = self.verify_link(token, TokenAction::Accept, now) else {
            return ResponseOutcome::Expired;
        };

        let request = match self.open_request(&payload) {
            Ok(Some(request)) => request,
            Ok(None) => return ResponseOutcome::Expired,
            Err(err) => {
                warn!(claim_id = %payload.claim_id.0, error = %err, "accept lookup failed");
                return ResponseOutcome::Error;
            }
        };

        let claim = match self.repository.fetch_claim(&payload.claim_id) {
            Ok(Some(claim)) => claim,
            Ok(None) => return ResponseOutcome::Expired,
            Err(err) => {
                warn!(claim_id = %payload.claim_id.0, error = %err, "accept lookup failed");
                return ResponseOutcome::Error;
            }
        };

        // Losing contractors hear that the job went elsewhere, even though the
        // assignment also declined their request.
        match &claim.assigned_contractor_id {
            Some(winner) if winner == &payload.contractor_id => {
                return terminal_outcome(request.status, TokenAction::Accept)
                    .unwrap_or(ResponseOutcome::Success);
            }
            Some(_) => {
                info!(
                    claim_id = %claim.id.0,
                    contractor_id = %payload.contractor_id.0,
                    "accept arrived after claim was filled"
                );
                return ResponseOutcome::AlreadyFilled;
            }
            None => {}
        }

        if let Some(outcome) = terminal_outcome(request.status, TokenAction::Accept) {
            return outcome;
        }
        if self.request_lapsed(&request, now) {
            return ResponseOutcome::Expired;
        }

        info!(
            claim_id = %claim.id.0,
            contractor_id = %payload.contractor_id.0,
            match_request_id = %request.id.0,
            "contractor accepted invitation; awaiting estimate"
        );
        ResponseOutcome::Success
    }

    /// Handle a visit to a signed decline link.
    pub fn decline_invitation(&self, token: &str) -> ResponseOutcome {
        let now = self.clock.now();
        let Some(payload) = self.verify_link(token, TokenAction::Decline, now) else {
            return ResponseOutcome::Expired;
        };

        let request = match self.open_request(&payload) {
            Ok(Some(request)) => request,
            Ok(None) => return ResponseOutcome::Expired,
            Err(err) => {
                warn!(claim_id = %payload.claim_id.0, error = %err, "decline lookup failed");
                return ResponseOutcome::Error;
            }
        };

        if let Some(outcome) = terminal_outcome(request.status, TokenAction::Decline) {
            return outcome;
        }
        if self.request_lapsed(&request, now) {
            return ResponseOutcome::Expired;
        }

        match self.repository.update_match_request_status(
            &request.id,
            MatchRequestStatus::Declined,
            Some(now),
        ) {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => {
                // Settled concurrently; report whatever it settled to.
                return match self.open_request(&payload) {
                    Ok(Some(current)) => terminal_outcome(current.status, TokenAction::Decline)
                        .unwrap_or(ResponseOutcome::Error),
                    _ => ResponseOutcome::Error,
                };
            }
            Err(err) => {
                warn!(match_request_id = %request.id.0, error = %err, "decline update failed");
                return ResponseOutcome::Error;
            }
        }

        info!(
            claim_id = %payload.claim_id.0,
            contractor_id = %payload.contractor_id.0,
            "contractor declined invitation"
        );
        self.notify_owner_of_decline(&payload.claim_id, &payload.contractor_id);
        ResponseOutcome::Declined
    }

    /// Record a quote from a contractor holding an open invitation.
    pub fn submit_estimate(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        amount_cents: u64,
        scope: &str,
    ) -> Result<Estimate, MatchingServiceError> {
        if amount_cents == 0 {
            return Err(MatchingServiceError::InvalidEstimate("amount must be positive"));
        }
        if scope.trim().is_empty() {
            return Err(MatchingServiceError::InvalidEstimate("scope of work is required"));
        }

        let claim = self
            .repository
            .fetch_claim(claim_id)?
            .ok_or(RepositoryError::NotFound)?;
        if claim.assigned_contractor_id.is_some() {
            return Err(MatchingServiceError::ClaimFilled);
        }

        let now = self.clock.now();
        let open = self
            .repository
            .fetch_match_request_for(claim_id, contractor_id)?
            .filter(|request| request.status == MatchRequestStatus::Sent)
            .filter(|request| !self.request_lapsed(request, now));
        if open.is_none() {
            return Err(MatchingServiceError::NoOpenInvitation(contractor_id.0.clone()));
        }

        let estimate = self.repository.create_estimate(
            claim_id,
            contractor_id,
            amount_cents,
            scope.trim(),
            now,
        )?;

        match self.repository.fetch_contractor(contractor_id) {
            Ok(Some(contractor)) => {
                let notice = estimate_submitted_notice(&claim, &contractor, &estimate);
                if let Err(err) = self.notifier.send(notice) {
                    warn!(estimate_id = %estimate.id.0, error = %err, "estimate notice failed");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(contractor_id = %contractor_id.0, error = %err, "contractor lookup failed"),
        }

        Ok(estimate)
    }

    /// Homeowner accepts one estimate; the first to commit wins the claim.
    pub fn accept_estimate(&self, estimate_id: &EstimateId) -> ResponseOutcome {
        let estimate = match self.repository.fetch_estimate(estimate_id) {
            Ok(Some(estimate)) => estimate,
            Ok(None) => {
                warn!(estimate_id = %estimate_id.0, "estimate not found");
                return ResponseOutcome::Error;
            }
            Err(err) => {
                warn!(estimate_id = %estimate_id.0, error = %err, "estimate lookup failed");
                return ResponseOutcome::Error;
            }
        };

        match estimate.status {
            EstimateStatus::Pending => {}
            EstimateStatus::Accepted => return ResponseOutcome::Success,
            EstimateStatus::Rejected => return self.rejected_estimate_outcome(&estimate),
        }

        let commit = AssignmentCommit {
            claim_id: estimate.claim_id.clone(),
            contractor_id: estimate.contractor_id.clone(),
            estimate_id: estimate.id.clone(),
            decided_at: self.clock.now(),
        };

        match self.repository.commit_assignment(&commit) {
            Ok(true) => {
                info!(
                    claim_id = %commit.claim_id.0,
                    contractor_id = %commit.contractor_id.0,
                    estimate_id = %commit.estimate_id.0,
                    "claim assigned"
                );
                self.notify_winner(&estimate);
                ResponseOutcome::Success
            }
            Ok(false) => {
                info!(
                    claim_id = %commit.claim_id.0,
                    estimate_id = %commit.estimate_id.0,
                    "estimate lost assignment race"
                );
                ResponseOutcome::AlreadyFilled
            }
            Err(err) => {
                warn!(
                    claim_id = %commit.claim_id.0,
                    estimate_id = %commit.estimate_id.0,
                    error = %err,
                    "assignment commit failed"
                );
                ResponseOutcome::Error
            }
        }
    }

    /// A rejected estimate lost to another contractor, or was superseded by a
    /// re-match while the claim stayed open.
    fn rejected_estimate_outcome(&self, estimate: &Estimate) -> ResponseOutcome {
        match self.repository.fetch_claim(&estimate.claim_id) {
            Ok(Some(claim)) if claim.assigned_contractor_id.is_some() => {
                ResponseOutcome::AlreadyFilled
            }
            Ok(_) => {
                info!(estimate_id = %estimate.id.0, "estimate superseded by a re-match");
                ResponseOutcome::Expired
            }
            Err(err) => {
                warn!(estimate_id = %estimate.id.0, error = %err, "claim lookup failed");
                ResponseOutcome::Error
            }
        }
    }

    fn verify_link(
        &self,
        token: &str,
        expected: TokenAction,
        now: DateTime<Utc>,
    ) -> Option<TokenPayload> {
        match self.tokens.verify(token, now) {
            Ok(payload) if payload.action == expected => Some(payload),
            Ok(payload) => {
                warn!(
                    claim_id = %payload.claim_id.0,
                    action = ?payload.action,
                    "token presented for the wrong action"
                );
                None
            }
            Err(err) => {
                warn!(error = %err, "invitation token rejected");
                None
            }
        }
    }

    fn open_request(
        &self,
        payload: &TokenPayload,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        self.repository
            .fetch_match_request_for(&payload.claim_id, &payload.contractor_id)
    }

    fn request_lapsed(&self, request: &MatchRequest, now: DateTime<Utc>) -> bool {
        request.status == MatchRequestStatus::Sent
            && now >= request.created_at + self.config.token_ttl()
    }

    fn notify_owner_of_decline(&self, claim_id: &ClaimId, contractor_id: &ContractorId) {
        let claim = self.repository.fetch_claim(claim_id);
        let contractor = self.repository.fetch_contractor(contractor_id);
        let (Ok(Some(claim)), Ok(Some(contractor))) = (claim, contractor) else {
            warn!(claim_id = %claim_id.0, "skipping decline notice; records unavailable");
            return;
        };

        if let Err(err) = self.notifier.send(decline_notice(&claim, &contractor)) {
            warn!(claim_id = %claim_id.0, error = %err, "decline notice failed");
        }
    }

    fn notify_winner(&self, estimate: &Estimate) {
        let claim = self.repository.fetch_claim(&estimate.claim_id);
        let contractor = self.repository.fetch_contractor(&estimate.contractor_id);
        let (Ok(Some(claim)), Ok(Some(contractor))) = (claim, contractor) else {
            warn!(estimate_id = %estimate.id.0, "skipping award notice; records unavailable");
            return;
        };

        if let Err(err) = self
            .notifier
            .send(estimate_accepted_notice(&claim, &contractor, estimate))
        {
            warn!(estimate_id = %estimate.id.0, error = %err, "award notice failed");
        }
    }
}
