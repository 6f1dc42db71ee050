use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Claim, ClaimId, ClaimStatus, Contractor, ContractorId, Estimate, EstimateId, MatchRequest,
    MatchRequestId, MatchRequestStatus, UserId,
};

/// Storage abstraction over claims, contractors, match requests, and estimates.
///
/// Implementations must make `create_match_request` fail with
/// [`RepositoryError::Conflict`] for a duplicate claim/contractor pair, and must
/// apply `assign_contractor_if_unassigned`, `commit_assignment`, and
/// `reset_for_rematch` as single conditional operations so concurrent callers
/// cannot both win.
pub trait MatchingRepository: Send + Sync {
    fn active_contractors(&self) -> Result<Vec<Contractor>, RepositoryError>;
    fn fetch_contractor(&self, id: &ContractorId) -> Result<Option<Contractor>, RepositoryError>;

    fn fetch_claim(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError>;
    fn update_claim_status(&self, id: &ClaimId, status: ClaimStatus)
        -> Result<(), RepositoryError>;
    /// Set the assignee only if none is set yet; returns whether this call won.
    fn assign_contractor_if_unassigned(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Result<bool, RepositoryError>;

    fn create_match_request(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        created_at: DateTime<Utc>,
    ) -> Result<MatchRequest, RepositoryError>;
    fn update_match_request_status(
        &self,
        id: &MatchRequestId,
        status: MatchRequestStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
    fn match_requests(&self, claim_id: &ClaimId) -> Result<Vec<MatchRequest>, RepositoryError>;
    fn fetch_match_request_for(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Result<Option<MatchRequest>, RepositoryError>;
    /// Clear the claim for another invitation round in one conditional step:
    /// delete its match requests, reject its pending estimates, and reset it
    /// to `submitted`. Returns `None` without touching anything when the claim
    /// already has an assignee, otherwise the number of requests removed.
    fn reset_for_rematch(&self, claim_id: &ClaimId) -> Result<Option<usize>, RepositoryError>;

    /// Store a pending estimate under a repository-assigned id.
    fn create_estimate(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        amount_cents: u64,
        scope: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<Estimate, RepositoryError>;
    fn fetch_estimate(&self, id: &EstimateId) -> Result<Option<Estimate>, RepositoryError>;

    /// Apply the five-part assignment all-or-nothing: accept the estimate,
    /// reject its siblings, assign the claim, accept the winning match request,
    /// and decline the others. Returns `false` without touching anything when
    /// the claim already has an assignee.
    fn commit_assignment(&self, commit: &AssignmentCommit) -> Result<bool, RepositoryError>;
}

/// Everything `commit_assignment` needs to settle a claim in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentCommit {
    pub claim_id: ClaimId,
    pub contractor_id: ContractorId,
    pub estimate_id: EstimateId,
    pub decided_at: DateTime<Utc>,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound email and in-app notification hook.
pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvitationEmail,
    InvitationInApp,
    InvitationDeclined,
    EstimateSubmitted,
    EstimateAccepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "address", rename_all = "snake_case")]
pub enum Recipient {
    Email(String),
    User(UserId),
}

/// Structured message handed to the notification transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}
