//! Contractor matching and assignment for disaster-damage claims.
//!
//! A submitted claim is scored against the active contractor pool, the top
//! candidates receive signed accept/decline invitations, and the first estimate
//! the homeowner accepts settles the claim while foreclosing every other
//! invitation.

pub mod clock;
pub mod domain;
pub(crate) mod invitation;
pub mod memory;
pub mod repository;
pub mod responses;
pub mod router;
pub mod scoring;
pub mod selection;
pub mod service;
pub mod tokens;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock};
pub use domain::{
    CapacityState, Claim, ClaimId, ClaimLocation, ClaimStatus, Contractor, ContractorId,
    Estimate, EstimateId, EstimateStatus, MatchRequest, MatchRequestId, MatchRequestStatus, Peril,
    TimeWindow, Trade, UserId,
};
pub use invitation::InvitationLinks;
pub use memory::InMemoryMatchingRepository;
pub use repository::{
    AssignmentCommit, MatchingRepository, Notification, NotificationError, NotificationKind,
    NotificationSender, Recipient, RepositoryError,
};
pub use responses::ResponseOutcome;
pub use router::matching_router;
pub use scoring::{FitLevel, ScoreComponent, ScoreSignal, ScoredContractor, ScoringConfig, ScoringEngine};
pub use selection::{select_top_contractors, DEFAULT_INVITE_LIMIT};
pub use service::{MatchingConfig, MatchingService, MatchingServiceError};
pub use tokens::{HmacTokenService, TokenAction, TokenError, TokenPayload, TokenService};
pub use validation::{ClaimGuard, ClaimValidationError};
pub use workflow::{WorkflowSummary, NO_CONTRACTORS_FOUND, NO_QUALIFYING_CONTRACTORS};
