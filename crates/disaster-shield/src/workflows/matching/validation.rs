use super::domain::{Claim, ClaimStatus};

/// Input errors that stop a claim before scoring begins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimValidationError {
    #[error("claim id is blank")]
    MissingClaimId,
    #[error("claim location is missing {field}")]
    IncompleteLocation { field: &'static str },
    #[error("state code '{0}' must be two letters")]
    InvalidStateCode(String),
    #[error("claim is {status} and cannot be matched")]
    NotMatchable { status: &'static str },
    #[error("claim already has an assigned contractor")]
    AlreadyAssigned,
}

/// Guard applied to claims entering the matching workflow.
#[derive(Debug, Clone, Default)]
pub struct ClaimGuard;

impl ClaimGuard {
    pub fn validate(&self, claim: &Claim) -> Result<(), ClaimValidationError> {
        if claim.id.0.trim().is_empty() {
            return Err(ClaimValidationError::MissingClaimId);
        }

        let location = &claim.location;
        for (field, value) in [
            ("street", &location.street),
            ("city", &location.city),
            ("state", &location.state),
            ("postal code", &location.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(ClaimValidationError::IncompleteLocation { field });
            }
        }

        let state = location.state.trim();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ClaimValidationError::InvalidStateCode(state.to_string()));
        }

        if matches!(
            claim.status,
            ClaimStatus::Scheduled
                | ClaimStatus::Onsite
                | ClaimStatus::Completed
                | ClaimStatus::Cancelled
        ) {
            return Err(ClaimValidationError::NotMatchable {
                status: claim.status.label(),
            });
        }

        if claim.assigned_contractor_id.is_some() {
            return Err(ClaimValidationError::AlreadyAssigned);
        }

        Ok(())
    }
}
