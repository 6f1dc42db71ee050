use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Claim, ClaimId, ClaimStatus, Contractor, MatchRequest};
use super::invitation::{invitation_email, invitation_in_app, InvitationLinks};
use super::repository::{MatchingRepository, NotificationSender, RepositoryError};
use super::selection::select_top_contractors;
use super::service::MatchingService;
use super::tokens::{TokenAction, TokenError, TokenPayload};

pub const NO_CONTRACTORS_FOUND: &str = "no contractors found";
pub const NO_QUALIFYING_CONTRACTORS: &str = "no qualifying contractors for claim";

/// Result of one invitation round. Failures are collected, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub success: bool,
    /// Selected contractors that hold a match request for the claim.
    pub matched_contractors: usize,
    /// Match requests created by this run; existing pairs are skipped.
    pub invitations_created: usize,
    pub emails_sent: usize,
    pub errors: Vec<String>,
}

impl WorkflowSummary {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            ..Self::default()
        }
    }
}

impl<R, N> MatchingService<R, N>
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    /// Score the active pool, invite the top candidates, and mark the claim matched.
    pub fn execute_complete_workflow(&self, claim: &Claim) -> WorkflowSummary {
        if let Err(err) = self.guard.validate(claim) {
            warn!(claim_id = %claim.id.0, error = %err, "claim rejected before matching");
            return WorkflowSummary::failed(format!("invalid claim: {err}"));
        }

        let contractors = match self.repository.active_contractors() {
            Ok(contractors) => contractors,
            Err(err) => {
                warn!(claim_id = %claim.id.0, error = %err, "unable to load contractors");
                return WorkflowSummary::failed(format!("failed to load contractors: {err}"));
            }
        };

        if contractors.is_empty() {
            info!(claim_id = %claim.id.0, "no active contractors available");
            return WorkflowSummary::failed(NO_CONTRACTORS_FOUND);
        }

        let scored = self.scoring.score_contractors(claim, &contractors);
        let selected = select_top_contractors(&scored, self.config.invite_limit);
        if selected.is_empty() {
            info!(
                claim_id = %claim.id.0,
                pool = contractors.len(),
                "no contractor fits the claim"
            );
            return WorkflowSummary::failed(NO_QUALIFYING_CONTRACTORS);
        }

        let now = self.clock.now();
        let mut summary = WorkflowSummary::default();

        for contractor in &selected {
            let request = match self
                .repository
                .create_match_request(&claim.id, &contractor.id, now)
            {
                Ok(request) => request,
                Err(RepositoryError::Conflict) => {
                    summary.matched_contractors += 1;
                    continue;
                }
                Err(err) => {
                    warn!(
                        claim_id = %claim.id.0,
                        contractor_id = %contractor.id.0,
                        error = %err,
                        "failed to create match request"
                    );
                    summary.errors.push(format!(
                        "failed to create match request for {}: {err}",
                        contractor.id.0
                    ));
                    continue;
                }
            };

            summary.matched_contractors += 1;
            summary.invitations_created += 1;
            self.dispatch_invitation(claim, contractor, &request, now, &mut summary);
        }

        if summary.matched_contractors > 0 && claim.status.can_advance_to(ClaimStatus::Matched) {
            if let Err(err) = self
                .repository
                .update_claim_status(&claim.id, ClaimStatus::Matched)
            {
                warn!(claim_id = %claim.id.0, error = %err, "failed to mark claim matched");
                summary
                    .errors
                    .push(format!("failed to update claim status: {err}"));
            }
        }

        summary.success = summary.matched_contractors > 0;
        info!(
            claim_id = %claim.id.0,
            matched = summary.matched_contractors,
            created = summary.invitations_created,
            emails = summary.emails_sent,
            errors = summary.errors.len(),
            "matching workflow finished"
        );
        summary
    }

    /// Drop every invitation and pending estimate for an unassigned claim, reset
    /// it to submitted, and match again.
    pub fn rematch(&self, claim_id: &ClaimId) -> WorkflowSummary {
        let removed = match self.repository.reset_for_rematch(claim_id) {
            Ok(Some(removed)) => removed,
            Ok(None) => return WorkflowSummary::failed("claim already has an assigned contractor"),
            Err(RepositoryError::NotFound) => {
                return WorkflowSummary::failed(format!("claim {} not found", claim_id.0))
            }
            Err(err) => return WorkflowSummary::failed(format!("failed to reset claim: {err}")),
        };
        info!(claim_id = %claim_id.0, removed, "cleared prior invitations");

        // Work from the reset row, not a copy read before the reset.
        let claim = match self.repository.fetch_claim(claim_id) {
            Ok(Some(claim)) => claim,
            Ok(None) => return WorkflowSummary::failed(format!("claim {} not found", claim_id.0)),
            Err(err) => return WorkflowSummary::failed(format!("failed to load claim: {err}")),
        };

        self.execute_complete_workflow(&claim)
    }

    fn dispatch_invitation(
        &self,
        claim: &Claim,
        contractor: &Contractor,
        request: &MatchRequest,
        issued_at: DateTime<Utc>,
        summary: &mut WorkflowSummary,
    ) {
        let links = match self.invitation_links(claim, contractor, issued_at) {
            Ok(links) => links,
            Err(err) => {
                warn!(
                    match_request_id = %request.id.0,
                    error = %err,
                    "unable to sign invitation links"
                );
                summary.errors.push(format!(
                    "failed to sign invitation for {}: {err}",
                    contractor.id.0
                ));
                return;
            }
        };

        let email = invitation_email(claim, contractor, &links, self.config.token_ttl_hours);
        match self.notifier.send(email) {
            Ok(()) => summary.emails_sent += 1,
            Err(err) => {
                warn!(
                    match_request_id = %request.id.0,
                    contractor_id = %contractor.id.0,
                    error = %err,
                    "invitation email failed"
                );
                summary
                    .errors
                    .push(format!("failed to email {}: {err}", contractor.id.0));
            }
        }

        if let Some(user_id) = &contractor.user_id {
            let notice = invitation_in_app(claim, contractor, user_id, &links);
            if let Err(err) = self.notifier.send(notice) {
                warn!(
                    match_request_id = %request.id.0,
                    contractor_id = %contractor.id.0,
                    error = %err,
                    "in-app invitation failed"
                );
                summary
                    .errors
                    .push(format!("failed to notify {} in-app: {err}", contractor.id.0));
            }
        }
    }

    fn invitation_links(
        &self,
        claim: &Claim,
        contractor: &Contractor,
        issued_at: DateTime<Utc>,
    ) -> Result<InvitationLinks, TokenError> {
        let ttl = self.config.token_ttl();
        let accept = self.tokens.issue(&TokenPayload::new(
            claim.id.clone(),
            contractor.id.clone(),
            TokenAction::Accept,
            issued_at,
            ttl,
        ))?;
        let decline = self.tokens.issue(&TokenPayload::new(
            claim.id.clone(),
            contractor.id.clone(),
            TokenAction::Decline,
            issued_at,
            ttl,
        ))?;

        Ok(InvitationLinks::new(
            &self.config.public_base_url,
            &accept,
            &decline,
        ))
    }
}
