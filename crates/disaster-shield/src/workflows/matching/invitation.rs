use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::domain::{Claim, Contractor, Estimate, UserId};
use super::repository::{Notification, NotificationKind, Recipient};

/// Accept/decline URLs carried by one invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationLinks {
    pub accept_url: String,
    pub decline_url: String,
}

impl InvitationLinks {
    pub fn new(base_url: &str, accept_token: &str, decline_token: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            accept_url: format!("{base}/api/v1/invitations/accept?token={accept_token}"),
            decline_url: format!("{base}/api/v1/invitations/decline?token={decline_token}"),
        }
    }
}

fn claim_metadata(claim: &Claim) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("claim_id".to_string(), claim.id.0.clone());
    metadata.insert("peril".to_string(), claim.peril.label().to_string());
    metadata
}

fn claim_summary(claim: &Claim) -> String {
    let mut summary = String::new();
    let location = &claim.location;
    let _ = writeln!(summary, "Damage type: {}", claim.peril.label());
    let _ = writeln!(
        summary,
        "Location: {}, {}, {} {}",
        location.street, location.city, location.state, location.postal_code
    );
    let _ = writeln!(
        summary,
        "Incident date: {}",
        claim.incident_at.format("%Y-%m-%d")
    );
    if let Some(date) = claim.preferred_date {
        let window = claim
            .preferred_window
            .map(|window| format!(" ({})", window.label()))
            .unwrap_or_default();
        let _ = writeln!(summary, "Preferred inspection: {date}{window}");
    }
    if !claim.description.trim().is_empty() {
        let _ = writeln!(summary, "Description: {}", claim.description.trim());
    }
    summary
}

pub(crate) fn invitation_subject(claim: &Claim) -> String {
    format!(
        "New {} damage claim in {}",
        claim.peril.label(),
        claim.location.summary()
    )
}

pub(crate) fn invitation_email(
    claim: &Claim,
    contractor: &Contractor,
    links: &InvitationLinks,
    ttl_hours: i64,
) -> Notification {
    let mut body = String::new();
    let _ = writeln!(body, "Hello {},", contractor.contact_name);
    let _ = writeln!(
        body,
        "\nA homeowner needs help with a claim that matches your service profile.\n"
    );
    body.push_str(&claim_summary(claim));
    let _ = writeln!(body, "\nAccept this job: {}", links.accept_url);
    let _ = writeln!(body, "Decline this job: {}", links.decline_url);
    let _ = writeln!(
        body,
        "\nThese links expire in {ttl_hours} hours. The first contractor to be confirmed gets the job."
    );

    let mut metadata = claim_metadata(claim);
    metadata.insert("contractor_id".to_string(), contractor.id.0.clone());

    Notification {
        kind: NotificationKind::InvitationEmail,
        recipient: Recipient::Email(contractor.email.clone()),
        subject: invitation_subject(claim),
        body,
        metadata,
    }
}

pub(crate) fn invitation_in_app(
    claim: &Claim,
    contractor: &Contractor,
    user_id: &UserId,
    links: &InvitationLinks,
) -> Notification {
    let mut metadata = claim_metadata(claim);
    metadata.insert("contractor_id".to_string(), contractor.id.0.clone());
    metadata.insert("accept_url".to_string(), links.accept_url.clone());
    metadata.insert("decline_url".to_string(), links.decline_url.clone());

    Notification {
        kind: NotificationKind::InvitationInApp,
        recipient: Recipient::User(user_id.clone()),
        subject: invitation_subject(claim),
        body: format!(
            "You have been invited to a {} claim in {}.",
            claim.peril.label(),
            claim.location.summary()
        ),
        metadata,
    }
}

pub(crate) fn decline_notice(claim: &Claim, contractor: &Contractor) -> Notification {
    let mut metadata = claim_metadata(claim);
    metadata.insert("contractor_id".to_string(), contractor.id.0.clone());

    Notification {
        kind: NotificationKind::InvitationDeclined,
        recipient: Recipient::User(claim.owner_id.clone()),
        subject: "A contractor declined your claim".to_string(),
        body: format!(
            "{} is unable to take your {} claim. Other invited contractors can still respond.",
            contractor.company_name,
            claim.peril.label()
        ),
        metadata,
    }
}

pub(crate) fn estimate_submitted_notice(
    claim: &Claim,
    contractor: &Contractor,
    estimate: &Estimate,
) -> Notification {
    let mut metadata = claim_metadata(claim);
    metadata.insert("estimate_id".to_string(), estimate.id.0.clone());

    Notification {
        kind: NotificationKind::EstimateSubmitted,
        recipient: Recipient::User(claim.owner_id.clone()),
        subject: format!("New estimate from {}", contractor.company_name),
        body: format!(
            "{} quoted {} for: {}",
            contractor.company_name,
            format_cents(estimate.amount_cents),
            estimate.scope.trim()
        ),
        metadata,
    }
}

pub(crate) fn estimate_accepted_notice(
    claim: &Claim,
    contractor: &Contractor,
    estimate: &Estimate,
) -> Notification {
    let mut metadata = claim_metadata(claim);
    metadata.insert("estimate_id".to_string(), estimate.id.0.clone());

    Notification {
        kind: NotificationKind::EstimateAccepted,
        recipient: Recipient::Email(contractor.email.clone()),
        subject: format!("Your estimate for {} was accepted", claim.location.summary()),
        body: format!(
            "The homeowner accepted your {} estimate. The job is now assigned to {}.",
            format_cents(estimate.amount_cents),
            contractor.company_name
        ),
        metadata,
    }
}

fn format_cents(amount_cents: u64) -> String {
    format!("${}.{:02}", amount_cents / 100, amount_cents % 100)
}
