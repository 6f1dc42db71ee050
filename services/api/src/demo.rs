use crate::infra::{sample_claim, seeded_repository, InMemoryNotificationOutbox};
use clap::Args;
use disaster_shield::error::AppError;
use disaster_shield::workflows::matching::{
    select_top_contractors, ContractorId, MatchingConfig, MatchingRepository, MatchingService,
    NotificationKind, Recipient, DEFAULT_INVITE_LIMIT,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of contractors to invite
    #[arg(long, default_value_t = DEFAULT_INVITE_LIMIT)]
    pub(crate) limit: usize,
    /// Stop after sending invitations instead of walking through decline and award
    #[arg(long)]
    pub(crate) invitations_only: bool,
}

fn link_token(url: &str) -> Option<&str> {
    url.split_once("token=").map(|(_, token)| token)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        limit,
        invitations_only,
    } = args;

    let repository = Arc::new(seeded_repository()?);
    let outbox = Arc::new(InMemoryNotificationOutbox::default());
    let config = MatchingConfig {
        invite_limit: limit,
        token_secret: "disaster-shield-demo".to_string(),
        ..MatchingConfig::default()
    };
    let service = MatchingService::new(repository.clone(), outbox.clone(), config);
    let claim = sample_claim();

    println!("DisasterShield matching demo");
    println!(
        "Claim {}: {} damage at {}",
        claim.id.0,
        claim.peril.label(),
        claim.location.summary()
    );

    let weights = service.scoring().config();
    println!(
        "Weights: geography {}/{}/{}, trade {}/{}/{}, workload {} less {} per open project",
        weights.geographic_match,
        weights.geographic_unrestricted,
        weights.geographic_mismatch,
        weights.trade_match,
        weights.trade_unrestricted,
        weights.trade_mismatch,
        weights.workload_ceiling,
        weights.workload_penalty_per_project
    );

    let pool = repository.active_contractors()?;
    let scored = service.scoring().score_contractors(&claim, &pool);
    let mut ranked: Vec<_> = scored.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    println!("\nScored pool ({} active contractors)", pool.len());
    for candidate in ranked {
        let breakdown: Vec<String> = candidate
            .components
            .iter()
            .map(|component| format!("{:?} {}", component.signal, component.score))
            .collect();
        println!(
            "- {:<28} {:>3} [{}]{}",
            candidate.contractor.company_name,
            candidate.score,
            breakdown.join(", "),
            if candidate.is_plausible() {
                ""
            } else {
                " (not plausible)"
            }
        );
    }

    let invite_limit = service.config().invite_limit;
    let selected = select_top_contractors(&scored, invite_limit);
    println!("\nSelected for invitation (limit {invite_limit})");
    for contractor in &selected {
        println!("- {} <{}>", contractor.company_name, contractor.email);
    }

    let summary = service.execute_complete_workflow(&claim);
    println!(
        "\nWorkflow: success={} matched={} created={} emails={}",
        summary.success,
        summary.matched_contractors,
        summary.invitations_created,
        summary.emails_sent
    );
    for error in &summary.errors {
        println!("  error: {error}");
    }

    if invitations_only || selected.len() < 2 {
        return Ok(());
    }

    let in_app = outbox
        .events()
        .into_iter()
        .filter(|notification| notification.kind == NotificationKind::InvitationInApp)
        .collect::<Vec<_>>();
    let links_for = |contractor_id: &ContractorId, key: &str| {
        in_app
            .iter()
            .find(|notification| {
                notification.metadata.get("contractor_id") == Some(&contractor_id.0)
            })
            .and_then(|notification| notification.metadata.get(key).cloned())
    };

    let decliner = &selected[selected.len() - 1];
    if let Some(url) = links_for(&decliner.id, "decline_url") {
        let outcome = service.decline_invitation(link_token(&url).unwrap_or_default());
        println!(
            "\n{} followed the decline link: {}",
            decliner.company_name,
            outcome.label()
        );
    }

    let winner = &selected[0];
    if let Some(url) = links_for(&winner.id, "accept_url") {
        let outcome = service.accept_invitation(link_token(&url).unwrap_or_default());
        println!(
            "{} followed the accept link: {}",
            winner.company_name,
            outcome.label()
        );
    }

    let estimate = service.submit_estimate(
        &claim.id,
        &winner.id,
        482_500,
        "Extract standing water, remove wet drywall to 2ft, dry and sanitize framing",
    )?;
    println!(
        "{} quoted ${}.{:02} ({})",
        winner.company_name,
        estimate.amount_cents / 100,
        estimate.amount_cents % 100,
        estimate.id.0
    );

    let outcome = service.accept_estimate(&estimate.id);
    println!("Homeowner accepted the estimate: {}", outcome.label());

    if let Some(url) = links_for(&selected[1].id, "accept_url") {
        let outcome = service.accept_invitation(link_token(&url).unwrap_or_default());
        println!(
            "{} followed the accept link afterwards: {}",
            selected[1].company_name,
            outcome.label()
        );
    }

    let requests = repository.match_requests(&claim.id)?;
    println!("\nFinal invitation states");
    for request in requests {
        println!("- {}: {}", request.contractor_id.0, request.status.label());
    }

    let owner_notices = outbox
        .events()
        .iter()
        .filter(|notification| notification.recipient == Recipient::User(claim.owner_id.clone()))
        .count();
    println!("Homeowner notifications: {owner_notices}");

    Ok(())
}
