use std::cmp::Ordering;

use super::domain::Contractor;
use super::scoring::ScoredContractor;

pub const DEFAULT_INVITE_LIMIT: usize = 3;

/// Rank plausible contractors and keep the top `limit`.
///
/// Ordering is score descending, then earliest `created_at`, then id, so the
/// same pool always yields the same invitations.
pub fn select_top_contractors(scored: &[ScoredContractor], limit: usize) -> Vec<Contractor> {
    let mut ranked: Vec<&ScoredContractor> = scored
        .iter()
        .filter(|candidate| candidate.score > 0 && candidate.is_plausible())
        .collect();

    ranked.sort_by(|left, right| compare_ranked(left, right));

    ranked
        .into_iter()
        .take(limit)
        .map(|candidate| candidate.contractor.clone())
        .collect()
}

fn compare_ranked(left: &ScoredContractor, right: &ScoredContractor) -> Ordering {
    right
        .score
        .cmp(&left.score)
        .then_with(|| left.contractor.created_at.cmp(&right.contractor.created_at))
        .then_with(|| left.contractor.id.cmp(&right.contractor.id))
}
