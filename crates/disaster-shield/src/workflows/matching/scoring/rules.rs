use super::super::domain::{Claim, Contractor};
use super::config::ScoringConfig;
use super::{FitLevel, ScoreComponent, ScoreSignal};

pub(crate) fn geographic_fit(
    claim: &Claim,
    contractor: &Contractor,
    config: &ScoringConfig,
) -> ScoreComponent {
    if contractor.service_areas.is_empty() {
        return ScoreComponent {
            signal: ScoreSignal::Geographic,
            fit: FitLevel::Unrestricted,
            score: config.geographic_unrestricted,
            notes: "no service areas on file; treated as unrestricted".to_string(),
        };
    }

    let location = &claim.location;
    let targets = [
        location.state.trim(),
        location.city.trim(),
        location.postal_code.trim(),
    ];

    let matched = contractor.service_areas.iter().find(|area| {
        let area = area.trim();
        !area.is_empty()
            && targets
                .iter()
                .any(|target| !target.is_empty() && area.eq_ignore_ascii_case(target))
    });

    match matched {
        Some(area) => ScoreComponent {
            signal: ScoreSignal::Geographic,
            fit: FitLevel::Match,
            score: config.geographic_match,
            notes: format!("serves {}", area.trim()),
        },
        None => ScoreComponent {
            signal: ScoreSignal::Geographic,
            fit: FitLevel::Mismatch,
            score: config.geographic_mismatch,
            notes: format!("no service area covers {}", location.summary()),
        },
    }
}

pub(crate) fn trade_fit(
    claim: &Claim,
    contractor: &Contractor,
    config: &ScoringConfig,
) -> ScoreComponent {
    if contractor.trades.is_empty() {
        return ScoreComponent {
            signal: ScoreSignal::Trade,
            fit: FitLevel::Unrestricted,
            score: config.trade_unrestricted,
            notes: "no trades on file; treated as unrestricted".to_string(),
        };
    }

    let matched = claim
        .peril
        .relevant_trades()
        .iter()
        .find(|trade| contractor.trades.contains(trade));

    match matched {
        Some(trade) => ScoreComponent {
            signal: ScoreSignal::Trade,
            fit: FitLevel::Match,
            score: config.trade_match,
            notes: format!("{} covers {} damage", trade.label(), claim.peril.label()),
        },
        None => ScoreComponent {
            signal: ScoreSignal::Trade,
            fit: FitLevel::Mismatch,
            score: config.trade_mismatch,
            notes: format!("no trade relevant to {} damage", claim.peril.label()),
        },
    }
}

pub(crate) fn workload_fit(contractor: &Contractor, config: &ScoringConfig) -> ScoreComponent {
    let penalty = contractor
        .open_projects
        .saturating_mul(u32::from(config.workload_penalty_per_project));
    let score = u32::from(config.workload_ceiling).saturating_sub(penalty) as u16;

    ScoreComponent {
        signal: ScoreSignal::Workload,
        fit: if contractor.open_projects == 0 {
            FitLevel::Match
        } else {
            FitLevel::Partial
        },
        score,
        notes: format!("{} open project(s)", contractor.open_projects),
    }
}
