mod config;
mod rules;

pub use config::ScoringConfig;

use super::domain::{Claim, Contractor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stateless scorer applying the weight configuration to a contractor pool.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every active contractor against the claim, preserving input order.
    pub fn score_contractors(
        &self,
        claim: &Claim,
        contractors: &[Contractor],
    ) -> Vec<ScoredContractor> {
        contractors
            .iter()
            .filter(|contractor| contractor.is_active())
            .map(|contractor| self.score(claim, contractor))
            .collect()
    }

    pub fn score(&self, claim: &Claim, contractor: &Contractor) -> ScoredContractor {
        let components = vec![
            rules::geographic_fit(claim, contractor, &self.config),
            rules::trade_fit(claim, contractor, &self.config),
            rules::workload_fit(contractor, &self.config),
        ];
        let score = components
            .iter()
            .fold(0u16, |total, component| total.saturating_add(component.score));

        debug!(
            claim_id = %claim.id.0,
            contractor_id = %contractor.id.0,
            score,
            "scored contractor"
        );

        ScoredContractor {
            contractor: contractor.clone(),
            score,
            components,
        }
    }
}

/// Which signal a component was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSignal {
    Geographic,
    Trade,
    Workload,
}

/// How well a single signal lined up with the claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitLevel {
    Match,
    /// Contractor left the field empty, which matches everything.
    Unrestricted,
    Partial,
    Mismatch,
}

/// Discrete contribution to a contractor's score, kept for audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub signal: ScoreSignal,
    pub fit: FitLevel,
    pub score: u16,
    pub notes: String,
}

/// Contractor annotated with its composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredContractor {
    pub contractor: Contractor,
    pub score: u16,
    pub components: Vec<ScoreComponent>,
}

impl ScoredContractor {
    pub fn fit(&self, signal: ScoreSignal) -> Option<FitLevel> {
        self.components
            .iter()
            .find(|component| component.signal == signal)
            .map(|component| component.fit)
    }

    /// A contractor is worth inviting only when its geography or trade fits,
    /// either by explicit match or by having no restriction at all.
    pub fn is_plausible(&self) -> bool {
        [ScoreSignal::Geographic, ScoreSignal::Trade]
            .into_iter()
            .filter_map(|signal| self.fit(signal))
            .any(|fit| matches!(fit, FitLevel::Match | FitLevel::Unrestricted))
    }
}
