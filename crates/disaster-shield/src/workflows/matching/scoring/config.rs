use serde::{Deserialize, Serialize};

/// Point weights for each scoring signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub geographic_match: u16,
    pub geographic_unrestricted: u16,
    pub geographic_mismatch: u16,
    pub trade_match: u16,
    pub trade_unrestricted: u16,
    pub trade_mismatch: u16,
    pub workload_ceiling: u16,
    pub workload_penalty_per_project: u16,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            geographic_match: 40,
            geographic_unrestricted: 20,
            geographic_mismatch: 5,
            trade_match: 40,
            trade_unrestricted: 20,
            trade_mismatch: 0,
            workload_ceiling: 20,
            workload_penalty_per_project: 4,
        }
    }
}
