use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for homeowner claims (projects).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub String);

/// Identifier wrapper for contractor records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractorId(pub String);

/// Identifier wrapper for invitation records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchRequestId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EstimateId(pub String);

/// Account reference for homeowners and contractor logins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Damage category reported on a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peril {
    Water,
    Flood,
    Wind,
    Fire,
    Mold,
    Other,
}

impl Peril {
    pub const fn label(self) -> &'static str {
        match self {
            Peril::Water => "water",
            Peril::Flood => "flood",
            Peril::Wind => "wind",
            Peril::Fire => "fire",
            Peril::Mold => "mold",
            Peril::Other => "other",
        }
    }

    /// Trades able to remediate the peril, most specific first.
    pub const fn relevant_trades(self) -> &'static [Trade] {
        match self {
            Peril::Water => &[Trade::WaterMitigation, Trade::Mold, Trade::General],
            Peril::Flood => &[
                Trade::WaterMitigation,
                Trade::Mold,
                Trade::Rebuild,
                Trade::General,
            ],
            Peril::Wind => &[Trade::Roofing, Trade::Rebuild, Trade::General],
            Peril::Fire => &[Trade::Rebuild, Trade::SmokeRestoration, Trade::General],
            Peril::Mold => &[Trade::Mold, Trade::WaterMitigation, Trade::General],
            Peril::Other => &[Trade::General, Trade::Rebuild],
        }
    }
}

/// Capability tags a contractor can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trade {
    WaterMitigation,
    Mold,
    Rebuild,
    Roofing,
    SmokeRestoration,
    General,
}

impl Trade {
    pub const fn label(self) -> &'static str {
        match self {
            Trade::WaterMitigation => "water_mitigation",
            Trade::Mold => "mold",
            Trade::Rebuild => "rebuild",
            Trade::Roofing => "roofing",
            Trade::SmokeRestoration => "smoke_restoration",
            Trade::General => "general",
        }
    }
}

/// Fixed inspection windows offered to homeowners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    EarlyMorning,
    LateMorning,
    Afternoon,
    Evening,
}

impl TimeWindow {
    pub const fn label(self) -> &'static str {
        match self {
            TimeWindow::EarlyMorning => "8:00 AM - 10:00 AM",
            TimeWindow::LateMorning => "10:00 AM - 12:00 PM",
            TimeWindow::Afternoon => "12:00 PM - 4:00 PM",
            TimeWindow::Evening => "4:00 PM - 7:00 PM",
        }
    }
}

/// Lifecycle of a claim from intake to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Submitted,
    Matched,
    Scheduled,
    Onsite,
    Completed,
    Cancelled,
}

impl ClaimStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Matched => "matched",
            ClaimStatus::Scheduled => "scheduled",
            ClaimStatus::Onsite => "onsite",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Cancelled => "cancelled",
        }
    }

    const fn stage(self) -> u8 {
        match self {
            ClaimStatus::Submitted => 0,
            ClaimStatus::Matched => 1,
            ClaimStatus::Scheduled => 2,
            ClaimStatus::Onsite => 3,
            ClaimStatus::Completed => 4,
            ClaimStatus::Cancelled => 5,
        }
    }

    /// Forward-only progression. Re-match resets bypass this check.
    pub fn can_advance_to(self, next: ClaimStatus) -> bool {
        match (self, next) {
            (ClaimStatus::Completed, _) | (ClaimStatus::Cancelled, _) => false,
            (_, ClaimStatus::Cancelled) => true,
            (current, next) => next.stage() > current.stage(),
        }
    }
}

/// Street address fields captured on the claim form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLocation {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl ClaimLocation {
    pub fn summary(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

/// Homeowner claim as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub owner_id: UserId,
    pub location: ClaimLocation,
    pub peril: Peril,
    pub description: String,
    pub incident_at: DateTime<Utc>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_window: Option<TimeWindow>,
    pub status: ClaimStatus,
    pub assigned_contractor_id: Option<ContractorId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityState {
    Active,
    Paused,
}

/// Contractor profile plus the signals scoring needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: ContractorId,
    pub user_id: Option<UserId>,
    pub company_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: String,
    /// State codes, city names, or postal codes. Empty means unrestricted.
    pub service_areas: Vec<String>,
    /// Empty means unrestricted.
    pub trades: Vec<Trade>,
    pub capacity: CapacityState,
    /// Count of open projects currently assigned to the contractor.
    #[serde(default)]
    pub open_projects: u32,
    pub created_at: DateTime<Utc>,
}

impl Contractor {
    pub fn is_active(&self) -> bool {
        self.capacity == CapacityState::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRequestStatus {
    Sent,
    Accepted,
    Declined,
    Expired,
}

impl MatchRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MatchRequestStatus::Sent => "sent",
            MatchRequestStatus::Accepted => "accepted",
            MatchRequestStatus::Declined => "declined",
            MatchRequestStatus::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, MatchRequestStatus::Sent)
    }
}

/// Invitation linking one claim to one candidate contractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub id: MatchRequestId,
    pub claim_id: ClaimId,
    pub contractor_id: ContractorId,
    pub status: MatchRequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Repair quote a contractor submits after accepting an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: EstimateId,
    pub claim_id: ClaimId,
    pub contractor_id: ContractorId,
    pub amount_cents: u64,
    pub scope: String,
    pub status: EstimateStatus,
    pub submitted_at: DateTime<Utc>,
}
