use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::matching::clock::Clock;
use crate::workflows::matching::domain::{
    CapacityState, Claim, ClaimId, ClaimLocation, ClaimStatus, Contractor, ContractorId, Estimate,
    EstimateId, MatchRequest, MatchRequestId, MatchRequestStatus, Peril, TimeWindow, Trade,
    UserId,
};
use crate::workflows::matching::memory::InMemoryMatchingRepository;
use crate::workflows::matching::repository::{
    AssignmentCommit, MatchingRepository, Notification, NotificationError, NotificationKind,
    NotificationSender, RepositoryError,
};
use crate::workflows::matching::service::{MatchingConfig, MatchingService};
use crate::workflows::matching::tokens::{
    HmacTokenService, TokenAction, TokenPayload, TokenService,
};

pub(super) const TEST_SECRET: &str = "unit-test-secret";

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn claim(id: &str, city: &str, state: &str, postal_code: &str, peril: Peril) -> Claim {
    Claim {
        id: ClaimId(id.to_string()),
        owner_id: UserId(format!("owner-{id}")),
        location: ClaimLocation {
            street: "100 Bayshore Blvd".to_string(),
            city: city.to_string(),
            state: state.to_string(),
            postal_code: postal_code.to_string(),
        },
        peril,
        description: "Burst pipe flooded the kitchen".to_string(),
        incident_at: at(1, 8),
        preferred_date: NaiveDate::from_ymd_opt(2025, 9, 4),
        preferred_window: Some(TimeWindow::LateMorning),
        status: ClaimStatus::Submitted,
        assigned_contractor_id: None,
    }
}

pub(super) fn tampa_water_claim() -> Claim {
    claim("claim-tampa", "Tampa", "FL", "33606", Peril::Water)
}

pub(super) fn contractor(id: &str, areas: &[&str], trades: &[Trade], created_day: u32) -> Contractor {
    Contractor {
        id: ContractorId(id.to_string()),
        user_id: Some(UserId(format!("user-{id}"))),
        company_name: format!("{id} Restoration"),
        contact_name: format!("{id} Owner"),
        phone: "555-0100".to_string(),
        email: format!("{id}@contractors.test"),
        service_areas: areas.iter().map(|area| area.to_string()).collect(),
        trades: trades.to_vec(),
        capacity: CapacityState::Active,
        open_projects: 0,
        created_at: at(created_day, 0),
    }
}

pub(super) fn paused(mut contractor: Contractor) -> Contractor {
    contractor.capacity = CapacityState::Paused;
    contractor
}

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig {
        invite_limit: 3,
        token_ttl_hours: 48,
        token_secret: TEST_SECRET.to_string(),
        public_base_url: "https://app.test".to_string(),
    }
}

pub(super) struct SettableClock {
    now: Mutex<DateTime<Utc>>,
}

impl SettableClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for SettableClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter(|notification| notification.kind == kind)
            .collect()
    }
}

impl NotificationSender for RecordingNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Rejects every email to one address and delivers everything else.
pub(super) struct FlakyNotifier {
    pub(super) failing_email: String,
    pub(super) inner: RecordingNotifier,
}

impl NotificationSender for FlakyNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        if let crate::workflows::matching::repository::Recipient::Email(address) =
            &notification.recipient
        {
            if address == &self.failing_email {
                return Err(NotificationError::Transport("smtp timeout".to_string()));
            }
        }
        self.inner.send(notification)
    }
}

pub(super) struct Harness<N> {
    pub(super) service: MatchingService<InMemoryMatchingRepository, N>,
    pub(super) repository: Arc<InMemoryMatchingRepository>,
    pub(super) notifier: Arc<N>,
    pub(super) clock: Arc<SettableClock>,
}

pub(super) fn harness_with<N>(notifier: N, contractors: Vec<Contractor>, claims: Vec<Claim>) -> Harness<N>
where
    N: NotificationSender + 'static,
{
    let repository = Arc::new(InMemoryMatchingRepository::default());
    for contractor in contractors {
        repository
            .insert_contractor(contractor)
            .expect("seed contractor");
    }
    for claim in claims {
        repository.insert_claim(claim).expect("seed claim");
    }

    let notifier = Arc::new(notifier);
    let clock = Arc::new(SettableClock::new(at(2, 9)));
    let service = MatchingService::with_dependencies(
        repository.clone(),
        notifier.clone(),
        Arc::new(HmacTokenService::new(TEST_SECRET)),
        clock.clone(),
        matching_config(),
    );

    Harness {
        service,
        repository,
        notifier,
        clock,
    }
}

pub(super) fn harness(contractors: Vec<Contractor>, claims: Vec<Claim>) -> Harness<RecordingNotifier> {
    harness_with(RecordingNotifier::default(), contractors, claims)
}

pub(super) fn token(
    claim_id: &ClaimId,
    contractor_id: &str,
    action: TokenAction,
    issued_at: DateTime<Utc>,
) -> String {
    HmacTokenService::new(TEST_SECRET)
        .issue(&TokenPayload::new(
            claim_id.clone(),
            ContractorId(contractor_id.to_string()),
            action,
            issued_at,
            Duration::hours(48),
        ))
        .expect("token issues")
}

/// Pull the token out of the link line that starts with `prefix` in an email body.
pub(super) fn token_from_email(notification: &Notification, prefix: &str) -> String {
    notification
        .body
        .lines()
        .find_map(|line| line.strip_prefix(prefix))
        .and_then(|url| url.split_once("token="))
        .map(|(_, token)| token.trim().to_string())
        .expect("email carries link")
}

pub(super) fn request_status(
    repository: &InMemoryMatchingRepository,
    claim_id: &ClaimId,
    contractor_id: &str,
) -> MatchRequestStatus {
    repository
        .fetch_match_request_for(claim_id, &ContractorId(contractor_id.to_string()))
        .expect("lookup succeeds")
        .expect("request exists")
        .status
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl MatchingRepository for UnavailableRepository {
    fn active_contractors(&self) -> Result<Vec<Contractor>, RepositoryError> {
        offline()
    }

    fn fetch_contractor(&self, _id: &ContractorId) -> Result<Option<Contractor>, RepositoryError> {
        offline()
    }

    fn fetch_claim(&self, _id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        offline()
    }

    fn update_claim_status(
        &self,
        _id: &ClaimId,
        _status: ClaimStatus,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn assign_contractor_if_unassigned(
        &self,
        _claim_id: &ClaimId,
        _contractor_id: &ContractorId,
    ) -> Result<bool, RepositoryError> {
        offline()
    }

    fn create_match_request(
        &self,
        _claim_id: &ClaimId,
        _contractor_id: &ContractorId,
        _created_at: DateTime<Utc>,
    ) -> Result<MatchRequest, RepositoryError> {
        offline()
    }

    fn update_match_request_status(
        &self,
        _id: &MatchRequestId,
        _status: MatchRequestStatus,
        _responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn match_requests(&self, _claim_id: &ClaimId) -> Result<Vec<MatchRequest>, RepositoryError> {
        offline()
    }

    fn fetch_match_request_for(
        &self,
        _claim_id: &ClaimId,
        _contractor_id: &ContractorId,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        offline()
    }

    fn reset_for_rematch(&self, _claim_id: &ClaimId) -> Result<Option<usize>, RepositoryError> {
        offline()
    }

    fn create_estimate(
        &self,
        _claim_id: &ClaimId,
        _contractor_id: &ContractorId,
        _amount_cents: u64,
        _scope: &str,
        _submitted_at: DateTime<Utc>,
    ) -> Result<Estimate, RepositoryError> {
        offline()
    }

    fn fetch_estimate(&self, _id: &EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        offline()
    }

    fn commit_assignment(&self, _commit: &AssignmentCommit) -> Result<bool, RepositoryError> {
        offline()
    }
}

/// Delegates to the in-memory store, but lets a homeowner's estimate pick land
/// just before the next `reset_for_rematch` reaches storage.
pub(super) struct SettlesBeforeReset {
    pub(super) inner: Arc<InMemoryMatchingRepository>,
    pub(super) pending: Mutex<Option<AssignmentCommit>>,
}

impl MatchingRepository for SettlesBeforeReset {
    fn active_contractors(&self) -> Result<Vec<Contractor>, RepositoryError> {
        self.inner.active_contractors()
    }

    fn fetch_contractor(&self, id: &ContractorId) -> Result<Option<Contractor>, RepositoryError> {
        self.inner.fetch_contractor(id)
    }

    fn fetch_claim(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        self.inner.fetch_claim(id)
    }

    fn update_claim_status(&self, id: &ClaimId, status: ClaimStatus) -> Result<(), RepositoryError> {
        self.inner.update_claim_status(id, status)
    }

    fn assign_contractor_if_unassigned(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Result<bool, RepositoryError> {
        self.inner.assign_contractor_if_unassigned(claim_id, contractor_id)
    }

    fn create_match_request(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        created_at: DateTime<Utc>,
    ) -> Result<MatchRequest, RepositoryError> {
        self.inner.create_match_request(claim_id, contractor_id, created_at)
    }

    fn update_match_request_status(
        &self,
        id: &MatchRequestId,
        status: MatchRequestStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        self.inner.update_match_request_status(id, status, responded_at)
    }

    fn match_requests(&self, claim_id: &ClaimId) -> Result<Vec<MatchRequest>, RepositoryError> {
        self.inner.match_requests(claim_id)
    }

    fn fetch_match_request_for(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
    ) -> Result<Option<MatchRequest>, RepositoryError> {
        self.inner.fetch_match_request_for(claim_id, contractor_id)
    }

    fn reset_for_rematch(&self, claim_id: &ClaimId) -> Result<Option<usize>, RepositoryError> {
        let pending = self.pending.lock().expect("pending mutex poisoned").take();
        if let Some(commit) = pending {
            assert!(self.inner.commit_assignment(&commit)?, "interleaved pick commits");
        }
        self.inner.reset_for_rematch(claim_id)
    }

    fn create_estimate(
        &self,
        claim_id: &ClaimId,
        contractor_id: &ContractorId,
        amount_cents: u64,
        scope: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<Estimate, RepositoryError> {
        self.inner
            .create_estimate(claim_id, contractor_id, amount_cents, scope, submitted_at)
    }

    fn fetch_estimate(&self, id: &EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        self.inner.fetch_estimate(id)
    }

    fn commit_assignment(&self, commit: &AssignmentCommit) -> Result<bool, RepositoryError> {
        self.inner.commit_assignment(commit)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
