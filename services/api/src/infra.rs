use chrono::{DateTime, Duration, TimeZone, Utc};
use disaster_shield::workflows::matching::{
    CapacityState, Claim, ClaimId, ClaimLocation, ClaimStatus, Contractor, ContractorId,
    InMemoryMatchingRepository, Notification, NotificationError, NotificationSender, Peril,
    RepositoryError, TimeWindow, Trade, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keeps every dispatched notification in memory and logs it; stands in for
/// the email and in-app channels.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationOutbox {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSender for InMemoryNotificationOutbox {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            kind = ?notification.kind,
            recipient = ?notification.recipient,
            subject = %notification.subject,
            "notification dispatched"
        );
        let mut guard = self.events.lock().expect("outbox mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationOutbox {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("outbox mutex poisoned").clone()
    }
}

fn sample_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn onboarded(days_ago: i64) -> DateTime<Utc> {
    sample_epoch() - Duration::days(days_ago)
}

fn sample_contractor(
    id: &str,
    company: &str,
    areas: &[&str],
    trades: &[Trade],
    open_projects: u32,
    days_ago: i64,
) -> Contractor {
    Contractor {
        id: ContractorId(id.to_string()),
        user_id: Some(UserId(format!("user-{id}"))),
        company_name: company.to_string(),
        contact_name: format!("{company} dispatch"),
        phone: "555-0142".to_string(),
        email: format!("{id}@contractors.example"),
        service_areas: areas.iter().map(|area| area.to_string()).collect(),
        trades: trades.to_vec(),
        capacity: CapacityState::Active,
        open_projects,
        created_at: onboarded(days_ago),
    }
}

pub(crate) fn sample_contractors() -> Vec<Contractor> {
    let mut paused = sample_contractor(
        "ctr-gulf",
        "Gulf Coast Dry-Out",
        &["FL"],
        &[Trade::WaterMitigation],
        0,
        400,
    );
    paused.capacity = CapacityState::Paused;

    vec![
        sample_contractor(
            "ctr-bayshore",
            "Bayshore Water Response",
            &["Tampa", "33606"],
            &[Trade::WaterMitigation, Trade::Mold],
            1,
            210,
        ),
        sample_contractor(
            "ctr-sunstate",
            "Sunstate Restoration",
            &["FL"],
            &[Trade::WaterMitigation, Trade::Rebuild],
            0,
            180,
        ),
        sample_contractor(
            "ctr-handy",
            "All Trades Handy Co",
            &[],
            &[],
            0,
            365,
        ),
        sample_contractor(
            "ctr-lonestar",
            "Lone Star Roofing",
            &["TX"],
            &[Trade::Roofing],
            0,
            90,
        ),
        sample_contractor(
            "ctr-pinellas",
            "Pinellas Mold Pros",
            &["Clearwater", "FL"],
            &[Trade::Mold],
            4,
            30,
        ),
        paused,
    ]
}

pub(crate) fn sample_claim() -> Claim {
    Claim {
        id: ClaimId("claim-demo-tampa".to_string()),
        owner_id: UserId("homeowner-demo".to_string()),
        location: ClaimLocation {
            street: "410 Bayshore Blvd".to_string(),
            city: "Tampa".to_string(),
            state: "FL".to_string(),
            postal_code: "33606".to_string(),
        },
        peril: Peril::Water,
        description: "Supply line burst under the kitchen sink; standing water in two rooms."
            .to_string(),
        incident_at: sample_epoch() - Duration::hours(6),
        preferred_date: None,
        preferred_window: Some(TimeWindow::LateMorning),
        status: ClaimStatus::Submitted,
        assigned_contractor_id: None,
    }
}

pub(crate) fn seeded_repository() -> Result<InMemoryMatchingRepository, RepositoryError> {
    let repository = InMemoryMatchingRepository::default();
    for contractor in sample_contractors() {
        repository.insert_contractor(contractor)?;
    }
    repository.insert_claim(sample_claim())?;
    Ok(repository)
}
