//! End-to-end behaviour of claim matching through the public service facade.
//!
//! Covers ranking determinism, invitation idempotency, the single-assignment race,
//! token lifetime, and re-matching.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use disaster_shield::workflows::matching::{
        CapacityState, Claim, ClaimId, ClaimLocation, ClaimStatus, Clock, Contractor,
        ContractorId, HmacTokenService, InMemoryMatchingRepository, MatchingConfig,
        MatchingService, Notification, NotificationError, NotificationSender, Peril, Trade,
        UserId,
    };

    pub(super) const SECRET: &str = "integration-secret";

    pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, day, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn claim(id: &str, city: &str, state: &str, peril: Peril) -> Claim {
        Claim {
            id: ClaimId(id.to_string()),
            owner_id: UserId("homeowner-1".to_string()),
            location: ClaimLocation {
                street: "12 Palm Ave".to_string(),
                city: city.to_string(),
                state: state.to_string(),
                postal_code: "33606".to_string(),
            },
            peril,
            description: "Damage reported after the storm".to_string(),
            incident_at: at(1, 6),
            preferred_date: None,
            preferred_window: None,
            status: ClaimStatus::Submitted,
            assigned_contractor_id: None,
        }
    }

    pub(super) fn contractor(id: &str, areas: &[&str], trades: &[Trade], day: u32) -> Contractor {
        Contractor {
            id: ContractorId(id.to_string()),
            user_id: None,
            company_name: format!("{id} LLC"),
            contact_name: "Dispatch".to_string(),
            phone: "555-0199".to_string(),
            email: format!("{id}@example.test"),
            service_areas: areas.iter().map(|area| area.to_string()).collect(),
            trades: trades.to_vec(),
            capacity: CapacityState::Active,
            open_projects: 0,
            created_at: at(day, 0),
        }
    }

    pub(super) struct FixedClock(pub(super) Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub(super) fn advance(&self, by: Duration) {
            *self.0.lock().expect("clock mutex poisoned") += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().expect("clock mutex poisoned")
        }
    }

    #[derive(Default)]
    pub(super) struct Outbox(pub(super) Mutex<Vec<Notification>>);

    impl Outbox {
        pub(super) fn sent(&self) -> Vec<Notification> {
            self.0.lock().expect("outbox mutex poisoned").clone()
        }
    }

    impl NotificationSender for Outbox {
        fn send(&self, notification: Notification) -> Result<(), NotificationError> {
            self.0
                .lock()
                .expect("outbox mutex poisoned")
                .push(notification);
            Ok(())
        }
    }

    pub(super) struct World {
        pub(super) service: MatchingService<InMemoryMatchingRepository, Outbox>,
        pub(super) repository: Arc<InMemoryMatchingRepository>,
        pub(super) outbox: Arc<Outbox>,
        pub(super) clock: Arc<FixedClock>,
    }

    pub(super) fn world(contractors: Vec<Contractor>, claims: Vec<Claim>, limit: usize) -> World {
        let repository = Arc::new(InMemoryMatchingRepository::default());
        for contractor in contractors {
            repository.insert_contractor(contractor).expect("seed contractor");
        }
        for claim in claims {
            repository.insert_claim(claim).expect("seed claim");
        }
        let outbox = Arc::new(Outbox::default());
        let clock = Arc::new(FixedClock(Mutex::new(at(3, 10))));
        let config = MatchingConfig {
            invite_limit: limit,
            token_ttl_hours: 48,
            token_secret: SECRET.to_string(),
            public_base_url: "https://shield.test".to_string(),
        };
        let service = MatchingService::with_dependencies(
            repository.clone(),
            outbox.clone(),
            Arc::new(HmacTokenService::new(SECRET)),
            clock.clone(),
            config,
        );
        World {
            service,
            repository,
            outbox,
            clock,
        }
    }

    pub(super) fn link_token(notification: &Notification, prefix: &str) -> String {
        notification
            .body
            .lines()
            .find_map(|line| line.strip_prefix(prefix))
            .and_then(|url| url.split_once("token="))
            .map(|(_, token)| token.to_string())
            .expect("link present")
    }
}

mod ranking {
    use super::common::*;
    use disaster_shield::workflows::matching::{
        select_top_contractors, Peril, ScoringEngine, Trade,
    };

    #[test]
    fn matching_contractor_outranks_out_of_area_roofer() {
        let claim = claim("claim-1", "Tampa", "FL", Peril::Water);
        let pool = vec![
            contractor("ctr-b", &["TX"], &[Trade::Roofing], 1),
            contractor("ctr-a", &["FL"], &[Trade::WaterMitigation], 2),
        ];
        let engine = ScoringEngine::default();

        let scored = engine.score_contractors(&claim, &pool);
        let a = scored.iter().find(|s| s.contractor.id.0 == "ctr-a").expect("a scored");
        let b = scored.iter().find(|s| s.contractor.id.0 == "ctr-b").expect("b scored");
        assert!(a.score > b.score);

        let selected = select_top_contractors(&scored, 1);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id.0, "ctr-a");
    }

    #[test]
    fn unrestricted_contractor_is_eligible_for_fire_claims() {
        let claim = claim("claim-2", "Austin", "TX", Peril::Fire);
        let pool = vec![contractor("ctr-c", &[], &[], 1)];
        let engine = ScoringEngine::default();

        let scored = engine.score_contractors(&claim, &pool);
        assert!(scored[0].score > 0);
        let selected = select_top_contractors(&scored, 3);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id.0, "ctr-c");
    }

    #[test]
    fn ranking_is_deterministic_with_creation_tie_break() {
        let claim = claim("claim-3", "Tampa", "FL", Peril::Flood);
        let pool = vec![
            contractor("ctr-late", &["FL"], &[Trade::WaterMitigation], 9),
            contractor("ctr-early", &["FL"], &[Trade::WaterMitigation], 1),
            contractor("ctr-mid", &["FL"], &[Trade::Rebuild], 5),
            contractor("ctr-open", &[], &[], 2),
        ];
        let engine = ScoringEngine::default();

        let ids = |limit| -> Vec<String> {
            select_top_contractors(&engine.score_contractors(&claim, &pool), limit)
                .into_iter()
                .map(|contractor| contractor.id.0)
                .collect()
        };

        let first = ids(3);
        assert_eq!(first, vec!["ctr-early", "ctr-mid", "ctr-late"]);
        for _ in 0..5 {
            assert_eq!(ids(3), first);
        }
    }
}

mod invitations {
    use super::common::*;
    use disaster_shield::workflows::matching::{
        ClaimStatus, MatchingRepository, NotificationKind, Peril, Trade, NO_CONTRACTORS_FOUND,
    };

    #[test]
    fn empty_pool_leaves_claim_submitted() {
        let claim = claim("claim-empty", "Tampa", "FL", Peril::Water);
        let w = world(Vec::new(), vec![claim.clone()], 3);

        let summary = w.service.execute_complete_workflow(&claim);

        assert!(!summary.success);
        assert_eq!(summary.matched_contractors, 0);
        assert_eq!(summary.errors, vec![NO_CONTRACTORS_FOUND.to_string()]);
        let stored = w.repository.fetch_claim(&claim.id).expect("fetch").expect("claim");
        assert_eq!(stored.status, ClaimStatus::Submitted);
    }

    #[test]
    fn repeated_runs_keep_one_request_per_contractor() {
        let claim = claim("claim-idem", "Tampa", "FL", Peril::Water);
        let w = world(
            vec![
                contractor("ctr-a", &["FL"], &[Trade::WaterMitigation], 1),
                contractor("ctr-b", &["Tampa"], &[Trade::General], 2),
            ],
            vec![claim.clone()],
            3,
        );

        w.service.execute_complete_workflow(&claim);
        let first: Vec<_> = w
            .repository
            .match_requests(&claim.id)
            .expect("requests")
            .into_iter()
            .map(|request| (request.id, request.contractor_id))
            .collect();
        w.service.execute_complete_workflow(&claim);
        w.service.execute_complete_workflow(&claim);
        let after: Vec<_> = w
            .repository
            .match_requests(&claim.id)
            .expect("requests")
            .into_iter()
            .map(|request| (request.id, request.contractor_id))
            .collect();

        assert_eq!(first.len(), 2);
        assert_eq!(first, after);
        assert_eq!(
            w.outbox
                .sent()
                .iter()
                .filter(|n| n.kind == NotificationKind::InvitationEmail)
                .count(),
            2
        );
    }

    #[test]
    fn rematch_replaces_every_prior_request() {
        let claim = claim("claim-rematch", "Tampa", "FL", Peril::Water);
        let w = world(
            vec![
                contractor("ctr-a", &["FL"], &[Trade::WaterMitigation], 1),
                contractor("ctr-b", &["Tampa"], &[Trade::General], 2),
            ],
            vec![claim.clone()],
            3,
        );
        w.service.execute_complete_workflow(&claim);
        let old: Vec<_> = w
            .repository
            .match_requests(&claim.id)
            .expect("requests")
            .into_iter()
            .map(|request| request.id)
            .collect();

        let summary = w.service.rematch(&claim.id);

        let fresh = w.repository.match_requests(&claim.id).expect("requests");
        assert!(summary.success);
        assert_eq!(fresh.len(), 2);
        assert!(fresh.iter().all(|request| !old.contains(&request.id)));
        let stored = w.repository.fetch_claim(&claim.id).expect("fetch").expect("claim");
        assert_eq!(stored.status, ClaimStatus::Matched);
    }
}

mod responses {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::Duration;

    use super::common::*;
    use disaster_shield::workflows::matching::{
        ContractorId, HmacTokenService, MatchRequestStatus, MatchingRepository, Peril,
        ResponseOutcome, TokenAction, TokenError, TokenPayload, TokenService, Trade,
    };

    #[test]
    fn accept_link_is_expired_after_forty_nine_hours() {
        let claim = claim("claim-late", "Tampa", "FL", Peril::Water);
        let w = world(
            vec![contractor("ctr-a", &["FL"], &[Trade::WaterMitigation], 1)],
            vec![claim.clone()],
            3,
        );
        w.service.execute_complete_workflow(&claim);
        let email = w.outbox.sent().into_iter().next().expect("invitation");
        let token = link_token(&email, "Accept this job: ");
        w.clock.advance(Duration::hours(49));

        assert_eq!(w.service.accept_invitation(&token), ResponseOutcome::Expired);
        let request = w
            .repository
            .fetch_match_request_for(&claim.id, &ContractorId("ctr-a".to_string()))
            .expect("lookup")
            .expect("request");
        assert_eq!(request.status, MatchRequestStatus::Sent);
        assert!(request.responded_at.is_none());
    }

    #[test]
    fn token_lifetime_boundary() {
        let tokens = HmacTokenService::new(SECRET);
        let issued = at(3, 10);
        let payload = TokenPayload::new(
            disaster_shield::workflows::matching::ClaimId("claim-ttl".to_string()),
            ContractorId("ctr-a".to_string()),
            TokenAction::Accept,
            issued,
            Duration::hours(48),
        );
        let token = tokens.issue(&payload).expect("issue");

        let just_before = issued + Duration::hours(48) - Duration::seconds(1);
        let just_after = issued + Duration::hours(48) + Duration::seconds(1);

        assert_eq!(tokens.verify(&token, just_before).expect("valid"), payload);
        assert!(matches!(
            tokens.verify(&token, just_after),
            Err(TokenError::Expired(_))
        ));
    }

    #[test]
    fn concurrent_estimate_acceptance_assigns_exactly_once() {
        let claim = claim("claim-race", "Tampa", "FL", Peril::Water);
        let ids = ["ctr-1", "ctr-2", "ctr-3", "ctr-4", "ctr-5", "ctr-6"];
        let pool = ids
            .iter()
            .enumerate()
            .map(|(i, id)| contractor(id, &["FL"], &[Trade::WaterMitigation], i as u32 + 1))
            .collect();
        let w = world(pool, vec![claim.clone()], ids.len());
        let summary = w.service.execute_complete_workflow(&claim);
        assert_eq!(summary.invitations_created, ids.len());

        let estimates: Vec<_> = ids
            .iter()
            .map(|id| {
                w.service
                    .submit_estimate(&claim.id, &ContractorId(id.to_string()), 50_000, "repairs")
                    .expect("estimate")
            })
            .collect();

        let barrier = Arc::new(Barrier::new(estimates.len()));
        let outcomes: Vec<ResponseOutcome> = thread::scope(|scope| {
            let handles: Vec<_> = estimates
                .iter()
                .map(|estimate| {
                    let barrier = barrier.clone();
                    let service = &w.service;
                    scope.spawn(move || {
                        barrier.wait();
                        service.accept_estimate(&estimate.id)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .collect()
        });

        assert_eq!(
            outcomes
                .iter()
                .filter(|outcome| **outcome == ResponseOutcome::Success)
                .count(),
            1
        );
        assert!(outcomes.iter().all(|outcome| matches!(
            outcome,
            ResponseOutcome::Success | ResponseOutcome::AlreadyFilled
        )));

        let stored = w.repository.fetch_claim(&claim.id).expect("fetch").expect("claim");
        let winner = stored.assigned_contractor_id.expect("claim assigned");
        let requests = w.repository.match_requests(&claim.id).expect("requests");
        let accepted: Vec<_> = requests
            .iter()
            .filter(|request| request.status == MatchRequestStatus::Accepted)
            .collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].contractor_id, winner);
        assert!(requests
            .iter()
            .filter(|request| request.contractor_id != winner)
            .all(|request| request.status == MatchRequestStatus::Declined));
    }

    #[test]
    fn conditional_assignment_has_one_winner_under_contention() {
        let claim = claim("claim-cas", "Tampa", "FL", Peril::Water);
        let w = world(Vec::new(), vec![claim.clone()], 3);
        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));

        let wins = thread::scope(|scope| {
            let handles: Vec<_> = (0..contenders)
                .map(|i| {
                    let barrier = barrier.clone();
                    let repository = w.repository.clone();
                    let claim_id = claim.id.clone();
                    scope.spawn(move || {
                        barrier.wait();
                        repository
                            .assign_contractor_if_unassigned(
                                &claim_id,
                                &ContractorId(format!("ctr-{i}")),
                            )
                            .expect("conditional update")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
    }
}
