use std::fmt;
use std::sync::Arc;

use chrono::Duration;

use super::clock::{Clock, SystemClock};
use super::repository::{MatchingRepository, NotificationSender, RepositoryError};
use super::scoring::ScoringEngine;
use super::selection::DEFAULT_INVITE_LIMIT;
use super::tokens::{HmacTokenService, TokenService};
use super::validation::ClaimGuard;

/// Runtime knobs for invitation rounds.
#[derive(Clone, PartialEq, Eq)]
pub struct MatchingConfig {
    pub invite_limit: usize,
    pub token_ttl_hours: i64,
    pub token_secret: String,
    pub public_base_url: String,
}

impl MatchingConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            invite_limit: DEFAULT_INVITE_LIMIT,
            token_ttl_hours: 48,
            token_secret: String::new(),
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl fmt::Debug for MatchingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingConfig")
            .field("invite_limit", &self.invite_limit)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("token_secret", &"<redacted>")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

/// Service composing scoring, selection, invitation dispatch, and response handling.
///
/// Every collaborator is passed in explicitly; nothing is read from globals.
pub struct MatchingService<R, N> {
    pub(crate) repository: Arc<R>,
    pub(crate) notifier: Arc<N>,
    pub(crate) tokens: Arc<dyn TokenService>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) scoring: ScoringEngine,
    pub(crate) guard: ClaimGuard,
    pub(crate) config: MatchingConfig,
}

impl<R, N> MatchingService<R, N>
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: MatchingConfig) -> Self {
        let tokens: Arc<dyn TokenService> =
            Arc::new(HmacTokenService::new(config.token_secret.clone()));
        Self::with_dependencies(repository, notifier, tokens, Arc::new(SystemClock), config)
    }

    pub fn with_dependencies(
        repository: Arc<R>,
        notifier: Arc<N>,
        tokens: Arc<dyn TokenService>,
        clock: Arc<dyn Clock>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            tokens,
            clock,
            scoring: ScoringEngine::default(),
            guard: ClaimGuard,
            config,
        }
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

/// Errors from service operations that are not summarised into a workflow result.
#[derive(Debug, thiserror::Error)]
pub enum MatchingServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("contractor {0} has no open invitation for this claim")]
    NoOpenInvitation(String),
    #[error("claim has already been assigned")]
    ClaimFilled,
    #[error("invalid estimate: {0}")]
    InvalidEstimate(&'static str),
}
