use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ClaimId, ContractorId, Estimate, EstimateId};
use super::repository::{MatchingRepository, NotificationSender, RepositoryError};
use super::responses::ResponseOutcome;
use super::service::MatchingService;
use super::workflow::WorkflowSummary;
use crate::error::AppError;

/// Router exposing the matching workflow and the signed invitation links.
pub fn matching_router<R, N>(service: Arc<MatchingService<R, N>>) -> Router
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route(
            "/api/v1/claims/:claim_id/match",
            post(match_handler::<R, N>),
        )
        .route(
            "/api/v1/claims/:claim_id/rematch",
            post(rematch_handler::<R, N>),
        )
        .route(
            "/api/v1/claims/:claim_id/estimates",
            post(submit_estimate_handler::<R, N>),
        )
        .route(
            "/api/v1/estimates/:estimate_id/accept",
            post(accept_estimate_handler::<R, N>),
        )
        .route(
            "/api/v1/invitations/accept",
            get(accept_link_handler::<R, N>),
        )
        .route(
            "/api/v1/invitations/decline",
            get(decline_link_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenQuery {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EstimateRequest {
    contractor_id: String,
    amount_cents: u64,
    scope: String,
}

fn outcome_response(outcome: ResponseOutcome) -> Response {
    let status = match outcome {
        ResponseOutcome::Success | ResponseOutcome::Declined => StatusCode::OK,
        ResponseOutcome::Expired => StatusCode::GONE,
        ResponseOutcome::AlreadyFilled => StatusCode::CONFLICT,
        ResponseOutcome::Error => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "outcome": outcome.label() }))).into_response()
}

pub(crate) async fn match_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(claim_id): Path<String>,
) -> Result<Json<WorkflowSummary>, AppError>
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    let claim = service
        .repository()
        .fetch_claim(&ClaimId(claim_id))?
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(service.execute_complete_workflow(&claim)))
}

pub(crate) async fn rematch_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(claim_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    let summary = service.rematch(&ClaimId(claim_id));
    (StatusCode::OK, Json(summary)).into_response()
}

pub(crate) async fn accept_link_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Query(query): Query<TokenQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    outcome_response(service.accept_invitation(&query.token))
}

pub(crate) async fn decline_link_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Query(query): Query<TokenQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    outcome_response(service.decline_invitation(&query.token))
}

pub(crate) async fn submit_estimate_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(claim_id): Path<String>,
    Json(request): Json<EstimateRequest>,
) -> Result<(StatusCode, Json<Estimate>), AppError>
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    let estimate = service.submit_estimate(
        &ClaimId(claim_id),
        &ContractorId(request.contractor_id),
        request.amount_cents,
        &request.scope,
    )?;
    Ok((StatusCode::CREATED, Json(estimate)))
}

pub(crate) async fn accept_estimate_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(estimate_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: NotificationSender + 'static,
{
    outcome_response(service.accept_estimate(&EstimateId(estimate_id)))
}
