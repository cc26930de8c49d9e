use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    QueryParams, UuidPath, ValidatedJson,
    errors::handlers::method_not_allowed,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, ServiceUnavailableResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::PollResult;
use crate::ledger::VoteRepository;
use crate::models::{
    CastVote, CategoriesResponse, CategoryCount, ClosePollResponse, CreatePoll,
    CreatePollResponse, DeletePollResponse, DeleteSummary, Poll, PollFilter, PollListResponse,
    PollResponse, PollStats, PollStatus, PollWithResults, StatsResponse, Vote, VoteResponse,
    VoteResults,
};
use crate::registry::PollRepository;
use crate::service::PollService;

const TAG: &str = "Polls";

/// OpenAPI documentation for the Polls API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_polls,
        create_poll,
        list_categories,
        get_stats,
        get_poll,
        delete_poll,
        cast_vote,
        close_poll,
    ),
    components(
        schemas(
            Poll, PollStatus, Vote, CreatePoll, CastVote, PollFilter, PollWithResults,
            VoteResults, DeleteSummary, CategoryCount, PollStats, PollListResponse,
            PollResponse, CreatePollResponse, VoteResponse, ClosePollResponse,
            DeletePollResponse, CategoriesResponse, StatsResponse
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Poll creation, voting and results")
    )
)]
pub struct ApiDoc;

type SharedService<P, V> = Arc<PollService<P, V>>;

/// Create the polls router with all HTTP endpoints
pub fn router<P, V>(service: PollService<P, V>) -> Router
where
    P: PollRepository + 'static,
    V: VoteRepository + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route("/categories", get(list_categories))
        .route("/stats", get(get_stats))
        .route("/{id}", get(get_poll).delete(delete_poll))
        .route("/{id}/vote", post(cast_vote))
        .route("/{id}/close", post(close_poll))
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(shared_service)
}

/// List polls, newest first
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(PollFilter),
    responses(
        (status = 200, description = "Polls with vote counts", body = PollListResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_polls<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
    QueryParams(filter): QueryParams<PollFilter>,
) -> PollResult<Json<PollListResponse>> {
    let polls = service.list_polls(filter).await?;
    Ok(Json(PollListResponse {
        success: true,
        count: polls.len(),
        polls,
    }))
}

/// Create a new poll
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = CreatePoll,
    responses(
        (status = 201, description = "Poll created successfully", body = CreatePollResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_poll<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
    ValidatedJson(input): ValidatedJson<CreatePoll>,
) -> PollResult<impl IntoResponse> {
    let poll = service.create_poll(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePollResponse {
            success: true,
            message: "Poll created successfully".to_string(),
            poll,
        }),
    ))
}

/// Poll counts per category
#[utoipa::path(
    get,
    path = "/categories",
    tag = TAG,
    responses(
        (status = 200, description = "Category summary", body = CategoriesResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
) -> PollResult<Json<CategoriesResponse>> {
    let (categories, total_polls) = service.categories().await?;
    Ok(Json(CategoriesResponse {
        success: true,
        categories,
        total_polls,
    }))
}

/// Totals across all polls
#[utoipa::path(
    get,
    path = "/stats",
    tag = TAG,
    responses(
        (status = 200, description = "Poll statistics", body = StatsResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_stats<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
) -> PollResult<Json<StatsResponse>> {
    let stats = service.stats().await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

/// Get a poll with counts and percentages
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Poll ID")
    ),
    responses(
        (status = 200, description = "Poll found", body = PollResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_poll<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
    UuidPath(id): UuidPath,
) -> PollResult<Json<PollResponse>> {
    let poll = service.get_poll(id).await?;
    Ok(Json(PollResponse {
        success: true,
        poll,
    }))
}

/// Delete a poll and all of its votes
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Poll ID")
    ),
    responses(
        (status = 200, description = "Poll deleted successfully", body = DeletePollResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_poll<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
    UuidPath(id): UuidPath,
) -> PollResult<Json<DeletePollResponse>> {
    let deleted = service.delete_poll(id).await?;
    Ok(Json(DeletePollResponse {
        success: true,
        message: "Poll deleted successfully".to_string(),
        deleted,
    }))
}

/// Cast a vote
#[utoipa::path(
    post,
    path = "/{id}/vote",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Poll ID")
    ),
    request_body = CastVote,
    responses(
        (status = 200, description = "Vote recorded successfully", body = VoteResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn cast_vote<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<CastVote>,
) -> PollResult<Json<VoteResponse>> {
    let outcome = service.vote(id, input).await?;
    Ok(Json(VoteResponse {
        success: true,
        message: "Vote recorded successfully".to_string(),
        vote: outcome.vote,
        results: outcome.results,
    }))
}

/// Close a poll to further voting
#[utoipa::path(
    post,
    path = "/{id}/close",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Poll ID")
    ),
    responses(
        (status = 200, description = "Poll closed successfully", body = ClosePollResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn close_poll<P: PollRepository, V: VoteRepository>(
    State(service): State<SharedService<P, V>>,
    UuidPath(id): UuidPath,
) -> PollResult<Json<ClosePollResponse>> {
    let poll = service.close_poll(id).await?;
    Ok(Json(ClosePollResponse {
        success: true,
        message: "Poll closed successfully".to_string(),
        poll_id: poll.id,
    }))
}
