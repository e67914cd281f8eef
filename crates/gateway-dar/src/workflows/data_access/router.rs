use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::amendments::AmendmentError;
use super::domain::{ApplicationId, User, UserId, UserType};
use super::repository::{ApplicationRepository, NotificationDispatcher, RepositoryError};
use super::service::{
    Actor, AmendmentService, AmendmentServiceError, AnswerUpdate, SetAmendmentRequest,
};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_FIRSTNAME_HEADER: &str = "x-user-firstname";
pub const USER_LASTNAME_HEADER: &str = "x-user-lastname";
pub const USER_TYPE_HEADER: &str = "x-user-type";

/// Router builder exposing the amendment workflow over HTTP.
pub fn amendment_router<R, N>(service: Arc<AmendmentService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/data-access-request/:application_id",
            get(view_handler::<R, N>),
        )
        .route(
            "/api/v1/data-access-request/:application_id/amendments",
            post(set_amendment_handler::<R, N>),
        )
        .route(
            "/api/v1/data-access-request/:application_id/answers",
            patch(update_answer_handler::<R, N>),
        )
        .route(
            "/api/v1/data-access-request/:application_id/requestAmendments",
            post(return_handler::<R, N>),
        )
        .route(
            "/api/v1/data-access-request/:application_id/resubmit",
            post(resubmit_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ViewQuery {
    pub(crate) version: Option<String>,
}

impl ViewQuery {
    /// Minor version to render. Anything that is not a whole number means the latest version.
    pub(crate) fn minor_version(&self) -> Option<usize> {
        self.version
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }
}

/// Stand-in for the authentication layer: the caller identity travels in request headers.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let user_type = UserType::parse(&header(USER_TYPE_HEADER)?)?;
    Some(Actor {
        user: User {
            id: UserId(header(USER_ID_HEADER)?),
            firstname: header(USER_FIRSTNAME_HEADER).unwrap_or_default(),
            lastname: header(USER_LASTNAME_HEADER).unwrap_or_default(),
            email: None,
        },
        user_type,
    })
}

fn unauthorised() -> Response {
    let payload = json!({ "error": "missing or invalid user headers" });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

pub(crate) fn error_response(error: AmendmentServiceError) -> Response {
    let status = match &error {
        AmendmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AmendmentServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AmendmentServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        AmendmentServiceError::InvalidState(_)
        | AmendmentServiceError::Amendment(AmendmentError::NoAmendmentsRequested)
        | AmendmentServiceError::Amendment(AmendmentError::AlreadyReturned) => {
            StatusCode::BAD_REQUEST
        }
        AmendmentServiceError::Repository(RepositoryError::Unavailable(_))
        | AmendmentServiceError::Amendment(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %error, "amendment request failed");
    }

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn view_handler<R, N>(
    State(service): State<Arc<AmendmentService<R, N>>>,
    Path(application_id): Path<String>,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return unauthorised();
    };
    match service.view(&ApplicationId(application_id), &actor, query.minor_version()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn set_amendment_handler<R, N>(
    State(service): State<Arc<AmendmentService<R, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SetAmendmentRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return unauthorised();
    };
    match service.set_amendment(&ApplicationId(application_id), &actor, request) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_answer_handler<R, N>(
    State(service): State<Arc<AmendmentService<R, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<AnswerUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return unauthorised();
    };
    match service.update_answer(&ApplicationId(application_id), &actor, update) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn return_handler<R, N>(
    State(service): State<Arc<AmendmentService<R, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return unauthorised();
    };
    match service.return_to_applicant(&ApplicationId(application_id), &actor) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resubmit_handler<R, N>(
    State(service): State<Arc<AmendmentService<R, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return unauthorised();
    };
    match service.resubmit(&ApplicationId(application_id), &actor) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}
