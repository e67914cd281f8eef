use super::common::*;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::NotificationConfig;
use crate::workflows::data_access::amendments::AmendmentError;
use crate::workflows::data_access::repository::{NotificationError, RepositoryError};
use crate::workflows::data_access::router::{
    actor_from_headers, error_response, view_handler, ViewQuery, USER_FIRSTNAME_HEADER, USER_ID_HEADER,
    USER_LASTNAME_HEADER, USER_TYPE_HEADER,
};
use crate::workflows::data_access::{
    amendment_router, AmendmentService, AmendmentServiceError, UserType,
};

fn custodian_request(method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, "user-custodian")
        .header(USER_FIRSTNAME_HEADER, "Rosalind")
        .header(USER_LASTNAME_HEADER, "Franklin")
        .header(USER_TYPE_HEADER, "custodian")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .expect("request builds")
}

#[test]
fn actor_requires_id_and_known_type() {
    let mut headers = HeaderMap::new();
    assert!(actor_from_headers(&headers).is_none());

    headers.insert(USER_ID_HEADER, HeaderValue::from_static("user-applicant"));
    headers.insert(USER_TYPE_HEADER, HeaderValue::from_static("reviewer"));
    assert!(actor_from_headers(&headers).is_none());

    headers.insert(USER_TYPE_HEADER, HeaderValue::from_static("applicant"));
    headers.insert(USER_FIRSTNAME_HEADER, HeaderValue::from_static("Ada"));
    let actor = actor_from_headers(&headers).expect("actor parsed");
    assert_eq!(actor.user_type, UserType::Applicant);
    assert_eq!(actor.user.firstname, "Ada");
    assert_eq!(actor.user.lastname, "");
}

#[tokio::test]
async fn view_route_requires_user_headers() {
    let (service, _, _) = build_service(submitted_record());
    let router = amendment_router(Arc::new(service));

    let response = router
        .oneshot(
            Request::get("/api/v1/data-access-request/dar-001")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert!(payload["error"].is_string());
}

#[tokio::test]
async fn view_route_returns_not_found_for_unknown_application() {
    let (service, _, _) = build_service(submitted_record());
    let router = amendment_router(Arc::new(service));

    let response = router
        .oneshot(custodian_request(
            "GET",
            "/api/v1/data-access-request/dar-404",
            Body::empty(),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn non_numeric_versions_mean_latest() {
    let parse = |raw: Option<&str>| {
        ViewQuery {
            version: raw.map(str::to_string),
        }
        .minor_version()
    };

    assert_eq!(parse(None), None);
    assert_eq!(parse(Some("latest")), None);
    assert_eq!(parse(Some("1.2")), None);
    assert_eq!(parse(Some("2")), Some(2));
}

#[tokio::test]
async fn view_route_serves_latest_for_non_numeric_version() {
    let (service, _, _) = build_service(submitted_record());
    let router = amendment_router(Arc::new(service));

    for uri in [
        "/api/v1/data-access-request/dar-001?version=latest",
        "/api/v1/data-access-request/dar-001?version=1.2",
    ] {
        let response = router
            .clone()
            .oneshot(custodian_request("GET", uri, Body::empty()))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["version"]["isLatestMinorVersion"], json!(true));
        assert!(payload["version"]["versionIndex"].is_null());
    }
}

#[tokio::test]
async fn amendment_route_records_request() {
    let (service, repository, _) = build_service(submitted_record());
    let router = amendment_router(Arc::new(service));
    let body = json!({
        "questionId": "q1",
        "questionSetId": "applicant",
        "mode": "add",
        "reason": "Please clarify"
    });

    let response = router
        .oneshot(custodian_request(
            "POST",
            "/api/v1/data-access-request/dar-001/amendments",
            Body::from(body.to_string()),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["applicationId"], json!("dar-001"));
    assert_eq!(payload["unansweredAmendments"], json!(1));
    assert_eq!(payload["applicationStatus"], json!("submitted"));

    let stored = repository.stored(&crate::workflows::data_access::ApplicationId(
        "dar-001".to_string(),
    ));
    assert_eq!(stored.amendment_iterations.len(), 1);
}

#[tokio::test]
async fn return_route_rejects_empty_iteration() {
    let (service, _, notifications) = build_service(submitted_record());
    let router = amendment_router(Arc::new(service));

    let response = router
        .oneshot(custodian_request(
            "POST",
            "/api/v1/data-access-request/dar-001/requestAmendments",
            Body::empty(),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(notifications.emails().is_empty());
}

#[tokio::test]
async fn view_handler_reports_repository_failure() {
    let service = Arc::new(AmendmentService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifications::default()),
        NotificationConfig::default(),
    ));
    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_static("user-custodian"));
    headers.insert(USER_TYPE_HEADER, HeaderValue::from_static("custodian"));

    let response = view_handler::<UnavailableRepository, MemoryNotifications>(
        State(service),
        Path("dar-001".to_string()),
        Query(ViewQuery::default()),
        headers,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn applicant_patch_is_forbidden_for_custodian() {
    let (service, _, _) = build_service(submitted_record());
    let router = amendment_router(Arc::new(service));
    let body = json!({ "questionId": "q1", "questionSetId": "applicant", "answer": "x" });

    let response = router
        .oneshot(custodian_request(
            "PATCH",
            "/api/v1/data-access-request/dar-001/answers",
            Body::from(body.to_string()),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test]
fn service_errors_map_to_status_codes() {
    let cases = [
        (AmendmentServiceError::Repository(RepositoryError::NotFound), StatusCode::NOT_FOUND),
        (AmendmentServiceError::Repository(RepositoryError::Conflict), StatusCode::CONFLICT),
        (
            AmendmentServiceError::Repository(RepositoryError::Unavailable("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (AmendmentServiceError::Forbidden("custodian only"), StatusCode::FORBIDDEN),
        (
            AmendmentServiceError::InvalidState("application is approved".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            AmendmentServiceError::Amendment(AmendmentError::NoAmendmentsRequested),
            StatusCode::BAD_REQUEST,
        ),
        (
            AmendmentServiceError::Amendment(AmendmentError::AlreadyReturned),
            StatusCode::BAD_REQUEST,
        ),
        (
            AmendmentServiceError::Amendment(AmendmentError::Notification(
                NotificationError::Transport("relay down".to_string()),
            )),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error_response(error).status(), expected);
    }
}
