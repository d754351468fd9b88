use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalogue::{ProgramCategory, ProgramId};
use crate::eligibility::{EvaluationContext, ResultFilter};
use crate::service::{BenefitService, ServiceError};

/// Router builder exposing the eligibility listing and autofill endpoints.
pub fn benefit_router(service: Arc<BenefitService>) -> Router {
    Router::new()
        .route("/api/v1/programs", get(programs_handler))
        .route("/api/v1/programs/eligibility", post(eligibility_handler))
        .route(
            "/api/v1/programs/:program_id/autofill",
            post(autofill_handler),
        )
        .route(
            "/api/v1/programs/:program_id/missing-fields",
            post(missing_fields_handler),
        )
        .route("/api/v1/profile/completion", post(completion_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EligibilityRequest {
    #[serde(default)]
    profile: Value,
    #[serde(default)]
    category: Option<ProgramCategory>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    eligible_only: bool,
    #[serde(default)]
    as_of: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRequest {
    #[serde(default)]
    profile: Value,
}

pub(crate) async fn programs_handler(State(service): State<Arc<BenefitService>>) -> Response {
    let payload = json!({ "programs": service.program_summaries() });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn eligibility_handler(
    State(service): State<Arc<BenefitService>>,
    axum::Json(request): axum::Json<EligibilityRequest>,
) -> Response {
    let as_of = match request.as_of.as_deref() {
        None => Utc::now(),
        Some(raw) => match parse_instant(raw) {
            Some(instant) => instant,
            None => {
                let payload = json!({
                    "error": format!("asOf '{raw}' must be an RFC 3339 timestamp or YYYY-MM-DD date"),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    let filter = ResultFilter {
        category: request.category,
        search: request.search,
        eligible_only: request.eligible_only,
    };
    let context = EvaluationContext::new(as_of);
    let results = service.list_eligible_programs(&request.profile, &filter, &context);

    let payload = json!({
        "evaluatedAt": context.as_of,
        "results": results,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn autofill_handler(
    State(service): State<Arc<BenefitService>>,
    Path(program_id): Path<String>,
    axum::Json(request): axum::Json<ProfileRequest>,
) -> Response {
    match service.autofill_program(&request.profile, &ProgramId(program_id)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn missing_fields_handler(
    State(service): State<Arc<BenefitService>>,
    Path(program_id): Path<String>,
    axum::Json(request): axum::Json<ProfileRequest>,
) -> Response {
    let id = ProgramId(program_id);
    match service.missing_fields_for_program(&request.profile, &id) {
        Ok(missing) => {
            let payload = json!({
                "programId": id,
                "missingFields": missing,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn completion_handler(
    State(service): State<Arc<BenefitService>>,
    axum::Json(request): axum::Json<ProfileRequest>,
) -> Response {
    let completion = service.profile_completion(&request.profile);
    (StatusCode::OK, axum::Json(completion)).into_response()
}

fn service_error_response(error: ServiceError) -> Response {
    match error {
        ServiceError::UnknownProgram(id) => {
            let payload = json!({
                "error": format!("unknown program '{id}'"),
                "programId": id,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| EvaluationContext::on_date(date).as_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;
    use crate::eligibility::EvaluationConfig;
    use crate::telemetry::NoopTelemetry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> Router {
        let service = BenefitService::new(
            Catalogue::standard().expect("standard catalogue"),
            EvaluationConfig::default(),
            Arc::new(NoopTelemetry),
        );
        benefit_router(Arc::new(service))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[test]
    fn parse_instant_accepts_dates_and_timestamps() {
        assert_eq!(
            parse_instant("2024-06-15").map(|instant| instant.to_rfc3339()),
            Some("2024-06-15T00:00:00+00:00".to_string())
        );
        assert!(parse_instant("2024-06-15T10:30:00+02:00").is_some());
        assert!(parse_instant("15.06.2024").is_none());
    }

    #[tokio::test]
    async fn eligibility_endpoint_ranks_and_filters() {
        let (status, body) = post_json(
            router(),
            "/api/v1/programs/eligibility",
            json!({
                "profile": { "monthlyNetIncome": 900, "employmentStatus": "unemployed", "geburtsdatum": "1990-01-01" },
                "category": "basic-income",
                "asOf": "2024-06-15"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().expect("results array");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["programId"], "buergergeld");
        assert_eq!(results[0]["score"], 100);
        assert_eq!(results[0]["status"], "eligible");
        assert_eq!(body["evaluatedAt"], "2024-06-15T00:00:00Z");
    }

    #[tokio::test]
    async fn eligibility_endpoint_rejects_bad_instants() {
        let (status, body) = post_json(
            router(),
            "/api/v1/programs/eligibility",
            json!({ "profile": {}, "asOf": "yesterday" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("message").contains("yesterday"));
    }

    #[tokio::test]
    async fn autofill_endpoint_returns_not_found_for_unknown_programs() {
        let (status, body) = post_json(
            router(),
            "/api/v1/programs/elterngeld-plus/autofill",
            json!({ "profile": {} }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["programId"], "elterngeld-plus");
    }

    #[tokio::test]
    async fn autofill_endpoint_fills_known_fields() {
        let (status, body) = post_json(
            router(),
            "/api/v1/programs/kindergeld/autofill",
            json!({ "profile": { "vorname": "Erika", "nachname": "Muster", "kinder_anzahl": "2" } }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filledValues"]["anzahl_kinder"], "2");
        assert_eq!(body["completenessPercent"], 50);
        assert_eq!(
            body["missingRequiredFields"],
            json!(["Familienstand", "Steuer-ID", "IBAN"])
        );
    }

    #[tokio::test]
    async fn completion_and_listing_endpoints_respond() {
        let (status, body) = post_json(
            router(),
            "/api/v1/profile/completion",
            json!({ "profile": { "vorname": "Erika" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["percentage"], 17);

        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/programs")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
