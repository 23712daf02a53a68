use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockpilot_advisor::{
    AdvisorError, AdvisorJob, AttributeMapperJob, AttributeMappingInput, DescriptionAdvisorJob,
    ProductSnapshot, StrategyAdvisorJob,
};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/reorder", get(reorder_advice))
        .route("/strategy", get(strategy_advice))
        .route("/description", post(draft_description))
        .route("/attributes/map", post(map_attributes))
}

fn advisor_error_to_response(e: AdvisorError) -> axum::response::Response {
    match e {
        AdvisorError::InvalidInput(msg) => {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", msg)
        }
        AdvisorError::Failed(msg) => {
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "advisor_failed", msg)
        }
        AdvisorError::Internal(msg) => {
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
        }
    }
}

/// Latest reorder advice batch produced by the background runner. Empty until
/// the first run for this tenant completes.
pub async fn reorder_advice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let advice = services
        .advice_sink()
        .latest(tenant.tenant_id())
        .unwrap_or_default();
    (StatusCode::OK, Json(serde_json::json!({ "advice": advice }))).into_response()
}

/// Runs the strategy advisor on demand over the current read models.
pub async fn strategy_advice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let snapshot = common::business_snapshot(&services, tenant.tenant_id());
    let job = StrategyAdvisorJob::new(tenant.tenant_id(), snapshot);
    match job.run() {
        Ok(advice) => (StatusCode::OK, Json(serde_json::json!({ "advice": advice }))).into_response(),
        Err(e) => advisor_error_to_response(e),
    }
}

pub async fn draft_description(
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(snapshot): Json<ProductSnapshot>,
) -> axum::response::Response {
    let job = DescriptionAdvisorJob::new(tenant.tenant_id(), snapshot);
    match job.run() {
        Ok(advice) => (StatusCode::OK, Json(serde_json::json!({ "advice": advice }))).into_response(),
        Err(e) => advisor_error_to_response(e),
    }
}

pub async fn map_attributes(
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(input): Json<AttributeMappingInput>,
) -> axum::response::Response {
    let job = AttributeMapperJob::new(tenant.tenant_id(), input);
    match job.run() {
        Ok(advice) => (StatusCode::OK, Json(serde_json::json!({ "advice": advice }))).into_response(),
        Err(e) => advisor_error_to_response(e),
    }
}
