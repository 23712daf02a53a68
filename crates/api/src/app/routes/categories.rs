use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use stockpilot_auth::Permission;
use stockpilot_catalog::{
    ArchiveCategory, Category, CategoryCommand, CategoryId, CreateCategory, RenameCategory,
};
use stockpilot_core::AggregateId;

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route("/:id", get(get_category))
        .route("/:id/rename", post(rename_category))
        .route("/:id/archive", post(archive_category))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> axum::response::Response {
    let agg = AggregateId::new();
    let category_id = CategoryId::new(agg);

    let cmd = CategoryCommand::CreateCategory(CreateCategory {
        tenant_id: tenant.tenant_id(),
        category_id,
        name: body.name,
        description: body.description.unwrap_or_default(),
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("categories.create")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Category>(
        tenant.tenant_id(),
        agg,
        "catalog.category",
        cmd_auth.inner,
        |_t, aggregate_id| Category::empty(CategoryId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn rename_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RenameCategoryRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid category id"),
    };
    let category_id = CategoryId::new(agg);

    let cmd = CategoryCommand::RenameCategory(RenameCategory {
        tenant_id: tenant.tenant_id(),
        category_id,
        name: body.name,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("categories.rename")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Category>(
        tenant.tenant_id(),
        agg,
        "catalog.category",
        cmd_auth.inner,
        |_t, aggregate_id| Category::empty(CategoryId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn archive_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid category id"),
    };
    let category_id = CategoryId::new(agg);

    let cmd = CategoryCommand::ArchiveCategory(ArchiveCategory {
        tenant_id: tenant.tenant_id(),
        category_id,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("categories.archive")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Category>(
        tenant.tenant_id(),
        agg,
        "catalog.category",
        cmd_auth.inner,
        |_t, aggregate_id| Category::empty(CategoryId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid category id"),
    };
    let category_id = CategoryId::new(agg);
    match services.categories_get(tenant.tenant_id(), &category_id) {
        Some(rm) => (StatusCode::OK, Json(dto::category_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "category not found"),
    }
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let items = services
        .categories_list(tenant.tenant_id())
        .into_iter()
        .map(dto::category_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
