use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use stockpilot_auth::Permission;
use stockpilot_catalog::ProductId;
use stockpilot_core::AggregateId;
use stockpilot_inventory::{
    CorrectStock, IssueStock, ReceiveStock, ReplenishmentPolicy, SetReplenishmentPolicy, StockItem,
    StockItemCommand, StockItemId, TrackProduct,
};

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/items", post(track_item).get(list_items))
        .route("/items/:id", get(get_item))
        .route("/items/:id/receive", post(receive_stock))
        .route("/items/:id/issue", post(issue_stock))
        .route("/items/:id/correct", post(correct_stock))
        .route("/items/:id/policy", post(set_policy))
        .route("/movements", get(list_movements))
}

pub async fn track_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Json(body): Json<dto::TrackItemRequest>,
) -> axum::response::Response {
    let product_agg: AggregateId = match body.product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    let agg = AggregateId::new();
    let item_id = StockItemId::new(agg);

    let cmd = StockItemCommand::TrackProduct(TrackProduct {
        tenant_id: tenant.tenant_id(),
        item_id,
        product_id: ProductId::new(product_agg),
        name: body.name,
        initial_quantity: body.initial_quantity,
        policy: body.policy,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("inventory.items.track")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<StockItem>(
        tenant.tenant_id(),
        agg,
        "inventory.stock_item",
        cmd_auth.inner,
        |_t, aggregate_id| StockItem::empty(StockItemId::new(aggregate_id)),
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

pub async fn receive_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MovementRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let item_id = StockItemId::new(agg);

    let cmd = StockItemCommand::ReceiveStock(ReceiveStock {
        tenant_id: tenant.tenant_id(),
        item_id,
        quantity: body.quantity,
        reference: body.reference,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("inventory.items.receive")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<StockItem>(
        tenant.tenant_id(),
        agg,
        "inventory.stock_item",
        cmd_auth.inner,
        |_t, aggregate_id| StockItem::empty(StockItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
            "stream_version": committed.last().map(|e| e.sequence_number).unwrap_or(0),
        })),
    )
        .into_response()
}

pub async fn issue_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MovementRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let item_id = StockItemId::new(agg);

    let cmd = StockItemCommand::IssueStock(IssueStock {
        tenant_id: tenant.tenant_id(),
        item_id,
        quantity: body.quantity,
        reference: body.reference,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("inventory.items.issue")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<StockItem>(
        tenant.tenant_id(),
        agg,
        "inventory.stock_item",
        cmd_auth.inner,
        |_t, aggregate_id| StockItem::empty(StockItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
            "stream_version": committed.last().map(|e| e.sequence_number).unwrap_or(0),
        })),
    )
        .into_response()
}

pub async fn correct_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CorrectStockRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let item_id = StockItemId::new(agg);

    let cmd = StockItemCommand::CorrectStock(CorrectStock {
        tenant_id: tenant.tenant_id(),
        item_id,
        counted_quantity: body.counted_quantity,
        reason: body.reason,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("inventory.items.correct")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<StockItem>(
        tenant.tenant_id(),
        agg,
        "inventory.stock_item",
        cmd_auth.inner,
        |_t, aggregate_id| StockItem::empty(StockItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
            "stream_version": committed.last().map(|e| e.sequence_number).unwrap_or(0),
        })),
    )
        .into_response()
}

pub async fn set_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(policy): Json<ReplenishmentPolicy>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let item_id = StockItemId::new(agg);

    let cmd = StockItemCommand::SetReplenishmentPolicy(SetReplenishmentPolicy {
        tenant_id: tenant.tenant_id(),
        item_id,
        policy,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("inventory.items.policy.set")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<StockItem>(
        tenant.tenant_id(),
        agg,
        "inventory.stock_item",
        cmd_auth.inner,
        |_t, aggregate_id| StockItem::empty(StockItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let item_id = StockItemId::new(agg);
    match services.stock_get(tenant.tenant_id(), &item_id) {
        Some(rm) => (StatusCode::OK, Json(dto::stock_item_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "stock item not found"),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let items = services
        .stock_list(tenant.tenant_id())
        .into_iter()
        .map(dto::stock_item_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Movement ledger across the tenant, newest first, with optional item and
/// kind filters.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Query(query): Query<dto::MovementsQuery>,
) -> axum::response::Response {
    let mut records = match &query.item {
        Some(raw) => {
            let agg: AggregateId = match raw.parse() {
                Ok(v) => v,
                Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
            };
            services.movements_for_item(tenant.tenant_id(), &StockItemId::new(agg))
        }
        None => services.movements_list(tenant.tenant_id()),
    };

    if let Some(kind) = &query.kind {
        records.retain(|rec| rec.kind.as_str() == kind);
    }

    records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    let limit = query.limit.unwrap_or(100);
    records.truncate(limit);

    let items = records.into_iter().map(dto::movement_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
