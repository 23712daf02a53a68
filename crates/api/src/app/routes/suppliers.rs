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
use stockpilot_core::AggregateId;
use stockpilot_suppliers::{
    RegisterSupplier, ReinstateSupplier, SetLeadTime, Supplier, SupplierCommand, SupplierId,
    SuspendSupplier, UpdateContact,
};

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_supplier).get(list_suppliers))
        .route("/:id", get(get_supplier).patch(update_supplier))
        .route("/:id/lead-time", post(set_lead_time))
        .route("/:id/suspend", post(suspend_supplier))
        .route("/:id/reinstate", post(reinstate_supplier))
}

pub async fn register_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Json(body): Json<dto::RegisterSupplierRequest>,
) -> axum::response::Response {
    let agg = AggregateId::new();
    let supplier_id = SupplierId::new(agg);

    let cmd = SupplierCommand::RegisterSupplier(RegisterSupplier {
        tenant_id: tenant.tenant_id(),
        supplier_id,
        name: body.name,
        contact: body.contact,
        lead_time_days: body.lead_time_days,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("suppliers.register")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Supplier>(
        tenant.tenant_id(),
        agg,
        "suppliers.supplier",
        cmd_auth.inner,
        |_t, aggregate_id| Supplier::empty(SupplierId::new(aggregate_id)),
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

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateSupplierRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };
    let supplier_id = SupplierId::new(agg);

    let cmd = SupplierCommand::UpdateContact(UpdateContact {
        tenant_id: tenant.tenant_id(),
        supplier_id,
        name: body.name,
        contact: body.contact,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("suppliers.update")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Supplier>(
        tenant.tenant_id(),
        agg,
        "suppliers.supplier",
        cmd_auth.inner,
        |_t, aggregate_id| Supplier::empty(SupplierId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn set_lead_time(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetLeadTimeRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };
    let supplier_id = SupplierId::new(agg);

    let cmd = SupplierCommand::SetLeadTime(SetLeadTime {
        tenant_id: tenant.tenant_id(),
        supplier_id,
        lead_time_days: body.lead_time_days,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("suppliers.lead_time.set")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Supplier>(
        tenant.tenant_id(),
        agg,
        "suppliers.supplier",
        cmd_auth.inner,
        |_t, aggregate_id| Supplier::empty(SupplierId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn suspend_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SuspendSupplierRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };
    let supplier_id = SupplierId::new(agg);

    let cmd = SupplierCommand::SuspendSupplier(SuspendSupplier {
        tenant_id: tenant.tenant_id(),
        supplier_id,
        reason: body.reason,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("suppliers.suspend")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Supplier>(
        tenant.tenant_id(),
        agg,
        "suppliers.supplier",
        cmd_auth.inner,
        |_t, aggregate_id| Supplier::empty(SupplierId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn reinstate_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };
    let supplier_id = SupplierId::new(agg);

    let cmd = SupplierCommand::ReinstateSupplier(ReinstateSupplier {
        tenant_id: tenant.tenant_id(),
        supplier_id,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("suppliers.reinstate")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<Supplier>(
        tenant.tenant_id(),
        agg,
        "suppliers.supplier",
        cmd_auth.inner,
        |_t, aggregate_id| Supplier::empty(SupplierId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };
    let supplier_id = SupplierId::new(agg);
    match services.suppliers_get(tenant.tenant_id(), &supplier_id) {
        Some(rm) => (StatusCode::OK, Json(dto::supplier_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "supplier not found"),
    }
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let items = services
        .suppliers_list(tenant.tenant_id())
        .into_iter()
        .map(dto::supplier_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
