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
use stockpilot_catalog::ProductId;
use stockpilot_core::AggregateId;
use stockpilot_inventory::{ReceiveStock, StockItem, StockItemCommand, StockItemId};
use stockpilot_purchasing::{
    AddLine, Approve, CancelOrder, CreatePurchaseOrder, PurchaseOrder, PurchaseOrderCommand,
    PurchaseOrderEvent, PurchaseOrderId, ReceiveGoods,
};

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/lines", post(add_line))
        .route("/:id/approve", post(approve_order))
        .route("/:id/receive", post(receive_order))
        .route("/:id/cancel", post(cancel_order))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Json(body): Json<dto::CreatePurchaseOrderRequest>,
) -> axum::response::Response {
    let supplier_agg: AggregateId = match body.supplier_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };

    // A supplier the read model knows to be suspended cannot take new orders.
    // An unknown supplier passes: the directory is eventually consistent.
    let supplier_id = stockpilot_suppliers::SupplierId::new(supplier_agg);
    if let Some(supplier) = services.suppliers_get(tenant.tenant_id(), &supplier_id) {
        if supplier.status == stockpilot_suppliers::SupplierStatus::Suspended {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invariant_violation",
                "supplier is suspended",
            );
        }
    }

    let agg = AggregateId::new();
    let order_id = PurchaseOrderId::new(agg);

    let cmd = PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        supplier_id,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("purchases.orders.create")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let mut committed_total = match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        agg,
        "purchasing.order",
        cmd_auth.inner,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(c) => c.len(),
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    // Optional initial lines, appended in request order.
    for line in body.lines {
        let product_agg: AggregateId = match line.product_id.parse() {
            Ok(v) => v,
            Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
        };

        let line_cmd = PurchaseOrderCommand::AddLine(AddLine {
            tenant_id: tenant.tenant_id(),
            order_id,
            product_id: ProductId::new(product_agg),
            quantity: line.quantity,
            occurred_at: Utc::now(),
        });

        let line_auth = CmdAuth {
            inner: line_cmd,
            required: vec![Permission::new("purchases.orders.add_line")],
        };
        if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &line_auth) {
            return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
        }

        match services.dispatch::<PurchaseOrder>(
            tenant.tenant_id(),
            agg,
            "purchasing.order",
            line_auth.inner,
            |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
        ) {
            Ok(c) => committed_total += c.len(),
            Err(e) => return errors::dispatch_error_to_response(e),
        }
    }

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed_total,
        })),
    )
        .into_response()
}

pub async fn add_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PurchaseOrderLineRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let order_id = PurchaseOrderId::new(agg);

    let product_agg: AggregateId = match body.product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    let cmd = PurchaseOrderCommand::AddLine(AddLine {
        tenant_id: tenant.tenant_id(),
        order_id,
        product_id: ProductId::new(product_agg),
        quantity: body.quantity,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("purchases.orders.add_line")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        agg,
        "purchasing.order",
        cmd_auth.inner,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn approve_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let order_id = PurchaseOrderId::new(agg);

    let cmd = PurchaseOrderCommand::Approve(Approve {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("purchases.orders.approve")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        agg,
        "purchasing.order",
        cmd_auth.inner,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

/// Marks the order received, then books each received line into the stock
/// ledger of the item tracking that product. Products without a tracked item
/// are skipped.
pub async fn receive_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let order_id = PurchaseOrderId::new(agg);

    let cmd = PurchaseOrderCommand::ReceiveGoods(ReceiveGoods {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("purchases.orders.receive")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        agg,
        "purchasing.order",
        cmd_auth.inner,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    let tracked = services.stock_list(tenant.tenant_id());
    let mut stock_receipts = 0usize;
    for stored in &committed {
        let Ok(PurchaseOrderEvent::GoodsReceived(goods)) =
            serde_json::from_value::<PurchaseOrderEvent>(stored.payload.clone())
        else {
            continue;
        };

        for line in goods.lines {
            let Some(item) = tracked.iter().find(|rm| rm.product_id == line.product_id) else {
                tracing::debug!(
                    order_id = %order_id,
                    product_id = %line.product_id,
                    "received product has no tracked stock item, skipping"
                );
                continue;
            };

            let receive = StockItemCommand::ReceiveStock(ReceiveStock {
                tenant_id: tenant.tenant_id(),
                item_id: item.item_id,
                quantity: line.quantity,
                reference: Some(format!("po:{order_id}")),
                occurred_at: Utc::now(),
            });

            match services.dispatch::<StockItem>(
                tenant.tenant_id(),
                item.item_id.0,
                "inventory.stock_item",
                receive,
                |_t, aggregate_id| StockItem::empty(StockItemId::new(aggregate_id)),
            ) {
                Ok(_) => stock_receipts += 1,
                Err(e) => {
                    tracing::warn!(
                        order_id = %order_id,
                        item_id = %item.item_id,
                        "stock receipt failed: {e:?}"
                    );
                }
            }
        }
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
            "stock_receipts": stock_receipts,
        })),
    )
        .into_response()
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(principal): Extension<crate::context::PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelOrderRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let order_id = PurchaseOrderId::new(agg);

    let cmd = PurchaseOrderCommand::CancelOrder(CancelOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        reason: body.reason,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("purchases.orders.cancel")],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let committed = match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        agg,
        "purchasing.order",
        cmd_auth.inner,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({"id": agg.to_string(), "events_committed": committed.len()}))).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let order_id = PurchaseOrderId::new(agg);
    match services.purchases_get(tenant.tenant_id(), &order_id) {
        Some(rm) => (StatusCode::OK, Json(dto::purchase_order_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase order not found"),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let items = services
        .purchases_list(tenant.tenant_id())
        .into_iter()
        .map(dto::purchase_order_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
