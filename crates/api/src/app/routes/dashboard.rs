use std::sync::Arc;

use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use chrono::Utc;

use stockpilot_purchasing::PurchaseOrderStatus;

use crate::app::routes::common;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(overview))
}

/// Tenant-wide operational overview, assembled from the read models.
pub async fn overview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let tenant_id = tenant.tenant_id();

    let products = services.products_list(tenant_id);
    let categories = services.categories_list(tenant_id);
    let suppliers = services.suppliers_list(tenant_id);
    let stock = services.stock_list(tenant_id);
    let orders = services.purchases_list(tenant_id);
    let movements = services.movements_list(tenant_id);

    let total_on_hand: i64 = stock.iter().map(|rm| rm.quantity).sum();
    let stock_value: u64 = stock
        .iter()
        .map(|rm| common::item_value(&services, tenant_id, rm))
        .sum();
    let open_purchase_orders = orders
        .iter()
        .filter(|o| {
            matches!(
                o.status,
                PurchaseOrderStatus::Draft | PurchaseOrderStatus::Approved
            )
        })
        .count();

    let week_ago = Utc::now() - chrono::Duration::days(7);
    let movements_last_7_days = movements.iter().filter(|m| m.occurred_at >= week_ago).count();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "products": products.len(),
            "categories": categories.len(),
            "suppliers": suppliers.len(),
            "stock_items": stock.len(),
            "total_on_hand": total_on_hand,
            "stock_value": stock_value,
            "low_stock_items": common::low_stock_count(&stock),
            "open_purchase_orders": open_purchase_orders,
            "movements_last_7_days": movements_last_7_days,
        })),
    )
        .into_response()
}
