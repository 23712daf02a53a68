use stockpilot_advisor::{assess, BusinessSnapshot, StockAssessmentInput};
use stockpilot_auth::{CommandAuthorization, Permission};
use stockpilot_core::TenantId;
use stockpilot_infra::projections::stock_levels::StockItemReadModel;
use stockpilot_purchasing::PurchaseOrderStatus;

use crate::app::services::AppServices;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Count items sitting below their reorder threshold.
pub fn low_stock_count(items: &[StockItemReadModel]) -> usize {
    items
        .iter()
        .filter(|rm| {
            assess(&StockAssessmentInput {
                current_stock: rm.quantity as f64,
                average_daily_sales: rm.average_daily_sales,
                lead_time_days: rm.lead_time_days,
            })
            .map(|a| a.is_low_stock)
            .unwrap_or(false)
        })
        .count()
}

/// Stock value of one item in minor units: on-hand quantity times the
/// product's base price. Items without a priced product contribute zero.
pub fn item_value(services: &AppServices, tenant_id: TenantId, rm: &StockItemReadModel) -> u64 {
    let price = services
        .products_get(tenant_id, &rm.product_id)
        .and_then(|p| p.pricing.base_price)
        .unwrap_or(0);
    (rm.quantity.max(0) as u64).saturating_mul(price)
}

/// Assemble the tenant-wide business snapshot the strategy advisor consumes.
pub fn business_snapshot(services: &AppServices, tenant_id: TenantId) -> BusinessSnapshot {
    let products = services.products_list(tenant_id);
    let stock = services.stock_list(tenant_id);
    let orders = services.purchases_list(tenant_id);

    let active_product_count = products
        .iter()
        .filter(|p| p.status == stockpilot_catalog::ProductStatus::Active)
        .count();
    let draft_product_count = products
        .iter()
        .filter(|p| p.status == stockpilot_catalog::ProductStatus::Draft)
        .count();

    let open_order_count = orders
        .iter()
        .filter(|o| {
            matches!(
                o.status,
                PurchaseOrderStatus::Draft | PurchaseOrderStatus::Approved
            )
        })
        .count();

    let values: Vec<u64> = stock
        .iter()
        .map(|rm| item_value(services, tenant_id, rm))
        .collect();
    let total_value: u64 = values.iter().sum();
    let top_item_value_share = if total_value > 0 {
        values.iter().copied().max().unwrap_or(0) as f64 / total_value as f64
    } else {
        0.0
    };

    BusinessSnapshot {
        tenant_id,
        product_count: products.len(),
        active_product_count,
        draft_product_count,
        stock_item_count: stock.len(),
        low_stock_count: low_stock_count(&stock),
        open_order_count,
        top_item_value_share,
    }
}
