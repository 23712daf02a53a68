use std::collections::BTreeMap;

use serde::Deserialize;

use stockpilot_advisor::{assess, StockAssessmentInput};
use stockpilot_infra::projections::{
    categories::CategoryReadModel,
    movements::MovementRecord,
    products::ProductReadModel,
    purchasing::PurchaseOrderReadModel,
    stock_levels::StockItemReadModel,
    suppliers::SupplierReadModel,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub pricing: Option<stockpilot_catalog::PricingMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignCategoryRequest {
    pub category_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAttributesRequest {
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSupplierRequest {
    pub name: String,
    pub contact: Option<stockpilot_suppliers::ContactInfo>,
    pub lead_time_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    pub contact: Option<stockpilot_suppliers::ContactInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SetLeadTimeRequest {
    pub lead_time_days: u32,
}

#[derive(Debug, Deserialize)]
pub struct SuspendSupplierRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackItemRequest {
    pub product_id: String,
    pub name: String,
    pub initial_quantity: i64,
    pub policy: Option<stockpilot_inventory::ReplenishmentPolicy>,
}

/// Shared body for receive and issue movements.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub quantity: i64,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CorrectStockRequest {
    pub counted_quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub item: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: String,
    #[serde(default)]
    pub lines: Vec<PurchaseOrderLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(rm: ProductReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.product_id.to_string(),
        "sku": rm.sku,
        "name": rm.name,
        "description": rm.description,
        "status": format!("{:?}", rm.status).to_lowercase(),
        "category_id": rm.category.map(|c| c.to_string()),
        "attributes": rm.attributes,
        "pricing": {
            "base_price": rm.pricing.base_price,
            "currency": rm.pricing.currency,
        }
    })
}

pub fn category_to_json(rm: CategoryReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.category_id.to_string(),
        "name": rm.name,
        "description": rm.description,
        "status": format!("{:?}", rm.status).to_lowercase(),
    })
}

pub fn supplier_to_json(rm: SupplierReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.supplier_id.to_string(),
        "name": rm.name,
        "contact": {
            "email": rm.contact.email,
            "phone": rm.contact.phone,
            "address": rm.contact.address,
        },
        "lead_time_days": rm.lead_time_days,
        "status": format!("{:?}", rm.status).to_lowercase(),
    })
}

/// Stock item read model plus its reorder assessment, computed inline from
/// the item's replenishment policy.
pub fn stock_item_to_json(rm: StockItemReadModel) -> serde_json::Value {
    let assessment = assess(&StockAssessmentInput {
        current_stock: rm.quantity as f64,
        average_daily_sales: rm.average_daily_sales,
        lead_time_days: rm.lead_time_days,
    })
    .ok();

    serde_json::json!({
        "id": rm.item_id.to_string(),
        "product_id": rm.product_id.to_string(),
        "name": rm.name,
        "quantity": rm.quantity,
        "policy": {
            "average_daily_sales": rm.average_daily_sales,
            "lead_time_days": rm.lead_time_days,
        },
        "assessment": assessment.map(|a| serde_json::json!({
            "is_low_stock": a.is_low_stock,
            "threshold": a.threshold,
            "reorder_quantity": a.reorder_quantity,
        })),
    })
}

pub fn movement_to_json(rec: MovementRecord) -> serde_json::Value {
    serde_json::json!({
        "item_id": rec.item_id.to_string(),
        "kind": rec.kind.as_str(),
        "quantity": rec.quantity,
        "resulting_quantity": rec.resulting_quantity,
        "reference": rec.reference,
        "occurred_at": rec.occurred_at.to_rfc3339(),
    })
}

pub fn purchase_order_to_json(rm: PurchaseOrderReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.order_id.to_string(),
        "supplier_id": rm.supplier_id.to_string(),
        "status": format!("{:?}", rm.status).to_lowercase(),
        "lines": rm.lines.into_iter().map(|l| serde_json::json!({
            "line_no": l.line_no,
            "product_id": l.product_id.to_string(),
            "quantity": l.quantity,
        })).collect::<Vec<_>>()
    })
}
