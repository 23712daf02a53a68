use serde_json::json;

use stockpilot_core::TenantId;

use crate::advice::{Advice, AdvisorError};
use crate::assessment::{assess, StockAssessmentInput};
use crate::job::AdvisorJob;
use crate::scheduler::{StockItemSnapshot, StockSnapshot};

pub const REORDER_JOB: &str = "inventory.reorder";

/// Reorder advisor: applies the low-stock assessment to every tracked item
/// in a tenant snapshot.
///
/// Emits one advice per low-stock item (threshold, on-hand quantity,
/// recommended reorder quantity) followed by a tenant-wide summary advice
/// whose score is the low-stock count.
#[derive(Debug, Clone)]
pub struct ReorderAdvisorJob {
    tenant_id: TenantId,
    input: StockSnapshot,
}

impl ReorderAdvisorJob {
    pub fn new(tenant_id: TenantId, input: StockSnapshot) -> Self {
        Self { tenant_id, input }
    }
}

impl AdvisorJob for ReorderAdvisorJob {
    type Input = StockSnapshot;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn input(&self) -> &Self::Input {
        &self.input
    }

    fn run(&self) -> Result<Vec<Advice>, AdvisorError> {
        if self.input.tenant_id != self.tenant_id {
            return Err(AdvisorError::InvalidInput(
                "tenant_id mismatch between job and snapshot".to_string(),
            ));
        }

        let mut advice: Vec<Advice> = Vec::new();

        for item in &self.input.items {
            if let Some(a) = assess_item(self.tenant_id, item)? {
                advice.push(a);
            }
        }

        let low_count = advice.len();
        advice.push(
            Advice::new(self.tenant_id, REORDER_JOB, low_count as f64, 1.0)
                .with_summary(format!(
                    "{} of {} tracked stock item(s) are below their reorder threshold",
                    low_count,
                    self.input.items.len()
                ))
                .with_details(json!({
                    "kind": "inventory.reorder_summary",
                    "tenant_id": self.tenant_id.to_string(),
                    "evaluated": self.input.items.len(),
                    "low_stock": low_count,
                })),
        );

        Ok(advice)
    }
}

fn assess_item(
    tenant_id: TenantId,
    item: &StockItemSnapshot,
) -> Result<Option<Advice>, AdvisorError> {
    if item.quantity < 0 {
        return Err(AdvisorError::InvalidInput(format!(
            "item {} has negative quantity {}",
            item.item_id, item.quantity
        )));
    }

    let result = assess(&StockAssessmentInput {
        current_stock: item.quantity as f64,
        average_daily_sales: item.average_daily_sales,
        lead_time_days: item.lead_time_days,
    })?;

    if !result.is_low_stock {
        return Ok(None);
    }

    let advice = Advice::new(tenant_id, REORDER_JOB, result.reorder_quantity as f64, 1.0)
        .about(item.item_id.clone())
        .with_summary(format!(
            "{} is low on stock: {} on hand, threshold {:.1}; order {} unit(s)",
            item.name, item.quantity, result.threshold, result.reorder_quantity
        ))
        .with_details(json!({
            "kind": "inventory.reorder_item",
            "item_id": item.item_id,
            "product_id": item.product_id,
            "name": item.name,
            "quantity": item.quantity,
            "threshold": result.threshold,
            "reorder_quantity": result.reorder_quantity,
            "average_daily_sales": item.average_daily_sales,
            "lead_time_days": item.lead_time_days,
        }));

    Ok(Some(advice))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_item(item_id: &str, quantity: i64, sales: f64, lead: f64) -> StockItemSnapshot {
        StockItemSnapshot {
            item_id: item_id.to_string(),
            product_id: format!("product-{item_id}"),
            name: format!("Item {item_id}"),
            quantity,
            average_daily_sales: sales,
            lead_time_days: lead,
        }
    }

    #[test]
    fn emits_one_advice_per_low_item_plus_summary() {
        let tenant_id = TenantId::new();
        let snapshot = StockSnapshot {
            tenant_id,
            items: vec![
                // threshold 60, stock 50 -> low, reorder 90
                snapshot_item("a", 50, 5.0, 10.0),
                // threshold 60, stock 200 -> fine
                snapshot_item("b", 200, 5.0, 10.0),
                // no policy -> threshold 0 -> never low
                snapshot_item("c", 0, 0.0, 0.0),
            ],
        };

        let advice = ReorderAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        assert_eq!(advice.len(), 2);

        let item_advice = &advice[0];
        assert_eq!(item_advice.job, REORDER_JOB);
        assert_eq!(item_advice.subject.as_deref(), Some("a"));
        assert_eq!(item_advice.score, 90.0);
        assert_eq!(item_advice.details["threshold"], 60.0);
        assert_eq!(item_advice.details["reorder_quantity"], 90);

        let summary = &advice[1];
        assert!(summary.subject.is_none());
        assert_eq!(summary.score, 1.0);
        assert_eq!(summary.details["evaluated"], 3);
        assert_eq!(summary.details["low_stock"], 1);
    }

    #[test]
    fn empty_snapshot_yields_only_the_summary() {
        let tenant_id = TenantId::new();
        let snapshot = StockSnapshot {
            tenant_id,
            items: vec![],
        };

        let advice = ReorderAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].score, 0.0);
    }

    #[test]
    fn rejects_snapshot_for_a_different_tenant() {
        let tenant_id = TenantId::new();
        let snapshot = StockSnapshot {
            tenant_id: TenantId::new(),
            items: vec![],
        };

        let err = ReorderAdvisorJob::new(tenant_id, snapshot).run().unwrap_err();
        match err {
            AdvisorError::InvalidInput(msg) => assert!(msg.contains("tenant_id mismatch")),
            _ => panic!("Expected InvalidInput for tenant mismatch"),
        }
    }

    #[test]
    fn same_snapshot_yields_same_advice() {
        let tenant_id = TenantId::new();
        let snapshot = StockSnapshot {
            tenant_id,
            items: vec![snapshot_item("a", 10, 2.0, 14.0)],
        };

        let first = ReorderAdvisorJob::new(tenant_id, snapshot.clone()).run().unwrap();
        let second = ReorderAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        assert_eq!(first, second);
    }
}
