use serde::{Deserialize, Serialize};
use serde_json::json;

use stockpilot_core::TenantId;

use crate::advice::{Advice, AdvisorError};
use crate::job::AdvisorJob;

pub const STRATEGY_JOB: &str = "business.strategy";

/// Aggregated view of a tenant's business, assembled from read models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSnapshot {
    pub tenant_id: TenantId,
    pub product_count: usize,
    pub active_product_count: usize,
    pub draft_product_count: usize,
    pub stock_item_count: usize,
    pub low_stock_count: usize,
    pub open_order_count: usize,
    /// Share of total stock value held by the single largest item, in \[0, 1\].
    pub top_item_value_share: f64,
}

/// One entry in the strategy rule table.
///
/// Conditions and rendering are plain function pointers so the table stays
/// a static, deterministic artifact.
#[derive(Clone)]
pub struct StrategyRule {
    pub code: &'static str,
    pub priority: i32,
    pub condition: fn(&BusinessSnapshot) -> bool,
    pub render: fn(&BusinessSnapshot) -> (f64, String),
}

impl core::fmt::Debug for StrategyRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StrategyRule")
            .field("code", &self.code)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Built-in rule table, ordered by priority (highest first once sorted).
pub fn default_rules() -> Vec<StrategyRule> {
    vec![
        StrategyRule {
            code: "replenish-low-stock",
            priority: 100,
            condition: |s| s.stock_item_count > 0 && low_ratio(s) > 0.3,
            render: |s| {
                (
                    low_ratio(s),
                    format!(
                        "{} of {} tracked items ({:.0}%) are below their reorder threshold; \
                         review replenishment policies and expedite open purchase orders",
                        s.low_stock_count,
                        s.stock_item_count,
                        low_ratio(s) * 100.0
                    ),
                )
            },
        },
        StrategyRule {
            code: "diversify-stock-value",
            priority: 90,
            condition: |s| s.stock_item_count >= 2 && s.top_item_value_share > 0.5,
            render: |s| {
                (
                    s.top_item_value_share,
                    format!(
                        "{:.0}% of stock value sits in a single item; spread purchasing \
                         across more products to reduce exposure",
                        s.top_item_value_share * 100.0
                    ),
                )
            },
        },
        StrategyRule {
            code: "activate-draft-products",
            priority: 80,
            condition: |s| s.draft_product_count > 0 && s.draft_product_count * 2 >= s.product_count,
            render: |s| {
                (
                    s.draft_product_count as f64 / s.product_count.max(1) as f64,
                    format!(
                        "{} of {} products are still drafts; finish and activate them so \
                         they can be stocked",
                        s.draft_product_count, s.product_count
                    ),
                )
            },
        },
        StrategyRule {
            code: "clear-purchase-backlog",
            priority: 70,
            condition: |s| s.open_order_count > 10,
            render: |s| {
                (
                    s.open_order_count as f64,
                    format!(
                        "{} purchase orders are open; receive or cancel stale orders to \
                         keep supplier lead times honest",
                        s.open_order_count
                    ),
                )
            },
        },
        StrategyRule {
            code: "expand-catalog",
            priority: 60,
            condition: |s| s.product_count < 3,
            render: |s| {
                (
                    s.product_count as f64,
                    format!(
                        "the catalog holds only {} product(s); add products to spread \
                         demand across suppliers",
                        s.product_count
                    ),
                )
            },
        },
    ]
}

fn low_ratio(s: &BusinessSnapshot) -> f64 {
    if s.stock_item_count == 0 {
        return 0.0;
    }
    s.low_stock_count as f64 / s.stock_item_count as f64
}

/// Strategy advisor: evaluates the rule table over a business snapshot.
///
/// Emits one advice per matched rule in priority order. When nothing
/// matches, emits a single steady-state advice so callers always get a
/// deterministic, non-empty answer.
#[derive(Debug, Clone)]
pub struct StrategyAdvisorJob {
    tenant_id: TenantId,
    input: BusinessSnapshot,
    rules: Vec<StrategyRule>,
}

impl StrategyAdvisorJob {
    pub fn new(tenant_id: TenantId, input: BusinessSnapshot) -> Self {
        Self::with_rules(tenant_id, input, default_rules())
    }

    pub fn with_rules(tenant_id: TenantId, input: BusinessSnapshot, rules: Vec<StrategyRule>) -> Self {
        let mut rules = rules;
        rules.sort_by_key(|r| -r.priority);
        Self {
            tenant_id,
            input,
            rules,
        }
    }
}

impl AdvisorJob for StrategyAdvisorJob {
    type Input = BusinessSnapshot;

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

        if self.input.low_stock_count > self.input.stock_item_count {
            return Err(AdvisorError::InvalidInput(
                "low_stock_count cannot exceed stock_item_count".to_string(),
            ));
        }

        if !self.input.top_item_value_share.is_finite()
            || !(0.0..=1.0).contains(&self.input.top_item_value_share)
        {
            return Err(AdvisorError::InvalidInput(
                "top_item_value_share must be within [0, 1]".to_string(),
            ));
        }

        let mut advice: Vec<Advice> = Vec::new();

        for rule in &self.rules {
            if !(rule.condition)(&self.input) {
                continue;
            }

            let (score, summary) = (rule.render)(&self.input);
            advice.push(
                Advice::new(self.tenant_id, STRATEGY_JOB, score, 0.8)
                    .about(rule.code)
                    .with_summary(summary)
                    .with_details(json!({
                        "kind": "business.strategy_rule",
                        "rule": rule.code,
                        "priority": rule.priority,
                        "snapshot": self.input,
                    })),
            );
        }

        if advice.is_empty() {
            advice.push(
                Advice::new(self.tenant_id, STRATEGY_JOB, 0.0, 1.0)
                    .about("steady-state")
                    .with_summary("no strategy concerns detected for this tenant")
                    .with_details(json!({
                        "kind": "business.strategy_rule",
                        "rule": "steady-state",
                        "snapshot": self.input,
                    })),
            );
        }

        Ok(advice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_snapshot(tenant_id: TenantId) -> BusinessSnapshot {
        BusinessSnapshot {
            tenant_id,
            product_count: 12,
            active_product_count: 11,
            draft_product_count: 1,
            stock_item_count: 10,
            low_stock_count: 1,
            open_order_count: 2,
            top_item_value_share: 0.2,
        }
    }

    #[test]
    fn healthy_snapshot_yields_steady_state() {
        let tenant_id = TenantId::new();
        let advice = StrategyAdvisorJob::new(tenant_id, healthy_snapshot(tenant_id))
            .run()
            .unwrap();
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].subject.as_deref(), Some("steady-state"));
        assert_eq!(advice[0].score, 0.0);
    }

    #[test]
    fn matched_rules_come_out_in_priority_order() {
        let tenant_id = TenantId::new();
        let mut snapshot = healthy_snapshot(tenant_id);
        snapshot.low_stock_count = 6; // low ratio 0.6 -> replenish rule (prio 100)
        snapshot.top_item_value_share = 0.7; // concentration rule (prio 90)
        snapshot.open_order_count = 15; // backlog rule (prio 70)

        let advice = StrategyAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        let codes: Vec<&str> = advice.iter().filter_map(|a| a.subject.as_deref()).collect();
        assert_eq!(
            codes,
            vec![
                "replenish-low-stock",
                "diversify-stock-value",
                "clear-purchase-backlog"
            ]
        );
        assert!((advice[0].score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn small_catalog_triggers_expand_rule() {
        let tenant_id = TenantId::new();
        let mut snapshot = healthy_snapshot(tenant_id);
        snapshot.product_count = 2;
        snapshot.active_product_count = 2;
        snapshot.draft_product_count = 0;

        let advice = StrategyAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        let codes: Vec<&str> = advice.iter().filter_map(|a| a.subject.as_deref()).collect();
        assert!(codes.contains(&"expand-catalog"));
    }

    #[test]
    fn inconsistent_counts_are_rejected() {
        let tenant_id = TenantId::new();
        let mut snapshot = healthy_snapshot(tenant_id);
        snapshot.low_stock_count = snapshot.stock_item_count + 1;

        let err = StrategyAdvisorJob::new(tenant_id, snapshot).run().unwrap_err();
        match err {
            AdvisorError::InvalidInput(msg) => assert!(msg.contains("low_stock_count")),
            _ => panic!("Expected InvalidInput for inconsistent counts"),
        }
    }

    #[test]
    fn same_snapshot_yields_same_advice() {
        let tenant_id = TenantId::new();
        let mut snapshot = healthy_snapshot(tenant_id);
        snapshot.low_stock_count = 9;

        let first = StrategyAdvisorJob::new(tenant_id, snapshot.clone()).run().unwrap();
        let second = StrategyAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        assert_eq!(first, second);
    }
}
