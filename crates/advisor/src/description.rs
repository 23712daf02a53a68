use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use stockpilot_core::TenantId;

use crate::advice::{Advice, AdvisorError};
use crate::job::AdvisorJob;

pub const DESCRIPTION_JOB: &str = "catalog.description";

/// Snapshot of the catalog fields a description is drafted from.
///
/// Attributes are a `BTreeMap` so iteration order (and therefore the drafted
/// text) is stable regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub name: String,
    pub category: Option<String>,
    pub attributes: BTreeMap<String, String>,
    /// Unit price in minor units.
    pub base_price: Option<u64>,
    pub currency: Option<String>,
}

/// Description advisor: drafts a product description from catalog fields.
///
/// Pure template assembly. No randomness, no model call: the same snapshot
/// always yields the same text.
#[derive(Debug, Clone)]
pub struct DescriptionAdvisorJob {
    tenant_id: TenantId,
    input: ProductSnapshot,
}

impl DescriptionAdvisorJob {
    pub fn new(tenant_id: TenantId, input: ProductSnapshot) -> Self {
        Self { tenant_id, input }
    }
}

impl AdvisorJob for DescriptionAdvisorJob {
    type Input = ProductSnapshot;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn input(&self) -> &Self::Input {
        &self.input
    }

    fn run(&self) -> Result<Vec<Advice>, AdvisorError> {
        let name = self.input.name.trim();
        if name.is_empty() {
            return Err(AdvisorError::InvalidInput(
                "product name is required to draft a description".to_string(),
            ));
        }

        let mut facts_used = 1usize;
        let mut description = name.to_string();

        if let Some(category) = self.input.category.as_deref().filter(|c| !c.trim().is_empty()) {
            description.push_str(&format!(", part of the {} range", category.trim()));
            facts_used += 1;
        }

        if !self.input.attributes.is_empty() {
            let attrs: Vec<String> = self
                .input
                .attributes
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect();
            description.push_str(&format!(", featuring {}", attrs.join(", ")));
            facts_used += self.input.attributes.len();
        }

        description.push('.');

        if let (Some(price), Some(currency)) = (self.input.base_price, &self.input.currency) {
            description.push_str(&format!(
                " Priced at {} {}.",
                format_minor_units(price),
                currency
            ));
            facts_used += 1;
        }

        Ok(vec![
            Advice::new(self.tenant_id, DESCRIPTION_JOB, facts_used as f64, 1.0)
                .about(self.input.product_id.clone())
                .with_summary(description.clone())
                .with_details(json!({
                    "kind": "catalog.description_draft",
                    "product_id": self.input.product_id,
                    "facts_used": facts_used,
                    "description": description,
                })),
        ])
    }
}

fn format_minor_units(price: u64) -> String {
    format!("{}.{:02}", price / 100, price % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_snapshot() -> ProductSnapshot {
        let mut attributes = BTreeMap::new();
        attributes.insert("material".to_string(), "steel".to_string());
        attributes.insert("finish".to_string(), "zinc".to_string());
        ProductSnapshot {
            product_id: "product-1".to_string(),
            name: "Steel Bolt M8".to_string(),
            category: Some("Fasteners".to_string()),
            attributes,
            base_price: Some(1250),
            currency: Some("EUR".to_string()),
        }
    }

    #[test]
    fn drafts_description_from_all_facts() {
        let tenant_id = TenantId::new();
        let advice = DescriptionAdvisorJob::new(tenant_id, full_snapshot())
            .run()
            .unwrap();
        assert_eq!(advice.len(), 1);

        let draft = &advice[0];
        assert_eq!(draft.subject.as_deref(), Some("product-1"));
        assert_eq!(
            draft.summary.as_deref(),
            Some(
                "Steel Bolt M8, part of the Fasteners range, featuring finish: zinc, \
                 material: steel. Priced at 12.50 EUR."
            )
        );
        // name + category + 2 attributes + price
        assert_eq!(draft.score, 5.0);
    }

    #[test]
    fn attribute_order_is_stable() {
        let tenant_id = TenantId::new();
        let mut reversed = full_snapshot();
        reversed.attributes = BTreeMap::new();
        reversed.attributes.insert("finish".to_string(), "zinc".to_string());
        reversed.attributes.insert("material".to_string(), "steel".to_string());

        let first = DescriptionAdvisorJob::new(tenant_id, full_snapshot()).run().unwrap();
        let second = DescriptionAdvisorJob::new(tenant_id, reversed).run().unwrap();
        assert_eq!(first[0].summary, second[0].summary);
    }

    #[test]
    fn name_only_snapshot_still_drafts() {
        let tenant_id = TenantId::new();
        let snapshot = ProductSnapshot {
            product_id: "product-2".to_string(),
            name: "Washer".to_string(),
            category: None,
            attributes: BTreeMap::new(),
            base_price: None,
            currency: None,
        };

        let advice = DescriptionAdvisorJob::new(tenant_id, snapshot).run().unwrap();
        assert_eq!(advice[0].summary.as_deref(), Some("Washer."));
        assert_eq!(advice[0].score, 1.0);
    }

    #[test]
    fn empty_name_is_rejected() {
        let tenant_id = TenantId::new();
        let snapshot = ProductSnapshot {
            product_id: "product-3".to_string(),
            name: "   ".to_string(),
            category: None,
            attributes: BTreeMap::new(),
            base_price: None,
            currency: None,
        };

        let err = DescriptionAdvisorJob::new(tenant_id, snapshot).run().unwrap_err();
        match err {
            AdvisorError::InvalidInput(msg) => assert!(msg.contains("name")),
            _ => panic!("Expected InvalidInput for empty name"),
        }
    }
}
