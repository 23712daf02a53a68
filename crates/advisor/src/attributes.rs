use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use stockpilot_core::TenantId;

use crate::advice::{Advice, AdvisorError};
use crate::job::AdvisorJob;

pub const ATTRIBUTE_MAPPING_JOB: &str = "catalog.attribute_mapping";

/// Canonical attribute names, in fixed order (order breaks scoring ties).
const CANONICAL: &[&str] = &[
    "color",
    "size",
    "weight",
    "material",
    "brand",
    "model",
    "dimensions",
    "capacity",
    "voltage",
    "warranty",
];

/// Token-level synonym table: free-form token -> canonical token.
const SYNONYMS: &[(&str, &str)] = &[
    ("colour", "color"),
    ("shade", "color"),
    ("hue", "color"),
    ("sizing", "size"),
    ("mass", "weight"),
    ("wt", "weight"),
    ("fabric", "material"),
    ("composition", "material"),
    ("make", "brand"),
    ("manufacturer", "brand"),
    ("mfr", "brand"),
    ("dims", "dimensions"),
    ("measurements", "dimensions"),
    ("volume", "capacity"),
    ("guarantee", "warranty"),
];

/// Minimum token-overlap (Jaccard) score for a fuzzy match.
const FUZZY_THRESHOLD: f64 = 0.5;

/// How a free-form name matched its canonical attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Synonym,
    Fuzzy,
}

/// One resolved mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMapping {
    pub input: String,
    pub canonical: String,
    pub via: MatchKind,
    pub score: f64,
}

/// Free-form attribute names to map onto the canonical dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMappingInput {
    pub names: Vec<String>,
}

/// Attribute mapper: normalizes free-form attribute names and maps them onto
/// the canonical dictionary.
///
/// Pipeline per name: normalize (lowercase, separators to spaces) -> replace
/// tokens via the synonym table -> exact match, then token-overlap scoring
/// against each canonical name. Unmapped names are reported, never guessed.
#[derive(Debug, Clone)]
pub struct AttributeMapperJob {
    tenant_id: TenantId,
    input: AttributeMappingInput,
}

impl AttributeMapperJob {
    pub fn new(tenant_id: TenantId, input: AttributeMappingInput) -> Self {
        Self { tenant_id, input }
    }
}

impl AdvisorJob for AttributeMapperJob {
    type Input = AttributeMappingInput;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn input(&self) -> &Self::Input {
        &self.input
    }

    fn run(&self) -> Result<Vec<Advice>, AdvisorError> {
        if self.input.names.is_empty() {
            return Err(AdvisorError::InvalidInput(
                "no attribute names to map".to_string(),
            ));
        }

        let mut mappings: Vec<AttributeMapping> = Vec::new();
        let mut unmapped: Vec<String> = Vec::new();

        for name in &self.input.names {
            match map_attribute(name) {
                Some(mapping) => mappings.push(mapping),
                None => unmapped.push(name.clone()),
            }
        }

        let total = self.input.names.len();
        let mapped = mappings.len();
        let confidence = mapped as f64 / total as f64;

        Ok(vec![
            Advice::new(self.tenant_id, ATTRIBUTE_MAPPING_JOB, mapped as f64, confidence)
                .with_summary(format!("mapped {mapped} of {total} attribute name(s)"))
                .with_details(json!({
                    "kind": "catalog.attribute_mapping",
                    "mappings": mappings,
                    "unmapped": unmapped,
                })),
        ])
    }
}

/// Map a single free-form attribute name. Pure and deterministic.
pub fn map_attribute(name: &str) -> Option<AttributeMapping> {
    let tokens = normalize_tokens(name);
    if tokens.is_empty() {
        return None;
    }

    let mut saw_synonym = false;
    let resolved: Vec<&str> = tokens
        .iter()
        .map(|token| match lookup_synonym(token) {
            Some(canonical) => {
                saw_synonym = true;
                canonical
            }
            None => token.as_str(),
        })
        .collect();

    // Whole-name match after synonym replacement.
    if resolved.len() == 1 {
        if let Some(canonical) = CANONICAL.iter().find(|c| **c == resolved[0]) {
            return Some(AttributeMapping {
                input: name.to_string(),
                canonical: (*canonical).to_string(),
                via: if saw_synonym {
                    MatchKind::Synonym
                } else {
                    MatchKind::Exact
                },
                score: 1.0,
            });
        }
    }

    // Token-overlap scoring; first canonical wins ties.
    let resolved_set: BTreeSet<&str> = resolved.iter().copied().collect();
    let mut best: Option<(&str, f64)> = None;
    for canonical in CANONICAL {
        let canonical_set: BTreeSet<&str> = canonical.split_whitespace().collect();
        let intersection = resolved_set.intersection(&canonical_set).count();
        if intersection == 0 {
            continue;
        }
        let union = resolved_set.union(&canonical_set).count();
        let score = intersection as f64 / union as f64;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((canonical, score));
        }
    }

    match best {
        Some((canonical, score)) if score >= FUZZY_THRESHOLD => Some(AttributeMapping {
            input: name.to_string(),
            canonical: canonical.to_string(),
            via: MatchKind::Fuzzy,
            score,
        }),
        _ => None,
    }
}

fn normalize_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .replace(['_', '-', '/', '.'], " ")
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

fn lookup_synonym(token: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == token)
        .map(|(_, to)| *to)
}
