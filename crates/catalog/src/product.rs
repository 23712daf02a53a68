use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpilot_core::{Aggregate, AggregateRoot, AggregateId, DomainError, TenantId, ValueObject};
use stockpilot_events::Event;

use crate::category::CategoryId;

/// Product identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// Optional pricing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PricingMetadata {
    pub base_price: Option<u64>, // Price in smallest currency unit (e.g., cents)
    pub currency: Option<String>, // ISO currency code (e.g., "USD", "EUR")
}

impl ValueObject for PricingMetadata {}

impl PricingMetadata {
    /// A price without a currency is meaningless downstream (valuation,
    /// dashboards), so the pair is validated together.
    fn validate(&self) -> Result<(), DomainError> {
        if self.base_price.is_some() && self.currency.is_none() {
            return Err(DomainError::validation("price requires a currency"));
        }
        Ok(())
    }
}

const MAX_SKU_LEN: usize = 64;

/// Aggregate root: Product.
///
/// Attributes are kept in a `BTreeMap` so serialized forms and derived text
/// (e.g. description drafts) are stable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    description: String,
    category: Option<CategoryId>,
    attributes: BTreeMap<String, String>,
    status: ProductStatus,
    pricing: PricingMetadata,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            description: String::new(),
            category: None,
            attributes: BTreeMap::new(),
            status: ProductStatus::Draft,
            pricing: PricingMetadata::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn pricing(&self) -> &PricingMetadata {
        &self.pricing
    }

    /// Check if the product can be tracked as inventory (must be Active).
    pub fn can_be_stocked(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub pricing: Option<PricingMetadata>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails (name and/or description).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPricing {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub pricing: PricingMetadata,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCategory {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetAttributes (replaces the full attribute map).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAttributes {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub attributes: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateDetails(UpdateDetails),
    SetPricing(SetPricing),
    AssignCategory(AssignCategory),
    SetAttributes(SetAttributes),
    ActivateProduct(ActivateProduct),
    ArchiveProduct(ArchiveProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub pricing: PricingMetadata,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetailsUpdated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductPricingSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPricingSet {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub pricing: PricingMetadata,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductCategoryAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategoryAssigned {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductAttributesSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributesSet {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub attributes: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductDetailsUpdated(ProductDetailsUpdated),
    ProductPricingSet(ProductPricingSet),
    ProductCategoryAssigned(ProductCategoryAssigned),
    ProductAttributesSet(ProductAttributesSet),
    ProductActivated(ProductActivated),
    ProductArchived(ProductArchived),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "catalog.product.created",
            ProductEvent::ProductDetailsUpdated(_) => "catalog.product.details_updated",
            ProductEvent::ProductPricingSet(_) => "catalog.product.pricing_set",
            ProductEvent::ProductCategoryAssigned(_) => "catalog.product.category_assigned",
            ProductEvent::ProductAttributesSet(_) => "catalog.product.attributes_set",
            ProductEvent::ProductActivated(_) => "catalog.product.activated",
            ProductEvent::ProductArchived(_) => "catalog.product.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductDetailsUpdated(e) => e.occurred_at,
            ProductEvent::ProductPricingSet(e) => e.occurred_at,
            ProductEvent::ProductCategoryAssigned(e) => e.occurred_at,
            ProductEvent::ProductAttributesSet(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
            ProductEvent::ProductArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.status = ProductStatus::Draft;
                self.pricing = e.pricing.clone();
                self.created = true;
            }
            ProductEvent::ProductDetailsUpdated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
            }
            ProductEvent::ProductPricingSet(e) => {
                self.pricing = e.pricing.clone();
            }
            ProductEvent::ProductCategoryAssigned(e) => {
                self.category = Some(e.category_id);
            }
            ProductEvent::ProductAttributesSet(e) => {
                self.attributes = e.attributes.clone();
            }
            ProductEvent::ProductActivated(_) => {
                self.status = ProductStatus::Active;
            }
            ProductEvent::ProductArchived(_) => {
                self.status = ProductStatus::Archived;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            ProductCommand::SetPricing(cmd) => self.handle_set_pricing(cmd),
            ProductCommand::AssignCategory(cmd) => self.handle_assign_category(cmd),
            ProductCommand::SetAttributes(cmd) => self.handle_set_attributes(cmd),
            ProductCommand::ActivateProduct(cmd) => self.handle_activate(cmd),
            ProductCommand::ArchiveProduct(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Product {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_not_archived(&self) -> Result<(), DomainError> {
        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be modified"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        if cmd.sku.len() > MAX_SKU_LEN {
            return Err(DomainError::validation("SKU must be at most 64 characters"));
        }

        let pricing = cmd.pricing.clone().unwrap_or_default();
        pricing.validate()?;

        // True SKU uniqueness per tenant is a read-side concern; the aggregate
        // can only validate the SKU shape.

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            sku: cmd.sku.clone(),
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            pricing,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(&self, cmd: &UpdateDetails) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;
        self.ensure_not_archived()?;

        if cmd.name.is_none() && cmd.description.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }

        if let Some(name) = &cmd.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }

        Ok(vec![ProductEvent::ProductDetailsUpdated(ProductDetailsUpdated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_pricing(&self, cmd: &SetPricing) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;
        self.ensure_not_archived()?;

        cmd.pricing.validate()?;

        Ok(vec![ProductEvent::ProductPricingSet(ProductPricingSet {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            pricing: cmd.pricing.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_category(&self, cmd: &AssignCategory) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;
        self.ensure_not_archived()?;

        if self.category == Some(cmd.category_id) {
            return Err(DomainError::conflict("product is already in this category"));
        }

        Ok(vec![ProductEvent::ProductCategoryAssigned(ProductCategoryAssigned {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            category_id: cmd.category_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_attributes(&self, cmd: &SetAttributes) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;
        self.ensure_not_archived()?;

        if cmd.attributes.keys().any(|k| k.trim().is_empty()) {
            return Err(DomainError::validation("attribute names cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductAttributesSet(ProductAttributesSet {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            attributes: cmd.attributes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Active {
            return Err(DomainError::conflict("product is already active"));
        }

        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be activated"));
        }

        Ok(vec![ProductEvent::ProductActivated(ProductActivated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::conflict("product is already archived"));
        }

        Ok(vec![ProductEvent::ProductArchived(ProductArchived {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpilot_core::AggregateId;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(tenant_id: TenantId, product_id: ProductId) -> CreateProduct {
        CreateProduct {
            tenant_id,
            product_id,
            sku: "SKU-001".to_string(),
            name: "Steel Bolt M8".to_string(),
            description: "Hex head, zinc plated".to_string(),
            pricing: None,
            occurred_at: test_time(),
        }
    }

    fn created_product(tenant_id: TenantId, product_id: ProductId) -> Product {
        let mut product = Product::empty(product_id);
        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap();
        product.apply(&events[0]);
        product
    }

    #[test]
    fn create_product_emits_product_created_event() {
        let product = Product::empty(test_product_id());
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();

        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ProductEvent::ProductCreated(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.sku, "SKU-001");
                assert_eq!(e.name, "Steel Bolt M8");
                assert_eq!(e.description, "Hex head, zinc plated");
            }
            _ => panic!("Expected ProductCreated event"),
        }
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let product = Product::empty(test_product_id());
        let mut cmd = create_cmd(test_tenant_id(), test_product_id());
        cmd.name = "   ".to_string();

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_product_rejects_empty_sku() {
        let product = Product::empty(test_product_id());
        let mut cmd = create_cmd(test_tenant_id(), test_product_id());
        cmd.sku = "".to_string();

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty SKU"),
        }
    }

    #[test]
    fn create_product_rejects_overlong_sku() {
        let product = Product::empty(test_product_id());
        let mut cmd = create_cmd(test_tenant_id(), test_product_id());
        cmd.sku = "X".repeat(65);

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("64")),
            _ => panic!("Expected Validation error for overlong SKU"),
        }
    }

    #[test]
    fn create_product_rejects_price_without_currency() {
        let product = Product::empty(test_product_id());
        let mut cmd = create_cmd(test_tenant_id(), test_product_id());
        cmd.pricing = Some(PricingMetadata {
            base_price: Some(1250),
            currency: None,
        });

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("currency")),
            _ => panic!("Expected Validation error for price without currency"),
        }
    }

    #[test]
    fn create_product_rejects_duplicate_creation() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let err = product
            .handle(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate creation"),
        }
    }

    #[test]
    fn update_details_changes_name_and_description() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        let cmd = UpdateDetails {
            tenant_id,
            product_id,
            name: Some("Steel Bolt M8 x 40".to_string()),
            description: Some("Hex head, zinc plated, 40mm".to_string()),
            occurred_at: test_time(),
        };

        let events = product.handle(&ProductCommand::UpdateDetails(cmd)).unwrap();
        product.apply(&events[0]);

        assert_eq!(product.name(), "Steel Bolt M8 x 40");
        assert_eq!(product.description(), "Hex head, zinc plated, 40mm");
    }

    #[test]
    fn update_details_rejects_empty_update() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let cmd = UpdateDetails {
            tenant_id,
            product_id,
            name: None,
            description: None,
            occurred_at: test_time(),
        };

        let err = product.handle(&ProductCommand::UpdateDetails(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("nothing to update")),
            _ => panic!("Expected Validation error for empty update"),
        }
    }

    #[test]
    fn set_pricing_replaces_pricing_metadata() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        let cmd = SetPricing {
            tenant_id,
            product_id,
            pricing: PricingMetadata {
                base_price: Some(995),
                currency: Some("EUR".to_string()),
            },
            occurred_at: test_time(),
        };

        let events = product.handle(&ProductCommand::SetPricing(cmd)).unwrap();
        product.apply(&events[0]);

        assert_eq!(product.pricing().base_price, Some(995));
        assert_eq!(product.pricing().currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn assign_category_records_the_category() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);
        let category_id = CategoryId::new(AggregateId::new());

        let cmd = AssignCategory {
            tenant_id,
            product_id,
            category_id,
            occurred_at: test_time(),
        };

        let events = product.handle(&ProductCommand::AssignCategory(cmd)).unwrap();
        product.apply(&events[0]);

        assert_eq!(product.category(), Some(category_id));
    }

    #[test]
    fn assign_category_rejects_reassigning_same_category() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);
        let category_id = CategoryId::new(AggregateId::new());

        let cmd = AssignCategory {
            tenant_id,
            product_id,
            category_id,
            occurred_at: test_time(),
        };
        let events = product.handle(&ProductCommand::AssignCategory(cmd.clone())).unwrap();
        product.apply(&events[0]);

        let err = product.handle(&ProductCommand::AssignCategory(cmd)).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for same category"),
        }
    }

    #[test]
    fn set_attributes_replaces_the_attribute_map() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        let mut attributes = BTreeMap::new();
        attributes.insert("material".to_string(), "steel".to_string());
        attributes.insert("finish".to_string(), "zinc".to_string());

        let cmd = SetAttributes {
            tenant_id,
            product_id,
            attributes: attributes.clone(),
            occurred_at: test_time(),
        };

        let events = product.handle(&ProductCommand::SetAttributes(cmd)).unwrap();
        product.apply(&events[0]);

        assert_eq!(product.attributes(), &attributes);
    }

    #[test]
    fn set_attributes_rejects_empty_attribute_names() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let mut attributes = BTreeMap::new();
        attributes.insert("  ".to_string(), "steel".to_string());

        let cmd = SetAttributes {
            tenant_id,
            product_id,
            attributes,
            occurred_at: test_time(),
        };

        let err = product.handle(&ProductCommand::SetAttributes(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty attribute name"),
        }
    }

    #[test]
    fn activate_product_updates_status_to_active() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);
        assert_eq!(product.status(), ProductStatus::Draft);
        assert!(!product.can_be_stocked());

        let cmd = ActivateProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };

        let events = product.handle(&ProductCommand::ActivateProduct(cmd)).unwrap();
        product.apply(&events[0]);
        assert_eq!(product.status(), ProductStatus::Active);
        assert!(product.can_be_stocked());
    }

    #[test]
    fn activate_product_rejects_archived_product() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        let archive = ArchiveProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };
        let events = product.handle(&ProductCommand::ArchiveProduct(archive)).unwrap();
        product.apply(&events[0]);

        let activate = ActivateProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };
        let err = product.handle(&ProductCommand::ActivateProduct(activate)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("archived") => {}
            _ => panic!("Expected InvariantViolation error for archived product"),
        }
    }

    #[test]
    fn archived_products_reject_modifications() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        let archive = ArchiveProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };
        let events = product.handle(&ProductCommand::ArchiveProduct(archive)).unwrap();
        product.apply(&events[0]);

        let update = UpdateDetails {
            tenant_id,
            product_id,
            name: Some("renamed".to_string()),
            description: None,
            occurred_at: test_time(),
        };
        let err = product.handle(&ProductCommand::UpdateDetails(update)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("archived")),
            _ => panic!("Expected InvariantViolation for update on archived product"),
        }
    }

    #[test]
    fn commands_reject_wrong_tenant() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let cmd = ArchiveProduct {
            tenant_id: test_tenant_id(),
            product_id,
            occurred_at: test_time(),
        };

        let err = product.handle(&ProductCommand::ArchiveProduct(cmd)).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation error for tenant mismatch"),
        }
    }

    #[test]
    fn commands_reject_non_existent_product() {
        let product = Product::empty(test_product_id());
        let cmd = ActivateProduct {
            tenant_id: test_tenant_id(),
            product_id: test_product_id(),
            occurred_at: test_time(),
        };

        let err = product.handle(&ProductCommand::ActivateProduct(cmd)).unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound error for non-existent product"),
        }
    }

    #[test]
    fn version_increments_on_apply() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);
        assert_eq!(product.version(), 0);

        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap();
        product.apply(&events[0]);
        assert_eq!(product.version(), 1);

        let activate = ActivateProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };
        let events = product.handle(&ProductCommand::ActivateProduct(activate)).unwrap();
        product.apply(&events[0]);
        assert_eq!(product.version(), 2);

        let archive = ArchiveProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };
        let events = product.handle(&ProductCommand::ArchiveProduct(archive)).unwrap();
        product.apply(&events[0]);
        assert_eq!(product.version(), 3);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);
        let snapshot = product.clone();

        let activate = ActivateProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        };

        let events1 = product.handle(&ProductCommand::ActivateProduct(activate.clone())).unwrap();
        let events2 = product.handle(&ProductCommand::ActivateProduct(activate)).unwrap();

        assert_eq!(product, snapshot);
        assert_eq!(events1, events2);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                // Use deterministic seed for CI reproducibility
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: Handle is deterministic (same state + command = same events).
            #[test]
            fn handle_is_deterministic(
                sku in "[A-Z0-9]{1,20}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,99}"
            ) {
                let tenant_id = test_tenant_id();
                let product_id = test_product_id();
                let mut product = Product::empty(product_id);

                let create = CreateProduct {
                    tenant_id,
                    product_id,
                    sku: sku.clone(),
                    name: name.clone(),
                    description: String::new(),
                    pricing: None,
                    occurred_at: Utc::now(),
                };
                let events = product.handle(&ProductCommand::CreateProduct(create)).unwrap();
                product.apply(&events[0]);

                let state_before = product.clone();

                let activate = ActivateProduct {
                    tenant_id,
                    product_id,
                    occurred_at: Utc::now(),
                };

                let events1 = product.handle(&ProductCommand::ActivateProduct(activate.clone()));
                let state_after_handle1 = product.clone();

                let events2 = product.handle(&ProductCommand::ActivateProduct(activate));
                let state_after_handle2 = product.clone();

                prop_assert_eq!(&state_before, &state_after_handle1);
                prop_assert_eq!(&state_before, &state_after_handle2);
                prop_assert_eq!(events1, events2);
            }

            /// Property: Apply is deterministic (same events = same final state).
            #[test]
            fn apply_is_deterministic(
                sku in "[A-Z0-9]{1,20}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,99}"
            ) {
                let tenant_id = test_tenant_id();
                let product_id = test_product_id();

                let events: Vec<ProductEvent> = vec![
                    ProductEvent::ProductCreated(ProductCreated {
                        tenant_id,
                        product_id,
                        sku: sku.clone(),
                        name: name.clone(),
                        description: String::new(),
                        pricing: PricingMetadata::default(),
                        occurred_at: Utc::now(),
                    }),
                    ProductEvent::ProductActivated(ProductActivated {
                        tenant_id,
                        product_id,
                        occurred_at: Utc::now(),
                    }),
                    ProductEvent::ProductArchived(ProductArchived {
                        tenant_id,
                        product_id,
                        occurred_at: Utc::now(),
                    }),
                ];

                let mut product1 = Product::empty(product_id);
                for event in &events {
                    product1.apply(event);
                }

                let mut product2 = Product::empty(product_id);
                for event in &events {
                    product2.apply(event);
                }

                prop_assert_eq!(&product1, &product2);
                prop_assert_eq!(product1.status(), ProductStatus::Archived);
                prop_assert_eq!(product1.version(), 3);
                prop_assert!(!product1.can_be_stocked());
            }

            /// Property: archived products refuse every mutating command.
            #[test]
            fn archived_products_refuse_mutations(
                sku in "[A-Z0-9]{1,20}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,99}",
                new_name in "[A-Za-z][A-Za-z0-9 ]{0,40}"
            ) {
                let tenant_id = test_tenant_id();
                let product_id = test_product_id();
                let mut product = Product::empty(product_id);

                let create = CreateProduct {
                    tenant_id,
                    product_id,
                    sku,
                    name,
                    description: String::new(),
                    pricing: None,
                    occurred_at: Utc::now(),
                };
                let events = product.handle(&ProductCommand::CreateProduct(create)).unwrap();
                product.apply(&events[0]);

                let archive = ArchiveProduct {
                    tenant_id,
                    product_id,
                    occurred_at: Utc::now(),
                };
                let events = product.handle(&ProductCommand::ArchiveProduct(archive)).unwrap();
                product.apply(&events[0]);

                let update = UpdateDetails {
                    tenant_id,
                    product_id,
                    name: Some(new_name),
                    description: None,
                    occurred_at: Utc::now(),
                };
                prop_assert!(product.handle(&ProductCommand::UpdateDetails(update)).is_err());

                let pricing = SetPricing {
                    tenant_id,
                    product_id,
                    pricing: PricingMetadata::default(),
                    occurred_at: Utc::now(),
                };
                prop_assert!(product.handle(&ProductCommand::SetPricing(pricing)).is_err());
            }
        }
    }
}
