use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpilot_catalog::ProductId;
use stockpilot_core::{Aggregate, AggregateRoot, AggregateId, DomainError, TenantId, ValueObject};
use stockpilot_events::Event;

/// Stock item identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockItemId(pub AggregateId);

impl StockItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of stock movement, shared vocabulary for events and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Received,
    Issued,
    Corrected,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Received => "received",
            MovementKind::Issued => "issued",
            MovementKind::Corrected => "corrected",
        }
    }
}

/// Replenishment policy driving reorder advice for a stock item.
///
/// Mirrors the assessment inputs: both values must be finite and
/// non-negative. Fractional values are allowed (average daily sales is
/// rarely a whole number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentPolicy {
    pub average_daily_sales: f64,
    pub lead_time_days: f64,
}

impl ValueObject for ReplenishmentPolicy {}

impl Default for ReplenishmentPolicy {
    fn default() -> Self {
        Self {
            average_daily_sales: 0.0,
            lead_time_days: 0.0,
        }
    }
}

impl ReplenishmentPolicy {
    fn validate(&self) -> Result<(), DomainError> {
        if !self.average_daily_sales.is_finite() || self.average_daily_sales < 0.0 {
            return Err(DomainError::validation(
                "average daily sales must be a non-negative finite number",
            ));
        }
        if !self.lead_time_days.is_finite() || self.lead_time_days < 0.0 {
            return Err(DomainError::validation(
                "lead time days must be a non-negative finite number",
            ));
        }
        Ok(())
    }
}

/// Aggregate root: StockItem (one per tracked product).
///
/// Every movement event carries the resulting quantity so replay never has
/// to re-derive arithmetic and the movements report can be served straight
/// from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StockItem {
    id: StockItemId,
    tenant_id: Option<TenantId>,
    product_id: Option<ProductId>,
    name: String,
    quantity: i64,
    policy: ReplenishmentPolicy,
    version: u64,
    created: bool,
}

impl StockItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: StockItemId) -> Self {
        Self {
            id,
            tenant_id: None,
            product_id: None,
            name: String::new(),
            quantity: 0,
            policy: ReplenishmentPolicy::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> StockItemId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units on hand. Never negative.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn policy(&self) -> &ReplenishmentPolicy {
        &self.policy
    }
}

impl AggregateRoot for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: TrackProduct (start tracking stock for a catalog product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackProduct {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub product_id: ProductId,
    /// Display name, denormalized from the catalog at tracking time.
    pub name: String,
    pub initial_quantity: i64,
    pub policy: Option<ReplenishmentPolicy>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStock (goods in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub quantity: i64,
    /// Free-form reference (e.g. purchase order id, delivery note).
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueStock (goods out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub quantity: i64,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CorrectStock (absolute count after a physical stock take).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectStock {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub counted_quantity: i64,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetReplenishmentPolicy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetReplenishmentPolicy {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub policy: ReplenishmentPolicy,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockItemCommand {
    TrackProduct(TrackProduct),
    ReceiveStock(ReceiveStock),
    IssueStock(IssueStock),
    CorrectStock(CorrectStock),
    SetReplenishmentPolicy(SetReplenishmentPolicy),
}

/// Event: ProductTracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTracked {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub product_id: ProductId,
    pub name: String,
    pub initial_quantity: i64,
    pub policy: ReplenishmentPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub quantity: i64,
    pub resulting_quantity: i64,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub quantity: i64,
    pub resulting_quantity: i64,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockCorrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCorrected {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub counted_quantity: i64,
    pub previous_quantity: i64,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReplenishmentPolicySet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentPolicySet {
    pub tenant_id: TenantId,
    pub item_id: StockItemId,
    pub policy: ReplenishmentPolicy,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockItemEvent {
    ProductTracked(ProductTracked),
    StockReceived(StockReceived),
    StockIssued(StockIssued),
    StockCorrected(StockCorrected),
    ReplenishmentPolicySet(ReplenishmentPolicySet),
}

impl StockItemEvent {
    /// Movement kind for movement events; None for lifecycle/policy events.
    pub fn movement_kind(&self) -> Option<MovementKind> {
        match self {
            StockItemEvent::StockReceived(_) => Some(MovementKind::Received),
            StockItemEvent::StockIssued(_) => Some(MovementKind::Issued),
            StockItemEvent::StockCorrected(_) => Some(MovementKind::Corrected),
            _ => None,
        }
    }
}

impl Event for StockItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockItemEvent::ProductTracked(_) => "inventory.stock.tracked",
            StockItemEvent::StockReceived(_) => "inventory.stock.received",
            StockItemEvent::StockIssued(_) => "inventory.stock.issued",
            StockItemEvent::StockCorrected(_) => "inventory.stock.corrected",
            StockItemEvent::ReplenishmentPolicySet(_) => "inventory.stock.policy_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockItemEvent::ProductTracked(e) => e.occurred_at,
            StockItemEvent::StockReceived(e) => e.occurred_at,
            StockItemEvent::StockIssued(e) => e.occurred_at,
            StockItemEvent::StockCorrected(e) => e.occurred_at,
            StockItemEvent::ReplenishmentPolicySet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockItem {
    type Command = StockItemCommand;
    type Event = StockItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockItemEvent::ProductTracked(e) => {
                self.id = e.item_id;
                self.tenant_id = Some(e.tenant_id);
                self.product_id = Some(e.product_id);
                self.name = e.name.clone();
                self.quantity = e.initial_quantity;
                self.policy = e.policy.clone();
                self.created = true;
            }
            StockItemEvent::StockReceived(e) => {
                self.quantity = e.resulting_quantity;
            }
            StockItemEvent::StockIssued(e) => {
                self.quantity = e.resulting_quantity;
            }
            StockItemEvent::StockCorrected(e) => {
                self.quantity = e.counted_quantity;
            }
            StockItemEvent::ReplenishmentPolicySet(e) => {
                self.policy = e.policy.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockItemCommand::TrackProduct(cmd) => self.handle_track(cmd),
            StockItemCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            StockItemCommand::IssueStock(cmd) => self.handle_issue(cmd),
            StockItemCommand::CorrectStock(cmd) => self.handle_correct(cmd),
            StockItemCommand::SetReplenishmentPolicy(cmd) => self.handle_set_policy(cmd),
        }
    }
}

impl StockItem {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_item_id(&self, item_id: StockItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_track(&self, cmd: &TrackProduct) -> Result<Vec<StockItemEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("stock item already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.initial_quantity < 0 {
            return Err(DomainError::validation("initial quantity cannot be negative"));
        }

        let policy = cmd.policy.clone().unwrap_or_default();
        policy.validate()?;

        Ok(vec![StockItemEvent::ProductTracked(ProductTracked {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            product_id: cmd.product_id,
            name: cmd.name.clone(),
            initial_quantity: cmd.initial_quantity,
            policy,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_item_id(cmd.item_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let resulting_quantity = self
            .quantity
            .checked_add(cmd.quantity)
            .ok_or_else(|| DomainError::invariant("stock quantity overflow"))?;

        Ok(vec![StockItemEvent::StockReceived(StockReceived {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            resulting_quantity,
            reference: cmd.reference.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_issue(&self, cmd: &IssueStock) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_item_id(cmd.item_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let resulting_quantity = self.quantity - cmd.quantity;
        if resulting_quantity < 0 {
            return Err(DomainError::invariant(format!(
                "insufficient stock: cannot issue {} units, only {} on hand",
                cmd.quantity, self.quantity
            )));
        }

        Ok(vec![StockItemEvent::StockIssued(StockIssued {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            resulting_quantity,
            reference: cmd.reference.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_correct(&self, cmd: &CorrectStock) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_item_id(cmd.item_id)?;

        if cmd.counted_quantity < 0 {
            return Err(DomainError::validation("counted quantity cannot be negative"));
        }

        if cmd.counted_quantity == self.quantity {
            return Err(DomainError::validation(
                "counted quantity equals current quantity; nothing to correct",
            ));
        }

        Ok(vec![StockItemEvent::StockCorrected(StockCorrected {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            counted_quantity: cmd.counted_quantity,
            previous_quantity: self.quantity,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_policy(&self, cmd: &SetReplenishmentPolicy) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_item_id(cmd.item_id)?;

        cmd.policy.validate()?;

        Ok(vec![StockItemEvent::ReplenishmentPolicySet(ReplenishmentPolicySet {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            policy: cmd.policy.clone(),
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

    fn test_item_id() -> StockItemId {
        StockItemId::new(AggregateId::new())
    }

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn tracked_item(tenant_id: TenantId, item_id: StockItemId, initial: i64) -> StockItem {
        let mut item = StockItem::empty(item_id);
        let cmd = TrackProduct {
            tenant_id,
            item_id,
            product_id: test_product_id(),
            name: "Steel Bolt M8".to_string(),
            initial_quantity: initial,
            policy: Some(ReplenishmentPolicy {
                average_daily_sales: 5.0,
                lead_time_days: 10.0,
            }),
            occurred_at: test_time(),
        };
        let events = item.handle(&StockItemCommand::TrackProduct(cmd)).unwrap();
        item.apply(&events[0]);
        item
    }

    #[test]
    fn track_product_emits_product_tracked_event() {
        let item = StockItem::empty(test_item_id());
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let product_id = test_product_id();

        let cmd = TrackProduct {
            tenant_id,
            item_id,
            product_id,
            name: "Steel Bolt M8".to_string(),
            initial_quantity: 50,
            policy: None,
            occurred_at: test_time(),
        };

        let events = item.handle(&StockItemCommand::TrackProduct(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            StockItemEvent::ProductTracked(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.item_id, item_id);
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.initial_quantity, 50);
                assert_eq!(e.policy.average_daily_sales, 0.0);
            }
            _ => panic!("Expected ProductTracked event"),
        }
    }

    #[test]
    fn track_product_rejects_negative_initial_quantity() {
        let item = StockItem::empty(test_item_id());
        let cmd = TrackProduct {
            tenant_id: test_tenant_id(),
            item_id: test_item_id(),
            product_id: test_product_id(),
            name: "Steel Bolt M8".to_string(),
            initial_quantity: -1,
            policy: None,
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::TrackProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for negative initial quantity"),
        }
    }

    #[test]
    fn track_product_rejects_non_finite_policy() {
        let item = StockItem::empty(test_item_id());
        let cmd = TrackProduct {
            tenant_id: test_tenant_id(),
            item_id: test_item_id(),
            product_id: test_product_id(),
            name: "Steel Bolt M8".to_string(),
            initial_quantity: 0,
            policy: Some(ReplenishmentPolicy {
                average_daily_sales: f64::NAN,
                lead_time_days: 10.0,
            }),
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::TrackProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("average daily sales")),
            _ => panic!("Expected Validation error for NaN policy"),
        }
    }

    #[test]
    fn receive_stock_increases_quantity_and_records_result() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);

        let cmd = ReceiveStock {
            tenant_id,
            item_id,
            quantity: 40,
            reference: Some("PO-1042".to_string()),
            occurred_at: test_time(),
        };

        let events = item.handle(&StockItemCommand::ReceiveStock(cmd)).unwrap();
        match &events[0] {
            StockItemEvent::StockReceived(e) => {
                assert_eq!(e.quantity, 40);
                assert_eq!(e.resulting_quantity, 90);
                assert_eq!(e.reference.as_deref(), Some("PO-1042"));
            }
            _ => panic!("Expected StockReceived event"),
        }

        item.apply(&events[0]);
        assert_eq!(item.quantity(), 90);
    }

    #[test]
    fn receive_stock_rejects_non_positive_quantity() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let item = tracked_item(tenant_id, item_id, 50);

        let cmd = ReceiveStock {
            tenant_id,
            item_id,
            quantity: 0,
            reference: None,
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::ReceiveStock(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for zero quantity"),
        }
    }

    #[test]
    fn issue_stock_decreases_quantity() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);

        let cmd = IssueStock {
            tenant_id,
            item_id,
            quantity: 20,
            reference: Some("SO-77".to_string()),
            occurred_at: test_time(),
        };

        let events = item.handle(&StockItemCommand::IssueStock(cmd)).unwrap();
        item.apply(&events[0]);
        assert_eq!(item.quantity(), 30);
    }

    #[test]
    fn issue_stock_rejects_insufficient_stock() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let item = tracked_item(tenant_id, item_id, 10);

        let cmd = IssueStock {
            tenant_id,
            item_id,
            quantity: 11,
            reference: None,
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::IssueStock(cmd)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("insufficient stock")),
            _ => panic!("Expected InvariantViolation for insufficient stock"),
        }
    }

    #[test]
    fn issuing_the_exact_quantity_empties_the_item() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 10);

        let cmd = IssueStock {
            tenant_id,
            item_id,
            quantity: 10,
            reference: None,
            occurred_at: test_time(),
        };

        let events = item.handle(&StockItemCommand::IssueStock(cmd)).unwrap();
        item.apply(&events[0]);
        assert_eq!(item.quantity(), 0);
    }

    #[test]
    fn correct_stock_records_previous_and_counted_quantities() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);

        let cmd = CorrectStock {
            tenant_id,
            item_id,
            counted_quantity: 47,
            reason: Some("stock take".to_string()),
            occurred_at: test_time(),
        };

        let events = item.handle(&StockItemCommand::CorrectStock(cmd)).unwrap();
        match &events[0] {
            StockItemEvent::StockCorrected(e) => {
                assert_eq!(e.previous_quantity, 50);
                assert_eq!(e.counted_quantity, 47);
            }
            _ => panic!("Expected StockCorrected event"),
        }

        item.apply(&events[0]);
        assert_eq!(item.quantity(), 47);
    }

    #[test]
    fn correct_stock_rejects_no_op_counts() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let item = tracked_item(tenant_id, item_id, 50);

        let cmd = CorrectStock {
            tenant_id,
            item_id,
            counted_quantity: 50,
            reason: None,
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::CorrectStock(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("nothing to correct")),
            _ => panic!("Expected Validation error for no-op correction"),
        }
    }

    #[test]
    fn set_replenishment_policy_replaces_the_policy() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);

        let cmd = SetReplenishmentPolicy {
            tenant_id,
            item_id,
            policy: ReplenishmentPolicy {
                average_daily_sales: 2.5,
                lead_time_days: 14.0,
            },
            occurred_at: test_time(),
        };

        let events = item.handle(&StockItemCommand::SetReplenishmentPolicy(cmd)).unwrap();
        item.apply(&events[0]);
        assert_eq!(item.policy().average_daily_sales, 2.5);
        assert_eq!(item.policy().lead_time_days, 14.0);
    }

    #[test]
    fn set_replenishment_policy_rejects_negative_values() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let item = tracked_item(tenant_id, item_id, 50);

        let cmd = SetReplenishmentPolicy {
            tenant_id,
            item_id,
            policy: ReplenishmentPolicy {
                average_daily_sales: 1.0,
                lead_time_days: -2.0,
            },
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::SetReplenishmentPolicy(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("lead time")),
            _ => panic!("Expected Validation error for negative lead time"),
        }
    }

    #[test]
    fn movement_kind_maps_event_variants() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);

        let receive = ReceiveStock {
            tenant_id,
            item_id,
            quantity: 1,
            reference: None,
            occurred_at: test_time(),
        };
        let events = item.handle(&StockItemCommand::ReceiveStock(receive)).unwrap();
        assert_eq!(events[0].movement_kind(), Some(MovementKind::Received));
        item.apply(&events[0]);

        let issue = IssueStock {
            tenant_id,
            item_id,
            quantity: 1,
            reference: None,
            occurred_at: test_time(),
        };
        let events = item.handle(&StockItemCommand::IssueStock(issue)).unwrap();
        assert_eq!(events[0].movement_kind(), Some(MovementKind::Issued));
    }

    #[test]
    fn commands_reject_wrong_tenant() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let item = tracked_item(tenant_id, item_id, 50);

        let cmd = ReceiveStock {
            tenant_id: test_tenant_id(),
            item_id,
            quantity: 5,
            reference: None,
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::ReceiveStock(cmd)).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation error for tenant mismatch"),
        }
    }

    #[test]
    fn commands_reject_untracked_item() {
        let item = StockItem::empty(test_item_id());
        let cmd = IssueStock {
            tenant_id: test_tenant_id(),
            item_id: test_item_id(),
            quantity: 1,
            reference: None,
            occurred_at: test_time(),
        };

        let err = item.handle(&StockItemCommand::IssueStock(cmd)).unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound error for untracked item"),
        }
    }

    #[test]
    fn version_increments_on_apply() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);
        assert_eq!(item.version(), 1);

        let cmd = ReceiveStock {
            tenant_id,
            item_id,
            quantity: 10,
            reference: None,
            occurred_at: test_time(),
        };
        let events = item.handle(&StockItemCommand::ReceiveStock(cmd)).unwrap();
        item.apply(&events[0]);
        assert_eq!(item.version(), 2);
    }

    #[test]
    fn replay_reproduces_quantity_from_resulting_quantities() {
        let tenant_id = test_tenant_id();
        let item_id = test_item_id();
        let mut item = tracked_item(tenant_id, item_id, 50);

        let mut events = Vec::new();
        let receive = ReceiveStock {
            tenant_id,
            item_id,
            quantity: 25,
            reference: None,
            occurred_at: test_time(),
        };
        let out = item.handle(&StockItemCommand::ReceiveStock(receive)).unwrap();
        item.apply(&out[0]);
        events.extend(out);

        let issue = IssueStock {
            tenant_id,
            item_id,
            quantity: 30,
            reference: None,
            occurred_at: test_time(),
        };
        let out = item.handle(&StockItemCommand::IssueStock(issue)).unwrap();
        item.apply(&out[0]);
        events.extend(out);

        // Replay the same events onto a fresh instance.
        let mut replayed = StockItem::empty(item_id);
        let track = TrackProduct {
            tenant_id,
            item_id,
            product_id: test_product_id(),
            name: "Steel Bolt M8".to_string(),
            initial_quantity: 50,
            policy: None,
            occurred_at: test_time(),
        };
        let first = StockItem::empty(item_id)
            .handle(&StockItemCommand::TrackProduct(track))
            .unwrap();
        replayed.apply(&first[0]);
        for event in &events {
            replayed.apply(event);
        }

        assert_eq!(replayed.quantity(), item.quantity());
        assert_eq!(replayed.quantity(), 45);
    }
}
