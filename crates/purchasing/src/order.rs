use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpilot_catalog::ProductId;
use stockpilot_core::{Aggregate, AggregateRoot, AggregateId, DomainError, Entity, TenantId};
use stockpilot_events::Event;
use stockpilot_suppliers::SupplierId;

/// Purchase order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
///
/// Draft orders collect lines, approval freezes them, receipt posts the
/// goods. Cancellation is allowed any time before receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Approved,
    Received,
    Cancelled,
}

/// Purchase order line. Line numbers are assigned sequentially and stay
/// stable for the life of the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
}

impl Entity for LineItem {
    type Id = u32;

    fn id(&self) -> &Self::Id {
        &self.line_no
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: Option<TenantId>,
    supplier_id: Option<SupplierId>,
    status: PurchaseOrderStatus,
    lines: Vec<LineItem>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            supplier_id: None,
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Sum of ordered units across all lines.
    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (only allowed in Draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveGoods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoods {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder (allowed from Draft or Approved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    Approve(Approve),
    ReceiveGoods(ReceiveGoods),
    CancelOrder(CancelOrder),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineAdded {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderApproved {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoodsReceived.
///
/// Carries the supplier and the full line set so consumers never have to
/// rehydrate the order: the API layer turns each line into an inventory
/// `ReceiveStock` command, and the movements projection can log the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub lines: Vec<LineItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCancelled {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderLineAdded(PurchaseOrderLineAdded),
    PurchaseOrderApproved(PurchaseOrderApproved),
    GoodsReceived(GoodsReceived),
    PurchaseOrderCancelled(PurchaseOrderCancelled),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::PurchaseOrderLineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::PurchaseOrderApproved(_) => "purchasing.order.approved",
            PurchaseOrderEvent::GoodsReceived(_) => "purchasing.order.goods_received",
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => "purchasing.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderApproved(e) => e.occurred_at,
            PurchaseOrderEvent::GoodsReceived(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.supplier_id = Some(e.supplier_id);
                self.status = PurchaseOrderStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.lines.push(LineItem {
                    line_no: e.line_no,
                    product_id: e.product_id,
                    quantity: e.quantity,
                });
            }
            PurchaseOrderEvent::PurchaseOrderApproved(_) => {
                self.status = PurchaseOrderStatus::Approved;
            }
            PurchaseOrderEvent::GoodsReceived(e) => {
                // All lines are received at once.
                self.lines = e.lines.clone();
                self.status = PurchaseOrderStatus::Received;
            }
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => {
                self.status = PurchaseOrderStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::Approve(cmd) => self.handle_approve(cmd),
            PurchaseOrderCommand::ReceiveGoods(cmd) => self.handle_receive(cmd),
            PurchaseOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                supplier_id: cmd.supplier_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "lines can only be added to draft purchase orders",
            ));
        }

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let next_line_no = (self.lines.len() as u32) + 1;
        Ok(vec![PurchaseOrderEvent::PurchaseOrderLineAdded(
            PurchaseOrderLineAdded {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                line_no: next_line_no,
                product_id: cmd.product_id,
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_approve(&self, cmd: &Approve) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "only draft purchase orders can be approved",
            ));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot approve purchase order without lines",
            ));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderApproved(
            PurchaseOrderApproved {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_receive(
        &self,
        cmd: &ReceiveGoods,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        // Invariant: Cannot receive before approval.
        if self.status != PurchaseOrderStatus::Approved {
            return Err(DomainError::invariant(
                "cannot receive goods before purchase order is approved",
            ));
        }

        let supplier_id = self
            .supplier_id
            .ok_or_else(|| DomainError::invariant("supplier must be set"))?;

        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot receive goods for empty purchase order",
            ));
        }

        Ok(vec![PurchaseOrderEvent::GoodsReceived(GoodsReceived {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            supplier_id,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        match self.status {
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Approved => {}
            PurchaseOrderStatus::Received => {
                return Err(DomainError::invariant(
                    "received purchase orders cannot be cancelled",
                ));
            }
            PurchaseOrderStatus::Cancelled => {
                return Err(DomainError::conflict("purchase order already cancelled"));
            }
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCancelled(
            PurchaseOrderCancelled {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
