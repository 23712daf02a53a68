use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpilot_core::{Aggregate, AggregateRoot, AggregateId, DomainError, TenantId, ValueObject};
use stockpilot_events::Event;

/// Supplier identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Suspended,
}

/// Contact information for a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ValueObject for ContactInfo {}

const MAX_LEAD_TIME_DAYS: u32 = 365;

/// Aggregate root: Supplier.
///
/// `lead_time_days` is the supplier's default delivery lead time; it seeds
/// the replenishment policy of stock items sourced from this supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supplier {
    id: SupplierId,
    tenant_id: Option<TenantId>,
    name: String,
    contact: ContactInfo,
    lead_time_days: u32,
    status: SupplierStatus,
    version: u64,
    created: bool,
}

impl Supplier {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SupplierId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            contact: ContactInfo::default(),
            lead_time_days: 0,
            status: SupplierStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn lead_time_days(&self) -> u32 {
        self.lead_time_days
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    /// Invariant helper: whether this supplier can take new orders.
    ///
    /// Suspended suppliers cannot be referenced by new purchase orders.
    pub fn can_supply(&self) -> bool {
        self.status == SupplierStatus::Active
    }
}

impl AggregateRoot for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSupplier {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: Option<ContactInfo>,
    /// Default delivery lead time in days (0 if unknown).
    pub lead_time_days: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateContact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateContact {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    /// Optional new name (if None, keep existing).
    pub name: Option<String>,
    /// Optional new contact info (if None, keep existing).
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetLeadTime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLeadTime {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SuspendSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendSupplier {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    /// Optional human-readable reason for suspension.
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReinstateSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinstateSupplier {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierCommand {
    RegisterSupplier(RegisterSupplier),
    UpdateContact(UpdateContact),
    SetLeadTime(SetLeadTime),
    SuspendSupplier(SuspendSupplier),
    ReinstateSupplier(ReinstateSupplier),
}

/// Event: SupplierRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRegistered {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierContactUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierContactUpdated {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierLeadTimeSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierLeadTimeSet {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierSuspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierSuspended {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierReinstated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierReinstated {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierEvent {
    SupplierRegistered(SupplierRegistered),
    SupplierContactUpdated(SupplierContactUpdated),
    SupplierLeadTimeSet(SupplierLeadTimeSet),
    SupplierSuspended(SupplierSuspended),
    SupplierReinstated(SupplierReinstated),
}

impl Event for SupplierEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupplierEvent::SupplierRegistered(_) => "suppliers.supplier.registered",
            SupplierEvent::SupplierContactUpdated(_) => "suppliers.supplier.contact_updated",
            SupplierEvent::SupplierLeadTimeSet(_) => "suppliers.supplier.lead_time_set",
            SupplierEvent::SupplierSuspended(_) => "suppliers.supplier.suspended",
            SupplierEvent::SupplierReinstated(_) => "suppliers.supplier.reinstated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupplierEvent::SupplierRegistered(e) => e.occurred_at,
            SupplierEvent::SupplierContactUpdated(e) => e.occurred_at,
            SupplierEvent::SupplierLeadTimeSet(e) => e.occurred_at,
            SupplierEvent::SupplierSuspended(e) => e.occurred_at,
            SupplierEvent::SupplierReinstated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Supplier {
    type Command = SupplierCommand;
    type Event = SupplierEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupplierEvent::SupplierRegistered(e) => {
                self.id = e.supplier_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.lead_time_days = e.lead_time_days;
                self.status = SupplierStatus::Active;
                self.created = true;
            }
            SupplierEvent::SupplierContactUpdated(e) => {
                self.name = e.name.clone();
                self.contact = e.contact.clone();
            }
            SupplierEvent::SupplierLeadTimeSet(e) => {
                self.lead_time_days = e.lead_time_days;
            }
            SupplierEvent::SupplierSuspended(_) => {
                self.status = SupplierStatus::Suspended;
            }
            SupplierEvent::SupplierReinstated(_) => {
                self.status = SupplierStatus::Active;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupplierCommand::RegisterSupplier(cmd) => self.handle_register(cmd),
            SupplierCommand::UpdateContact(cmd) => self.handle_update_contact(cmd),
            SupplierCommand::SetLeadTime(cmd) => self.handle_set_lead_time(cmd),
            SupplierCommand::SuspendSupplier(cmd) => self.handle_suspend(cmd),
            SupplierCommand::ReinstateSupplier(cmd) => self.handle_reinstate(cmd),
        }
    }
}

impl Supplier {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_supplier_id(&self, supplier_id: SupplierId) -> Result<(), DomainError> {
        if self.id != supplier_id {
            return Err(DomainError::invariant("supplier_id mismatch"));
        }
        Ok(())
    }

    fn validate_lead_time(lead_time_days: u32) -> Result<(), DomainError> {
        if lead_time_days > MAX_LEAD_TIME_DAYS {
            return Err(DomainError::validation("lead time must be at most 365 days"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("supplier already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let lead_time_days = cmd.lead_time_days.unwrap_or(0);
        Self::validate_lead_time(lead_time_days)?;

        let contact = cmd.contact.clone().unwrap_or_default();

        Ok(vec![SupplierEvent::SupplierRegistered(SupplierRegistered {
            tenant_id: cmd.tenant_id,
            supplier_id: cmd.supplier_id,
            name: cmd.name.clone(),
            contact,
            lead_time_days,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_contact(&self, cmd: &UpdateContact) -> Result<Vec<SupplierEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_supplier_id(cmd.supplier_id)?;

        let new_name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if new_name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let new_contact = cmd.contact.clone().unwrap_or_else(|| self.contact.clone());

        Ok(vec![SupplierEvent::SupplierContactUpdated(SupplierContactUpdated {
            tenant_id: cmd.tenant_id,
            supplier_id: cmd.supplier_id,
            name: new_name,
            contact: new_contact,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_lead_time(&self, cmd: &SetLeadTime) -> Result<Vec<SupplierEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_supplier_id(cmd.supplier_id)?;

        Self::validate_lead_time(cmd.lead_time_days)?;

        Ok(vec![SupplierEvent::SupplierLeadTimeSet(SupplierLeadTimeSet {
            tenant_id: cmd.tenant_id,
            supplier_id: cmd.supplier_id,
            lead_time_days: cmd.lead_time_days,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_supplier_id(cmd.supplier_id)?;

        if self.status == SupplierStatus::Suspended {
            return Err(DomainError::conflict("supplier is already suspended"));
        }

        Ok(vec![SupplierEvent::SupplierSuspended(SupplierSuspended {
            tenant_id: cmd.tenant_id,
            supplier_id: cmd.supplier_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reinstate(&self, cmd: &ReinstateSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_supplier_id(cmd.supplier_id)?;

        if self.status == SupplierStatus::Active {
            return Err(DomainError::conflict("supplier is not suspended"));
        }

        Ok(vec![SupplierEvent::SupplierReinstated(SupplierReinstated {
            tenant_id: cmd.tenant_id,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
