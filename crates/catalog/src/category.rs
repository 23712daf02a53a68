use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpilot_core::{Aggregate, AggregateRoot, AggregateId, DomainError, TenantId};
use stockpilot_events::Event;

/// Category identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub AggregateId);

impl CategoryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Category status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Active,
    Archived,
}

const MAX_NAME_LEN: usize = 80;

/// Aggregate root: Category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    id: CategoryId,
    tenant_id: Option<TenantId>,
    name: String,
    description: String,
    status: CategoryStatus,
    version: u64,
    created: bool,
}

impl Category {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CategoryId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            description: String::new(),
            status: CategoryStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> CategoryStatus {
        self.status
    }
}

impl AggregateRoot for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategory {
    pub tenant_id: TenantId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RenameCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCategory {
    pub tenant_id: TenantId,
    pub category_id: CategoryId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveCategory {
    pub tenant_id: TenantId,
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryCommand {
    CreateCategory(CreateCategory),
    RenameCategory(RenameCategory),
    ArchiveCategory(ArchiveCategory),
}

/// Event: CategoryCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCreated {
    pub tenant_id: TenantId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CategoryRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRenamed {
    pub tenant_id: TenantId,
    pub category_id: CategoryId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CategoryArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryArchived {
    pub tenant_id: TenantId,
    pub category_id: CategoryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEvent {
    CategoryCreated(CategoryCreated),
    CategoryRenamed(CategoryRenamed),
    CategoryArchived(CategoryArchived),
}

impl Event for CategoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CategoryEvent::CategoryCreated(_) => "catalog.category.created",
            CategoryEvent::CategoryRenamed(_) => "catalog.category.renamed",
            CategoryEvent::CategoryArchived(_) => "catalog.category.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CategoryEvent::CategoryCreated(e) => e.occurred_at,
            CategoryEvent::CategoryRenamed(e) => e.occurred_at,
            CategoryEvent::CategoryArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Category {
    type Command = CategoryCommand;
    type Event = CategoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CategoryEvent::CategoryCreated(e) => {
                self.id = e.category_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.status = CategoryStatus::Active;
                self.created = true;
            }
            CategoryEvent::CategoryRenamed(e) => {
                self.name = e.name.clone();
            }
            CategoryEvent::CategoryArchived(_) => {
                self.status = CategoryStatus::Archived;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CategoryCommand::CreateCategory(cmd) => self.handle_create(cmd),
            CategoryCommand::RenameCategory(cmd) => self.handle_rename(cmd),
            CategoryCommand::ArchiveCategory(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Category {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_category_id(&self, category_id: CategoryId) -> Result<(), DomainError> {
        if self.id != category_id {
            return Err(DomainError::invariant("category_id mismatch"));
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(DomainError::validation("name must be at most 80 characters"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateCategory) -> Result<Vec<CategoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("category already exists"));
        }

        Self::validate_name(&cmd.name)?;

        Ok(vec![CategoryEvent::CategoryCreated(CategoryCreated {
            tenant_id: cmd.tenant_id,
            category_id: cmd.category_id,
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameCategory) -> Result<Vec<CategoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_category_id(cmd.category_id)?;

        if self.status == CategoryStatus::Archived {
            return Err(DomainError::invariant("archived categories cannot be renamed"));
        }

        Self::validate_name(&cmd.name)?;

        if self.name == cmd.name {
            return Err(DomainError::conflict("category already has this name"));
        }

        Ok(vec![CategoryEvent::CategoryRenamed(CategoryRenamed {
            tenant_id: cmd.tenant_id,
            category_id: cmd.category_id,
            name: cmd.name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveCategory) -> Result<Vec<CategoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_category_id(cmd.category_id)?;

        if self.status == CategoryStatus::Archived {
            return Err(DomainError::conflict("category is already archived"));
        }

        Ok(vec![CategoryEvent::CategoryArchived(CategoryArchived {
            tenant_id: cmd.tenant_id,
            category_id: cmd.category_id,
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

    fn test_category_id() -> CategoryId {
        CategoryId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_category(tenant_id: TenantId, category_id: CategoryId) -> Category {
        let mut category = Category::empty(category_id);
        let cmd = CreateCategory {
            tenant_id,
            category_id,
            name: "Fasteners".to_string(),
            description: "Bolts, nuts and screws".to_string(),
            occurred_at: test_time(),
        };
        let events = category.handle(&CategoryCommand::CreateCategory(cmd)).unwrap();
        category.apply(&events[0]);
        category
    }

    #[test]
    fn create_category_emits_category_created_event() {
        let category = Category::empty(test_category_id());
        let tenant_id = test_tenant_id();
        let category_id = test_category_id();
        let cmd = CreateCategory {
            tenant_id,
            category_id,
            name: "Fasteners".to_string(),
            description: "Bolts, nuts and screws".to_string(),
            occurred_at: test_time(),
        };

        let events = category.handle(&CategoryCommand::CreateCategory(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            CategoryEvent::CategoryCreated(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.category_id, category_id);
                assert_eq!(e.name, "Fasteners");
            }
            _ => panic!("Expected CategoryCreated event"),
        }
    }

    #[test]
    fn create_category_rejects_empty_name() {
        let category = Category::empty(test_category_id());
        let cmd = CreateCategory {
            tenant_id: test_tenant_id(),
            category_id: test_category_id(),
            name: " ".to_string(),
            description: String::new(),
            occurred_at: test_time(),
        };

        let err = category.handle(&CategoryCommand::CreateCategory(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_category_rejects_overlong_name() {
        let category = Category::empty(test_category_id());
        let cmd = CreateCategory {
            tenant_id: test_tenant_id(),
            category_id: test_category_id(),
            name: "x".repeat(81),
            description: String::new(),
            occurred_at: test_time(),
        };

        let err = category.handle(&CategoryCommand::CreateCategory(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("80")),
            _ => panic!("Expected Validation error for overlong name"),
        }
    }

    #[test]
    fn rename_category_changes_the_name() {
        let tenant_id = test_tenant_id();
        let category_id = test_category_id();
        let mut category = created_category(tenant_id, category_id);

        let cmd = RenameCategory {
            tenant_id,
            category_id,
            name: "Hardware".to_string(),
            occurred_at: test_time(),
        };

        let events = category.handle(&CategoryCommand::RenameCategory(cmd)).unwrap();
        category.apply(&events[0]);
        assert_eq!(category.name(), "Hardware");
        assert_eq!(category.version(), 2);
    }

    #[test]
    fn rename_category_rejects_unchanged_name() {
        let tenant_id = test_tenant_id();
        let category_id = test_category_id();
        let category = created_category(tenant_id, category_id);

        let cmd = RenameCategory {
            tenant_id,
            category_id,
            name: "Fasteners".to_string(),
            occurred_at: test_time(),
        };

        let err = category.handle(&CategoryCommand::RenameCategory(cmd)).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for unchanged name"),
        }
    }

    #[test]
    fn archive_category_updates_status() {
        let tenant_id = test_tenant_id();
        let category_id = test_category_id();
        let mut category = created_category(tenant_id, category_id);

        let cmd = ArchiveCategory {
            tenant_id,
            category_id,
            occurred_at: test_time(),
        };

        let events = category.handle(&CategoryCommand::ArchiveCategory(cmd)).unwrap();
        category.apply(&events[0]);
        assert_eq!(category.status(), CategoryStatus::Archived);
    }

    #[test]
    fn archived_category_rejects_rename() {
        let tenant_id = test_tenant_id();
        let category_id = test_category_id();
        let mut category = created_category(tenant_id, category_id);

        let archive = ArchiveCategory {
            tenant_id,
            category_id,
            occurred_at: test_time(),
        };
        let events = category.handle(&CategoryCommand::ArchiveCategory(archive)).unwrap();
        category.apply(&events[0]);

        let rename = RenameCategory {
            tenant_id,
            category_id,
            name: "Hardware".to_string(),
            occurred_at: test_time(),
        };
        let err = category.handle(&CategoryCommand::RenameCategory(rename)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("archived")),
            _ => panic!("Expected InvariantViolation for rename on archived category"),
        }
    }

    #[test]
    fn commands_reject_wrong_tenant() {
        let tenant_id = test_tenant_id();
        let category_id = test_category_id();
        let category = created_category(tenant_id, category_id);

        let cmd = ArchiveCategory {
            tenant_id: test_tenant_id(),
            category_id,
            occurred_at: test_time(),
        };

        let err = category.handle(&CategoryCommand::ArchiveCategory(cmd)).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation error for tenant mismatch"),
        }
    }

    #[test]
    fn commands_reject_non_existent_category() {
        let category = Category::empty(test_category_id());
        let cmd = RenameCategory {
            tenant_id: test_tenant_id(),
            category_id: test_category_id(),
            name: "Hardware".to_string(),
            occurred_at: test_time(),
        };

        let err = category.handle(&CategoryCommand::RenameCategory(cmd)).unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound error for non-existent category"),
        }
    }
}
