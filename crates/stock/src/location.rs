use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, TenantId};
use depot_events::{Command, Event};

use crate::company::ensure_compatible;

/// Stock location identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub AggregateId);

impl LocationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LocationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<LocationId> for AggregateId {
    fn from(value: LocationId) -> Self {
        value.0
    }
}

/// What a location is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationUsage {
    /// Structural node; never holds stock.
    View,
    Internal,
    Supplier,
    Customer,
    Transit,
    Inventory,
}

/// Parent of a location being created (owned by its own aggregate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLocation {
    pub id: LocationId,
    pub company_id: Option<CompanyId>,
}

/// Aggregate root: Location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    id: LocationId,
    tenant_id: Option<TenantId>,
    name: String,
    usage: LocationUsage,
    parent_id: Option<LocationId>,
    company_id: Option<CompanyId>,
    active: bool,
    version: u64,
    created: bool,
}

impl Location {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: LocationId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            usage: LocationUsage::Internal,
            parent_id: None,
            company_id: None,
            active: true,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LocationId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> LocationUsage {
        self.usage
    }

    pub fn parent_id(&self) -> Option<LocationId> {
        self.parent_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateLocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLocation {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub name: String,
    pub usage: LocationUsage,
    pub parent: Option<ParentLocation>,
    pub company_id: Option<CompanyId>,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RenameLocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameLocation {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetLocationActive (archive / unarchive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLocationActive {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationCommand {
    CreateLocation(CreateLocation),
    RenameLocation(RenameLocation),
    SetLocationActive(SetLocationActive),
}

impl Command for LocationCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            LocationCommand::CreateLocation(c) => c.location_id.0,
            LocationCommand::RenameLocation(c) => c.location_id.0,
            LocationCommand::SetLocationActive(c) => c.location_id.0,
        }
    }
}

/// Event: LocationCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCreated {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub name: String,
    pub usage: LocationUsage,
    pub parent_id: Option<LocationId>,
    pub company_id: Option<CompanyId>,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LocationRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRenamed {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LocationArchived / LocationUnarchived share a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationActivityChanged {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationEvent {
    LocationCreated(LocationCreated),
    LocationRenamed(LocationRenamed),
    LocationArchived(LocationActivityChanged),
    LocationUnarchived(LocationActivityChanged),
}

impl LocationEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            LocationEvent::LocationCreated(e) => e.tenant_id,
            LocationEvent::LocationRenamed(e) => e.tenant_id,
            LocationEvent::LocationArchived(e) | LocationEvent::LocationUnarchived(e) => e.tenant_id,
        }
    }

    pub fn location_id(&self) -> LocationId {
        match self {
            LocationEvent::LocationCreated(e) => e.location_id,
            LocationEvent::LocationRenamed(e) => e.location_id,
            LocationEvent::LocationArchived(e) | LocationEvent::LocationUnarchived(e) => {
                e.location_id
            }
        }
    }
}

impl Event for LocationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LocationEvent::LocationCreated(_) => "stock.location.created",
            LocationEvent::LocationRenamed(_) => "stock.location.renamed",
            LocationEvent::LocationArchived(_) => "stock.location.archived",
            LocationEvent::LocationUnarchived(_) => "stock.location.unarchived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LocationEvent::LocationCreated(e) => e.occurred_at,
            LocationEvent::LocationRenamed(e) => e.occurred_at,
            LocationEvent::LocationArchived(e) | LocationEvent::LocationUnarchived(e) => {
                e.occurred_at
            }
        }
    }
}

impl Aggregate for Location {
    type Command = LocationCommand;
    type Event = LocationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LocationEvent::LocationCreated(e) => {
                self.id = e.location_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.usage = e.usage;
                self.parent_id = e.parent_id;
                self.company_id = e.company_id;
                self.active = e.active;
                self.created = true;
            }
            LocationEvent::LocationRenamed(e) => {
                self.name = e.name.clone();
            }
            LocationEvent::LocationArchived(_) => {
                self.active = false;
            }
            LocationEvent::LocationUnarchived(_) => {
                self.active = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LocationCommand::CreateLocation(cmd) => self.handle_create(cmd),
            LocationCommand::RenameLocation(cmd) => self.handle_rename(cmd),
            LocationCommand::SetLocationActive(cmd) => self.handle_set_active(cmd),
        }
    }
}

impl Location {
    fn ensure_existing(&self, tenant_id: TenantId, location_id: LocationId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != location_id {
            return Err(DomainError::invariant("location_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateLocation) -> Result<Vec<LocationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("location already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("location name cannot be empty"));
        }
        if let Some(parent) = &cmd.parent {
            if parent.id == cmd.location_id {
                return Err(DomainError::invariant("a location cannot be its own parent"));
            }
            ensure_compatible(parent.company_id, cmd.company_id, "Parent location")?;
        }

        Ok(vec![LocationEvent::LocationCreated(LocationCreated {
            tenant_id: cmd.tenant_id,
            location_id: cmd.location_id,
            name: cmd.name.trim().to_string(),
            usage: cmd.usage,
            parent_id: cmd.parent.map(|p| p.id),
            company_id: cmd.company_id,
            active: cmd.active,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameLocation) -> Result<Vec<LocationEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.location_id)?;

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("location name cannot be empty"));
        }
        if name == self.name {
            return Ok(vec![]);
        }

        Ok(vec![LocationEvent::LocationRenamed(LocationRenamed {
            tenant_id: cmd.tenant_id,
            location_id: cmd.location_id,
            name: name.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Idempotent: asking for the current state emits nothing.
    fn handle_set_active(&self, cmd: &SetLocationActive) -> Result<Vec<LocationEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.location_id)?;

        if cmd.active == self.active {
            return Ok(vec![]);
        }

        let payload = LocationActivityChanged {
            tenant_id: cmd.tenant_id,
            location_id: cmd.location_id,
            occurred_at: cmd.occurred_at,
        };
        Ok(vec![if cmd.active {
            LocationEvent::LocationUnarchived(payload)
        } else {
            LocationEvent::LocationArchived(payload)
        }])
    }
}
