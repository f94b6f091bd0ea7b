use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, TenantId};
use depot_events::{Command, Event};

use crate::company::{CompanyScoped, ensure_compatible};
use crate::location::LocationId;
use crate::sequence::SequenceId;
use crate::steps::{OperationCode, OperationKind};
use crate::warehouse::WarehouseId;

/// Operation type identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickingTypeId(pub AggregateId);

impl PickingTypeId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PickingTypeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<PickingTypeId> for AggregateId {
    fn from(value: PickingTypeId) -> Self {
        value.0
    }
}

/// Mutable part of an operation type, recomputed by the warehouse workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingTypeSettings {
    pub name: String,
    pub default_src: Option<LocationId>,
    pub default_dest: Option<LocationId>,
    pub return_picking_type: Option<PickingTypeId>,
    pub active: bool,
}

/// Aggregate root: PickingType (operation type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickingType {
    id: PickingTypeId,
    tenant_id: Option<TenantId>,
    warehouse_id: Option<WarehouseId>,
    kind: OperationKind,
    sequence_id: Option<SequenceId>,
    company_id: Option<CompanyId>,
    settings: PickingTypeSettings,
    version: u64,
    created: bool,
}

impl PickingType {
    pub fn empty(id: PickingTypeId) -> Self {
        Self {
            id,
            tenant_id: None,
            warehouse_id: None,
            kind: OperationKind::Internal,
            sequence_id: None,
            company_id: None,
            settings: PickingTypeSettings {
                name: String::new(),
                default_src: None,
                default_dest: None,
                return_picking_type: None,
                active: true,
            },
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PickingTypeId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn code(&self) -> OperationCode {
        self.kind.code()
    }

    pub fn sequence_id(&self) -> Option<SequenceId> {
        self.sequence_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn settings(&self) -> &PickingTypeSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.settings.active
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for PickingType {
    type Id = PickingTypeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePickingType {
    pub tenant_id: TenantId,
    pub picking_type_id: PickingTypeId,
    pub warehouse_id: WarehouseId,
    pub kind: OperationKind,
    pub sequence_id: SequenceId,
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub default_src: Option<CompanyScoped<LocationId>>,
    pub default_dest: Option<CompanyScoped<LocationId>>,
    pub return_picking_type: Option<PickingTypeId>,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurePickingType {
    pub tenant_id: TenantId,
    pub picking_type_id: PickingTypeId,
    pub name: String,
    pub default_src: Option<CompanyScoped<LocationId>>,
    pub default_dest: Option<CompanyScoped<LocationId>>,
    pub return_picking_type: Option<PickingTypeId>,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickingTypeCommand {
    CreatePickingType(CreatePickingType),
    ConfigurePickingType(ConfigurePickingType),
}

impl Command for PickingTypeCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            PickingTypeCommand::CreatePickingType(c) => c.picking_type_id.0,
            PickingTypeCommand::ConfigurePickingType(c) => c.picking_type_id.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingTypeCreated {
    pub tenant_id: TenantId,
    pub picking_type_id: PickingTypeId,
    pub warehouse_id: WarehouseId,
    pub kind: OperationKind,
    pub sequence_id: SequenceId,
    pub company_id: Option<CompanyId>,
    pub settings: PickingTypeSettings,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingTypeConfigured {
    pub tenant_id: TenantId,
    pub picking_type_id: PickingTypeId,
    pub settings: PickingTypeSettings,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickingTypeEvent {
    PickingTypeCreated(PickingTypeCreated),
    PickingTypeConfigured(PickingTypeConfigured),
}

impl Event for PickingTypeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PickingTypeEvent::PickingTypeCreated(_) => "stock.picking_type.created",
            PickingTypeEvent::PickingTypeConfigured(_) => "stock.picking_type.configured",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PickingTypeEvent::PickingTypeCreated(e) => e.occurred_at,
            PickingTypeEvent::PickingTypeConfigured(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PickingType {
    type Command = PickingTypeCommand;
    type Event = PickingTypeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PickingTypeEvent::PickingTypeCreated(e) => {
                self.id = e.picking_type_id;
                self.tenant_id = Some(e.tenant_id);
                self.warehouse_id = Some(e.warehouse_id);
                self.kind = e.kind;
                self.sequence_id = Some(e.sequence_id);
                self.company_id = e.company_id;
                self.settings = e.settings.clone();
                self.created = true;
            }
            PickingTypeEvent::PickingTypeConfigured(e) => {
                self.settings = e.settings.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PickingTypeCommand::CreatePickingType(cmd) => self.handle_create(cmd),
            PickingTypeCommand::ConfigurePickingType(cmd) => self.handle_configure(cmd),
        }
    }
}

impl PickingType {
    fn check_locations(
        company_id: Option<CompanyId>,
        src: Option<&CompanyScoped<LocationId>>,
        dest: Option<&CompanyScoped<LocationId>>,
    ) -> Result<(), DomainError> {
        for location in [src, dest].into_iter().flatten() {
            ensure_compatible(company_id, location.company_id, "Default location")?;
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePickingType) -> Result<Vec<PickingTypeEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("operation type already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("operation type name cannot be empty"));
        }
        Self::check_locations(cmd.company_id, cmd.default_src.as_ref(), cmd.default_dest.as_ref())?;

        Ok(vec![PickingTypeEvent::PickingTypeCreated(PickingTypeCreated {
            tenant_id: cmd.tenant_id,
            picking_type_id: cmd.picking_type_id,
            warehouse_id: cmd.warehouse_id,
            kind: cmd.kind,
            sequence_id: cmd.sequence_id,
            company_id: cmd.company_id,
            settings: PickingTypeSettings {
                name: cmd.name.clone(),
                default_src: cmd.default_src.map(|l| l.id),
                default_dest: cmd.default_dest.map(|l| l.id),
                return_picking_type: cmd.return_picking_type,
                active: cmd.active,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_configure(
        &self,
        cmd: &ConfigurePickingType,
    ) -> Result<Vec<PickingTypeEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(cmd.tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("operation type name cannot be empty"));
        }
        Self::check_locations(self.company_id, cmd.default_src.as_ref(), cmd.default_dest.as_ref())?;

        let settings = PickingTypeSettings {
            name: cmd.name.clone(),
            default_src: cmd.default_src.map(|l| l.id),
            default_dest: cmd.default_dest.map(|l| l.id),
            return_picking_type: cmd.return_picking_type,
            active: cmd.active,
        };
        if settings == self.settings {
            return Ok(vec![]);
        }

        Ok(vec![PickingTypeEvent::PickingTypeConfigured(PickingTypeConfigured {
            tenant_id: cmd.tenant_id,
            picking_type_id: cmd.picking_type_id,
            settings,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_events::execute;

    fn new_location(company_id: Option<CompanyId>) -> CompanyScoped<LocationId> {
        CompanyScoped::new(LocationId::new(AggregateId::new()), company_id)
    }

    fn create_cmd(tenant_id: TenantId, company_id: CompanyId) -> CreatePickingType {
        CreatePickingType {
            tenant_id,
            picking_type_id: PickingTypeId::new(AggregateId::new()),
            warehouse_id: WarehouseId::new(AggregateId::new()),
            kind: OperationKind::Receipt,
            sequence_id: SequenceId::new(AggregateId::new()),
            company_id: Some(company_id),
            name: "Receipts".to_string(),
            default_src: Some(new_location(None)),
            default_dest: Some(new_location(Some(company_id))),
            return_picking_type: None,
            active: true,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn create_accepts_shared_and_own_company_locations() {
        let company_id = CompanyId::new();
        let cmd = create_cmd(TenantId::new(), company_id);
        let mut picking_type = PickingType::empty(cmd.picking_type_id);

        execute(&mut picking_type, &PickingTypeCommand::CreatePickingType(cmd.clone())).unwrap();

        assert_eq!(picking_type.kind(), OperationKind::Receipt);
        assert_eq!(picking_type.code(), OperationCode::Incoming);
        assert_eq!(picking_type.settings().default_dest, cmd.default_dest.map(|l| l.id));
    }

    #[test]
    fn create_rejects_foreign_company_location() {
        let company_id = CompanyId::new();
        let mut cmd = create_cmd(TenantId::new(), company_id);
        cmd.default_dest = Some(new_location(Some(CompanyId::new())));

        let err = PickingType::empty(cmd.picking_type_id)
            .handle(&PickingTypeCommand::CreatePickingType(cmd))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvariantViolation("Default location must belong to the same company".into())
        );
    }

    #[test]
    fn configure_only_emits_on_change() {
        let tenant_id = TenantId::new();
        let cmd = create_cmd(tenant_id, CompanyId::new());
        let mut picking_type = PickingType::empty(cmd.picking_type_id);
        execute(&mut picking_type, &PickingTypeCommand::CreatePickingType(cmd.clone())).unwrap();

        let mut configure = ConfigurePickingType {
            tenant_id,
            picking_type_id: cmd.picking_type_id,
            name: cmd.name.clone(),
            default_src: cmd.default_src,
            default_dest: cmd.default_dest,
            return_picking_type: None,
            active: true,
            occurred_at: Utc::now(),
        };
        assert!(
            picking_type
                .handle(&PickingTypeCommand::ConfigurePickingType(configure.clone()))
                .unwrap()
                .is_empty()
        );

        configure.active = false;
        execute(&mut picking_type, &PickingTypeCommand::ConfigurePickingType(configure)).unwrap();
        assert!(!picking_type.is_active());
        assert_eq!(picking_type.version(), 2);
    }
}
