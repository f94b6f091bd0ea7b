use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, TenantId};
use depot_events::{Command, Event};

/// Partner identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(pub AggregateId);

impl PartnerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartnerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<PartnerId> for AggregateId {
    fn from(value: PartnerId) -> Self {
        value.0
    }
}

/// Contact information for a partner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Warehouse data stamped onto a partner used as a warehouse address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerWarehouse {
    pub warehouse_id: AggregateId,
    /// Location goods sent to this partner end up in.
    pub property_stock_customer: AggregateId,
    /// Location goods bought from this partner come from.
    pub property_stock_supplier: AggregateId,
}

/// Aggregate root: Partner (an address: company, warehouse, customer, vendor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partner {
    id: PartnerId,
    tenant_id: Option<TenantId>,
    name: String,
    contact: ContactInfo,
    company_id: Option<CompanyId>,
    warehouse: Option<PartnerWarehouse>,
    version: u64,
    created: bool,
}

impl Partner {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PartnerId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            contact: ContactInfo::default(),
            company_id: None,
            warehouse: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartnerId {
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

    /// `None` for partners shared by every company of the tenant.
    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn warehouse(&self) -> Option<&PartnerWarehouse> {
        self.warehouse.as_ref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Partner {
    type Id = PartnerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterPartner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPartner {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub name: String,
    pub contact: Option<ContactInfo>,
    pub company_id: Option<CompanyId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    /// Optional new name (if None, keep existing).
    pub name: Option<String>,
    /// Optional new contact info (if None, keep existing).
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignWarehouse.
///
/// Both stock properties point at the company's inter-warehouse transit
/// location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignWarehouse {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub warehouse_id: AggregateId,
    pub transit_location_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerCommand {
    RegisterPartner(RegisterPartner),
    UpdateDetails(UpdateDetails),
    AssignWarehouse(AssignWarehouse),
}

impl Command for PartnerCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            PartnerCommand::RegisterPartner(c) => c.partner_id.0,
            PartnerCommand::UpdateDetails(c) => c.partner_id.0,
            PartnerCommand::AssignWarehouse(c) => c.partner_id.0,
        }
    }
}

/// Event: PartnerRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerRegistered {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub name: String,
    pub contact: ContactInfo,
    pub company_id: Option<CompanyId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartnerUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerUpdated {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseAssigned {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub warehouse: PartnerWarehouse,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerEvent {
    PartnerRegistered(PartnerRegistered),
    PartnerUpdated(PartnerUpdated),
    WarehouseAssigned(WarehouseAssigned),
}

impl Event for PartnerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartnerEvent::PartnerRegistered(_) => "parties.partner.registered",
            PartnerEvent::PartnerUpdated(_) => "parties.partner.updated",
            PartnerEvent::WarehouseAssigned(_) => "parties.partner.warehouse_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartnerEvent::PartnerRegistered(e) => e.occurred_at,
            PartnerEvent::PartnerUpdated(e) => e.occurred_at,
            PartnerEvent::WarehouseAssigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Partner {
    type Command = PartnerCommand;
    type Event = PartnerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartnerEvent::PartnerRegistered(e) => {
                self.id = e.partner_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.company_id = e.company_id;
                self.created = true;
            }
            PartnerEvent::PartnerUpdated(e) => {
                self.name = e.name.clone();
                self.contact = e.contact.clone();
            }
            PartnerEvent::WarehouseAssigned(e) => {
                self.warehouse = Some(e.warehouse);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartnerCommand::RegisterPartner(cmd) => self.handle_register(cmd),
            PartnerCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            PartnerCommand::AssignWarehouse(cmd) => self.handle_assign_warehouse(cmd),
        }
    }
}

impl Partner {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_partner_id(&self, partner_id: PartnerId) -> Result<(), DomainError> {
        if self.id != partner_id {
            return Err(DomainError::invariant("partner_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterPartner) -> Result<Vec<PartnerEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("partner already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![PartnerEvent::PartnerRegistered(PartnerRegistered {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            name: cmd.name.clone(),
            contact: cmd.contact.clone().unwrap_or_default(),
            company_id: cmd.company_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateDetails) -> Result<Vec<PartnerEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_partner_id(cmd.partner_id)?;

        let new_name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if new_name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let new_contact = cmd.contact.clone().unwrap_or_else(|| self.contact.clone());

        Ok(vec![PartnerEvent::PartnerUpdated(PartnerUpdated {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            name: new_name,
            contact: new_contact,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_warehouse(
        &self,
        cmd: &AssignWarehouse,
    ) -> Result<Vec<PartnerEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_partner_id(cmd.partner_id)?;

        let warehouse = PartnerWarehouse {
            warehouse_id: cmd.warehouse_id,
            property_stock_customer: cmd.transit_location_id,
            property_stock_supplier: cmd.transit_location_id,
        };
        if self.warehouse == Some(warehouse) {
            return Ok(vec![]);
        }

        Ok(vec![PartnerEvent::WarehouseAssigned(WarehouseAssigned {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            warehouse,
            occurred_at: cmd.occurred_at,
        })])
    }
}
