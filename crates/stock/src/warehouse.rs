use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, TenantId};
use depot_events::{Command, Event};
use depot_parties::PartnerId;

use crate::code::WarehouseCode;
use crate::company::{CompanyScoped, ensure_company};
use crate::location::LocationId;
use crate::picking_type::PickingTypeId;
use crate::route::{RouteId, RuleId};
use crate::steps::{OperationKind, StepConfig, SubLocation};

/// Display order given to warehouses created without one.
pub const DEFAULT_SEQUENCE: u32 = 10;

/// Warehouse identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(pub AggregateId);

impl WarehouseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<WarehouseId> for AggregateId {
    fn from(value: WarehouseId) -> Self {
        value.0
    }
}

/// Routes owned by (or attached to) a warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRoutes {
    pub reception_route_id: Option<RouteId>,
    pub delivery_route_id: Option<RouteId>,
    pub crossdock_route_id: Option<RouteId>,
    /// This warehouse's rule inside the tenant-wide make-to-order route.
    pub mto_rule_id: Option<RuleId>,
    /// Routes selectable on the warehouse.
    pub route_ids: Vec<RouteId>,
}

/// Aggregate root: Warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warehouse {
    id: WarehouseId,
    tenant_id: Option<TenantId>,
    name: String,
    code: Option<WarehouseCode>,
    company_id: Option<CompanyId>,
    partner_id: Option<PartnerId>,
    active: bool,
    sequence: u32,
    steps: StepConfig,
    view_location_id: Option<LocationId>,
    /// Every sub-location ever provisioned; archived ones stay referenced.
    sub_locations: BTreeMap<SubLocation, LocationId>,
    operation_types: BTreeMap<OperationKind, PickingTypeId>,
    routes: WarehouseRoutes,
    resupply_wh_ids: Vec<WarehouseId>,
    resupply_route_ids: Vec<RouteId>,
    version: u64,
    created: bool,
}

impl Warehouse {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: WarehouseId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            code: None,
            company_id: None,
            partner_id: None,
            active: true,
            sequence: DEFAULT_SEQUENCE,
            steps: StepConfig::default(),
            view_location_id: None,
            sub_locations: BTreeMap::new(),
            operation_types: BTreeMap::new(),
            routes: WarehouseRoutes::default(),
            resupply_wh_ids: vec![],
            resupply_route_ids: vec![],
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> WarehouseId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> Option<&WarehouseCode> {
        self.code.as_ref()
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn partner_id(&self) -> Option<PartnerId> {
        self.partner_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn steps(&self) -> StepConfig {
        self.steps
    }

    pub fn view_location_id(&self) -> Option<LocationId> {
        self.view_location_id
    }

    pub fn sub_location(&self, sub: SubLocation) -> Option<LocationId> {
        self.sub_locations.get(&sub).copied()
    }

    pub fn sub_locations(&self) -> &BTreeMap<SubLocation, LocationId> {
        &self.sub_locations
    }

    pub fn stock_location_id(&self) -> Option<LocationId> {
        self.sub_location(SubLocation::Stock)
    }

    pub fn operation_type(&self, kind: OperationKind) -> Option<PickingTypeId> {
        self.operation_types.get(&kind).copied()
    }

    pub fn operation_types(&self) -> &BTreeMap<OperationKind, PickingTypeId> {
        &self.operation_types
    }

    pub fn routes(&self) -> &WarehouseRoutes {
        &self.routes
    }

    pub fn resupply_wh_ids(&self) -> &[WarehouseId] {
        &self.resupply_wh_ids
    }

    pub fn resupply_route_ids(&self) -> &[RouteId] {
        &self.resupply_route_ids
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateWarehouse.
///
/// The view location and the sub-locations are created by the provisioning
/// workflow beforehand; the warehouse only references them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWarehouse {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: String,
    pub company_id: CompanyId,
    pub partner: Option<CompanyScoped<PartnerId>>,
    pub view_location: CompanyScoped<LocationId>,
    pub sub_locations: BTreeMap<SubLocation, CompanyScoped<LocationId>>,
    pub steps: StepConfig,
    pub sequence: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateWarehouse. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWarehouse {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub name: Option<String>,
    pub code: Option<String>,
    pub sequence: Option<u32>,
    pub partner: Option<Option<CompanyScoped<PartnerId>>>,
    pub steps: Option<StepConfig>,
    pub active: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSubLocations {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub locations: BTreeMap<SubLocation, CompanyScoped<LocationId>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignOperationTypes {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub operation_types: BTreeMap<OperationKind, CompanyScoped<PickingTypeId>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRoutes {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub routes: WarehouseRoutes,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignResupply {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub resupply_warehouses: Vec<CompanyScoped<WarehouseId>>,
    pub resupply_route_ids: Vec<RouteId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseCommand {
    CreateWarehouse(CreateWarehouse),
    UpdateWarehouse(UpdateWarehouse),
    SetSubLocations(SetSubLocations),
    AssignOperationTypes(AssignOperationTypes),
    AssignRoutes(AssignRoutes),
    AssignResupply(AssignResupply),
}

impl Command for WarehouseCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            WarehouseCommand::CreateWarehouse(c) => c.warehouse_id.0,
            WarehouseCommand::UpdateWarehouse(c) => c.warehouse_id.0,
            WarehouseCommand::SetSubLocations(c) => c.warehouse_id.0,
            WarehouseCommand::AssignOperationTypes(c) => c.warehouse_id.0,
            WarehouseCommand::AssignRoutes(c) => c.warehouse_id.0,
            WarehouseCommand::AssignResupply(c) => c.warehouse_id.0,
        }
    }
}

/// Event: WarehouseCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseCreated {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: WarehouseCode,
    pub company_id: CompanyId,
    pub partner_id: Option<PartnerId>,
    pub view_location_id: LocationId,
    pub sub_locations: BTreeMap<SubLocation, LocationId>,
    pub steps: StepConfig,
    pub sequence: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseUpdated (full values after the change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseUpdated {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: WarehouseCode,
    pub sequence: u32,
    pub partner_id: Option<PartnerId>,
    pub steps: StepConfig,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLocationsAssigned {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub locations: BTreeMap<SubLocation, LocationId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTypesAssigned {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub operation_types: BTreeMap<OperationKind, PickingTypeId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesAssigned {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub routes: WarehouseRoutes,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResupplyAssigned {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub resupply_wh_ids: Vec<WarehouseId>,
    pub resupply_route_ids: Vec<RouteId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseEvent {
    WarehouseCreated(WarehouseCreated),
    WarehouseUpdated(WarehouseUpdated),
    SubLocationsAssigned(SubLocationsAssigned),
    OperationTypesAssigned(OperationTypesAssigned),
    RoutesAssigned(RoutesAssigned),
    ResupplyAssigned(ResupplyAssigned),
}

impl WarehouseEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            WarehouseEvent::WarehouseCreated(e) => e.tenant_id,
            WarehouseEvent::WarehouseUpdated(e) => e.tenant_id,
            WarehouseEvent::SubLocationsAssigned(e) => e.tenant_id,
            WarehouseEvent::OperationTypesAssigned(e) => e.tenant_id,
            WarehouseEvent::RoutesAssigned(e) => e.tenant_id,
            WarehouseEvent::ResupplyAssigned(e) => e.tenant_id,
        }
    }
}

impl Event for WarehouseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WarehouseEvent::WarehouseCreated(_) => "stock.warehouse.created",
            WarehouseEvent::WarehouseUpdated(_) => "stock.warehouse.updated",
            WarehouseEvent::SubLocationsAssigned(_) => "stock.warehouse.sub_locations_assigned",
            WarehouseEvent::OperationTypesAssigned(_) => {
                "stock.warehouse.operation_types_assigned"
            }
            WarehouseEvent::RoutesAssigned(_) => "stock.warehouse.routes_assigned",
            WarehouseEvent::ResupplyAssigned(_) => "stock.warehouse.resupply_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WarehouseEvent::WarehouseCreated(e) => e.occurred_at,
            WarehouseEvent::WarehouseUpdated(e) => e.occurred_at,
            WarehouseEvent::SubLocationsAssigned(e) => e.occurred_at,
            WarehouseEvent::OperationTypesAssigned(e) => e.occurred_at,
            WarehouseEvent::RoutesAssigned(e) => e.occurred_at,
            WarehouseEvent::ResupplyAssigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Warehouse {
    type Command = WarehouseCommand;
    type Event = WarehouseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WarehouseEvent::WarehouseCreated(e) => {
                self.id = e.warehouse_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.code = Some(e.code.clone());
                self.company_id = Some(e.company_id);
                self.partner_id = e.partner_id;
                self.view_location_id = Some(e.view_location_id);
                self.sub_locations = e.sub_locations.clone();
                self.steps = e.steps;
                self.sequence = e.sequence;
                self.active = true;
                self.created = true;
            }
            WarehouseEvent::WarehouseUpdated(e) => {
                self.name = e.name.clone();
                self.code = Some(e.code.clone());
                self.sequence = e.sequence;
                self.partner_id = e.partner_id;
                self.steps = e.steps;
                self.active = e.active;
            }
            WarehouseEvent::SubLocationsAssigned(e) => {
                self.sub_locations
                    .extend(e.locations.iter().map(|(k, v)| (*k, *v)));
            }
            WarehouseEvent::OperationTypesAssigned(e) => {
                self.operation_types
                    .extend(e.operation_types.iter().map(|(k, v)| (*k, *v)));
            }
            WarehouseEvent::RoutesAssigned(e) => {
                self.routes = e.routes.clone();
            }
            WarehouseEvent::ResupplyAssigned(e) => {
                self.resupply_wh_ids = e.resupply_wh_ids.clone();
                self.resupply_route_ids = e.resupply_route_ids.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WarehouseCommand::CreateWarehouse(cmd) => self.handle_create(cmd),
            WarehouseCommand::UpdateWarehouse(cmd) => self.handle_update(cmd),
            WarehouseCommand::SetSubLocations(cmd) => self.handle_set_sub_locations(cmd),
            WarehouseCommand::AssignOperationTypes(cmd) => self.handle_assign_operation_types(cmd),
            WarehouseCommand::AssignRoutes(cmd) => self.handle_assign_routes(cmd),
            WarehouseCommand::AssignResupply(cmd) => self.handle_assign_resupply(cmd),
        }
    }
}

impl Warehouse {
    fn ensure_existing(
        &self,
        tenant_id: TenantId,
        warehouse_id: WarehouseId,
    ) -> Result<CompanyId, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != warehouse_id {
            return Err(DomainError::invariant("warehouse_id mismatch"));
        }
        self.company_id
            .ok_or_else(|| DomainError::invariant("warehouse has no company"))
    }

    fn validate_name(name: &str) -> Result<String, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        Ok(name.to_string())
    }

    fn handle_create(&self, cmd: &CreateWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("warehouse already exists"));
        }

        let name = Self::validate_name(&cmd.name)?;
        let code = WarehouseCode::parse(&cmd.code)?;

        ensure_company(cmd.company_id, &cmd.view_location, "View location")?;
        if let Some(partner) = &cmd.partner {
            ensure_company(cmd.company_id, partner, "Address")?;
        }

        let required: BTreeSet<SubLocation> = cmd.steps.required_sub_locations().into_iter().collect();
        let given: BTreeSet<SubLocation> = cmd.sub_locations.keys().copied().collect();
        if required != given {
            return Err(DomainError::invariant(format!(
                "sub-locations {given:?} do not match the step configuration (expected {required:?})"
            )));
        }
        for (sub, location) in &cmd.sub_locations {
            ensure_company(cmd.company_id, location, sub.name())?;
        }

        Ok(vec![WarehouseEvent::WarehouseCreated(WarehouseCreated {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            name,
            code,
            company_id: cmd.company_id,
            partner_id: cmd.partner.map(|p| p.id),
            view_location_id: cmd.view_location.id,
            sub_locations: cmd.sub_locations.iter().map(|(k, v)| (*k, v.id)).collect(),
            steps: cmd.steps,
            sequence: cmd.sequence,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        let company_id = self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;

        let name = match &cmd.name {
            Some(name) => Self::validate_name(name)?,
            None => self.name.clone(),
        };
        let code = match (&cmd.code, &self.code) {
            (Some(raw), _) => WarehouseCode::parse(raw)?,
            (None, Some(current)) => current.clone(),
            (None, None) => return Err(DomainError::invariant("warehouse has no short name")),
        };
        let partner_id = match &cmd.partner {
            Some(Some(partner)) => {
                ensure_company(company_id, partner, "Address")?;
                Some(partner.id)
            }
            Some(None) => None,
            None => self.partner_id,
        };
        let steps = cmd.steps.unwrap_or(self.steps);
        if let Some(missing) = steps
            .required_sub_locations()
            .into_iter()
            .find(|sub| !self.sub_locations.contains_key(sub))
        {
            return Err(DomainError::invariant(format!(
                "the {} location must be provisioned before switching steps",
                missing.name()
            )));
        }

        let updated = WarehouseUpdated {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            name,
            code,
            sequence: cmd.sequence.unwrap_or(self.sequence),
            partner_id,
            steps,
            active: cmd.active.unwrap_or(self.active),
            occurred_at: cmd.occurred_at,
        };

        let unchanged = updated.name == self.name
            && Some(&updated.code) == self.code.as_ref()
            && updated.sequence == self.sequence
            && updated.partner_id == self.partner_id
            && updated.steps == self.steps
            && updated.active == self.active;
        if unchanged {
            return Ok(vec![]);
        }

        Ok(vec![WarehouseEvent::WarehouseUpdated(updated)])
    }

    fn handle_set_sub_locations(
        &self,
        cmd: &SetSubLocations,
    ) -> Result<Vec<WarehouseEvent>, DomainError> {
        let company_id = self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;

        let mut changed = BTreeMap::new();
        for (sub, location) in &cmd.locations {
            ensure_company(company_id, location, sub.name())?;
            if self.sub_locations.get(sub) != Some(&location.id) {
                changed.insert(*sub, location.id);
            }
        }
        if changed.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![WarehouseEvent::SubLocationsAssigned(SubLocationsAssigned {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            locations: changed,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_operation_types(
        &self,
        cmd: &AssignOperationTypes,
    ) -> Result<Vec<WarehouseEvent>, DomainError> {
        let company_id = self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;

        let mut changed = BTreeMap::new();
        for (kind, picking_type) in &cmd.operation_types {
            ensure_company(company_id, picking_type, kind.name())?;
            if self.operation_types.get(kind) != Some(&picking_type.id) {
                changed.insert(*kind, picking_type.id);
            }
        }
        if changed.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![WarehouseEvent::OperationTypesAssigned(OperationTypesAssigned {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            operation_types: changed,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_routes(&self, cmd: &AssignRoutes) -> Result<Vec<WarehouseEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;
        if cmd.routes == self.routes {
            return Ok(vec![]);
        }

        Ok(vec![WarehouseEvent::RoutesAssigned(RoutesAssigned {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            routes: cmd.routes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_resupply(
        &self,
        cmd: &AssignResupply,
    ) -> Result<Vec<WarehouseEvent>, DomainError> {
        let company_id = self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;

        let mut resupply_wh_ids = Vec::with_capacity(cmd.resupply_warehouses.len());
        for supplier in &cmd.resupply_warehouses {
            if supplier.id == self.id {
                return Err(DomainError::invariant("a warehouse cannot resupply itself"));
            }
            if supplier.company_id != Some(company_id) {
                return Err(DomainError::company_mismatch("Resupply warehouse"));
            }
            if !resupply_wh_ids.contains(&supplier.id) {
                resupply_wh_ids.push(supplier.id);
            }
        }

        if resupply_wh_ids == self.resupply_wh_ids
            && cmd.resupply_route_ids == self.resupply_route_ids
        {
            return Ok(vec![]);
        }

        Ok(vec![WarehouseEvent::ResupplyAssigned(ResupplyAssigned {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            resupply_wh_ids,
            resupply_route_ids: cmd.resupply_route_ids.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{DeliverySteps, ReceptionSteps};
    use depot_events::execute;

    fn scoped_location(company_id: CompanyId) -> CompanyScoped<LocationId> {
        CompanyScoped::new(LocationId::new(AggregateId::new()), Some(company_id))
    }

    fn create_cmd(tenant_id: TenantId, company_id: CompanyId, steps: StepConfig) -> CreateWarehouse {
        CreateWarehouse {
            tenant_id,
            warehouse_id: WarehouseId::new(AggregateId::new()),
            name: "Main Warehouse".to_string(),
            code: "WH".to_string(),
            company_id,
            partner: None,
            view_location: scoped_location(company_id),
            sub_locations: steps
                .required_sub_locations()
                .into_iter()
                .map(|sub| (sub, scoped_location(company_id)))
                .collect(),
            steps,
            sequence: DEFAULT_SEQUENCE,
            occurred_at: Utc::now(),
        }
    }

    fn created(tenant_id: TenantId, company_id: CompanyId) -> Warehouse {
        let cmd = create_cmd(tenant_id, company_id, StepConfig::default());
        let mut warehouse = Warehouse::empty(cmd.warehouse_id);
        execute(&mut warehouse, &WarehouseCommand::CreateWarehouse(cmd)).unwrap();
        warehouse
    }

    fn update(warehouse: &Warehouse) -> UpdateWarehouse {
        UpdateWarehouse {
            tenant_id: warehouse.tenant_id().unwrap(),
            warehouse_id: warehouse.id_typed(),
            name: None,
            code: None,
            sequence: None,
            partner: None,
            steps: None,
            active: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn create_warehouse_emits_created_event() {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let steps = StepConfig::new(ReceptionSteps::OneStep, DeliverySteps::PickPackShip);
        let cmd = create_cmd(tenant_id, company_id, steps);

        let warehouse = Warehouse::empty(cmd.warehouse_id);
        let events = warehouse
            .handle(&WarehouseCommand::CreateWarehouse(cmd.clone()))
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            WarehouseEvent::WarehouseCreated(e) => {
                assert_eq!(e.code.as_str(), "WH");
                assert_eq!(
                    e.sub_locations.keys().copied().collect::<Vec<_>>(),
                    vec![SubLocation::Stock, SubLocation::Output, SubLocation::Packing]
                );
                assert_eq!(e.view_location_id, cmd.view_location.id);
            }
            _ => panic!("Expected WarehouseCreated event"),
        }
    }

    #[test]
    fn create_rejects_long_code() {
        let mut cmd = create_cmd(TenantId::new(), CompanyId::new(), StepConfig::default());
        cmd.code = "TOOLONG".to_string();

        let err = Warehouse::empty(cmd.warehouse_id)
            .handle(&WarehouseCommand::CreateWarehouse(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_extra_or_missing_sub_locations() {
        let company_id = CompanyId::new();
        let mut cmd = create_cmd(TenantId::new(), company_id, StepConfig::default());
        cmd.sub_locations
            .insert(SubLocation::Output, scoped_location(company_id));

        let err = Warehouse::empty(cmd.warehouse_id)
            .handle(&WarehouseCommand::CreateWarehouse(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn create_rejects_location_of_other_company() {
        let company_id = CompanyId::new();
        let mut cmd = create_cmd(TenantId::new(), company_id, StepConfig::default());
        cmd.view_location = scoped_location(CompanyId::new());

        let err = Warehouse::empty(cmd.warehouse_id)
            .handle(&WarehouseCommand::CreateWarehouse(cmd))
            .unwrap_err();
        assert_eq!(err, DomainError::company_mismatch("View location"));
    }

    #[test]
    fn switching_steps_requires_provisioned_locations() {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let mut warehouse = created(tenant_id, company_id);

        let mut cmd = update(&warehouse);
        cmd.steps = Some(StepConfig::new(ReceptionSteps::TwoSteps, DeliverySteps::ShipOnly));
        assert!(matches!(
            warehouse.handle(&WarehouseCommand::UpdateWarehouse(cmd.clone())),
            Err(DomainError::InvariantViolation(_))
        ));

        let warehouse_id = warehouse.id_typed();
        execute(
            &mut warehouse,
            &WarehouseCommand::SetSubLocations(SetSubLocations {
                tenant_id,
                warehouse_id,
                locations: BTreeMap::from([(SubLocation::Input, scoped_location(company_id))]),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        execute(&mut warehouse, &WarehouseCommand::UpdateWarehouse(cmd)).unwrap();

        assert_eq!(warehouse.steps().reception, ReceptionSteps::TwoSteps);
        assert!(warehouse.sub_location(SubLocation::Input).is_some());
    }

    #[test]
    fn update_without_changes_is_a_no_op() {
        let warehouse = created(TenantId::new(), CompanyId::new());
        let mut cmd = update(&warehouse);
        cmd.name = Some("Main Warehouse".to_string());

        let events = warehouse
            .handle(&WarehouseCommand::UpdateWarehouse(cmd))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn archive_via_update() {
        let mut warehouse = created(TenantId::new(), CompanyId::new());
        let mut cmd = update(&warehouse);
        cmd.active = Some(false);

        execute(&mut warehouse, &WarehouseCommand::UpdateWarehouse(cmd)).unwrap();
        assert!(!warehouse.is_active());
    }

    #[test]
    fn resupply_rejects_self_and_foreign_warehouses() {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let warehouse = created(tenant_id, company_id);

        let assign = |supplier: CompanyScoped<WarehouseId>| {
            WarehouseCommand::AssignResupply(AssignResupply {
                tenant_id,
                warehouse_id: warehouse.id_typed(),
                resupply_warehouses: vec![supplier],
                resupply_route_ids: vec![],
                occurred_at: Utc::now(),
            })
        };

        let itself = CompanyScoped::new(warehouse.id_typed(), Some(company_id));
        assert!(warehouse.handle(&assign(itself)).is_err());

        let foreign = CompanyScoped::new(WarehouseId::new(AggregateId::new()), Some(CompanyId::new()));
        assert_eq!(
            warehouse.handle(&assign(foreign)).unwrap_err(),
            DomainError::company_mismatch("Resupply warehouse")
        );

        let sibling = CompanyScoped::new(WarehouseId::new(AggregateId::new()), Some(company_id));
        assert_eq!(warehouse.handle(&assign(sibling)).unwrap().len(), 1);
    }

    #[test]
    fn operation_type_assignment_merges() {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let mut warehouse = created(tenant_id, company_id);
        let receipt = PickingTypeId::new(AggregateId::new());

        let assign = WarehouseCommand::AssignOperationTypes(AssignOperationTypes {
            tenant_id,
            warehouse_id: warehouse.id_typed(),
            operation_types: BTreeMap::from([(
                OperationKind::Receipt,
                CompanyScoped::new(receipt, Some(company_id)),
            )]),
            occurred_at: Utc::now(),
        });
        execute(&mut warehouse, &assign).unwrap();
        assert!(execute(&mut warehouse, &assign).unwrap().is_empty());
        assert_eq!(warehouse.operation_type(OperationKind::Receipt), Some(receipt));
    }
}
