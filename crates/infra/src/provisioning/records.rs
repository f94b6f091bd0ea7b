//! Staging of the records a warehouse owns.
//!
//! Every function here is idempotent against the current state: records
//! that already match are left alone, missing ones are created, obsolete
//! ones are archived. Creation and later writes share the same code.

use std::collections::BTreeMap;

use tracing::debug;

use depot_core::{AggregateId, CompanyId};
use depot_parties::{AssignWarehouse, Partner, PartnerCommand, PartnerId};
use depot_stock::{
    AssignOperationTypes, AssignResupply, AssignRoutes, CompanyScoped, ConfigurePickingType,
    CreateLocation, CreatePickingType, CreateRoute, CreateSequence, DEFAULT_PADDING, EnableGroup,
    FeatureGroup, Location, LocationCommand, LocationId, LocationRef, LocationUsage,
    OperationKind, ParentLocation, PickingType, PickingTypeCommand, PickingTypeId, RenameLocation,
    ReplaceRules, Route, RouteCommand, RouteFlags, RouteHeader, RouteId, Routing, Rule, Sequence,
    SequenceCommand, SequenceId, SetLocationActive, SettingsCommand, StepConfig, StockSettings,
    SubLocation, UpdateRoute, UpdateSequence, UpsertRule, Warehouse, WarehouseCommand,
    WarehouseId, WarehouseLayout, WarehouseRoutes, resupply_route_name, resupply_rules,
    settings_id,
};

use super::platform::Platform;
use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;
use crate::streams;
use crate::unit_of_work::UnitOfWork;

const RECEPTION_ROUTE_SEQUENCE: u32 = 9;
const DELIVERY_ROUTE_SEQUENCE: u32 = 10;
const CROSSDOCK_ROUTE_SEQUENCE: u32 = 20;
const RESUPPLY_ROUTE_SEQUENCE: u32 = 20;

pub(crate) fn load_location<S: EventStore>(
    uow: &UnitOfWork<'_, S>,
    location_id: LocationId,
) -> Result<Location, DispatchError> {
    uow.load(location_id.0, |id| Location::empty(LocationId::new(id)))
}

pub(crate) fn load_warehouse<S: EventStore>(
    uow: &UnitOfWork<'_, S>,
    warehouse_id: WarehouseId,
) -> Result<Warehouse, DispatchError> {
    uow.load(warehouse_id.0, |id| Warehouse::empty(WarehouseId::new(id)))
}

pub(crate) fn load_settings<S: EventStore>(
    uow: &UnitOfWork<'_, S>,
) -> Result<StockSettings, DispatchError> {
    uow.load(settings_id(uow.tenant_id()), StockSettings::empty)
}

pub(crate) fn create_location<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    name: &str,
    usage: LocationUsage,
    parent: LocationId,
    company_id: CompanyId,
) -> Result<LocationId, DispatchError> {
    let location_id = LocationId::new(AggregateId::new());
    let parent_company = load_location(uow, parent)?.company_id();
    let mut location = Location::empty(location_id);

    let command = LocationCommand::CreateLocation(CreateLocation {
        tenant_id: uow.tenant_id(),
        location_id,
        name: name.to_string(),
        usage,
        parent: Some(ParentLocation {
            id: parent,
            company_id: parent_company,
        }),
        company_id: Some(company_id),
        active: true,
        occurred_at: uow.now(),
    });
    uow.execute(&mut location, streams::LOCATION, &command)?;
    debug!(tenant_id = %uow.tenant_id(), %location_id, name, "location created");
    Ok(location_id)
}

pub(crate) fn rename_location<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    location_id: LocationId,
    name: &str,
) -> Result<(), DispatchError> {
    let mut location = load_location(uow, location_id)?;
    let command = LocationCommand::RenameLocation(RenameLocation {
        tenant_id: uow.tenant_id(),
        location_id,
        name: name.to_string(),
        occurred_at: uow.now(),
    });
    uow.execute(&mut location, streams::LOCATION, &command)?;
    Ok(())
}

fn set_location_active<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    location_id: LocationId,
    active: bool,
) -> Result<(), DispatchError> {
    let mut location = load_location(uow, location_id)?;
    let command = LocationCommand::SetLocationActive(SetLocationActive {
        tenant_id: uow.tenant_id(),
        location_id,
        active,
        occurred_at: uow.now(),
    });
    uow.execute(&mut location, streams::LOCATION, &command)?;
    Ok(())
}

/// Bring the sub-locations in line with `steps`.
///
/// Required locations are created under `view` when missing and reactivated
/// when archived; the others are archived. Returns the locations created.
pub(crate) fn reconcile_sub_locations<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    existing: &BTreeMap<SubLocation, LocationId>,
    steps: StepConfig,
    view: LocationId,
    company_id: CompanyId,
) -> Result<BTreeMap<SubLocation, LocationId>, DispatchError> {
    let mut created = BTreeMap::new();
    for sub in SubLocation::ALL {
        let required = steps.requires_location(sub);
        match existing.get(&sub) {
            Some(location_id) => set_location_active(uow, *location_id, required)?,
            None if required => {
                let location_id =
                    create_location(uow, sub.name(), LocationUsage::Internal, view, company_id)?;
                created.insert(sub, location_id);
            }
            None => {}
        }
    }
    Ok(created)
}

/// Collect what routing derivation needs from the staged state of `warehouse`.
pub(crate) fn layout<S: EventStore>(
    uow: &UnitOfWork<'_, S>,
    warehouse: &Warehouse,
    platform: &Platform,
) -> Result<WarehouseLayout, DispatchError> {
    let company_id = warehouse
        .company_id()
        .ok_or_else(|| DispatchError::InvariantViolation("warehouse has no company".into()))?;
    let code = warehouse
        .code()
        .cloned()
        .ok_or_else(|| DispatchError::InvariantViolation("warehouse has no short name".into()))?;

    let mut sub_locations = BTreeMap::new();
    for (sub, location_id) in warehouse.sub_locations() {
        let location = load_location(uow, *location_id)?;
        sub_locations.insert(*sub, LocationRef::new(*location_id, location.name()));
    }

    Ok(WarehouseLayout {
        warehouse_id: warehouse.id_typed(),
        name: warehouse.name().to_string(),
        code,
        company_id,
        steps: warehouse.steps(),
        sub_locations,
        vendors: platform.vendors.clone(),
        customers: platform.customers.clone(),
        operation_types: warehouse.operation_types().clone(),
    })
}

/// Vendors and customers are shared; everything else belongs to the warehouse company.
fn scoped_location(layout: &WarehouseLayout, location_id: LocationId) -> CompanyScoped<LocationId> {
    if location_id == layout.vendors.id || location_id == layout.customers.id {
        CompanyScoped::shared(location_id)
    } else {
        CompanyScoped::new(location_id, Some(layout.company_id))
    }
}

fn sequence_name(layout: &WarehouseLayout, kind: OperationKind) -> String {
    format!("{} Sequence {}", layout.name, kind.name())
}

fn sequence_prefix(layout: &WarehouseLayout, kind: OperationKind) -> String {
    format!("{}/{}/", layout.code, kind.sequence_code())
}

/// Create missing operation types (with their sequences) and reconfigure the
/// existing ones, then record the new ones on the warehouse.
pub(crate) fn reconcile_operation_types<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    warehouse: &mut Warehouse,
    layout: &WarehouseLayout,
) -> Result<(), DispatchError> {
    let steps = layout.steps;

    // Ids first: delivery points at the return type whatever the order.
    let mut ids: BTreeMap<OperationKind, (PickingTypeId, bool)> = BTreeMap::new();
    for kind in OperationKind::ALL {
        match warehouse.operation_type(kind) {
            Some(id) => {
                ids.insert(kind, (id, false));
            }
            None if steps.requires_operation(kind) => {
                ids.insert(kind, (PickingTypeId::new(AggregateId::new()), true));
            }
            None => {}
        }
    }
    let return_type = ids.get(&OperationKind::Return).map(|(id, _)| *id);

    let mut created = BTreeMap::new();
    for (kind, (picking_type_id, is_new)) in &ids {
        let required = steps.requires_operation(*kind);
        let active = required && warehouse.is_active();
        let return_picking_type = if *kind == OperationKind::Delivery {
            return_type
        } else {
            None
        };

        if *is_new {
            let sequence_id = create_sequence(uow, layout, *kind)?;
            let (src, dest) = layout.default_locations(*kind)?;
            let mut picking_type = PickingType::empty(*picking_type_id);
            let command = PickingTypeCommand::CreatePickingType(CreatePickingType {
                tenant_id: uow.tenant_id(),
                picking_type_id: *picking_type_id,
                warehouse_id: layout.warehouse_id,
                kind: *kind,
                sequence_id,
                company_id: Some(layout.company_id),
                name: kind.name().to_string(),
                default_src: Some(scoped_location(layout, src)),
                default_dest: Some(scoped_location(layout, dest)),
                return_picking_type,
                active,
                occurred_at: uow.now(),
            });
            uow.execute(&mut picking_type, streams::PICKING_TYPE, &command)?;
            created.insert(
                *kind,
                CompanyScoped::new(*picking_type_id, Some(layout.company_id)),
            );
            continue;
        }

        let mut picking_type =
            uow.load(picking_type_id.0, |id| PickingType::empty(PickingTypeId::new(id)))?;
        if let Some(sequence_id) = picking_type.sequence_id() {
            update_sequence(uow, sequence_id, layout, *kind)?;
        }

        let current = picking_type.settings().clone();
        let (src, dest) = if required {
            let (src, dest) = layout.default_locations(*kind)?;
            (Some(src), Some(dest))
        } else {
            (current.default_src, current.default_dest)
        };
        let command = PickingTypeCommand::ConfigurePickingType(ConfigurePickingType {
            tenant_id: uow.tenant_id(),
            picking_type_id: *picking_type_id,
            name: current.name,
            default_src: src.map(|id| scoped_location(layout, id)),
            default_dest: dest.map(|id| scoped_location(layout, id)),
            return_picking_type: return_picking_type.or(current.return_picking_type),
            active,
            occurred_at: uow.now(),
        });
        uow.execute(&mut picking_type, streams::PICKING_TYPE, &command)?;
    }

    if !created.is_empty() {
        let command = WarehouseCommand::AssignOperationTypes(AssignOperationTypes {
            tenant_id: uow.tenant_id(),
            warehouse_id: layout.warehouse_id,
            operation_types: created,
            occurred_at: uow.now(),
        });
        uow.execute(warehouse, streams::WAREHOUSE, &command)?;
    }
    Ok(())
}

fn create_sequence<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    layout: &WarehouseLayout,
    kind: OperationKind,
) -> Result<SequenceId, DispatchError> {
    let sequence_id = SequenceId::new(AggregateId::new());
    let mut sequence = Sequence::empty(sequence_id);
    let command = SequenceCommand::CreateSequence(CreateSequence {
        tenant_id: uow.tenant_id(),
        sequence_id,
        name: sequence_name(layout, kind),
        prefix: sequence_prefix(layout, kind),
        padding: DEFAULT_PADDING,
        company_id: Some(layout.company_id),
        occurred_at: uow.now(),
    });
    uow.execute(&mut sequence, streams::SEQUENCE, &command)?;
    Ok(sequence_id)
}

fn update_sequence<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    sequence_id: SequenceId,
    layout: &WarehouseLayout,
    kind: OperationKind,
) -> Result<(), DispatchError> {
    let mut sequence = uow.load(sequence_id.0, |id| Sequence::empty(SequenceId::new(id)))?;
    let command = SequenceCommand::UpdateSequence(UpdateSequence {
        tenant_id: uow.tenant_id(),
        sequence_id,
        name: sequence_name(layout, kind),
        prefix: sequence_prefix(layout, kind),
        occurred_at: uow.now(),
    });
    uow.execute(&mut sequence, streams::SEQUENCE, &command)?;
    Ok(())
}

struct RoutePlan {
    name: String,
    sequence: u32,
    active: bool,
    routings: Vec<Routing>,
}

fn warehouse_route<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    existing: Option<RouteId>,
    layout: &WarehouseLayout,
    plan: RoutePlan,
) -> Result<RouteId, DispatchError> {
    let header = RouteHeader {
        name: plan.name,
        active: plan.active,
        sequence: plan.sequence,
        flags: RouteFlags {
            product_selectable: false,
            product_categ_selectable: true,
            warehouse_selectable: true,
        },
        warehouse_ids: vec![layout.warehouse_id],
        supplied_wh_id: None,
        supplier_wh_id: None,
    };
    upsert_route(uow, existing, layout.company_id, header, |route_id| {
        Ok(layout.rules(route_id, &plan.routings, plan.active))
    })
}

/// Rules of a route that no longer has a routing are kept, archived.
fn archived(rules: &[Rule]) -> Vec<Rule> {
    rules
        .iter()
        .cloned()
        .map(|mut rule| {
            rule.active = false;
            rule
        })
        .collect()
}

fn upsert_route<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    existing: Option<RouteId>,
    company_id: CompanyId,
    header: RouteHeader,
    derive_rules: impl FnOnce(RouteId) -> Result<Vec<Rule>, DispatchError>,
) -> Result<RouteId, DispatchError> {
    let Some(route_id) = existing else {
        let route_id = RouteId::new(AggregateId::new());
        let mut route = Route::empty(route_id);
        let command = RouteCommand::CreateRoute(CreateRoute {
            tenant_id: uow.tenant_id(),
            route_id,
            company_id: Some(company_id),
            rules: derive_rules(route_id)?,
            header,
            occurred_at: uow.now(),
        });
        uow.execute(&mut route, streams::ROUTE, &command)?;
        debug!(tenant_id = %uow.tenant_id(), %route_id, "route created");
        return Ok(route_id);
    };

    let mut route = uow.load(route_id.0, |id| Route::empty(RouteId::new(id)))?;
    let mut rules = derive_rules(route_id)?;
    if rules.is_empty() {
        rules = archived(route.rules());
    }

    let update = RouteCommand::UpdateRoute(UpdateRoute {
        tenant_id: uow.tenant_id(),
        route_id,
        header,
        occurred_at: uow.now(),
    });
    uow.execute(&mut route, streams::ROUTE, &update)?;

    let replace = RouteCommand::ReplaceRules(ReplaceRules {
        tenant_id: uow.tenant_id(),
        route_id,
        rules,
        occurred_at: uow.now(),
    });
    uow.execute(&mut route, streams::ROUTE, &replace)?;
    Ok(route_id)
}

/// Reception, delivery and cross-dock routes plus the warehouse's rule in
/// the make-to-order route.
pub(crate) fn reconcile_routes<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    warehouse: &mut Warehouse,
    layout: &WarehouseLayout,
    platform: &Platform,
) -> Result<(), DispatchError> {
    let active = warehouse.is_active();
    let current = warehouse.routes().clone();
    let crossdock_active = active && layout.steps.crossdock_enabled();

    let reception = warehouse_route(
        uow,
        current.reception_route_id,
        layout,
        RoutePlan {
            name: layout.reception_route_name(),
            sequence: RECEPTION_ROUTE_SEQUENCE,
            active,
            routings: layout.reception_routings()?,
        },
    )?;
    let delivery = warehouse_route(
        uow,
        current.delivery_route_id,
        layout,
        RoutePlan {
            name: layout.delivery_route_name(),
            sequence: DELIVERY_ROUTE_SEQUENCE,
            active,
            routings: layout.delivery_routings()?,
        },
    )?;
    // Always built so enabling cross-docking later only flips it on.
    let crossdock = warehouse_route(
        uow,
        current.crossdock_route_id,
        layout,
        RoutePlan {
            name: layout.crossdock_route_name(),
            sequence: CROSSDOCK_ROUTE_SEQUENCE,
            active: crossdock_active,
            routings: layout.crossdock_routings()?,
        },
    )?;

    let mto_rule = layout.mto_rule(platform.mto_route_id, active)?;
    let mto_rule_id = mto_rule.id;
    let mut mto_route = uow.load(platform.mto_route_id.0, |id| Route::empty(RouteId::new(id)))?;
    let upsert = RouteCommand::UpsertRule(UpsertRule {
        tenant_id: uow.tenant_id(),
        route_id: platform.mto_route_id,
        rule: mto_rule,
        occurred_at: uow.now(),
    });
    uow.execute(&mut mto_route, streams::ROUTE, &upsert)?;

    let mut selectable = vec![reception, delivery];
    if crossdock_active {
        selectable.push(crossdock);
    }

    let command = WarehouseCommand::AssignRoutes(AssignRoutes {
        tenant_id: uow.tenant_id(),
        warehouse_id: layout.warehouse_id,
        routes: WarehouseRoutes {
            reception_route_id: Some(reception),
            delivery_route_id: Some(delivery),
            crossdock_route_id: Some(crossdock),
            mto_rule_id: Some(mto_rule_id),
            route_ids: selectable,
        },
        occurred_at: uow.now(),
    });
    uow.execute(warehouse, streams::WAREHOUSE, &command)?;
    Ok(())
}

/// One route per supplier moving goods through the company transit location.
///
/// `existing` maps suppliers to the resupply routes already built for this
/// warehouse, archived ones included. Routes of suppliers no longer listed
/// are archived; listing a supplier again reactivates its route.
pub(crate) fn reconcile_resupply<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    warehouse: &mut Warehouse,
    layout: &WarehouseLayout,
    platform: &Platform,
    suppliers: &[CompanyScoped<WarehouseId>],
    existing: &BTreeMap<WarehouseId, RouteId>,
) -> Result<(), DispatchError> {
    let active = warehouse.is_active();

    let mut route_ids = Vec::with_capacity(suppliers.len());
    for supplier in suppliers {
        let supplier_warehouse = load_warehouse(uow, supplier.id)?;
        if !supplier_warehouse.is_created() {
            return Err(DispatchError::NotFound);
        }
        let supplier_layout = self::layout(uow, &supplier_warehouse, platform)?;

        let header = RouteHeader {
            name: resupply_route_name(&layout.name, &supplier_layout.name),
            active,
            sequence: RESUPPLY_ROUTE_SEQUENCE,
            flags: RouteFlags {
                product_selectable: true,
                product_categ_selectable: true,
                warehouse_selectable: false,
            },
            warehouse_ids: vec![],
            supplied_wh_id: Some(layout.warehouse_id),
            supplier_wh_id: Some(supplier.id),
        };
        let route_id = upsert_route(
            uow,
            existing.get(&supplier.id).copied(),
            layout.company_id,
            header,
            |route_id| {
                let mut rules = resupply_rules(route_id, layout, &supplier_layout, &platform.transit)?;
                for rule in &mut rules {
                    rule.active = active;
                }
                Ok(rules)
            },
        )?;
        route_ids.push(route_id);
    }

    let listed: Vec<WarehouseId> = suppliers.iter().map(|s| s.id).collect();
    for (supplier, route_id) in existing {
        if listed.contains(supplier) {
            continue;
        }
        let mut route = uow.load(route_id.0, |id| Route::empty(RouteId::new(id)))?;
        let header = RouteHeader {
            active: false,
            ..route.header().clone()
        };
        let command = RouteCommand::UpdateRoute(UpdateRoute {
            tenant_id: uow.tenant_id(),
            route_id: *route_id,
            header,
            occurred_at: uow.now(),
        });
        uow.execute(&mut route, streams::ROUTE, &command)?;
    }

    let command = WarehouseCommand::AssignResupply(AssignResupply {
        tenant_id: uow.tenant_id(),
        warehouse_id: layout.warehouse_id,
        resupply_warehouses: suppliers.to_vec(),
        resupply_route_ids: route_ids,
        occurred_at: uow.now(),
    });
    uow.execute(warehouse, streams::WAREHOUSE, &command)?;
    Ok(())
}

/// Rebuild the names and rules of routes `supplier` feeds into other
/// warehouses. Each route keeps its activity.
pub(crate) fn refresh_supplied_routes<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    supplier: &WarehouseLayout,
    platform: &Platform,
    routes: &[(WarehouseId, RouteId)],
) -> Result<(), DispatchError> {
    for (supplied_id, route_id) in routes {
        let supplied_warehouse = load_warehouse(uow, *supplied_id)?;
        if !supplied_warehouse.is_created() {
            return Err(DispatchError::NotFound);
        }
        let supplied = layout(uow, &supplied_warehouse, platform)?;
        let route = uow.load(route_id.0, |id| Route::empty(RouteId::new(id)))?;
        let header = RouteHeader {
            name: resupply_route_name(&supplied.name, &supplier.name),
            ..route.header().clone()
        };
        let active = header.active;
        upsert_route(uow, Some(*route_id), supplied.company_id, header, |route_id| {
            let mut rules = resupply_rules(route_id, &supplied, supplier, &platform.transit)?;
            for rule in &mut rules {
                rule.active = active;
            }
            Ok(rules)
        })?;
        debug!(tenant_id = %uow.tenant_id(), %route_id, "resupply route renamed");
    }
    Ok(())
}

/// Point the partner's stock properties at the company transit location.
pub(crate) fn assign_partner<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    partner_id: PartnerId,
    warehouse_id: WarehouseId,
    transit: LocationId,
) -> Result<(), DispatchError> {
    let mut partner = uow.load(partner_id.0, |id| Partner::empty(PartnerId::new(id)))?;
    let command = PartnerCommand::AssignWarehouse(AssignWarehouse {
        tenant_id: uow.tenant_id(),
        partner_id,
        warehouse_id: warehouse_id.0,
        transit_location_id: transit.0,
        occurred_at: uow.now(),
    });
    uow.execute(&mut partner, streams::PARTNER, &command)?;
    Ok(())
}

/// Switch on storage locations and multi-warehouse once a tenant runs more
/// than one active warehouse. Returns the groups actually enabled.
pub(crate) fn sync_feature_groups<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    active_warehouses: usize,
) -> Result<Vec<FeatureGroup>, DispatchError> {
    if active_warehouses <= 1 {
        return Ok(vec![]);
    }

    let mut settings = load_settings(uow)?;
    let mut enabled = Vec::new();
    for group in [FeatureGroup::MultiLocations, FeatureGroup::MultiWarehouses] {
        let command = SettingsCommand::EnableGroup(EnableGroup {
            tenant_id: uow.tenant_id(),
            group,
            occurred_at: uow.now(),
        });
        if !uow.execute(&mut settings, streams::SETTINGS, &command)?.is_empty() {
            enabled.push(group);
        }
    }
    Ok(enabled)
}
