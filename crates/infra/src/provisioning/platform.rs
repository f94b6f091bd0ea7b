//! Well-known records every tenant needs before its first warehouse.
//!
//! Ids are derived from the tenant id (UUID v5), so the records can be found
//! again without a registry and are created on first use.

use tracing::debug;

use depot_core::{AggregateId, CompanyId, TenantId};
use depot_stock::{
    CreateLocation, CreateRoute, Location, LocationCommand, LocationId, LocationRef, LocationUsage,
    MTO_ROUTE_NAME, ParentLocation, Route, RouteCommand, RouteFlags, RouteHeader, RouteId,
};

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;
use crate::streams;
use crate::unit_of_work::UnitOfWork;

pub const PHYSICAL_LOCATIONS: &str = "Physical Locations";
pub const PARTNER_LOCATIONS: &str = "Partner Locations";
pub const VENDORS: &str = "Vendors";
pub const CUSTOMERS: &str = "Customers";
pub const VIRTUAL_LOCATIONS: &str = "Virtual Locations";
pub const TRANSIT: &str = "Inter-warehouse transit";

struct Blueprint {
    key: &'static str,
    name: &'static str,
    usage: LocationUsage,
    parent: Option<&'static str>,
}

/// Parents come before their children.
const LOCATIONS: [Blueprint; 5] = [
    Blueprint {
        key: "stock.stock_location_locations",
        name: PHYSICAL_LOCATIONS,
        usage: LocationUsage::View,
        parent: None,
    },
    Blueprint {
        key: "stock.stock_location_locations_partner",
        name: PARTNER_LOCATIONS,
        usage: LocationUsage::View,
        parent: None,
    },
    Blueprint {
        key: "stock.stock_location_suppliers",
        name: VENDORS,
        usage: LocationUsage::Supplier,
        parent: Some("stock.stock_location_locations_partner"),
    },
    Blueprint {
        key: "stock.stock_location_customers",
        name: CUSTOMERS,
        usage: LocationUsage::Customer,
        parent: Some("stock.stock_location_locations_partner"),
    },
    Blueprint {
        key: "stock.stock_location_locations_virtual",
        name: VIRTUAL_LOCATIONS,
        usage: LocationUsage::View,
        parent: None,
    },
];

fn well_known(tenant_id: TenantId, key: &str) -> AggregateId {
    AggregateId::well_known(tenant_id.as_uuid(), key)
}

/// Root of every warehouse view location.
pub fn physical_root(tenant_id: TenantId) -> LocationId {
    LocationId::new(well_known(tenant_id, LOCATIONS[0].key))
}

pub fn vendors(tenant_id: TenantId) -> LocationId {
    LocationId::new(well_known(tenant_id, LOCATIONS[2].key))
}

pub fn customers(tenant_id: TenantId) -> LocationId {
    LocationId::new(well_known(tenant_id, LOCATIONS[3].key))
}

/// Transit location goods cross between two warehouses of `company_id`.
pub fn transit(tenant_id: TenantId, company_id: CompanyId) -> LocationId {
    LocationId::new(well_known(
        tenant_id,
        &format!("stock.stock_location_inter_wh:{company_id}"),
    ))
}

/// The tenant-wide make-to-order route.
pub fn mto_route(tenant_id: TenantId) -> RouteId {
    RouteId::new(well_known(tenant_id, "stock.route_warehouse0_mto"))
}

/// Platform records resolved for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub physical_root: LocationRef,
    pub vendors: LocationRef,
    pub customers: LocationRef,
    pub transit: LocationRef,
    pub mto_route_id: RouteId,
}

/// Stage whatever platform record is still missing for `company_id`.
pub(crate) fn ensure<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    company_id: CompanyId,
) -> Result<Platform, DispatchError> {
    let tenant_id = uow.tenant_id();

    for blueprint in &LOCATIONS {
        let parent = blueprint.parent.map(|key| ParentLocation {
            id: LocationId::new(well_known(tenant_id, key)),
            company_id: None,
        });
        ensure_location(
            uow,
            LocationId::new(well_known(tenant_id, blueprint.key)),
            blueprint.name,
            blueprint.usage,
            parent,
            None,
        )?;
    }

    let physical_root = physical_root(tenant_id);
    let transit_id = transit(tenant_id, company_id);
    ensure_location(
        uow,
        transit_id,
        TRANSIT,
        LocationUsage::Transit,
        Some(ParentLocation {
            id: physical_root,
            company_id: None,
        }),
        Some(company_id),
    )?;

    let mto_route_id = mto_route(tenant_id);
    ensure_mto_route(uow, mto_route_id)?;

    Ok(Platform {
        physical_root: LocationRef::new(physical_root, PHYSICAL_LOCATIONS),
        vendors: LocationRef::new(vendors(tenant_id), VENDORS),
        customers: LocationRef::new(customers(tenant_id), CUSTOMERS),
        transit: LocationRef::new(transit_id, TRANSIT),
        mto_route_id,
    })
}

fn ensure_location<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    location_id: LocationId,
    name: &str,
    usage: LocationUsage,
    parent: Option<ParentLocation>,
    company_id: Option<CompanyId>,
) -> Result<(), DispatchError> {
    let mut location = uow.load(location_id.0, |id| Location::empty(LocationId::new(id)))?;
    if location.is_created() {
        return Ok(());
    }

    let command = LocationCommand::CreateLocation(CreateLocation {
        tenant_id: uow.tenant_id(),
        location_id,
        name: name.to_string(),
        usage,
        parent,
        company_id,
        active: true,
        occurred_at: uow.now(),
    });
    uow.execute(&mut location, streams::LOCATION, &command)?;
    debug!(tenant_id = %uow.tenant_id(), %location_id, name, "platform location created");
    Ok(())
}

/// Archived until a product opts in; warehouses still add their rule to it.
fn ensure_mto_route<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    route_id: RouteId,
) -> Result<(), DispatchError> {
    let mut route = uow.load(route_id.0, |id| Route::empty(RouteId::new(id)))?;
    if route.is_created() {
        return Ok(());
    }

    let command = RouteCommand::CreateRoute(CreateRoute {
        tenant_id: uow.tenant_id(),
        route_id,
        company_id: None,
        header: RouteHeader {
            name: MTO_ROUTE_NAME.to_string(),
            active: false,
            sequence: 5,
            flags: RouteFlags {
                product_selectable: true,
                product_categ_selectable: false,
                warehouse_selectable: false,
            },
            warehouse_ids: vec![],
            supplied_wh_id: None,
            supplier_wh_id: None,
        },
        rules: vec![],
        occurred_at: uow.now(),
    });
    uow.execute(&mut route, streams::ROUTE, &command)?;
    debug!(tenant_id = %uow.tenant_id(), %route_id, "make-to-order route created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use depot_events::InMemoryEventBus;

    use super::*;
    use crate::event_store::InMemoryEventStore;

    #[test]
    fn platform_records_are_created_once_per_tenant() {
        let store = InMemoryEventStore::new();
        let bus = InMemoryEventBus::new();
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        let platform = ensure(&mut uow, company_id).unwrap();
        assert_eq!(uow.staged_len(), 7);
        uow.commit(&bus).unwrap();

        let mut again = UnitOfWork::begin(&store, tenant_id);
        assert_eq!(ensure(&mut again, company_id).unwrap(), platform);
        assert_eq!(again.staged_len(), 0);

        // A second company only adds its transit location.
        let mut other = UnitOfWork::begin(&store, tenant_id);
        let other_platform = ensure(&mut other, CompanyId::new()).unwrap();
        assert_eq!(other.staged_len(), 1);
        assert_ne!(other_platform.transit.id, platform.transit.id);
        assert_eq!(other_platform.physical_root, platform.physical_root);
    }

    #[test]
    fn ids_differ_between_tenants() {
        let a = TenantId::new();
        let b = TenantId::new();
        assert_eq!(physical_root(a), physical_root(a));
        assert_ne!(physical_root(a), physical_root(b));
        assert_ne!(mto_route(a), mto_route(b));
    }
}
