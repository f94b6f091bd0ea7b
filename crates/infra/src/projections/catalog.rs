//! All stock read models behind one handle.

use serde_json::Value as JsonValue;

use depot_core::{CompanyId, TenantId};
use depot_events::EventEnvelope;
use depot_parties::PartnerId;
use depot_stock::{LocationId, PickingTypeId, RouteId, WarehouseId};

use super::{
    CompanyReadModel, LocationReadModel, LocationsProjection, PartiesProjection, PartnerReadModel,
    PickingTypeReadModel, PickingTypesProjection, Projection, ProjectionError, RouteReadModel,
    RoutesProjection, WarehouseReadModel, WarehousesProjection,
};
use crate::event_store::StoredEvent;
use crate::read_model::InMemoryTenantStore;

pub type Locations = LocationsProjection<InMemoryTenantStore<LocationId, LocationReadModel>>;
pub type Warehouses = WarehousesProjection<InMemoryTenantStore<WarehouseId, WarehouseReadModel>>;
pub type Routes = RoutesProjection<InMemoryTenantStore<RouteId, RouteReadModel>>;
pub type PickingTypes = PickingTypesProjection<InMemoryTenantStore<PickingTypeId, PickingTypeReadModel>>;
pub type Parties = PartiesProjection<
    InMemoryTenantStore<PartnerId, PartnerReadModel>,
    InMemoryTenantStore<CompanyId, CompanyReadModel>,
>;

#[derive(Debug)]
pub struct StockCatalog {
    pub locations: Locations,
    pub warehouses: Warehouses,
    pub routes: Routes,
    pub picking_types: PickingTypes,
    pub parties: Parties,
}

impl Default for StockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl StockCatalog {
    pub fn new() -> Self {
        Self {
            locations: LocationsProjection::new(InMemoryTenantStore::new()),
            warehouses: WarehousesProjection::new(InMemoryTenantStore::new()),
            routes: RoutesProjection::new(InMemoryTenantStore::new()),
            picking_types: PickingTypesProjection::new(InMemoryTenantStore::new()),
            parties: PartiesProjection::new(InMemoryTenantStore::new(), InMemoryTenantStore::new()),
        }
    }

    fn projections(&self) -> [&dyn Projection; 5] {
        [
            &self.locations,
            &self.warehouses,
            &self.routes,
            &self.picking_types,
            &self.parties,
        ]
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        for projection in self.projections() {
            projection.apply_envelope(envelope)?;
        }
        Ok(())
    }

    /// Feed freshly committed events, in commit order.
    pub fn apply_committed(&self, committed: &[StoredEvent]) -> Result<(), ProjectionError> {
        committed
            .iter()
            .try_for_each(|stored| self.apply_envelope(&stored.to_envelope()))
    }

    /// Rebuild every read model of a tenant from its commit log.
    pub fn rebuild(&self, tenant_id: TenantId, log: &[StoredEvent]) -> Result<(), ProjectionError> {
        let envelopes: Vec<_> = log.iter().map(StoredEvent::to_envelope).collect();
        for projection in self.projections() {
            projection.rebuild(tenant_id, &envelopes)?;
        }
        Ok(())
    }
}
