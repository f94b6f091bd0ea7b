use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value as JsonValue;

use depot_core::{CompanyId, TenantId};
use depot_events::EventEnvelope;
use depot_parties::PartnerId;
use depot_stock::{
    DeliverySteps, LocationId, OperationKind, PickingTypeId, ReceptionSteps, RouteId, SubLocation,
    WarehouseEvent, WarehouseId, WarehouseRoutes,
};

use super::{Projection, ProjectionError, StreamCursors, decode, ensure_stream};
use crate::read_model::TenantStore;
use crate::streams;

/// Queryable warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseReadModel {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: String,
    pub company_id: CompanyId,
    pub partner_id: Option<PartnerId>,
    pub active: bool,
    pub sequence: u32,
    pub reception_steps: ReceptionSteps,
    pub delivery_steps: DeliverySteps,
    pub view_location_id: LocationId,
    pub sub_locations: BTreeMap<SubLocation, LocationId>,
    pub operation_types: BTreeMap<OperationKind, PickingTypeId>,
    pub routes: WarehouseRoutes,
    pub resupply_wh_ids: Vec<WarehouseId>,
    pub resupply_route_ids: Vec<RouteId>,
    /// Tie-breaker after `sequence` when listing.
    #[serde(skip)]
    pub created_rank: u64,
}

impl WarehouseReadModel {
    pub fn stock_location_id(&self) -> Option<LocationId> {
        self.sub_locations.get(&SubLocation::Stock).copied()
    }
}

/// Search criteria. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarehouseFilter {
    pub company_id: Option<CompanyId>,
    /// Case-insensitive substring.
    pub name: Option<String>,
    /// Exact short name.
    pub code: Option<String>,
    pub active: Option<bool>,
}

impl WarehouseFilter {
    fn matches(&self, rm: &WarehouseReadModel) -> bool {
        self.company_id.is_none_or(|c| c == rm.company_id)
            && self
                .name
                .as_ref()
                .is_none_or(|n| rm.name.to_lowercase().contains(&n.to_lowercase()))
            && self.code.as_ref().is_none_or(|c| *c == rm.code)
            && self.active.is_none_or(|a| a == rm.active)
    }
}

/// Warehouse directory projection.
#[derive(Debug)]
pub struct WarehousesProjection<S>
where
    S: TenantStore<WarehouseId, WarehouseReadModel>,
{
    store: S,
    cursors: StreamCursors,
    next_rank: AtomicU64,
}

impl<S> WarehousesProjection<S>
where
    S: TenantStore<WarehouseId, WarehouseReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
            next_rank: AtomicU64::new(0),
        }
    }

    pub fn get(&self, tenant_id: TenantId, warehouse_id: &WarehouseId) -> Option<WarehouseReadModel> {
        self.store.get(tenant_id, warehouse_id)
    }

    /// Matching warehouses ordered by `sequence`, then creation.
    pub fn search(&self, tenant_id: TenantId, filter: &WarehouseFilter) -> Vec<WarehouseReadModel> {
        let mut out: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|rm| filter.matches(rm))
            .collect();
        out.sort_by_key(|rm| (rm.sequence, rm.created_rank));
        out
    }

    /// Warehouses of a company, archived ones included.
    pub fn count_for_company(&self, tenant_id: TenantId, company_id: CompanyId) -> usize {
        self.store
            .list(tenant_id)
            .iter()
            .filter(|rm| rm.company_id == company_id)
            .count()
    }

    pub fn count_active(&self, tenant_id: TenantId) -> usize {
        self.store.list(tenant_id).iter().filter(|rm| rm.active).count()
    }
}

impl<S> Projection for WarehousesProjection<S>
where
    S: TenantStore<WarehouseId, WarehouseReadModel>,
{
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::WAREHOUSE || !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        let event: WarehouseEvent = decode(envelope)?;
        let tenant_id = event.tenant_id();

        match event {
            WarehouseEvent::WarehouseCreated(e) => {
                ensure_stream(envelope, tenant_id, e.warehouse_id.0)?;
                self.store.upsert(
                    tenant_id,
                    e.warehouse_id,
                    WarehouseReadModel {
                        warehouse_id: e.warehouse_id,
                        name: e.name,
                        code: e.code.to_string(),
                        company_id: e.company_id,
                        partner_id: e.partner_id,
                        active: true,
                        sequence: e.sequence,
                        reception_steps: e.steps.reception,
                        delivery_steps: e.steps.delivery,
                        view_location_id: e.view_location_id,
                        sub_locations: e.sub_locations,
                        operation_types: BTreeMap::new(),
                        routes: WarehouseRoutes::default(),
                        resupply_wh_ids: vec![],
                        resupply_route_ids: vec![],
                        created_rank: self.next_rank.fetch_add(1, Ordering::Relaxed),
                    },
                );
            }
            WarehouseEvent::WarehouseUpdated(e) => {
                ensure_stream(envelope, tenant_id, e.warehouse_id.0)?;
                self.store.modify(tenant_id, &e.warehouse_id, &mut |rm| {
                    rm.name = e.name.clone();
                    rm.code = e.code.to_string();
                    rm.sequence = e.sequence;
                    rm.partner_id = e.partner_id;
                    rm.reception_steps = e.steps.reception;
                    rm.delivery_steps = e.steps.delivery;
                    rm.active = e.active;
                });
            }
            WarehouseEvent::SubLocationsAssigned(e) => {
                ensure_stream(envelope, tenant_id, e.warehouse_id.0)?;
                self.store.modify(tenant_id, &e.warehouse_id, &mut |rm| {
                    rm.sub_locations.extend(e.locations.iter().map(|(k, v)| (*k, *v)));
                });
            }
            WarehouseEvent::OperationTypesAssigned(e) => {
                ensure_stream(envelope, tenant_id, e.warehouse_id.0)?;
                self.store.modify(tenant_id, &e.warehouse_id, &mut |rm| {
                    rm.operation_types
                        .extend(e.operation_types.iter().map(|(k, v)| (*k, *v)));
                });
            }
            WarehouseEvent::RoutesAssigned(e) => {
                ensure_stream(envelope, tenant_id, e.warehouse_id.0)?;
                self.store.modify(tenant_id, &e.warehouse_id, &mut |rm| {
                    rm.routes = e.routes.clone();
                });
            }
            WarehouseEvent::ResupplyAssigned(e) => {
                ensure_stream(envelope, tenant_id, e.warehouse_id.0)?;
                self.store.modify(tenant_id, &e.warehouse_id, &mut |rm| {
                    rm.resupply_wh_ids = e.resupply_wh_ids.clone();
                    rm.resupply_route_ids = e.resupply_route_ids.clone();
                });
            }
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }
}
