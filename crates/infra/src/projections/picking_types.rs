use serde::Serialize;
use serde_json::Value as JsonValue;

use depot_core::{CompanyId, TenantId};
use depot_events::EventEnvelope;
use depot_stock::{
    LocationId, OperationCode, OperationKind, PickingTypeEvent, PickingTypeId, SequenceId,
    WarehouseId,
};

use super::{Projection, ProjectionError, StreamCursors, decode, ensure_stream};
use crate::read_model::TenantStore;
use crate::streams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickingTypeReadModel {
    pub picking_type_id: PickingTypeId,
    pub warehouse_id: WarehouseId,
    pub kind: OperationKind,
    pub code: OperationCode,
    pub sequence_code: &'static str,
    pub sequence_id: SequenceId,
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub default_src: Option<LocationId>,
    pub default_dest: Option<LocationId>,
    pub return_picking_type: Option<PickingTypeId>,
    pub active: bool,
}

#[derive(Debug)]
pub struct PickingTypesProjection<S>
where
    S: TenantStore<PickingTypeId, PickingTypeReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> PickingTypesProjection<S>
where
    S: TenantStore<PickingTypeId, PickingTypeReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &PickingTypeId) -> Option<PickingTypeReadModel> {
        self.store.get(tenant_id, id)
    }

    /// Operation types of `warehouse` in kind order.
    pub fn for_warehouse(&self, tenant_id: TenantId, warehouse: WarehouseId) -> Vec<PickingTypeReadModel> {
        let mut out: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|p| p.warehouse_id == warehouse)
            .collect();
        out.sort_by_key(|p| p.kind);
        out
    }
}

impl<S> Projection for PickingTypesProjection<S>
where
    S: TenantStore<PickingTypeId, PickingTypeReadModel>,
{
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::PICKING_TYPE || !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        match decode::<PickingTypeEvent>(envelope)? {
            PickingTypeEvent::PickingTypeCreated(e) => {
                ensure_stream(envelope, e.tenant_id, e.picking_type_id.0)?;
                self.store.upsert(
                    e.tenant_id,
                    e.picking_type_id,
                    PickingTypeReadModel {
                        picking_type_id: e.picking_type_id,
                        warehouse_id: e.warehouse_id,
                        kind: e.kind,
                        code: e.kind.code(),
                        sequence_code: e.kind.sequence_code(),
                        sequence_id: e.sequence_id,
                        company_id: e.company_id,
                        name: e.settings.name,
                        default_src: e.settings.default_src,
                        default_dest: e.settings.default_dest,
                        return_picking_type: e.settings.return_picking_type,
                        active: e.settings.active,
                    },
                );
            }
            PickingTypeEvent::PickingTypeConfigured(e) => {
                ensure_stream(envelope, e.tenant_id, e.picking_type_id.0)?;
                self.store.modify(e.tenant_id, &e.picking_type_id, &mut |rm| {
                    rm.name = e.settings.name.clone();
                    rm.default_src = e.settings.default_src;
                    rm.default_dest = e.settings.default_dest;
                    rm.return_picking_type = e.settings.return_picking_type;
                    rm.active = e.settings.active;
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
