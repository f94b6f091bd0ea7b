use serde::Serialize;
use serde_json::Value as JsonValue;

use depot_core::{CompanyId, TenantId};
use depot_events::EventEnvelope;
use depot_stock::{RouteEvent, RouteHeader, RouteId, Rule, WarehouseId};

use super::{Projection, ProjectionError, StreamCursors, decode, ensure_stream};
use crate::read_model::TenantStore;
use crate::streams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteReadModel {
    pub route_id: RouteId,
    pub company_id: Option<CompanyId>,
    #[serde(flatten)]
    pub header: RouteHeader,
    pub rules: Vec<Rule>,
}

impl RouteReadModel {
    /// Attached to `warehouse`, or resupplying it.
    pub fn serves(&self, warehouse: WarehouseId) -> bool {
        self.header.warehouse_ids.contains(&warehouse) || self.header.supplied_wh_id == Some(warehouse)
    }
}

#[derive(Debug)]
pub struct RoutesProjection<S>
where
    S: TenantStore<RouteId, RouteReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> RoutesProjection<S>
where
    S: TenantStore<RouteId, RouteReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, route_id: &RouteId) -> Option<RouteReadModel> {
        self.store.get(tenant_id, route_id)
    }

    /// Routes serving `warehouse`, archived ones included, by sequence then name.
    pub fn for_warehouse(&self, tenant_id: TenantId, warehouse: WarehouseId) -> Vec<RouteReadModel> {
        let mut out: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|r| r.serves(warehouse))
            .collect();
        out.sort_by(|a, b| {
            (a.header.sequence, &a.header.name).cmp(&(b.header.sequence, &b.header.name))
        });
        out
    }

    /// Resupply routes `supplier` feeds, archived ones included.
    pub fn supplied_by(&self, tenant_id: TenantId, supplier: WarehouseId) -> Vec<RouteReadModel> {
        self.store
            .list(tenant_id)
            .into_iter()
            .filter(|r| r.header.supplier_wh_id == Some(supplier))
            .collect()
    }
}

impl<S> Projection for RoutesProjection<S>
where
    S: TenantStore<RouteId, RouteReadModel>,
{
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::ROUTE || !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        match decode::<RouteEvent>(envelope)? {
            RouteEvent::RouteCreated(e) => {
                ensure_stream(envelope, e.tenant_id, e.route_id.0)?;
                self.store.upsert(
                    e.tenant_id,
                    e.route_id,
                    RouteReadModel {
                        route_id: e.route_id,
                        company_id: e.company_id,
                        header: e.header,
                        rules: e.rules,
                    },
                );
            }
            RouteEvent::RouteUpdated(e) => {
                ensure_stream(envelope, e.tenant_id, e.route_id.0)?;
                self.store.modify(e.tenant_id, &e.route_id, &mut |rm| {
                    rm.header = e.header.clone();
                });
            }
            RouteEvent::RulesReplaced(e) => {
                ensure_stream(envelope, e.tenant_id, e.route_id.0)?;
                self.store.modify(e.tenant_id, &e.route_id, &mut |rm| {
                    rm.rules = e.rules.clone();
                });
            }
            RouteEvent::RuleUpserted(e) => {
                ensure_stream(envelope, e.tenant_id, e.route_id.0)?;
                self.store.modify(e.tenant_id, &e.route_id, &mut |rm| {
                    match rm.rules.iter_mut().find(|r| r.id == e.rule.id) {
                        Some(rule) => *rule = e.rule.clone(),
                        None => rm.rules.push(e.rule.clone()),
                    }
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
