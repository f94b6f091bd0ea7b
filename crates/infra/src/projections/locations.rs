use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use serde_json::Value as JsonValue;

use depot_core::{CompanyId, TenantId};
use depot_events::EventEnvelope;
use depot_stock::{LocationEvent, LocationId, LocationUsage};

use super::{Projection, ProjectionError, StreamCursors, decode, ensure_stream};
use crate::read_model::TenantStore;
use crate::streams;

/// Queryable location, with its full path name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationReadModel {
    pub location_id: LocationId,
    pub name: String,
    /// "WH/Stock" for children; view locations show their own name.
    pub complete_name: String,
    pub usage: LocationUsage,
    pub parent_id: Option<LocationId>,
    pub company_id: Option<CompanyId>,
    pub active: bool,
}

fn complete_name(parent: Option<&LocationReadModel>, name: &str, usage: LocationUsage) -> String {
    match parent {
        Some(parent) if usage != LocationUsage::View => format!("{}/{name}", parent.complete_name),
        _ => name.to_string(),
    }
}

/// Location tree projection.
#[derive(Debug)]
pub struct LocationsProjection<S>
where
    S: TenantStore<LocationId, LocationReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> LocationsProjection<S>
where
    S: TenantStore<LocationId, LocationReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, location_id: &LocationId) -> Option<LocationReadModel> {
        self.store.get(tenant_id, location_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<LocationReadModel> {
        self.store.list(tenant_id)
    }

    pub fn children(&self, tenant_id: TenantId, parent: LocationId) -> Vec<LocationReadModel> {
        self.list(tenant_id)
            .into_iter()
            .filter(|l| l.parent_id == Some(parent))
            .collect()
    }

    /// Every location below `root`, sorted by complete name.
    pub fn descendants(&self, tenant_id: TenantId, root: LocationId) -> Vec<LocationReadModel> {
        let all = self.list(tenant_id);
        let mut out = Vec::new();
        let mut queue = VecDeque::from([root]);
        let mut seen = HashSet::from([root]);

        while let Some(parent) = queue.pop_front() {
            for child in all.iter().filter(|l| l.parent_id == Some(parent)) {
                if seen.insert(child.location_id) {
                    queue.push_back(child.location_id);
                    out.push(child.clone());
                }
            }
        }

        out.sort_by(|a, b| a.complete_name.cmp(&b.complete_name));
        out
    }

    /// Parent chain of `location_id`, closest first.
    pub fn ancestors(&self, tenant_id: TenantId, location_id: LocationId) -> Vec<LocationReadModel> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([location_id]);
        let mut current = self.get(tenant_id, &location_id).and_then(|l| l.parent_id);

        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let Some(parent) = self.get(tenant_id, &id) else {
                break;
            };
            current = parent.parent_id;
            out.push(parent);
        }
        out
    }

    /// Whether `ancestor` appears in the parent chain of `location_id`.
    pub fn is_descendant_of(
        &self,
        tenant_id: TenantId,
        location_id: LocationId,
        ancestor: LocationId,
    ) -> bool {
        self.ancestors(tenant_id, location_id)
            .iter()
            .any(|l| l.location_id == ancestor)
    }

    /// Recompute complete names below `root` after it was renamed.
    fn refresh_subtree(&self, tenant_id: TenantId, root: LocationId) {
        let mut queue = VecDeque::from([root]);
        let mut seen = HashSet::from([root]);

        while let Some(parent_id) = queue.pop_front() {
            let Some(parent) = self.get(tenant_id, &parent_id) else {
                continue;
            };
            for mut child in self.children(tenant_id, parent_id) {
                if !seen.insert(child.location_id) {
                    continue;
                }
                child.complete_name = complete_name(Some(&parent), &child.name, child.usage);
                queue.push_back(child.location_id);
                self.store.upsert(tenant_id, child.location_id, child);
            }
        }
    }
}

impl<S> Projection for LocationsProjection<S>
where
    S: TenantStore<LocationId, LocationReadModel>,
{
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::LOCATION || !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        let event: LocationEvent = decode(envelope)?;
        ensure_stream(envelope, event.tenant_id(), event.location_id().0)?;
        let tenant_id = event.tenant_id();

        match event {
            LocationEvent::LocationCreated(e) => {
                let parent = e.parent_id.and_then(|p| self.get(tenant_id, &p));
                self.store.upsert(
                    tenant_id,
                    e.location_id,
                    LocationReadModel {
                        location_id: e.location_id,
                        complete_name: complete_name(parent.as_ref(), &e.name, e.usage),
                        name: e.name,
                        usage: e.usage,
                        parent_id: e.parent_id,
                        company_id: e.company_id,
                        active: e.active,
                    },
                );
            }
            LocationEvent::LocationRenamed(e) => {
                if let Some(mut rm) = self.get(tenant_id, &e.location_id) {
                    let parent = rm.parent_id.and_then(|p| self.get(tenant_id, &p));
                    rm.complete_name = complete_name(parent.as_ref(), &e.name, rm.usage);
                    rm.name = e.name;
                    self.store.upsert(tenant_id, e.location_id, rm);
                    self.refresh_subtree(tenant_id, e.location_id);
                }
            }
            LocationEvent::LocationArchived(e) => {
                self.store.modify(tenant_id, &e.location_id, &mut |rm| rm.active = false);
            }
            LocationEvent::LocationUnarchived(e) => {
                self.store.modify(tenant_id, &e.location_id, &mut |rm| rm.active = true);
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

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use depot_core::AggregateId;
    use depot_events::Event;
    use depot_stock::location::{LocationCreated, LocationRenamed};
    use uuid::Uuid;

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    type Store = InMemoryTenantStore<LocationId, LocationReadModel>;

    fn envelope(event: &LocationEvent, seq: u64) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            event.tenant_id(),
            event.location_id().0,
            streams::LOCATION,
            seq,
            event.event_type(),
            serde_json::to_value(event).unwrap(),
        )
    }

    fn created(
        tenant_id: TenantId,
        name: &str,
        usage: LocationUsage,
        parent_id: Option<LocationId>,
    ) -> LocationEvent {
        LocationEvent::LocationCreated(LocationCreated {
            tenant_id,
            location_id: LocationId::new(AggregateId::new()),
            name: name.to_string(),
            usage,
            parent_id,
            company_id: None,
            active: true,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn complete_names_follow_the_tree_and_renames() {
        let projection = LocationsProjection::new(Store::new());
        let tenant_id = TenantId::new();

        let root = created(tenant_id, "Physical Locations", LocationUsage::View, None);
        let view = created(tenant_id, "WH", LocationUsage::View, Some(root.location_id()));
        let stock = created(tenant_id, "Stock", LocationUsage::Internal, Some(view.location_id()));
        for ev in [&root, &view, &stock] {
            projection.apply_envelope(&envelope(ev, 1)).unwrap();
        }

        let rm = projection.get(tenant_id, &stock.location_id()).unwrap();
        assert_eq!(rm.complete_name, "WH/Stock");
        assert!(projection.is_descendant_of(tenant_id, stock.location_id(), root.location_id()));
        assert!(!projection.is_descendant_of(tenant_id, root.location_id(), stock.location_id()));

        let renamed = LocationEvent::LocationRenamed(LocationRenamed {
            tenant_id,
            location_id: view.location_id(),
            name: "SF".to_string(),
            occurred_at: Utc::now(),
        });
        projection.apply_envelope(&envelope(&renamed, 2)).unwrap();

        let rm = projection.get(tenant_id, &stock.location_id()).unwrap();
        assert_eq!(rm.complete_name, "SF/Stock");
        assert_eq!(projection.descendants(tenant_id, root.location_id()).len(), 2);
    }

    #[test]
    fn duplicate_delivery_is_ignored() {
        let projection = LocationsProjection::new(Store::new());
        let tenant_id = TenantId::new();
        let ev = created(tenant_id, "Stock", LocationUsage::Internal, None);

        projection.apply_envelope(&envelope(&ev, 1)).unwrap();
        projection.apply_envelope(&envelope(&ev, 1)).unwrap();
        assert_eq!(projection.list(tenant_id).len(), 1);
    }

    #[test]
    fn mismatched_tenant_is_rejected() {
        let projection = LocationsProjection::new(Store::new());
        let ev = created(TenantId::new(), "Stock", LocationUsage::Internal, None);
        let env = envelope(&ev, 1);
        let foreign = EventEnvelope::new(
            env.event_id(),
            TenantId::new(),
            env.aggregate_id(),
            env.aggregate_type(),
            1,
            env.event_type(),
            env.payload().clone(),
        );

        assert!(matches!(
            projection.apply_envelope(&foreign),
            Err(ProjectionError::TenantIsolation(_))
        ));
    }
}
