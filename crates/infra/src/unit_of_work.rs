//! Multi-aggregate unit of work.
//!
//! A provisioning workflow creates a view location, its sub-locations, the
//! warehouse, sequences, operation types and routes in one go. Each step is
//! decided by its own aggregate, but nothing may be persisted unless every
//! step succeeds. `UnitOfWork` stages the decided events per stream and
//! commits them through a single [`EventStore::append_batch`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use depot_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, TenantId};
use depot_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{
    DispatchError, apply_history, publish_all, validate_loaded_stream,
};
use crate::event_store::{EventStore, StoredEvent, StreamAppend, UncommittedEvent};

#[derive(Debug)]
struct StagedStream {
    aggregate_id: AggregateId,
    expected_version: ExpectedVersion,
    events: Vec<UncommittedEvent>,
}

/// Staged, not yet committed changes of one tenant.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// everything it staged.
#[derive(Debug)]
pub struct UnitOfWork<'a, S> {
    store: &'a S,
    tenant_id: TenantId,
    occurred_at: DateTime<Utc>,
    staged: Vec<StagedStream>,
}

impl<'a, S> UnitOfWork<'a, S>
where
    S: EventStore,
{
    pub fn begin(store: &'a S, tenant_id: TenantId) -> Self {
        Self {
            store,
            tenant_id,
            occurred_at: Utc::now(),
            staged: Vec::new(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Business time shared by every event of this unit.
    pub fn now(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Number of events staged so far.
    pub fn staged_len(&self) -> usize {
        self.staged.iter().map(|s| s.events.len()).sum()
    }

    /// Rehydrate an aggregate from its committed history plus whatever this
    /// unit already staged for it.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(self.tenant_id, aggregate_id)?;
        validate_loaded_stream(self.tenant_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;

        if let Some(staged) = self.staged_stream(aggregate_id) {
            for pending in &staged.events {
                let ev: A::Event = serde_json::from_value(pending.payload.clone())
                    .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
                aggregate.apply(&ev);
            }
        }

        Ok(aggregate)
    }

    /// Decide and apply `command` on `aggregate`, staging the resulting events.
    ///
    /// The aggregate is updated in place so later steps of the workflow see
    /// the new state.
    pub fn execute<A>(
        &mut self,
        aggregate: &mut A,
        aggregate_type: &str,
        command: &A::Command,
    ) -> Result<Vec<A::Event>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Id: Clone + Into<AggregateId>,
        A::Event: depot_events::Event + Serialize,
    {
        let version_before = aggregate.version();
        let events = depot_events::execute(aggregate, command)?;
        if events.is_empty() {
            return Ok(events);
        }

        let aggregate_id: AggregateId = aggregate.id().clone().into();
        let uncommitted = events
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    self.tenant_id,
                    aggregate_id,
                    aggregate_type,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        match self.staged.iter_mut().find(|s| s.aggregate_id == aggregate_id) {
            Some(staged) => staged.events.extend(uncommitted),
            None => self.staged.push(StagedStream {
                aggregate_id,
                expected_version: ExpectedVersion::at(version_before),
                events: uncommitted,
            }),
        }

        Ok(events)
    }

    /// Persist every staged stream atomically, then publish.
    pub fn commit<B>(self, bus: &B) -> Result<Vec<StoredEvent>, DispatchError>
    where
        B: EventBus<EventEnvelope<JsonValue>>,
    {
        if self.staged.is_empty() {
            return Ok(vec![]);
        }

        let batch = self
            .staged
            .into_iter()
            .map(|s| StreamAppend {
                events: s.events,
                expected_version: s.expected_version,
            })
            .collect();

        let committed = self.store.append_batch(batch)?;
        publish_all(bus, &committed)?;
        Ok(committed)
    }

    fn staged_stream(&self, aggregate_id: AggregateId) -> Option<&StagedStream> {
        self.staged.iter().find(|s| s.aggregate_id == aggregate_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use depot_events::InMemoryEventBus;
    use depot_stock::{
        CreateLocation, Location, LocationCommand, LocationId, LocationUsage, RenameLocation,
    };

    use super::*;
    use crate::event_store::InMemoryEventStore;

    fn create(tenant_id: TenantId, location_id: LocationId, now: DateTime<Utc>) -> LocationCommand {
        LocationCommand::CreateLocation(CreateLocation {
            tenant_id,
            location_id,
            name: "Stock".to_string(),
            usage: LocationUsage::Internal,
            parent: None,
            company_id: None,
            active: true,
            occurred_at: now,
        })
    }

    #[test]
    fn nothing_is_written_before_commit() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let location_id = LocationId::new(AggregateId::new());

        {
            let mut uow = UnitOfWork::begin(&store, tenant_id);
            let mut location = Location::empty(location_id);
            let cmd = create(tenant_id, location_id, uow.now());
            uow.execute(&mut location, "stock.location", &cmd).unwrap();
            assert_eq!(uow.staged_len(), 1);
        }

        assert!(store.load_stream(tenant_id, location_id.0).unwrap().is_empty());
    }

    #[test]
    fn load_sees_staged_events_and_commit_publishes() {
        let store = InMemoryEventStore::new();
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let tenant_id = TenantId::new();
        let location_id = LocationId::new(AggregateId::new());

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        let mut location = Location::empty(location_id);
        let cmd = create(tenant_id, location_id, uow.now());
        uow.execute(&mut location, "stock.location", &cmd).unwrap();

        let mut reloaded = uow
            .load(location_id.0, |id| Location::empty(LocationId::new(id)))
            .unwrap();
        assert!(reloaded.is_created());

        let rename = LocationCommand::RenameLocation(RenameLocation {
            tenant_id,
            location_id,
            name: "Main Stock".to_string(),
            occurred_at: uow.now(),
        });
        uow.execute(&mut reloaded, "stock.location", &rename).unwrap();

        let committed = uow.commit(&bus).unwrap();
        assert_eq!(
            committed.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(sub.try_recv().unwrap().event_type(), "stock.location.created");
        assert_eq!(sub.try_recv().unwrap().event_type(), "stock.location.renamed");
    }

    #[test]
    fn failed_domain_step_stages_nothing() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let location_id = LocationId::new(AggregateId::new());

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        let mut location = Location::empty(location_id);
        let rename = LocationCommand::RenameLocation(RenameLocation {
            tenant_id,
            location_id,
            name: "X".to_string(),
            occurred_at: uow.now(),
        });

        assert!(matches!(
            uow.execute(&mut location, "stock.location", &rename),
            Err(DispatchError::NotFound)
        ));
        assert_eq!(uow.staged_len(), 0);
    }
}
