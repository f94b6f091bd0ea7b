//! Command execution pipeline for a single aggregate.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (tenant-scoped)
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus
//! ```
//!
//! Workflows touching several aggregates at once go through
//! [`crate::unit_of_work::UnitOfWork`] instead, which shares the load and
//! rehydrate helpers defined here.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use depot_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, TenantId};
use depot_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale aggregate version).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    /// Tenant isolation violation (cross-tenant or cross-aggregate stream mixing).
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
    /// Domain validation failure (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    /// Historical payloads no longer match the aggregate event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Events are persisted before publication: if the append fails, nothing is
/// published. A publication failure is returned to the caller while the
/// events stay committed (at-least-once delivery).
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full event-sourcing pipeline.
    ///
    /// `make_aggregate` builds the empty instance to rehydrate (for example
    /// `Sequence::empty(id)`). Returns the committed events; an empty vector
    /// means the command was already satisfied.
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: depot_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history (tenant-scoped)
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    tenant_id,
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Publish committed events (after append)
        publish_all(&self.bus, &committed)?;

        Ok(committed)
    }
}

pub(crate) fn publish_all<B>(bus: &B, committed: &[StoredEvent]) -> Result<(), DispatchError>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    for stored in committed {
        bus.publish(stored.to_envelope())
            .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
    }
    Ok(())
}

pub(crate) fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

pub(crate) fn validate_loaded_stream(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Enforce tenant isolation even if a buggy backend returns cross-tenant data.
    // Also ensure the stream is monotonically increasing by sequence number.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

pub(crate) fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use depot_events::InMemoryEventBus;
    use depot_stock::{
        CreateSequence, DEFAULT_PADDING, ReserveNumber, Sequence, SequenceCommand, SequenceId,
    };

    use super::*;
    use crate::event_store::InMemoryEventStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn dispatcher() -> (CommandDispatcher<InMemoryEventStore, Bus>, Bus) {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        (CommandDispatcher::new(InMemoryEventStore::new(), bus.clone()), bus)
    }

    fn create(tenant_id: TenantId, sequence_id: SequenceId) -> SequenceCommand {
        SequenceCommand::CreateSequence(CreateSequence {
            tenant_id,
            sequence_id,
            name: "WH Sequence Receipts".to_string(),
            prefix: "WH/IN/".to_string(),
            padding: DEFAULT_PADDING,
            company_id: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_persists_then_publishes() {
        let (dispatcher, bus) = dispatcher();
        let sub = bus.subscribe();
        let tenant_id = TenantId::new();
        let sequence_id = SequenceId::new(AggregateId::new());

        let committed = dispatcher
            .dispatch(
                tenant_id,
                sequence_id.0,
                "stock.sequence",
                create(tenant_id, sequence_id),
                |_, id| Sequence::empty(SequenceId::new(id)),
            )
            .unwrap();

        assert_eq!(committed.len(), 1);
        let envelope = sub.try_recv().unwrap();
        assert_eq!(envelope.event_type(), "stock.sequence.created");
        assert_eq!(envelope.sequence_number(), 1);
    }

    #[test]
    fn domain_errors_are_mapped() {
        let (dispatcher, _bus) = dispatcher();
        let tenant_id = TenantId::new();
        let sequence_id = SequenceId::new(AggregateId::new());

        let err = dispatcher
            .dispatch(
                tenant_id,
                sequence_id.0,
                "stock.sequence",
                SequenceCommand::ReserveNumber(ReserveNumber {
                    tenant_id,
                    sequence_id,
                    occurred_at: Utc::now(),
                }),
                |_, id| Sequence::empty(SequenceId::new(id)),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }

    #[test]
    fn other_tenant_sees_an_empty_stream() {
        let (dispatcher, _bus) = dispatcher();
        let tenant_id = TenantId::new();
        let sequence_id = SequenceId::new(AggregateId::new());
        let make = |_: TenantId, id: AggregateId| Sequence::empty(SequenceId::new(id));

        dispatcher
            .dispatch(tenant_id, sequence_id.0, "stock.sequence", create(tenant_id, sequence_id), make)
            .unwrap();

        let other = TenantId::new();
        let err = dispatcher
            .dispatch(
                other,
                sequence_id.0,
                "stock.sequence",
                SequenceCommand::ReserveNumber(ReserveNumber {
                    tenant_id: other,
                    sequence_id,
                    occurred_at: Utc::now(),
                }),
                make,
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }
}
