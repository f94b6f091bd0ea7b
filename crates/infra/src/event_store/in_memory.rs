use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use depot_core::{AggregateId, TenantId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<StreamKey, Vec<StoredEvent>>,
    /// Per-tenant commit log, in append order.
    log: HashMap<TenantId, Vec<StoredEvent>>,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    /// All events of one stream must share tenant, aggregate and aggregate type.
    fn stream_key(events: &[UncommittedEvent]) -> Result<Option<StreamKey>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(None);
        };

        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != first.tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != first.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != first.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        Ok(Some(StreamKey {
            tenant_id: first.tenant_id,
            aggregate_id: first.aggregate_id,
        }))
    }
}

impl EventStore for InMemoryEventStore {
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        // 1) Shape checks, no lock needed.
        let mut keyed = Vec::with_capacity(batch.len());
        let mut seen = HashSet::new();
        let mut tenant: Option<TenantId> = None;
        for append in batch {
            let Some(key) = Self::stream_key(&append.events)? else {
                continue;
            };
            if tenant.is_some_and(|t| t != key.tenant_id) {
                return Err(EventStoreError::TenantIsolation(
                    "batch spans multiple tenants".to_string(),
                ));
            }
            tenant = Some(key.tenant_id);
            if !seen.insert(key) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "stream {} appears twice in one batch",
                    key.aggregate_id
                )));
            }
            keyed.push((key, append));
        }
        let Some(tenant_id) = tenant else {
            return Ok(vec![]);
        };

        let mut inner = self
            .inner
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        // 2) Check every stream before touching any of them.
        for (key, append) in &keyed {
            let stream = inner.streams.get(key).map(Vec::as_slice).unwrap_or(&[]);
            let current = Self::current_version(stream);

            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream {}: expected {:?}, found {current}",
                    key.aggregate_id, append.expected_version
                )));
            }

            // Enforce aggregate type stability across the stream.
            if let (Some(existing), Some(incoming)) = (stream.first(), append.events.first()) {
                if existing.aggregate_type != incoming.aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{}', attempted append with '{}'",
                        existing.aggregate_type, incoming.aggregate_type
                    )));
                }
            }
        }

        // 3) Assign sequence numbers and append (append-only).
        let mut committed = Vec::new();
        for (key, append) in keyed {
            let stream = inner.streams.entry(key).or_default();
            let mut next = Self::current_version(stream) + 1;
            for e in append.events {
                let stored = StoredEvent {
                    event_id: e.event_id,
                    tenant_id: e.tenant_id,
                    aggregate_id: e.aggregate_id,
                    aggregate_type: e.aggregate_type,
                    sequence_number: next,
                    event_type: e.event_type,
                    event_version: e.event_version,
                    occurred_at: e.occurred_at,
                    payload: e.payload,
                };
                next += 1;
                stream.push(stored.clone());
                committed.push(stored);
            }
        }
        inner
            .log
            .entry(tenant_id)
            .or_default()
            .extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let inner = self
            .inner
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(inner.streams.get(&key).cloned().unwrap_or_default())
    }

    /// Events come back in commit order, so parents precede children.
    fn load_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(inner.log.get(&tenant_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use depot_core::ExpectedVersion;
    use uuid::Uuid;

    use super::*;

    fn event(tenant_id: TenantId, aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        store
            .append(vec![event(tenant_id, b, "stock.location")], ExpectedVersion::NoStream)
            .unwrap();

        // `b` already exists, so the whole batch must be rejected.
        let err = store
            .append_batch(vec![
                StreamAppend {
                    events: vec![event(tenant_id, a, "stock.location")],
                    expected_version: ExpectedVersion::NoStream,
                },
                StreamAppend {
                    events: vec![event(tenant_id, b, "stock.location")],
                    expected_version: ExpectedVersion::NoStream,
                },
            ])
            .unwrap_err();

        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert!(store.load_stream(tenant_id, a).unwrap().is_empty());
        assert_eq!(store.load_tenant(tenant_id).unwrap().len(), 1);
    }

    #[test]
    fn batch_rejects_mixed_tenants() {
        let store = InMemoryEventStore::new();
        let err = store
            .append_batch(vec![
                StreamAppend {
                    events: vec![event(TenantId::new(), AggregateId::new(), "stock.route")],
                    expected_version: ExpectedVersion::Any,
                },
                StreamAppend {
                    events: vec![event(TenantId::new(), AggregateId::new(), "stock.route")],
                    expected_version: ExpectedVersion::Any,
                },
            ])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));
    }

    #[test]
    fn sequence_numbers_continue_per_stream() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let a = AggregateId::new();

        store
            .append(vec![event(tenant_id, a, "stock.sequence")], ExpectedVersion::NoStream)
            .unwrap();
        let committed = store
            .append(
                vec![
                    event(tenant_id, a, "stock.sequence"),
                    event(tenant_id, a, "stock.sequence"),
                ],
                ExpectedVersion::Exact(1),
            )
            .unwrap();

        assert_eq!(
            committed.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn stream_type_is_stable() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let a = AggregateId::new();

        store
            .append(vec![event(tenant_id, a, "stock.route")], ExpectedVersion::Any)
            .unwrap();
        let err = store
            .append(vec![event(tenant_id, a, "stock.location")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }
}
