//! Per-stream cursors for idempotent projections.
//!
//! A cursor remembers the last applied `sequence_number` of each
//! `(tenant, aggregate)` stream. Replays at or below the cursor are skipped,
//! gaps are rejected.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use depot_core::{AggregateId, TenantId};
use depot_events::EventEnvelope;

use super::ProjectionError;

#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<(TenantId, AggregateId), u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|c| c.get(&(tenant_id, aggregate_id)).copied())
            .unwrap_or(0)
    }

    /// Whether `envelope` is the next event of its stream.
    ///
    /// `Ok(false)` means it was already applied.
    pub fn should_apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        let last = self.get(envelope.tenant_id(), envelope.aggregate_id());
        let found = envelope.sequence_number();

        if found == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found });
        }
        if found <= last {
            return Ok(false);
        }
        if last != 0 && found != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found });
        }
        Ok(true)
    }

    pub fn advance(&self, envelope: &EventEnvelope<JsonValue>) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(
                (envelope.tenant_id(), envelope.aggregate_id()),
                envelope.sequence_number(),
            );
        }
    }

    pub fn clear_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.retain(|(t, _), _| *t != tenant_id);
        }
    }
}
