//! Projections (read model builders).
//!
//! Projections consume committed event envelopes and maintain tenant-isolated
//! read models for queries. All projections are:
//! - **Rebuildable**: reconstructed from the tenant's commit log
//! - **Tenant-isolated**: data is partitioned by tenant
//! - **Idempotent**: safe for at-least-once delivery (see [`StreamCursors`])

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use depot_core::{AggregateId, TenantId};
use depot_events::EventEnvelope;

pub mod catalog;
pub mod cursor;
pub mod locations;
pub mod parties;
pub mod picking_types;
pub mod routes;
pub mod warehouses;

pub use catalog::StockCatalog;
pub use cursor::StreamCursors;
pub use locations::{LocationReadModel, LocationsProjection};
pub use parties::{CompanyReadModel, PartiesProjection, PartnerReadModel};
pub use picking_types::{PickingTypeReadModel, PickingTypesProjection};
pub use routes::{RouteReadModel, RoutesProjection};
pub use warehouses::{WarehouseFilter, WarehouseReadModel, WarehousesProjection};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// A read model fed from published envelopes.
pub trait Projection: Send + Sync {
    /// Apply one envelope. Envelopes of other aggregate types are ignored.
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Drop every record and cursor of a tenant.
    fn clear_tenant(&self, tenant_id: TenantId);

    /// Rebuild a tenant from scratch.
    ///
    /// Envelopes must come in commit order: parents are applied before the
    /// records that point at them.
    fn rebuild(
        &self,
        tenant_id: TenantId,
        envelopes: &[EventEnvelope<JsonValue>],
    ) -> Result<(), ProjectionError> {
        self.clear_tenant(tenant_id);
        for envelope in envelopes.iter().filter(|e| e.tenant_id() == tenant_id) {
            self.apply_envelope(envelope)?;
        }
        Ok(())
    }
}

pub(crate) fn decode<E: DeserializeOwned>(
    envelope: &EventEnvelope<JsonValue>,
) -> Result<E, ProjectionError> {
    serde_json::from_value(envelope.payload().clone())
        .map_err(|e| ProjectionError::Deserialize(e.to_string()))
}

/// The event must belong to the stream its envelope claims.
pub(crate) fn ensure_stream(
    envelope: &EventEnvelope<JsonValue>,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
) -> Result<(), ProjectionError> {
    if tenant_id != envelope.tenant_id() {
        return Err(ProjectionError::TenantIsolation(
            "event tenant_id does not match envelope tenant_id".to_string(),
        ));
    }
    if aggregate_id != envelope.aggregate_id() {
        return Err(ProjectionError::TenantIsolation(
            "event id does not match envelope aggregate_id".to_string(),
        ));
    }
    Ok(())
}
