use std::sync::Arc;

use serde_json::Value as JsonValue;

use depot_events::{EventBus, EventEnvelope, InMemoryEventBus};
use depot_infra::event_store::InMemoryEventStore;
use depot_infra::provisioning::WarehouseService;

pub type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

/// Services shared by every handler.
#[derive(Debug)]
pub struct AppServices {
    pub warehouses: WarehouseService<Arc<InMemoryEventStore>, Bus>,
}

/// In-memory wiring: store + bus + warehouse service, plus an audit
/// subscriber that logs every published event.
pub fn build_services() -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());

    spawn_audit_log(&bus);

    AppServices {
        warehouses: WarehouseService::new(store, bus),
    }
}

fn spawn_audit_log(bus: &Bus) {
    let sub = bus.subscribe();
    let spawned = std::thread::Builder::new()
        .name("audit-log".to_string())
        .spawn(move || {
            while let Ok(env) = sub.recv() {
                tracing::debug!(
                    tenant_id = %env.tenant_id(),
                    aggregate_type = env.aggregate_type(),
                    aggregate_id = %env.aggregate_id(),
                    sequence_number = env.sequence_number(),
                    "event published"
                );
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("audit subscriber not started: {e}");
    }
}
