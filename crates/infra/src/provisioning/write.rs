use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use tracing::info;

use depot_core::TenantId;
use depot_events::{EventBus, EventEnvelope};
use depot_stock::{
    CompanyScoped, RouteId, SetSubLocations, StepConfig, UpdateWarehouse, WarehouseCode,
    WarehouseCommand, WarehouseId,
};

use super::error::ProvisioningError;
use super::model::WarehouseChanges;
use super::service::WarehouseService;
use super::{platform, records};
use crate::event_store::EventStore;
use crate::projections::WarehouseReadModel;
use crate::streams;

impl<S, B> WarehouseService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Apply changes to a warehouse and bring its records in line.
    ///
    /// Sub-locations and operation types are created on demand when steps
    /// grow and archived when they shrink. A new short name renames the view
    /// location; names flow into sequences and routes, including the
    /// resupply routes this warehouse feeds elsewhere. Archiving the
    /// warehouse archives its routes and operation types.
    pub fn write_warehouse(
        &self,
        tenant_id: TenantId,
        warehouse_id: WarehouseId,
        changes: WarehouseChanges,
    ) -> Result<WarehouseReadModel, ProvisioningError> {
        let _guard = self.lock()?;
        let current = self.get_warehouse(tenant_id, warehouse_id)?;
        let company_id = current.company_id;

        let name = match changes.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(ProvisioningError::Validation(
                    "warehouse name cannot be empty".to_string(),
                ));
            }
            Some(name) => name.to_string(),
            None => current.name.clone(),
        };
        let code = match changes.code.as_deref() {
            Some(raw) => WarehouseCode::parse(raw)?.to_string(),
            None => current.code.clone(),
        };
        let renamed = name != current.name;
        let recoded = code != current.code;
        if renamed || recoded {
            self.ensure_unique(tenant_id, company_id, &name, &code, Some(warehouse_id))?;
        }

        let partner = match changes.partner_id {
            Some(Some(partner_id)) => {
                Some(Some(self.scoped_partner(tenant_id, company_id, partner_id)?))
            }
            Some(None) => Some(None),
            None => None,
        };
        let supplier_ids = changes
            .resupply_wh_ids
            .unwrap_or_else(|| current.resupply_wh_ids.clone());
        let suppliers = self.scoped_suppliers(tenant_id, company_id, &supplier_ids)?;
        let existing_resupply: BTreeMap<WarehouseId, _> = self
            .catalog
            .routes
            .for_warehouse(tenant_id, warehouse_id)
            .into_iter()
            .filter(|r| r.header.supplied_wh_id == Some(warehouse_id))
            .filter_map(|r| r.header.supplier_wh_id.map(|supplier| (supplier, r.route_id)))
            .collect();
        let fed_routes: Vec<(WarehouseId, RouteId)> = if renamed || recoded {
            self.catalog
                .routes
                .supplied_by(tenant_id, warehouse_id)
                .into_iter()
                .filter_map(|r| r.header.supplied_wh_id.map(|supplied| (supplied, r.route_id)))
                .collect()
        } else {
            Vec::new()
        };

        let steps = StepConfig::new(
            changes.reception_steps.unwrap_or(current.reception_steps),
            changes.delivery_steps.unwrap_or(current.delivery_steps),
        );
        let active = changes.active.unwrap_or(current.active);

        let mut uow = self.begin(tenant_id);
        let platform = platform::ensure(&mut uow, company_id)?;
        let mut warehouse = records::load_warehouse(&uow, warehouse_id)?;

        // Locations first: the warehouse refuses steps whose areas do not exist.
        let created = records::reconcile_sub_locations(
            &mut uow,
            warehouse.sub_locations(),
            steps,
            current.view_location_id,
            company_id,
        )?;
        if !created.is_empty() {
            let command = WarehouseCommand::SetSubLocations(SetSubLocations {
                tenant_id,
                warehouse_id,
                locations: created
                    .into_iter()
                    .map(|(sub, id)| (sub, CompanyScoped::new(id, Some(company_id))))
                    .collect(),
                occurred_at: uow.now(),
            });
            uow.execute(&mut warehouse, streams::WAREHOUSE, &command)?;
        }

        let command = WarehouseCommand::UpdateWarehouse(UpdateWarehouse {
            tenant_id,
            warehouse_id,
            name: Some(name),
            code: Some(code.clone()),
            sequence: changes.sequence,
            partner,
            steps: Some(steps),
            active: Some(active),
            occurred_at: uow.now(),
        });
        uow.execute(&mut warehouse, streams::WAREHOUSE, &command)?;

        if recoded {
            records::rename_location(&mut uow, current.view_location_id, &code)?;
        }

        let layout = records::layout(&uow, &warehouse, &platform)?;
        records::reconcile_operation_types(&mut uow, &mut warehouse, &layout)?;
        let layout = records::layout(&uow, &warehouse, &platform)?;
        records::reconcile_routes(&mut uow, &mut warehouse, &layout, &platform)?;
        records::reconcile_resupply(
            &mut uow,
            &mut warehouse,
            &layout,
            &platform,
            &suppliers,
            &existing_resupply,
        )?;
        records::refresh_supplied_routes(&mut uow, &layout, &platform, &fed_routes)?;

        if let Some(Some(partner)) = partner {
            records::assign_partner(&mut uow, partner.id, warehouse_id, platform.transit.id)?;
        }

        let active_after = self.catalog.warehouses.count_active(tenant_id)
            - usize::from(current.active)
            + usize::from(active);
        for group in records::sync_feature_groups(&mut uow, active_after)? {
            info!(%tenant_id, group = group.label(), "feature group enabled");
        }

        let staged = uow.staged_len();
        self.commit(uow)?;
        info!(%tenant_id, %warehouse_id, code = %code, active, events = staged, "warehouse updated");

        self.get_warehouse(tenant_id, warehouse_id)
    }
}
