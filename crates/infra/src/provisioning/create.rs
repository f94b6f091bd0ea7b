use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use tracing::info;

use depot_core::AggregateId;
use depot_events::{EventBus, EventEnvelope};
use depot_stock::{
    CompanyScoped, CreateWarehouse, FeatureGroup, LocationUsage, StepConfig, Warehouse,
    WarehouseCode, WarehouseCommand, WarehouseId,
};

use super::error::ProvisioningError;
use super::model::{Advisory, NewWarehouse, Provisioned, STORAGE_LOCATIONS_ADVISORY, TenantContext};
use super::service::WarehouseService;
use super::{platform, records};
use crate::event_store::EventStore;
use crate::streams;

impl<S, B> WarehouseService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Create a warehouse with everything it needs to operate.
    ///
    /// In order: platform records, the view location named after the short
    /// name, the sub-locations the steps require, the warehouse, its
    /// sequences and operation types, its routes and make-to-order rule,
    /// resupply routes, the partner address, then the feature groups. All of
    /// it is committed at once or not at all.
    pub fn create_warehouse(
        &self,
        ctx: &TenantContext,
        input: NewWarehouse,
    ) -> Result<Provisioned, ProvisioningError> {
        let _guard = self.lock()?;
        let tenant_id = ctx.tenant_id;

        let company_id = input
            .company_id
            .or(ctx.company_id)
            .ok_or_else(|| ProvisioningError::Validation("a company is required".to_string()))?;
        let company = self.company(tenant_id, company_id)?;
        let defaults = self.defaults_for(tenant_id, Some(company.company_id));

        let name = match input.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => defaults
                .name
                .ok_or_else(|| ProvisioningError::Validation("a name is required".to_string()))?,
        };
        let code = WarehouseCode::parse(&input.code)?;
        self.ensure_unique(tenant_id, company_id, &name, code.as_str(), None)?;

        let partner = input
            .partner_id
            .or(defaults.partner_id)
            .map(|partner_id| self.scoped_partner(tenant_id, company_id, partner_id))
            .transpose()?;
        let suppliers = self.scoped_suppliers(tenant_id, company_id, &input.resupply_wh_ids)?;
        let steps = StepConfig::new(
            input.reception_steps.unwrap_or(defaults.reception_steps),
            input.delivery_steps.unwrap_or(defaults.delivery_steps),
        );

        let mut uow = self.begin(tenant_id);
        let storage_locations_before =
            records::load_settings(&uow)?.is_enabled(FeatureGroup::MultiLocations);
        let platform = platform::ensure(&mut uow, company_id)?;

        let view = records::create_location(
            &mut uow,
            code.as_str(),
            LocationUsage::View,
            platform.physical_root.id,
            company_id,
        )?;
        let sub_locations =
            records::reconcile_sub_locations(&mut uow, &BTreeMap::new(), steps, view, company_id)?;

        let warehouse_id = WarehouseId::new(AggregateId::new());
        let mut warehouse = Warehouse::empty(warehouse_id);
        let command = WarehouseCommand::CreateWarehouse(CreateWarehouse {
            tenant_id,
            warehouse_id,
            name,
            code: code.to_string(),
            company_id,
            partner,
            view_location: CompanyScoped::new(view, Some(company_id)),
            sub_locations: sub_locations
                .into_iter()
                .map(|(sub, id)| (sub, CompanyScoped::new(id, Some(company_id))))
                .collect(),
            steps,
            sequence: input.sequence.unwrap_or(defaults.sequence),
            occurred_at: uow.now(),
        });
        uow.execute(&mut warehouse, streams::WAREHOUSE, &command)?;

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
            &BTreeMap::new(),
        )?;

        if let Some(partner) = partner {
            records::assign_partner(&mut uow, partner.id, warehouse_id, platform.transit.id)?;
        }

        let active_after = self.catalog.warehouses.count_active(tenant_id) + 1;
        for group in records::sync_feature_groups(&mut uow, active_after)? {
            info!(%tenant_id, group = group.label(), "feature group enabled");
        }

        let staged = uow.staged_len();
        self.commit(uow)?;
        info!(
            %tenant_id,
            %warehouse_id,
            code = %code,
            steps.reception = ?steps.reception,
            steps.delivery = ?steps.delivery,
            events = staged,
            "warehouse provisioned"
        );

        let mut advisories = Vec::new();
        if !storage_locations_before {
            advisories.push(Advisory::warning(STORAGE_LOCATIONS_ADVISORY));
        }

        Ok(Provisioned {
            warehouse: self.get_warehouse(tenant_id, warehouse_id)?,
            advisories,
        })
    }
}
