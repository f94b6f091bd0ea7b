use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use depot_core::{AggregateId, CompanyId, TenantId};
use depot_events::{EventBus, EventEnvelope};
use depot_parties::{
    Company, CompanyCommand, Partner, PartnerCommand, PartnerId, RegisterCompany, RegisterPartner,
};
use depot_stock::{
    CompanyScoped, DEFAULT_SEQUENCE, DeliverySteps, FeatureGroup, LocationId, ReceptionSteps,
    ReserveNumber, Sequence, SequenceCommand, SequenceEvent, SequenceId, WarehouseId,
    ensure_company,
};

use super::error::ProvisioningError;
use super::model::{
    Advisory, NewCompany, NewPartner, ReservedNumber, STORAGE_LOCATIONS_ADVISORY, TenantContext,
    WarehouseDefaults,
};
use super::{platform, records};
use crate::command_dispatcher::CommandDispatcher;
use crate::event_store::{EventStore, StoredEvent};
use crate::projections::{
    CompanyReadModel, LocationReadModel, PartnerReadModel, PickingTypeReadModel, RouteReadModel,
    StockCatalog, WarehouseFilter, WarehouseReadModel,
};
use crate::streams;
use crate::unit_of_work::UnitOfWork;

pub(super) const NAME_NOT_UNIQUE: &str = "The name of the warehouse must be unique per company!";
pub(super) const CODE_NOT_UNIQUE: &str =
    "The short name of the warehouse must be unique per company!";

/// Warehouse provisioning and the queries around it.
///
/// Writes are serialized by one lock and each of them commits through a
/// single unit of work; read models are refreshed from the committed events
/// before the lock is released, so a caller always reads its own writes.
#[derive(Debug)]
pub struct WarehouseService<S, B> {
    pub(super) dispatcher: CommandDispatcher<S, B>,
    pub(super) catalog: StockCatalog,
    write_lock: Mutex<()>,
}

impl<S, B> WarehouseService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            catalog: StockCatalog::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &StockCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, ()>, ProvisioningError> {
        self.write_lock
            .lock()
            .map_err(|_| ProvisioningError::LockPoisoned)
    }

    pub(super) fn begin(&self, tenant_id: TenantId) -> UnitOfWork<'_, S> {
        UnitOfWork::begin(self.dispatcher.store(), tenant_id)
    }

    /// Persist, publish, then feed the read models.
    pub(super) fn commit(&self, uow: UnitOfWork<'_, S>) -> Result<Vec<StoredEvent>, ProvisioningError> {
        let committed = uow.commit(self.dispatcher.bus())?;
        self.catalog.apply_committed(&committed)?;
        Ok(committed)
    }

    /// Replay a tenant's log into fresh read models.
    pub fn rebuild(&self, tenant_id: TenantId) -> Result<(), ProvisioningError> {
        let _guard = self.lock()?;
        let log = self.dispatcher.store().load_tenant(tenant_id)?;
        self.catalog.rebuild(tenant_id, &log)?;
        info!(%tenant_id, events = log.len(), "read models rebuilt");
        Ok(())
    }

    // ---- companies and partners ----

    /// Register a company together with the partner holding its address.
    pub fn register_company(
        &self,
        tenant_id: TenantId,
        input: NewCompany,
    ) -> Result<CompanyReadModel, ProvisioningError> {
        let _guard = self.lock()?;
        let company_id = CompanyId::new();
        let partner_id = PartnerId::new(AggregateId::new());

        let mut uow = self.begin(tenant_id);
        let mut partner = Partner::empty(partner_id);
        let register_partner = PartnerCommand::RegisterPartner(RegisterPartner {
            tenant_id,
            partner_id,
            name: input.name.clone(),
            contact: Some(input.contact),
            company_id: Some(company_id),
            occurred_at: uow.now(),
        });
        uow.execute(&mut partner, streams::PARTNER, &register_partner)?;

        let mut company = Company::empty(company_id);
        let register_company = CompanyCommand::RegisterCompany(RegisterCompany {
            tenant_id,
            company_id,
            name: input.name,
            partner_id: Some(partner_id),
            occurred_at: uow.now(),
        });
        uow.execute(&mut company, streams::COMPANY, &register_company)?;

        self.commit(uow)?;
        info!(%tenant_id, %company_id, "company registered");
        self.catalog
            .parties
            .company(tenant_id, &company_id)
            .ok_or_else(|| ProvisioningError::NotFound(format!("company {company_id}")))
    }

    pub fn register_partner(
        &self,
        tenant_id: TenantId,
        input: NewPartner,
    ) -> Result<PartnerReadModel, ProvisioningError> {
        let _guard = self.lock()?;
        if let Some(company_id) = input.company_id {
            self.company(tenant_id, company_id)?;
        }

        let partner_id = PartnerId::new(AggregateId::new());
        let command = PartnerCommand::RegisterPartner(RegisterPartner {
            tenant_id,
            partner_id,
            name: input.name,
            contact: Some(input.contact),
            company_id: input.company_id,
            occurred_at: Utc::now(),
        });
        let committed = self.dispatcher.dispatch(
            tenant_id,
            partner_id.0,
            streams::PARTNER,
            command,
            |_, id| Partner::empty(PartnerId::new(id)),
        )?;
        self.catalog.apply_committed(&committed)?;

        self.partner(tenant_id, partner_id)
    }

    pub fn company(
        &self,
        tenant_id: TenantId,
        company_id: CompanyId,
    ) -> Result<CompanyReadModel, ProvisioningError> {
        self.catalog
            .parties
            .company(tenant_id, &company_id)
            .ok_or_else(|| ProvisioningError::NotFound(format!("company {company_id}")))
    }

    pub fn companies(&self, tenant_id: TenantId) -> Vec<CompanyReadModel> {
        self.catalog.parties.companies(tenant_id)
    }

    pub fn partner(
        &self,
        tenant_id: TenantId,
        partner_id: PartnerId,
    ) -> Result<PartnerReadModel, ProvisioningError> {
        self.catalog
            .parties
            .partner(tenant_id, &partner_id)
            .ok_or_else(|| ProvisioningError::NotFound(format!("partner {partner_id}")))
    }

    pub fn partners(&self, tenant_id: TenantId, query: Option<&str>) -> Vec<PartnerReadModel> {
        match query {
            Some(q) => self.catalog.parties.search_partners(tenant_id, q),
            None => self.catalog.parties.partners(tenant_id),
        }
    }

    // ---- sequences ----

    /// Take the next number of a sequence and render it with its prefix.
    pub fn reserve_number(
        &self,
        tenant_id: TenantId,
        sequence_id: SequenceId,
    ) -> Result<ReservedNumber, ProvisioningError> {
        let _guard = self.lock()?;
        let command = SequenceCommand::ReserveNumber(ReserveNumber {
            tenant_id,
            sequence_id,
            occurred_at: Utc::now(),
        });
        let committed = self.dispatcher.dispatch(
            tenant_id,
            sequence_id.0,
            streams::SEQUENCE,
            command,
            |_, id| Sequence::empty(SequenceId::new(id)),
        )?;

        let number = committed
            .iter()
            .find_map(|stored| match serde_json::from_value(stored.payload.clone()) {
                Ok(SequenceEvent::NumberReserved(e)) => Some(e.number),
                _ => None,
            })
            .ok_or_else(|| ProvisioningError::NotFound(format!("sequence {sequence_id}")))?;

        let sequence = self
            .begin(tenant_id)
            .load(sequence_id.0, |id| Sequence::empty(SequenceId::new(id)))?;
        Ok(ReservedNumber {
            sequence_id,
            number,
            name: sequence.format(number),
        })
    }

    // ---- warehouse queries ----

    pub fn get_warehouse(
        &self,
        tenant_id: TenantId,
        warehouse_id: WarehouseId,
    ) -> Result<WarehouseReadModel, ProvisioningError> {
        self.catalog
            .warehouses
            .get(tenant_id, &warehouse_id)
            .ok_or_else(|| ProvisioningError::NotFound(format!("warehouse {warehouse_id}")))
    }

    pub fn search_warehouses(
        &self,
        tenant_id: TenantId,
        filter: &WarehouseFilter,
    ) -> Vec<WarehouseReadModel> {
        self.catalog.warehouses.search(tenant_id, filter)
    }

    /// Values a new warehouse of the context company would get.
    pub fn default_warehouse_values(&self, ctx: &TenantContext) -> WarehouseDefaults {
        self.defaults_for(ctx.tenant_id, ctx.company_id)
    }

    pub(super) fn defaults_for(
        &self,
        tenant_id: TenantId,
        company_id: Option<CompanyId>,
    ) -> WarehouseDefaults {
        let company = company_id.and_then(|id| self.catalog.parties.company(tenant_id, &id));
        let name = company.as_ref().map(|company| {
            match self
                .catalog
                .warehouses
                .count_for_company(tenant_id, company.company_id)
            {
                0 => company.name.clone(),
                n => format!("{} - warehouse # {}", company.name, n + 1),
            }
        });

        WarehouseDefaults {
            name,
            company_id,
            partner_id: company.and_then(|c| c.partner_id),
            reception_steps: ReceptionSteps::default(),
            delivery_steps: DeliverySteps::default(),
            sequence: DEFAULT_SEQUENCE,
            active: true,
        }
    }

    /// The view location and everything below it.
    pub fn warehouse_locations(
        &self,
        tenant_id: TenantId,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<LocationReadModel>, ProvisioningError> {
        let warehouse = self.get_warehouse(tenant_id, warehouse_id)?;
        let locations = &self.catalog.locations;
        let mut out: Vec<_> = locations
            .get(tenant_id, &warehouse.view_location_id)
            .into_iter()
            .collect();
        out.extend(locations.descendants(tenant_id, warehouse.view_location_id));
        Ok(out)
    }

    pub fn warehouse_routes(
        &self,
        tenant_id: TenantId,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<RouteReadModel>, ProvisioningError> {
        self.get_warehouse(tenant_id, warehouse_id)?;
        Ok(self.catalog.routes.for_warehouse(tenant_id, warehouse_id))
    }

    pub fn warehouse_operation_types(
        &self,
        tenant_id: TenantId,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<PickingTypeReadModel>, ProvisioningError> {
        self.get_warehouse(tenant_id, warehouse_id)?;
        Ok(self.catalog.picking_types.for_warehouse(tenant_id, warehouse_id))
    }

    pub fn is_descendant_of(&self, tenant_id: TenantId, location: LocationId, ancestor: LocationId) -> bool {
        self.catalog.locations.is_descendant_of(tenant_id, location, ancestor)
    }

    /// Root of the physical locations tree of a tenant.
    pub fn root_location(&self, tenant_id: TenantId) -> LocationId {
        platform::physical_root(tenant_id)
    }

    /// Warning to show when a company is picked on a new-warehouse form.
    pub fn onchange_company(&self, tenant_id: TenantId) -> Result<Option<Advisory>, ProvisioningError> {
        let settings = records::load_settings(&self.begin(tenant_id))?;
        let any_enabled = settings.is_enabled(FeatureGroup::MultiLocations)
            || settings.is_enabled(FeatureGroup::MultiWarehouses);
        Ok((!any_enabled).then(|| Advisory::warning(STORAGE_LOCATIONS_ADVISORY)))
    }

    // ---- helpers shared by create and write ----

    /// Name and short name must both be unique inside a company.
    pub(super) fn ensure_unique(
        &self,
        tenant_id: TenantId,
        company_id: CompanyId,
        name: &str,
        code: &str,
        except: Option<WarehouseId>,
    ) -> Result<(), ProvisioningError> {
        let filter = WarehouseFilter {
            company_id: Some(company_id),
            ..Default::default()
        };
        let siblings: Vec<_> = self
            .catalog
            .warehouses
            .search(tenant_id, &filter)
            .into_iter()
            .filter(|w| Some(w.warehouse_id) != except)
            .collect();

        if siblings.iter().any(|w| w.name == name) {
            return Err(ProvisioningError::Constraint(NAME_NOT_UNIQUE.to_string()));
        }
        if siblings.iter().any(|w| w.code == code) {
            return Err(ProvisioningError::Constraint(CODE_NOT_UNIQUE.to_string()));
        }
        Ok(())
    }

    pub(super) fn scoped_partner(
        &self,
        tenant_id: TenantId,
        company_id: CompanyId,
        partner_id: PartnerId,
    ) -> Result<CompanyScoped<PartnerId>, ProvisioningError> {
        let partner = self.partner(tenant_id, partner_id)?;
        let scoped = CompanyScoped::new(partner_id, partner.company_id);
        ensure_company(company_id, &scoped, "Address")?;
        Ok(scoped)
    }

    pub(super) fn scoped_suppliers(
        &self,
        tenant_id: TenantId,
        company_id: CompanyId,
        warehouse_ids: &[WarehouseId],
    ) -> Result<Vec<CompanyScoped<WarehouseId>>, ProvisioningError> {
        let mut out: Vec<CompanyScoped<WarehouseId>> = Vec::with_capacity(warehouse_ids.len());
        for id in warehouse_ids {
            if out.iter().any(|s| s.id == *id) {
                continue;
            }
            let supplier = self.get_warehouse(tenant_id, *id)?;
            let scoped = CompanyScoped::new(*id, Some(supplier.company_id));
            ensure_company(company_id, &scoped, "Resupply warehouse")?;
            out.push(scoped);
        }
        Ok(out)
    }
}
