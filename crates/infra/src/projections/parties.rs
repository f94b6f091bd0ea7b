use serde::Serialize;
use serde_json::Value as JsonValue;

use depot_core::{CompanyId, TenantId};
use depot_events::EventEnvelope;
use depot_parties::{CompanyEvent, PartnerEvent, PartnerId, PartnerWarehouse};

use super::{Projection, ProjectionError, StreamCursors, decode, ensure_stream};
use crate::read_model::TenantStore;
use crate::streams;

/// Partner directory entry (addresses, warehouse stock properties).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerReadModel {
    pub partner_id: PartnerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company_id: Option<CompanyId>,
    pub warehouse: Option<PartnerWarehouse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyReadModel {
    pub company_id: CompanyId,
    pub name: String,
    pub partner_id: Option<PartnerId>,
}

/// Directory of companies and partners.
///
/// Consumes both `parties.company` and `parties.partner` envelopes; anything
/// else on the bus is ignored.
#[derive(Debug)]
pub struct PartiesProjection<P, C>
where
    P: TenantStore<PartnerId, PartnerReadModel>,
    C: TenantStore<CompanyId, CompanyReadModel>,
{
    partners: P,
    companies: C,
    cursors: StreamCursors,
}

impl<P, C> PartiesProjection<P, C>
where
    P: TenantStore<PartnerId, PartnerReadModel>,
    C: TenantStore<CompanyId, CompanyReadModel>,
{
    pub fn new(partners: P, companies: C) -> Self {
        Self {
            partners,
            companies,
            cursors: StreamCursors::new(),
        }
    }

    pub fn partner(&self, tenant_id: TenantId, partner_id: &PartnerId) -> Option<PartnerReadModel> {
        self.partners.get(tenant_id, partner_id)
    }

    pub fn partners(&self, tenant_id: TenantId) -> Vec<PartnerReadModel> {
        let mut out = self.partners.list(tenant_id);
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Case-insensitive name search.
    pub fn search_partners(&self, tenant_id: TenantId, query: &str) -> Vec<PartnerReadModel> {
        let q = query.to_lowercase();
        self.partners(tenant_id)
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&q))
            .collect()
    }

    pub fn company(&self, tenant_id: TenantId, company_id: &CompanyId) -> Option<CompanyReadModel> {
        self.companies.get(tenant_id, company_id)
    }

    pub fn companies(&self, tenant_id: TenantId) -> Vec<CompanyReadModel> {
        let mut out = self.companies.list(tenant_id);
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    fn apply_partner(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        match decode::<PartnerEvent>(envelope)? {
            PartnerEvent::PartnerRegistered(e) => {
                ensure_stream(envelope, e.tenant_id, e.partner_id.0)?;
                self.partners.upsert(
                    e.tenant_id,
                    e.partner_id,
                    PartnerReadModel {
                        partner_id: e.partner_id,
                        name: e.name,
                        email: e.contact.email,
                        phone: e.contact.phone,
                        address: e.contact.address,
                        company_id: e.company_id,
                        warehouse: None,
                    },
                );
            }
            PartnerEvent::PartnerUpdated(e) => {
                ensure_stream(envelope, e.tenant_id, e.partner_id.0)?;
                self.partners.modify(e.tenant_id, &e.partner_id, &mut |rm| {
                    rm.name = e.name.clone();
                    rm.email = e.contact.email.clone();
                    rm.phone = e.contact.phone.clone();
                    rm.address = e.contact.address.clone();
                });
            }
            PartnerEvent::WarehouseAssigned(e) => {
                ensure_stream(envelope, e.tenant_id, e.partner_id.0)?;
                self.partners.modify(e.tenant_id, &e.partner_id, &mut |rm| {
                    rm.warehouse = Some(e.warehouse.clone());
                });
            }
        }
        Ok(())
    }

    fn apply_company(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        match decode::<CompanyEvent>(envelope)? {
            CompanyEvent::CompanyRegistered(e) => {
                ensure_stream(envelope, e.tenant_id, e.company_id.into())?;
                self.companies.upsert(
                    e.tenant_id,
                    e.company_id,
                    CompanyReadModel {
                        company_id: e.company_id,
                        name: e.name,
                        partner_id: e.partner_id,
                    },
                );
            }
            CompanyEvent::CompanyRenamed(e) => {
                ensure_stream(envelope, e.tenant_id, e.company_id.into())?;
                self.companies.modify(e.tenant_id, &e.company_id, &mut |rm| {
                    rm.name = e.name.clone();
                });
            }
        }
        Ok(())
    }
}

impl<P, C> Projection for PartiesProjection<P, C>
where
    P: TenantStore<PartnerId, PartnerReadModel>,
    C: TenantStore<CompanyId, CompanyReadModel>,
{
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let is_partner = envelope.aggregate_type() == streams::PARTNER;
        let is_company = envelope.aggregate_type() == streams::COMPANY;
        if !(is_partner || is_company) || !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        if is_partner {
            self.apply_partner(envelope)?;
        } else {
            self.apply_company(envelope)?;
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        self.partners.clear_tenant(tenant_id);
        self.companies.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use depot_core::AggregateId;
    use depot_events::Event;
    use depot_parties::{ContactInfo, PartnerRegistered, WarehouseAssigned};
    use uuid::Uuid;

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    fn envelope(event: &PartnerEvent, aggregate: AggregateId, seq: u64, tenant_id: TenantId) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            tenant_id,
            aggregate,
            streams::PARTNER,
            seq,
            event.event_type(),
            serde_json::to_value(event).unwrap(),
        )
    }

    #[test]
    fn partner_keeps_its_warehouse_assignment() {
        let projection = PartiesProjection::new(InMemoryTenantStore::new(), InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let partner_id = PartnerId::new(AggregateId::new());

        let registered = PartnerEvent::PartnerRegistered(PartnerRegistered {
            tenant_id,
            partner_id,
            name: "YourCompany".to_string(),
            contact: ContactInfo::default(),
            company_id: None,
            occurred_at: Utc::now(),
        });
        let warehouse = PartnerWarehouse {
            warehouse_id: AggregateId::new(),
            property_stock_customer: AggregateId::new(),
            property_stock_supplier: AggregateId::new(),
        };
        let assigned = PartnerEvent::WarehouseAssigned(WarehouseAssigned {
            tenant_id,
            partner_id,
            warehouse: warehouse.clone(),
            occurred_at: Utc::now(),
        });

        projection.apply_envelope(&envelope(&registered, partner_id.0, 1, tenant_id)).unwrap();
        projection.apply_envelope(&envelope(&assigned, partner_id.0, 2, tenant_id)).unwrap();

        let rm = projection.partner(tenant_id, &partner_id).unwrap();
        assert_eq!(rm.warehouse, Some(warehouse));
        assert_eq!(projection.search_partners(tenant_id, "yourc").len(), 1);
        assert!(projection.partners(TenantId::new()).is_empty());
    }
}
