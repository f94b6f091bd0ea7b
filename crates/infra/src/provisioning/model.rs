//! Inputs and outputs of the warehouse service.

use serde::Serialize;

use depot_core::{CompanyId, TenantId};
use depot_parties::{ContactInfo, PartnerId};
use depot_stock::{DeliverySteps, ReceptionSteps, SequenceId, WarehouseId};

use crate::projections::WarehouseReadModel;

/// Advisory shown when the first warehouse switches storage locations on.
pub const STORAGE_LOCATIONS_ADVISORY: &str =
    "Creating a new warehouse will automatically activate the Storage Locations setting";

/// Who is asking: the tenant and, optionally, the user's current company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub company_id: Option<CompanyId>,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId, company_id: Option<CompanyId>) -> Self {
        Self {
            tenant_id,
            company_id,
        }
    }
}

/// Requested values for a new warehouse. Unset fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewWarehouse {
    pub name: Option<String>,
    pub code: String,
    pub company_id: Option<CompanyId>,
    pub partner_id: Option<PartnerId>,
    pub reception_steps: Option<ReceptionSteps>,
    pub delivery_steps: Option<DeliverySteps>,
    pub sequence: Option<u32>,
    pub resupply_wh_ids: Vec<WarehouseId>,
}

/// Changes to an existing warehouse. `None` leaves a field untouched;
/// `partner_id: Some(None)` clears the address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarehouseChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub sequence: Option<u32>,
    pub partner_id: Option<Option<PartnerId>>,
    pub reception_steps: Option<ReceptionSteps>,
    pub delivery_steps: Option<DeliverySteps>,
    pub resupply_wh_ids: Option<Vec<WarehouseId>>,
    pub active: Option<bool>,
}

/// Non-blocking warning returned next to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub title: String,
    pub message: String,
}

impl Advisory {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            title: "Warning".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    pub warehouse: WarehouseReadModel,
    pub advisories: Vec<Advisory>,
}

/// Values a new-warehouse form starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseDefaults {
    pub name: Option<String>,
    pub company_id: Option<CompanyId>,
    pub partner_id: Option<PartnerId>,
    pub reception_steps: ReceptionSteps,
    pub delivery_steps: DeliverySteps,
    pub sequence: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCompany {
    pub name: String,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPartner {
    pub name: String,
    pub contact: ContactInfo,
    pub company_id: Option<CompanyId>,
}

/// A number taken from a sequence, already rendered ("WH/IN/00001").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedNumber {
    pub sequence_id: SequenceId,
    pub number: u64,
    pub name: String,
}
