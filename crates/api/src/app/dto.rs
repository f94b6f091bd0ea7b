use axum::http::StatusCode;
use serde::{Deserialize, Deserializer};

use depot_core::{AggregateId, CompanyId};
use depot_infra::projections::{WarehouseFilter, WarehouseReadModel};
use depot_infra::provisioning::{NewWarehouse, WarehouseChanges};
use depot_parties::{ContactInfo, PartnerId};
use depot_stock::{DeliverySteps, ReceptionSteps, WarehouseId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterCompanyRequest {
    pub name: String,
    pub contact: Option<ContactInfo>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPartnerRequest {
    pub name: String,
    pub contact: Option<ContactInfo>,
    pub company_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    pub name: Option<String>,
    pub code: String,
    pub company_id: Option<String>,
    pub partner_id: Option<String>,
    pub reception_steps: Option<ReceptionSteps>,
    pub delivery_steps: Option<DeliverySteps>,
    pub sequence: Option<u32>,
    #[serde(default)]
    pub resupply_wh_ids: Vec<String>,
}

/// `"partner_id": null` clears the address; omitting it leaves it as is.
#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub sequence: Option<u32>,
    #[serde(default, deserialize_with = "double_option")]
    pub partner_id: Option<Option<String>>,
    pub reception_steps: Option<ReceptionSteps>,
    pub delivery_steps: Option<DeliverySteps>,
    pub resupply_wh_ids: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchWarehousesQuery {
    pub company_id: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchPartnersQuery {
    pub q: Option<String>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_aggregate_id(raw: &str, what: &str) -> Result<AggregateId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
    })
}

pub fn parse_company_id(raw: &str) -> Result<CompanyId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid company id")
    })
}

pub fn parse_warehouse_id(raw: &str) -> Result<WarehouseId, axum::response::Response> {
    parse_aggregate_id(raw, "warehouse").map(WarehouseId::new)
}

pub fn parse_partner_id(raw: &str) -> Result<PartnerId, axum::response::Response> {
    parse_aggregate_id(raw, "partner").map(PartnerId::new)
}

fn parse_warehouse_ids(raw: &[String]) -> Result<Vec<WarehouseId>, axum::response::Response> {
    raw.iter().map(|id| parse_warehouse_id(id)).collect()
}

// -------------------------
// Request → service input
// -------------------------

impl CreateWarehouseRequest {
    pub fn into_input(self) -> Result<NewWarehouse, axum::response::Response> {
        Ok(NewWarehouse {
            name: self.name,
            code: self.code,
            company_id: self.company_id.as_deref().map(parse_company_id).transpose()?,
            partner_id: self.partner_id.as_deref().map(parse_partner_id).transpose()?,
            reception_steps: self.reception_steps,
            delivery_steps: self.delivery_steps,
            sequence: self.sequence,
            resupply_wh_ids: parse_warehouse_ids(&self.resupply_wh_ids)?,
        })
    }
}

impl UpdateWarehouseRequest {
    pub fn into_changes(self) -> Result<WarehouseChanges, axum::response::Response> {
        let partner_id = match self.partner_id {
            Some(Some(raw)) => Some(Some(parse_partner_id(&raw)?)),
            Some(None) => Some(None),
            None => None,
        };
        Ok(WarehouseChanges {
            name: self.name,
            code: self.code,
            sequence: self.sequence,
            partner_id,
            reception_steps: self.reception_steps,
            delivery_steps: self.delivery_steps,
            resupply_wh_ids: self
                .resupply_wh_ids
                .as_deref()
                .map(parse_warehouse_ids)
                .transpose()?,
            active: self.active,
        })
    }
}

impl SearchWarehousesQuery {
    pub fn into_filter(self) -> Result<WarehouseFilter, axum::response::Response> {
        Ok(WarehouseFilter {
            company_id: self.company_id.as_deref().map(parse_company_id).transpose()?,
            name: self.name,
            code: self.code,
            active: self.active,
        })
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn warehouse_to_json(rm: WarehouseReadModel) -> serde_json::Value {
    let stock_location_id = rm.stock_location_id();
    serde_json::json!({
        "id": rm.warehouse_id.0.to_string(),
        "name": rm.name,
        "code": rm.code,
        "company_id": rm.company_id,
        "partner_id": rm.partner_id,
        "active": rm.active,
        "sequence": rm.sequence,
        "reception_steps": rm.reception_steps,
        "delivery_steps": rm.delivery_steps,
        "view_location_id": rm.view_location_id,
        "lot_stock_id": stock_location_id,
        "sub_locations": rm.sub_locations,
        "operation_types": rm.operation_types,
        "routes": rm.routes,
        "resupply_wh_ids": rm.resupply_wh_ids,
        "resupply_route_ids": rm.resupply_route_ids,
    })
}
