//! Warehouse provisioning: turns one warehouse request into the locations,
//! numbering sequences, operation types and routes it needs, and keeps them
//! consistent as the warehouse changes.

mod create;
mod error;
mod model;
pub mod platform;
mod records;
mod service;
mod write;

pub use error::ProvisioningError;
pub use model::{
    Advisory, NewCompany, NewPartner, NewWarehouse, Provisioned, ReservedNumber,
    STORAGE_LOCATIONS_ADVISORY, TenantContext, WarehouseChanges, WarehouseDefaults,
};
pub use platform::Platform;
pub use service::WarehouseService;
