//! Parties domain module (companies and their partner addresses, event-sourced).
//!
//! This crate contains business rules for companies and partners,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod company;
pub mod partner;

pub use company::{
    Company, CompanyCommand, CompanyEvent, CompanyRegistered, CompanyRenamed, RegisterCompany,
    RenameCompany,
};
pub use partner::{
    AssignWarehouse, ContactInfo, Partner, PartnerCommand, PartnerEvent, PartnerId,
    PartnerRegistered, PartnerUpdated, PartnerWarehouse, RegisterPartner, UpdateDetails,
    WarehouseAssigned,
};
