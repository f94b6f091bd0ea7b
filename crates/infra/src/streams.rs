//! Aggregate type tags stored with every event.
//!
//! Projections filter envelopes on these, so a tag must never change once
//! events were written under it.

pub const LOCATION: &str = "stock.location";
pub const PICKING_TYPE: &str = "stock.picking_type";
pub const SEQUENCE: &str = "stock.sequence";
pub const ROUTE: &str = "stock.route";
pub const WAREHOUSE: &str = "stock.warehouse";
pub const SETTINGS: &str = "stock.settings";
pub const PARTNER: &str = "parties.partner";
pub const COMPANY: &str = "parties.company";
