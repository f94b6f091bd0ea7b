//! `depot-stock`: warehouse domain with locations, operation types, numbering
//! sequences, routes and the warehouses tying them together.
//!
//! Aggregates are pure; records owned by sibling aggregates are passed into
//! commands as [`CompanyScoped`] references so company consistency is still
//! checked where the decision is made.

pub mod code;
pub mod company;
pub mod location;
pub mod picking_type;
pub mod route;
pub mod routing;
pub mod sequence;
pub mod settings;
pub mod steps;
pub mod warehouse;

pub use code::{MAX_CODE_LEN, WarehouseCode};
pub use company::{CompanyScoped, ensure_company, ensure_compatible};
pub use location::{
    CreateLocation, Location, LocationCommand, LocationEvent, LocationId, LocationUsage,
    ParentLocation, RenameLocation, SetLocationActive,
};
pub use picking_type::{
    ConfigurePickingType, CreatePickingType, PickingType, PickingTypeCommand, PickingTypeEvent,
    PickingTypeId, PickingTypeSettings,
};
pub use route::{
    CreateRoute, ProcureMethod, ReplaceRules, Route, RouteCommand, RouteEvent, RouteFlags,
    RouteHeader, RouteId, Rule, RuleAction, RuleId, UpdateRoute, UpsertRule,
};
pub use routing::{
    LocationRef, MTO_ROUTE_NAME, Routing, WarehouseLayout, mto_rule_id, resupply_route_name,
    resupply_rules,
};
pub use sequence::{
    CreateSequence, DEFAULT_PADDING, ReserveNumber, Sequence, SequenceCommand, SequenceEvent,
    SequenceId, UpdateSequence, format_number,
};
pub use settings::{EnableGroup, FeatureGroup, SettingsCommand, SettingsEvent, StockSettings, settings_id};
pub use steps::{DeliverySteps, OperationCode, OperationKind, ReceptionSteps, StepConfig, SubLocation};
pub use warehouse::{
    AssignOperationTypes, AssignResupply, AssignRoutes, CreateWarehouse, DEFAULT_SEQUENCE,
    SetSubLocations, UpdateWarehouse, Warehouse, WarehouseCommand, WarehouseEvent, WarehouseId,
    WarehouseRoutes,
};
