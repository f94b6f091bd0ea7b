//! Routing derivation: which rules a warehouse's routes need for a given
//! step configuration.
//!
//! Everything here is pure. The provisioning workflow gathers a
//! [`WarehouseLayout`] from the records it just created or loaded and turns
//! the derived [`Routing`] chains into [`Rule`] entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use depot_core::{CompanyId, DomainError, DomainResult};

use crate::code::WarehouseCode;
use crate::location::LocationId;
use crate::picking_type::PickingTypeId;
use crate::route::{ProcureMethod, RouteId, Rule, RuleAction, RuleId};
use crate::steps::{DeliverySteps, OperationKind, ReceptionSteps, StepConfig, SubLocation};
use crate::warehouse::WarehouseId;

/// Name of the tenant-wide make-to-order route.
pub const MTO_ROUTE_NAME: &str = "Replenish on Order (MTO)";

/// A location as it appears in rule names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: LocationId,
    pub name: String,
}

impl LocationRef {
    pub fn new(id: LocationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One hop of a route before it becomes a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub from: LocationRef,
    pub to: LocationRef,
    pub picking_type: PickingTypeId,
    pub action: RuleAction,
}

/// What routing derivation needs to know about one warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseLayout {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: WarehouseCode,
    pub company_id: CompanyId,
    pub steps: StepConfig,
    pub sub_locations: BTreeMap<SubLocation, LocationRef>,
    pub vendors: LocationRef,
    pub customers: LocationRef,
    pub operation_types: BTreeMap<OperationKind, PickingTypeId>,
}

impl WarehouseLayout {
    pub fn location(&self, sub: SubLocation) -> DomainResult<&LocationRef> {
        self.sub_locations.get(&sub).ok_or_else(|| {
            DomainError::invariant(format!(
                "warehouse {} has no {} location",
                self.code,
                sub.name()
            ))
        })
    }

    pub fn operation(&self, kind: OperationKind) -> DomainResult<PickingTypeId> {
        self.operation_types.get(&kind).copied().ok_or_else(|| {
            DomainError::invariant(format!(
                "warehouse {} has no {} operation type",
                self.code,
                kind.name()
            ))
        })
    }

    /// Default source and destination of the operation type of `kind`.
    pub fn default_locations(&self, kind: OperationKind) -> DomainResult<(LocationId, LocationId)> {
        let steps = self.steps;
        let pair = match kind {
            OperationKind::Receipt => (
                self.vendors.id,
                self.location(steps.reception_entry())?.id,
            ),
            OperationKind::Delivery => (
                self.location(steps.delivery_exit())?.id,
                self.customers.id,
            ),
            OperationKind::Pick => {
                let dest = if steps.delivery == DeliverySteps::PickPackShip {
                    SubLocation::Packing
                } else {
                    SubLocation::Output
                };
                (
                    self.location(SubLocation::Stock)?.id,
                    self.location(dest)?.id,
                )
            }
            OperationKind::Pack => (
                self.location(SubLocation::Packing)?.id,
                self.location(SubLocation::Output)?.id,
            ),
            OperationKind::Internal => {
                let stock = self.location(SubLocation::Stock)?.id;
                (stock, stock)
            }
            OperationKind::Return => (
                self.customers.id,
                self.location(SubLocation::Stock)?.id,
            ),
        };
        Ok(pair)
    }

    fn hop(
        &self,
        from: &LocationRef,
        to: &LocationRef,
        kind: OperationKind,
        action: RuleAction,
    ) -> DomainResult<Routing> {
        Ok(Routing {
            from: from.clone(),
            to: to.clone(),
            picking_type: self.operation(kind)?,
            action,
        })
    }

    /// Moves from the input area into stock. Empty for one-step receptions.
    pub fn reception_routings(&self) -> DomainResult<Vec<Routing>> {
        match self.steps.reception {
            ReceptionSteps::OneStep => Ok(vec![]),
            ReceptionSteps::TwoSteps => Ok(vec![self.hop(
                self.location(SubLocation::Input)?,
                self.location(SubLocation::Stock)?,
                OperationKind::Internal,
                RuleAction::PullPush,
            )?]),
            ReceptionSteps::ThreeSteps => {
                let qc = self.location(SubLocation::QualityControl)?;
                Ok(vec![
                    self.hop(
                        self.location(SubLocation::Input)?,
                        qc,
                        OperationKind::Internal,
                        RuleAction::PullPush,
                    )?,
                    self.hop(
                        qc,
                        self.location(SubLocation::Stock)?,
                        OperationKind::Internal,
                        RuleAction::PullPush,
                    )?,
                ])
            }
        }
    }

    /// Moves from stock to the customers, through output and packing when configured.
    pub fn delivery_routings(&self) -> DomainResult<Vec<Routing>> {
        let stock = self.location(SubLocation::Stock)?;
        match self.steps.delivery {
            DeliverySteps::ShipOnly => Ok(vec![self.hop(
                stock,
                &self.customers,
                OperationKind::Delivery,
                RuleAction::Pull,
            )?]),
            DeliverySteps::PickShip => {
                let output = self.location(SubLocation::Output)?;
                Ok(vec![
                    self.hop(stock, output, OperationKind::Pick, RuleAction::Pull)?,
                    self.hop(output, &self.customers, OperationKind::Delivery, RuleAction::Pull)?,
                ])
            }
            DeliverySteps::PickPackShip => {
                let packing = self.location(SubLocation::Packing)?;
                let output = self.location(SubLocation::Output)?;
                Ok(vec![
                    self.hop(stock, packing, OperationKind::Pick, RuleAction::Pull)?,
                    self.hop(packing, output, OperationKind::Pack, RuleAction::Pull)?,
                    self.hop(output, &self.customers, OperationKind::Delivery, RuleAction::Pull)?,
                ])
            }
        }
    }

    /// Input straight to output, then out. Empty when cross-docking is off.
    pub fn crossdock_routings(&self) -> DomainResult<Vec<Routing>> {
        if !self.steps.crossdock_enabled() {
            return Ok(vec![]);
        }
        let output = self.location(SubLocation::Output)?;
        Ok(vec![
            self.hop(
                self.location(SubLocation::Input)?,
                output,
                OperationKind::Internal,
                RuleAction::Pull,
            )?,
            self.hop(output, &self.customers, OperationKind::Delivery, RuleAction::Pull)?,
        ])
    }

    /// Turn a routing chain into rules of `route_id`.
    ///
    /// The first hop takes goods from stock, every later hop waits for the
    /// previous one.
    pub fn rules(&self, route_id: RouteId, routings: &[Routing], active: bool) -> Vec<Rule> {
        routings
            .iter()
            .enumerate()
            .map(|(position, routing)| Rule {
                id: RuleId::derive(route_id, &hop_key(routing)),
                name: rule_name(self.code.as_str(), &routing.from, &routing.to),
                action: routing.action,
                location_src_id: routing.from.id,
                location_dest_id: routing.to.id,
                picking_type_id: routing.picking_type,
                procure_method: if position == 0 {
                    ProcureMethod::MakeToStock
                } else {
                    ProcureMethod::MakeToOrder
                },
                warehouse_id: Some(self.warehouse_id),
                propagate_warehouse_id: None,
                company_id: Some(self.company_id),
                active,
                sequence: position as u32,
            })
            .collect()
    }

    /// This warehouse's rule in the tenant-wide make-to-order route.
    ///
    /// Mirrors the first delivery hop but always procures on order.
    pub fn mto_rule(&self, mto_route_id: RouteId, active: bool) -> DomainResult<Rule> {
        let first = self
            .delivery_routings()?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::invariant("delivery routing cannot be empty"))?;

        Ok(Rule {
            id: mto_rule_id(mto_route_id, self.warehouse_id),
            name: format!("{} (MTO)", rule_name(self.code.as_str(), &first.from, &first.to)),
            action: RuleAction::Pull,
            location_src_id: first.from.id,
            location_dest_id: first.to.id,
            picking_type_id: first.picking_type,
            procure_method: ProcureMethod::MakeToOrder,
            warehouse_id: Some(self.warehouse_id),
            propagate_warehouse_id: None,
            company_id: Some(self.company_id),
            active,
            sequence: 5,
        })
    }

    pub fn reception_route_name(&self) -> String {
        format!("{}: {}", self.name, self.steps.reception.label())
    }

    pub fn delivery_route_name(&self) -> String {
        format!("{}: {}", self.name, self.steps.delivery.label())
    }

    pub fn crossdock_route_name(&self) -> String {
        format!("{}: Cross-Dock", self.name)
    }
}

/// Id of `warehouse`'s rule inside the make-to-order route.
pub fn mto_rule_id(mto_route_id: RouteId, warehouse: WarehouseId) -> RuleId {
    RuleId::derive(mto_route_id, &format!("mto:{}", warehouse.0))
}

/// Name of the route moving goods from `supplier` into `supplied`.
pub fn resupply_route_name(supplied: &str, supplier: &str) -> String {
    format!("{supplied}: Supply Product from {supplier}")
}

/// Rules of a resupply route: the supplier ships its stock into the
/// company transit location, the supplied warehouse receives from there.
pub fn resupply_rules(
    route_id: RouteId,
    supplied: &WarehouseLayout,
    supplier: &WarehouseLayout,
    transit: &LocationRef,
) -> DomainResult<Vec<Rule>> {
    let supplier_stock = supplier.location(SubLocation::Stock)?;
    let supplied_entry = supplied.location(supplied.steps.reception_entry())?;

    Ok(vec![
        Rule {
            id: RuleId::derive(route_id, "ship"),
            name: rule_name(supplier.code.as_str(), supplier_stock, transit),
            action: RuleAction::Pull,
            location_src_id: supplier_stock.id,
            location_dest_id: transit.id,
            picking_type_id: supplier.operation(OperationKind::Delivery)?,
            procure_method: ProcureMethod::MakeToStock,
            warehouse_id: Some(supplier.warehouse_id),
            propagate_warehouse_id: Some(supplied.warehouse_id),
            company_id: Some(supplied.company_id),
            active: true,
            sequence: 0,
        },
        Rule {
            id: RuleId::derive(route_id, "receive"),
            name: rule_name(supplied.code.as_str(), transit, supplied_entry),
            action: RuleAction::Pull,
            location_src_id: transit.id,
            location_dest_id: supplied_entry.id,
            picking_type_id: supplied.operation(OperationKind::Receipt)?,
            procure_method: ProcureMethod::MakeToOrder,
            warehouse_id: Some(supplied.warehouse_id),
            propagate_warehouse_id: None,
            company_id: Some(supplied.company_id),
            active: true,
            sequence: 1,
        },
    ])
}

fn rule_name(code: &str, from: &LocationRef, to: &LocationRef) -> String {
    format!("{code}: {} → {}", from.name, to.name)
}

fn hop_key(routing: &Routing) -> String {
    format!("{}>{}", routing.from.id, routing.to.id)
}
