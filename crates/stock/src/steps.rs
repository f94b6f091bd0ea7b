//! Step configuration: how many moves a receipt or a delivery takes, and
//! which sub-locations and operation types each configuration needs.

use serde::{Deserialize, Serialize};

/// Incoming shipments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceptionSteps {
    /// Receive goods directly in stock.
    #[default]
    OneStep,
    /// Unload in input, then bring to stock.
    TwoSteps,
    /// Unload in input, go through quality control, then stock.
    ThreeSteps,
}

impl ReceptionSteps {
    pub fn label(self) -> &'static str {
        match self {
            ReceptionSteps::OneStep => "Receive in 1 step (stock)",
            ReceptionSteps::TwoSteps => "Receive in 2 steps (input + stock)",
            ReceptionSteps::ThreeSteps => "Receive in 3 steps (input + quality + stock)",
        }
    }

    pub fn step_count(self) -> u8 {
        match self {
            ReceptionSteps::OneStep => 1,
            ReceptionSteps::TwoSteps => 2,
            ReceptionSteps::ThreeSteps => 3,
        }
    }
}

/// Outgoing shipments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySteps {
    /// Deliver goods directly from stock.
    #[default]
    ShipOnly,
    /// Send goods to output, then deliver.
    PickShip,
    /// Pack goods, send them to output, then deliver.
    PickPackShip,
}

impl DeliverySteps {
    pub fn label(self) -> &'static str {
        match self {
            DeliverySteps::ShipOnly => "Deliver in 1 step (ship)",
            DeliverySteps::PickShip => "Deliver in 2 steps (pick + ship)",
            DeliverySteps::PickPackShip => "Deliver in 3 steps (pick + pack + ship)",
        }
    }

    pub fn step_count(self) -> u8 {
        match self {
            DeliverySteps::ShipOnly => 1,
            DeliverySteps::PickShip => 2,
            DeliverySteps::PickPackShip => 3,
        }
    }
}

/// Internal location of a warehouse, parented under its view location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubLocation {
    Stock,
    Input,
    QualityControl,
    Output,
    Packing,
}

impl SubLocation {
    pub const ALL: [SubLocation; 5] = [
        SubLocation::Stock,
        SubLocation::Input,
        SubLocation::QualityControl,
        SubLocation::Output,
        SubLocation::Packing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SubLocation::Stock => "Stock",
            SubLocation::Input => "Input",
            SubLocation::QualityControl => "Quality Control",
            SubLocation::Output => "Output",
            SubLocation::Packing => "Packing Zone",
        }
    }
}

/// Kind of stock operation a warehouse provisions an operation type for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Receipt,
    Delivery,
    Pick,
    Pack,
    Internal,
    Return,
}

/// Direction of an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCode {
    Incoming,
    Outgoing,
    Internal,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Receipt,
        OperationKind::Delivery,
        OperationKind::Pick,
        OperationKind::Pack,
        OperationKind::Internal,
        OperationKind::Return,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Receipt => "Receipts",
            OperationKind::Delivery => "Delivery Orders",
            OperationKind::Pick => "Pick",
            OperationKind::Pack => "Pack",
            OperationKind::Internal => "Internal Transfers",
            OperationKind::Return => "Returns",
        }
    }

    pub fn code(self) -> OperationCode {
        match self {
            OperationKind::Receipt | OperationKind::Return => OperationCode::Incoming,
            OperationKind::Delivery => OperationCode::Outgoing,
            OperationKind::Pick | OperationKind::Pack | OperationKind::Internal => {
                OperationCode::Internal
            }
        }
    }

    /// Short code used in the numbering prefix ("WH/IN/").
    pub fn sequence_code(self) -> &'static str {
        match self {
            OperationKind::Receipt => "IN",
            OperationKind::Delivery => "OUT",
            OperationKind::Pick => "PICK",
            OperationKind::Pack => "PACK",
            OperationKind::Internal => "INT",
            OperationKind::Return => "RET",
        }
    }
}

/// Reception + delivery step selection of one warehouse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepConfig {
    pub reception: ReceptionSteps,
    pub delivery: DeliverySteps,
}

impl StepConfig {
    pub fn new(reception: ReceptionSteps, delivery: DeliverySteps) -> Self {
        Self {
            reception,
            delivery,
        }
    }

    pub fn requires_location(&self, location: SubLocation) -> bool {
        match location {
            SubLocation::Stock => true,
            SubLocation::Input => self.reception != ReceptionSteps::OneStep,
            SubLocation::QualityControl => self.reception == ReceptionSteps::ThreeSteps,
            SubLocation::Output => self.delivery != DeliverySteps::ShipOnly,
            SubLocation::Packing => self.delivery == DeliverySteps::PickPackShip,
        }
    }

    pub fn requires_operation(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Pick => self.delivery != DeliverySteps::ShipOnly,
            OperationKind::Pack => self.delivery == DeliverySteps::PickPackShip,
            OperationKind::Receipt
            | OperationKind::Delivery
            | OperationKind::Internal
            | OperationKind::Return => true,
        }
    }

    pub fn required_sub_locations(&self) -> Vec<SubLocation> {
        SubLocation::ALL
            .into_iter()
            .filter(|l| self.requires_location(*l))
            .collect()
    }

    pub fn required_operation_kinds(&self) -> Vec<OperationKind> {
        OperationKind::ALL
            .into_iter()
            .filter(|k| self.requires_operation(*k))
            .collect()
    }

    /// Cross-docking needs both an input and an output area.
    pub fn crossdock_enabled(&self) -> bool {
        self.reception != ReceptionSteps::OneStep && self.delivery != DeliverySteps::ShipOnly
    }

    /// Where received goods land first.
    pub fn reception_entry(&self) -> SubLocation {
        if self.reception == ReceptionSteps::OneStep {
            SubLocation::Stock
        } else {
            SubLocation::Input
        }
    }

    /// Where delivered goods leave from.
    pub fn delivery_exit(&self) -> SubLocation {
        if self.delivery == DeliverySteps::ShipOnly {
            SubLocation::Stock
        } else {
            SubLocation::Output
        }
    }
}
