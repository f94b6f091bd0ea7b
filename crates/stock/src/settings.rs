use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use depot_events::{Command, Event};

/// Stock features a tenant can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    /// "Storage Locations": more than the default stock location per warehouse.
    MultiLocations,
    MultiWarehouses,
}

impl FeatureGroup {
    pub fn label(self) -> &'static str {
        match self {
            FeatureGroup::MultiLocations => "Storage Locations",
            FeatureGroup::MultiWarehouses => "Multi-Warehouses",
        }
    }
}

/// Id of the tenant's settings stream (one per tenant).
pub fn settings_id(tenant_id: TenantId) -> AggregateId {
    AggregateId::well_known(tenant_id.as_uuid(), "stock.settings")
}

/// Aggregate root: StockSettings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSettings {
    id: AggregateId,
    tenant_id: Option<TenantId>,
    groups: BTreeSet<FeatureGroup>,
    version: u64,
}

impl StockSettings {
    pub fn empty(id: AggregateId) -> Self {
        Self {
            id,
            tenant_id: None,
            groups: BTreeSet::new(),
            version: 0,
        }
    }

    pub fn is_enabled(&self, group: FeatureGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn enabled_groups(&self) -> impl Iterator<Item = FeatureGroup> + '_ {
        self.groups.iter().copied()
    }
}

impl AggregateRoot for StockSettings {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableGroup {
    pub tenant_id: TenantId,
    pub group: FeatureGroup,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsCommand {
    EnableGroup(EnableGroup),
}

impl Command for SettingsCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            SettingsCommand::EnableGroup(c) => settings_id(c.tenant_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEnabled {
    pub tenant_id: TenantId,
    pub group: FeatureGroup,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsEvent {
    GroupEnabled(GroupEnabled),
}

impl Event for SettingsEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SettingsEvent::GroupEnabled(_) => "stock.settings.group_enabled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SettingsEvent::GroupEnabled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockSettings {
    type Command = SettingsCommand;
    type Event = SettingsEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SettingsEvent::GroupEnabled(e) => {
                self.tenant_id = Some(e.tenant_id);
                self.groups.insert(e.group);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SettingsCommand::EnableGroup(cmd) => {
                if self.tenant_id.is_some_and(|t| t != cmd.tenant_id) {
                    return Err(DomainError::invariant("tenant mismatch"));
                }
                if self.is_enabled(cmd.group) {
                    return Ok(vec![]);
                }
                Ok(vec![SettingsEvent::GroupEnabled(GroupEnabled {
                    tenant_id: cmd.tenant_id,
                    group: cmd.group,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
