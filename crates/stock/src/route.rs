use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{
    Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, Entity, TenantId,
};
use depot_events::{Command, Event};

use crate::company::ensure_compatible;
use crate::location::LocationId;
use crate::picking_type::PickingTypeId;
use crate::warehouse::WarehouseId;

/// Route identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub AggregateId);

impl RouteId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RouteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<RouteId> for AggregateId {
    fn from(value: RouteId) -> Self {
        value.0
    }
}

/// Rule identifier, unique inside its route.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub AggregateId);

impl RuleId {
    /// Stable id for the rule of `route` known under `key`, so rebuilding a
    /// route keeps the ids of the rules that survive.
    pub fn derive(route: RouteId, key: &str) -> Self {
        Self(AggregateId::well_known(route.0.as_uuid(), key))
    }
}

/// How a rule is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Pull,
    Push,
    PullPush,
}

/// Where a rule takes goods from when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcureMethod {
    /// Take goods from the source location's stock.
    MakeToStock,
    /// Trigger a procurement on the source location first.
    MakeToOrder,
}

/// A single stock movement step of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub action: RuleAction,
    pub location_src_id: LocationId,
    pub location_dest_id: LocationId,
    pub picking_type_id: PickingTypeId,
    pub procure_method: ProcureMethod,
    pub warehouse_id: Option<WarehouseId>,
    pub propagate_warehouse_id: Option<WarehouseId>,
    pub company_id: Option<CompanyId>,
    pub active: bool,
    pub sequence: u32,
}

impl Entity for Rule {
    type Id = RuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Where a route may be selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFlags {
    pub product_selectable: bool,
    pub product_categ_selectable: bool,
    pub warehouse_selectable: bool,
}

/// Route attributes that warehouse workflows rewrite as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHeader {
    pub name: String,
    pub active: bool,
    pub sequence: u32,
    pub flags: RouteFlags,
    pub warehouse_ids: Vec<WarehouseId>,
    pub supplied_wh_id: Option<WarehouseId>,
    pub supplier_wh_id: Option<WarehouseId>,
}

/// Aggregate root: Route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    id: RouteId,
    tenant_id: Option<TenantId>,
    company_id: Option<CompanyId>,
    header: RouteHeader,
    rules: Vec<Rule>,
    version: u64,
    created: bool,
}

impl Route {
    pub fn empty(id: RouteId) -> Self {
        Self {
            id,
            tenant_id: None,
            company_id: None,
            header: RouteHeader {
                name: String::new(),
                active: true,
                sequence: 0,
                flags: RouteFlags::default(),
                warehouse_ids: vec![],
                supplied_wh_id: None,
                supplier_wh_id: None,
            },
            rules: vec![],
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RouteId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn header(&self) -> &RouteHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn is_active(&self) -> bool {
        self.header.active
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Route {
    type Id = RouteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoute {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub company_id: Option<CompanyId>,
    pub header: RouteHeader,
    pub rules: Vec<Rule>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoute {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub header: RouteHeader,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceRules {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub rules: Vec<Rule>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertRule {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub rule: Rule,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteCommand {
    CreateRoute(CreateRoute),
    UpdateRoute(UpdateRoute),
    ReplaceRules(ReplaceRules),
    UpsertRule(UpsertRule),
}

impl Command for RouteCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            RouteCommand::CreateRoute(c) => c.route_id.0,
            RouteCommand::UpdateRoute(c) => c.route_id.0,
            RouteCommand::ReplaceRules(c) => c.route_id.0,
            RouteCommand::UpsertRule(c) => c.route_id.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCreated {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub company_id: Option<CompanyId>,
    pub header: RouteHeader,
    pub rules: Vec<Rule>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteUpdated {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub header: RouteHeader,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesReplaced {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub rules: Vec<Rule>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUpserted {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub rule: Rule,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteEvent {
    RouteCreated(RouteCreated),
    RouteUpdated(RouteUpdated),
    RulesReplaced(RulesReplaced),
    RuleUpserted(RuleUpserted),
}

impl Event for RouteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RouteEvent::RouteCreated(_) => "stock.route.created",
            RouteEvent::RouteUpdated(_) => "stock.route.updated",
            RouteEvent::RulesReplaced(_) => "stock.route.rules_replaced",
            RouteEvent::RuleUpserted(_) => "stock.route.rule_upserted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RouteEvent::RouteCreated(e) => e.occurred_at,
            RouteEvent::RouteUpdated(e) => e.occurred_at,
            RouteEvent::RulesReplaced(e) => e.occurred_at,
            RouteEvent::RuleUpserted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Route {
    type Command = RouteCommand;
    type Event = RouteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RouteEvent::RouteCreated(e) => {
                self.id = e.route_id;
                self.tenant_id = Some(e.tenant_id);
                self.company_id = e.company_id;
                self.header = e.header.clone();
                self.rules = e.rules.clone();
                self.created = true;
            }
            RouteEvent::RouteUpdated(e) => {
                self.header = e.header.clone();
            }
            RouteEvent::RulesReplaced(e) => {
                self.rules = e.rules.clone();
            }
            RouteEvent::RuleUpserted(e) => {
                match self.rules.iter_mut().find(|r| r.id == e.rule.id) {
                    Some(existing) => *existing = e.rule.clone(),
                    None => self.rules.push(e.rule.clone()),
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RouteCommand::CreateRoute(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("route already exists"));
                }
                validate_header(&cmd.header)?;
                validate_rules(cmd.company_id, &cmd.rules)?;

                Ok(vec![RouteEvent::RouteCreated(RouteCreated {
                    tenant_id: cmd.tenant_id,
                    route_id: cmd.route_id,
                    company_id: cmd.company_id,
                    header: cmd.header.clone(),
                    rules: cmd.rules.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            RouteCommand::UpdateRoute(cmd) => {
                self.ensure_existing(cmd.tenant_id)?;
                validate_header(&cmd.header)?;
                if cmd.header == self.header {
                    return Ok(vec![]);
                }

                Ok(vec![RouteEvent::RouteUpdated(RouteUpdated {
                    tenant_id: cmd.tenant_id,
                    route_id: cmd.route_id,
                    header: cmd.header.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            RouteCommand::ReplaceRules(cmd) => {
                self.ensure_existing(cmd.tenant_id)?;
                validate_rules(self.company_id, &cmd.rules)?;
                if cmd.rules == self.rules {
                    return Ok(vec![]);
                }

                Ok(vec![RouteEvent::RulesReplaced(RulesReplaced {
                    tenant_id: cmd.tenant_id,
                    route_id: cmd.route_id,
                    rules: cmd.rules.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            RouteCommand::UpsertRule(cmd) => {
                self.ensure_existing(cmd.tenant_id)?;
                validate_rule(self.company_id, &cmd.rule)?;
                if self.rule(cmd.rule.id) == Some(&cmd.rule) {
                    return Ok(vec![]);
                }

                Ok(vec![RouteEvent::RuleUpserted(RuleUpserted {
                    tenant_id: cmd.tenant_id,
                    route_id: cmd.route_id,
                    rule: cmd.rule.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Route {
    fn ensure_existing(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }
}

fn validate_header(header: &RouteHeader) -> Result<(), DomainError> {
    if header.name.trim().is_empty() {
        return Err(DomainError::validation("route name cannot be empty"));
    }
    Ok(())
}

fn validate_rule(route_company: Option<CompanyId>, rule: &Rule) -> Result<(), DomainError> {
    if rule.name.trim().is_empty() {
        return Err(DomainError::validation("rule name cannot be empty"));
    }
    if rule.location_src_id == rule.location_dest_id {
        return Err(DomainError::invariant(format!(
            "rule '{}' moves goods onto its own source location",
            rule.name
        )));
    }
    ensure_compatible(route_company, rule.company_id, "Rule")
}

fn validate_rules(route_company: Option<CompanyId>, rules: &[Rule]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for rule in rules {
        validate_rule(route_company, rule)?;
        if !seen.insert(rule.id) {
            return Err(DomainError::invariant("duplicate rule id in route"));
        }
    }
    Ok(())
}
