use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, TenantId};
use depot_events::{Command, Event};

use crate::partner::PartnerId;

/// Aggregate root: Company (record ownership boundary inside a tenant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    id: CompanyId,
    tenant_id: Option<TenantId>,
    name: String,
    partner_id: Option<PartnerId>,
    version: u64,
    created: bool,
}

impl Company {
    pub fn empty(id: CompanyId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            partner_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The company's own address.
    pub fn partner_id(&self) -> Option<PartnerId> {
        self.partner_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCompany {
    pub tenant_id: TenantId,
    pub company_id: CompanyId,
    pub name: String,
    pub partner_id: Option<PartnerId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCompany {
    pub tenant_id: TenantId,
    pub company_id: CompanyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyCommand {
    RegisterCompany(RegisterCompany),
    RenameCompany(RenameCompany),
}

impl Command for CompanyCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            CompanyCommand::RegisterCompany(c) => c.company_id.into(),
            CompanyCommand::RenameCompany(c) => c.company_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRegistered {
    pub tenant_id: TenantId,
    pub company_id: CompanyId,
    pub name: String,
    pub partner_id: Option<PartnerId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRenamed {
    pub tenant_id: TenantId,
    pub company_id: CompanyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyEvent {
    CompanyRegistered(CompanyRegistered),
    CompanyRenamed(CompanyRenamed),
}

impl Event for CompanyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompanyEvent::CompanyRegistered(_) => "parties.company.registered",
            CompanyEvent::CompanyRenamed(_) => "parties.company.renamed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CompanyEvent::CompanyRegistered(e) => e.occurred_at,
            CompanyEvent::CompanyRenamed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Company {
    type Command = CompanyCommand;
    type Event = CompanyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CompanyEvent::CompanyRegistered(e) => {
                self.id = e.company_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.partner_id = e.partner_id;
                self.created = true;
            }
            CompanyEvent::CompanyRenamed(e) => {
                self.name = e.name.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CompanyCommand::RegisterCompany(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("company already exists"));
                }
                if cmd.name.trim().is_empty() {
                    return Err(DomainError::validation("company name cannot be empty"));
                }
                Ok(vec![CompanyEvent::CompanyRegistered(CompanyRegistered {
                    tenant_id: cmd.tenant_id,
                    company_id: cmd.company_id,
                    name: cmd.name.trim().to_string(),
                    partner_id: cmd.partner_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            CompanyCommand::RenameCompany(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.tenant_id != Some(cmd.tenant_id) {
                    return Err(DomainError::invariant("tenant mismatch"));
                }
                let name = cmd.name.trim();
                if name.is_empty() {
                    return Err(DomainError::validation("company name cannot be empty"));
                }
                if name == self.name {
                    return Ok(vec![]);
                }
                Ok(vec![CompanyEvent::CompanyRenamed(CompanyRenamed {
                    tenant_id: cmd.tenant_id,
                    company_id: cmd.company_id,
                    name: name.to_string(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
