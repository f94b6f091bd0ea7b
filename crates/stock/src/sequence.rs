use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, TenantId};
use depot_events::{Command, Event};

/// Numbering sequence identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub AggregateId);

impl SequenceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<SequenceId> for AggregateId {
    fn from(value: SequenceId) -> Self {
        value.0
    }
}

/// Zero padding applied to warehouse operation numbers.
pub const DEFAULT_PADDING: u8 = 5;

/// Aggregate root: Sequence (document numbering, e.g. `WH/IN/00001`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: SequenceId,
    tenant_id: Option<TenantId>,
    name: String,
    prefix: String,
    padding: u8,
    next_number: u64,
    company_id: Option<CompanyId>,
    version: u64,
    created: bool,
}

impl Sequence {
    pub fn empty(id: SequenceId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            prefix: String::new(),
            padding: DEFAULT_PADDING,
            next_number: 1,
            company_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SequenceId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn padding(&self) -> u8 {
        self.padding
    }

    pub fn next_number(&self) -> u64 {
        self.next_number
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Render `number` with this sequence's prefix and padding.
    pub fn format(&self, number: u64) -> String {
        format_number(&self.prefix, self.padding, number)
    }
}

pub fn format_number(prefix: &str, padding: u8, number: u64) -> String {
    format!("{prefix}{number:0width$}", width = usize::from(padding))
}

impl AggregateRoot for Sequence {
    type Id = SequenceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSequence {
    pub tenant_id: TenantId,
    pub sequence_id: SequenceId,
    pub name: String,
    pub prefix: String,
    pub padding: u8,
    pub company_id: Option<CompanyId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSequence {
    pub tenant_id: TenantId,
    pub sequence_id: SequenceId,
    pub name: String,
    pub prefix: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveNumber {
    pub tenant_id: TenantId,
    pub sequence_id: SequenceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceCommand {
    CreateSequence(CreateSequence),
    UpdateSequence(UpdateSequence),
    ReserveNumber(ReserveNumber),
}

impl Command for SequenceCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            SequenceCommand::CreateSequence(c) => c.sequence_id.0,
            SequenceCommand::UpdateSequence(c) => c.sequence_id.0,
            SequenceCommand::ReserveNumber(c) => c.sequence_id.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCreated {
    pub tenant_id: TenantId,
    pub sequence_id: SequenceId,
    pub name: String,
    pub prefix: String,
    pub padding: u8,
    pub company_id: Option<CompanyId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceUpdated {
    pub tenant_id: TenantId,
    pub sequence_id: SequenceId,
    pub name: String,
    pub prefix: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberReserved {
    pub tenant_id: TenantId,
    pub sequence_id: SequenceId,
    pub number: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceEvent {
    SequenceCreated(SequenceCreated),
    SequenceUpdated(SequenceUpdated),
    NumberReserved(NumberReserved),
}

impl Event for SequenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SequenceEvent::SequenceCreated(_) => "stock.sequence.created",
            SequenceEvent::SequenceUpdated(_) => "stock.sequence.updated",
            SequenceEvent::NumberReserved(_) => "stock.sequence.number_reserved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SequenceEvent::SequenceCreated(e) => e.occurred_at,
            SequenceEvent::SequenceUpdated(e) => e.occurred_at,
            SequenceEvent::NumberReserved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sequence {
    type Command = SequenceCommand;
    type Event = SequenceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SequenceEvent::SequenceCreated(e) => {
                self.id = e.sequence_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.prefix = e.prefix.clone();
                self.padding = e.padding;
                self.company_id = e.company_id;
                self.next_number = 1;
                self.created = true;
            }
            SequenceEvent::SequenceUpdated(e) => {
                self.name = e.name.clone();
                self.prefix = e.prefix.clone();
            }
            SequenceEvent::NumberReserved(e) => {
                self.next_number = e.number + 1;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SequenceCommand::CreateSequence(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("sequence already exists"));
                }
                if cmd.name.trim().is_empty() {
                    return Err(DomainError::validation("sequence name cannot be empty"));
                }
                Ok(vec![SequenceEvent::SequenceCreated(SequenceCreated {
                    tenant_id: cmd.tenant_id,
                    sequence_id: cmd.sequence_id,
                    name: cmd.name.clone(),
                    prefix: cmd.prefix.clone(),
                    padding: cmd.padding,
                    company_id: cmd.company_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            SequenceCommand::UpdateSequence(cmd) => {
                self.ensure_existing(cmd.tenant_id)?;
                if cmd.name == self.name && cmd.prefix == self.prefix {
                    return Ok(vec![]);
                }
                Ok(vec![SequenceEvent::SequenceUpdated(SequenceUpdated {
                    tenant_id: cmd.tenant_id,
                    sequence_id: cmd.sequence_id,
                    name: cmd.name.clone(),
                    prefix: cmd.prefix.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            SequenceCommand::ReserveNumber(cmd) => {
                self.ensure_existing(cmd.tenant_id)?;
                Ok(vec![SequenceEvent::NumberReserved(NumberReserved {
                    tenant_id: cmd.tenant_id,
                    sequence_id: cmd.sequence_id,
                    number: self.next_number,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Sequence {
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

#[cfg(test)]
mod tests {
    use super::*;
    use depot_events::execute;

    fn created(tenant_id: TenantId) -> Sequence {
        let sequence_id = SequenceId::new(AggregateId::new());
        let mut seq = Sequence::empty(sequence_id);
        execute(
            &mut seq,
            &SequenceCommand::CreateSequence(CreateSequence {
                tenant_id,
                sequence_id,
                name: "WH Sequence Receipts".to_string(),
                prefix: "WH/IN/".to_string(),
                padding: DEFAULT_PADDING,
                company_id: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        seq
    }

    #[test]
    fn format_pads_numbers() {
        assert_eq!(format_number("WH/IN/", 5, 1), "WH/IN/00001");
        assert_eq!(format_number("WH/IN/", 5, 123456), "WH/IN/123456");
    }

    #[test]
    fn reserve_hands_out_consecutive_numbers() {
        let tenant_id = TenantId::new();
        let mut seq = created(tenant_id);
        let reserve = SequenceCommand::ReserveNumber(ReserveNumber {
            tenant_id,
            sequence_id: seq.id_typed(),
            occurred_at: Utc::now(),
        });

        let first = execute(&mut seq, &reserve).unwrap();
        let second = execute(&mut seq, &reserve).unwrap();
        match (&first[0], &second[0]) {
            (SequenceEvent::NumberReserved(a), SequenceEvent::NumberReserved(b)) => {
                assert_eq!(a.number, 1);
                assert_eq!(b.number, 2);
            }
            _ => panic!("Expected NumberReserved events"),
        }
        assert_eq!(seq.format(seq.next_number()), "WH/IN/00003");
    }

    #[test]
    fn unchanged_update_emits_nothing() {
        let tenant_id = TenantId::new();
        let seq = created(tenant_id);
        let events = seq
            .handle(&SequenceCommand::UpdateSequence(UpdateSequence {
                tenant_id,
                sequence_id: seq.id_typed(),
                name: seq.name().to_string(),
                prefix: seq.prefix().to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn reserve_on_other_tenant_is_rejected() {
        let seq = created(TenantId::new());
        let err = seq
            .handle(&SequenceCommand::ReserveNumber(ReserveNumber {
                tenant_id: TenantId::new(),
                sequence_id: seq.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
