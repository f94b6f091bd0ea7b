use depot_core::AggregateId;

/// A command targets exactly one aggregate stream.
///
/// Commands are intent ("create warehouse WH"); the aggregate turns accepted
/// commands into events. A multi-record workflow is a sequence of commands,
/// one per target stream, committed together by the infrastructure layer.
///
/// Tenant isolation is carried by the envelopes, not by the command.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
