use thiserror::Error;

use depot_core::DomainError;

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStoreError;
use crate::projections::ProjectionError;

/// Errors surfaced by [`super::WarehouseService`].
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// A uniqueness rule was violated; the message is meant for the end user.
    #[error("{0}")]
    Constraint(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("provisioning lock poisoned")]
    LockPoisoned,
}

impl From<DomainError> for ProvisioningError {
    fn from(value: DomainError) -> Self {
        ProvisioningError::Dispatch(value.into())
    }
}

impl From<EventStoreError> for ProvisioningError {
    fn from(value: EventStoreError) -> Self {
        ProvisioningError::Dispatch(value.into())
    }
}
