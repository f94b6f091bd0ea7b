//! Infrastructure layer: event store, command pipeline, read models and the
//! warehouse provisioning service built on them.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod provisioning;
pub mod read_model;
pub mod streams;
pub mod unit_of_work;

#[cfg(test)]
mod integration_tests;
