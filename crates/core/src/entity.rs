//! Entity trait: identity + continuity inside an aggregate.

/// Entity marker + minimal interface.
///
/// Entities live inside an aggregate (e.g. the rules of a route) and are
/// matched by id when the aggregate replaces or upserts them.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
