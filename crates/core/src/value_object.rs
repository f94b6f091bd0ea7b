//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; a
/// validated warehouse short code is one. To "modify" a value object, build
/// a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
