//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// value objects with the same values are the same value. To "modify" one,
/// build a new one. Contact details, pricing metadata and replenishment
/// policies are value objects; a product is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
