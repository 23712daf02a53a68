//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Entities inside an aggregate (e.g. a purchase-order line) are identified
/// by a local id that stays stable while their attributes change.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
