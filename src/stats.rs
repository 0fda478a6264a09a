//! Statistics for identified-owned pools.

use crate::{config::DuplicatePolicy, type_tag::TypeTag};

/// Snapshot of a pool's current state.
///
/// Returned by [`IdentifiedOwnedPool::stats()`](crate::IdentifiedOwnedPool::stats).
///
/// # Example
///
/// ```rust,ignore
/// let stats = textdraws.stats();
/// log::info!("{}: {} live, {} free slots", stats.type_tag, stats.len, stats.free_slots);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Pool name from the config, or the element type name.
    pub type_tag: TypeTag,

    /// Tag of the type new instances are constructed as.
    pub registered_type: Option<TypeTag>,

    /// Live entries.
    pub len: usize,

    /// Slots allocated, live or free.
    pub capacity: usize,

    /// Slots waiting to be reused.
    pub free_slots: usize,

    pub duplicate_policy: DuplicatePolicy,
}
