//! Capabilities a pooled entity exposes to its pool.

use std::sync::Arc;

use crate::error::ConstructError;

/// Numeric identifier distinguishing entities of the same owner.
pub type Id = i32;

/// Entity carrying a numeric identifier.
pub trait Identified {
    fn id(&self) -> Id;
}

/// Entity owned by an external actor, usually a connected player.
pub trait Owned {
    type Owner: PartialEq + Clone + std::fmt::Debug + Send + Sync + 'static;

    fn owner(&self) -> &Self::Owner;
}

/// Anything an [`IdentifiedOwnedPool`](crate::IdentifiedOwnedPool) can hold.
pub trait Pooled: Identified + Owned + Send + Sync + 'static {
    /// Whether this entity answers to `(owner, id)`.
    #[inline]
    fn is(&self, owner: &Self::Owner, id: Id) -> bool {
        self.id() == id && self.owner() == owner
    }
}

impl<T: ?Sized + Identified + Owned + Send + Sync + 'static> Pooled for T {}

/// Constructor taking the `(owner, id)` pair an entity is created with.
///
/// Registering a type with a pool records this constructor; the pool calls
/// it whenever [`add`](crate::IdentifiedOwnedPool::add) needs a new instance.
pub trait Construct<O>: Sized {
    fn construct(owner: O, id: Id) -> Result<Self, ConstructError>;
}

/// Converts a shared concrete instance into the pool's element type.
///
/// Implemented for every sized type onto itself. Pools of trait objects
/// need one impl per concrete type, usually generated with
/// `#[upcast(dyn Trait)]` on `#[derive(Pooled)]`.
pub trait Upcast<T: ?Sized> {
    fn upcast(self: Arc<Self>) -> Arc<T>;
}

impl<T> Upcast<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}
