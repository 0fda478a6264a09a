//! Pools of game entities owned by an external actor and addressed by a
//! numeric identifier, e.g. per-player text draws.
//!
//! An [`IdentifiedOwnedPool`] is told which concrete type to build, then
//! answers `find`, `add` and `find_or_create` for `(owner, id)` pairs.

pub mod config;
pub mod entity;
pub mod error;
pub mod identified_owned;
pub mod pool;
pub mod registry;
pub mod stats;
pub mod type_tag;

pub mod derive {
    pub use ownedpool_derive::*;
}

pub use config::{DuplicatePolicy, PoolConfig};
pub use entity::{Construct, Id, Identified, Owned, Pooled, Upcast};
pub use error::{ConstructError, Error, Result};
pub use identified_owned::IdentifiedOwnedPool;
pub use pool::{Key, Pool};
pub use registry::{TypeDescriptor, TypeRegistry};
pub use stats::Stats;
pub use type_tag::{TypeTag, TypeTagInfo, TypeTagged};
