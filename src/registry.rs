//! Constructors looked up by type tag.
//!
//! A game mode registers every concrete entity type it knows about once,
//! then configures pools by name:
//!
//! ```rust,ignore
//! let registry = TypeRegistry::new();
//! registry.register::<PlayerLabel, dyn Hud>()?;
//!
//! let pool = IdentifiedOwnedPool::<dyn Hud>::new();
//! pool.register_tag(&registry, "hud::PlayerLabel")?;
//! ```

use std::{any::Any, sync::Arc};

use dashmap::DashMap;

use crate::{
    entity::{Construct, Id, Upcast},
    error::{ConstructError, Error, Result},
    type_tag::{TypeTag, TypeTagged},
};

pub(crate) type ErasedInstance = Box<dyn Any + Send + Sync>;

type ErasedConstructor<O> =
    dyn Fn(O, Id) -> std::result::Result<ErasedInstance, ConstructError> + Send + Sync;

/// Type-erased constructor together with the handle type it produces.
pub struct TypeDescriptor<O> {
    produces: TypeTag,
    ctor: Arc<ErasedConstructor<O>>,
}

impl<O> Clone for TypeDescriptor<O> {
    fn clone(&self) -> Self {
        Self {
            produces: self.produces.clone(),
            ctor: self.ctor.clone(),
        }
    }
}

impl<O> TypeDescriptor<O> {
    /// Tag of the value the constructor yields, an `Arc<T>` for some `T`.
    #[inline]
    pub fn produces(&self) -> &TypeTag {
        &self.produces
    }

    #[inline]
    pub fn construct(
        &self,
        owner: O,
        id: Id,
    ) -> std::result::Result<ErasedInstance, ConstructError> {
        (self.ctor)(owner, id)
    }
}

/// Name-keyed constructors for entities owned by `O`.
pub struct TypeRegistry<O> {
    types: DashMap<TypeTag, TypeDescriptor<O>>,
}

impl<O> Default for TypeRegistry<O> {
    fn default() -> Self {
        Self {
            types: DashMap::new(),
        }
    }
}

impl<O: 'static> TypeRegistry<O> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers `C` under its own tag, constructing handles to `T`.
    pub fn register<C, T>(&self) -> Result<()>
    where
        C: Construct<O> + Upcast<T> + TypeTagged + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_with(C::TYPE_TAG(), |owner, id| {
            C::construct(owner, id).map(|c| <C as Upcast<T>>::upcast(Arc::new(c)))
        })
    }

    pub fn register_with<T, F>(&self, tag: impl Into<TypeTag>, f: F) -> Result<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(O, Id) -> std::result::Result<Arc<T>, ConstructError> + Send + Sync + 'static,
    {
        let raw = tag.into();
        let tag = raw
            .canonical()
            .ok_or_else(|| Error::InvalidTypeTag(raw.to_string()))?;

        log::debug!("registry: {} -> {}", tag, std::any::type_name::<Arc<T>>());

        let descriptor = TypeDescriptor {
            produces: TypeTag::of::<Arc<T>>(),
            ctor: Arc::new(move |owner: O, id: Id| {
                f(owner, id).map(|instance| Box::new(instance) as ErasedInstance)
            }),
        };

        if self.types.insert(tag.clone(), descriptor).is_some() {
            log::debug!("registry: replaced previous constructor for {}", tag);
        }

        Ok(())
    }

    pub fn get(&self, tag: &TypeTag) -> Option<TypeDescriptor<O>> {
        self.types
            .get(&tag.canonical()?)
            .map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn contains(&self, tag: &TypeTag) -> bool {
        tag.canonical()
            .map_or(false, |tag| self.types.contains_key(&tag))
    }

    pub fn unregister(&self, tag: &TypeTag) -> bool {
        tag.canonical()
            .map_or(false, |tag| self.types.remove(&tag).is_some())
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<_> = self.types.iter().map(|entry| entry.key().clone()).collect();
        tags.sort();
        tags
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
