//! Pool of entities keyed by `(owner, id)`, constructing them on demand.
//!
//! ```rust,ignore
//! let textdraws = IdentifiedOwnedPool::<PlayerTextDraw>::new();
//! textdraws.register::<PlayerTextDraw>();
//!
//! let label = textdraws.find_or_create(player, 0)?;
//! assert!(Arc::ptr_eq(&label, &textdraws.find(&player, 0).unwrap()));
//! ```

use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use crate::{
    config::{DuplicatePolicy, PoolConfig},
    entity::{Construct, Id, Owned, Pooled, Upcast},
    error::{ConstructError, Error, Result},
    pool::Pool,
    registry::TypeRegistry,
    stats::Stats,
    type_tag::{TypeTag, TypeTagged},
};

type Constructor<O, T> = dyn Fn(O, Id) -> Result<Arc<T>> + Send + Sync;

struct Registration<T: ?Sized + Pooled> {
    type_tag: TypeTag,
    ctor: Arc<Constructor<<T as Owned>::Owner, T>>,
}

impl<T: ?Sized + Pooled> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            type_tag: self.type_tag.clone(),
            ctor: self.ctor.clone(),
        }
    }
}

pub struct IdentifiedOwnedPool<T: ?Sized + Pooled> {
    pool: Pool<T>,
    registration: RwLock<Option<Registration<T>>>,
    create_lock: ReentrantMutex<()>,
    type_tag: TypeTag,
    config: PoolConfig,
}

impl<T: ?Sized + Pooled> Default for IdentifiedOwnedPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Pooled> IdentifiedOwnedPool<T> {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let type_tag = match &config.name {
            Some(name) => TypeTag::from(name.clone()),
            None => TypeTag::of::<T>(),
        };

        Self {
            pool: Pool::with_capacity(config.capacity),
            registration: RwLock::new(None),
            create_lock: ReentrantMutex::new(()),
            type_tag,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Name of this pool: the configured name or the element type.
    #[inline]
    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    /// Instantiates `C` for every future construction.
    ///
    /// Replaces any earlier registration.
    pub fn register<C>(&self)
    where
        C: Construct<T::Owner> + Upcast<T> + TypeTagged + 'static,
    {
        let type_tag = C::TYPE_TAG();
        let tag = type_tag.clone();

        self.set_registration(Registration {
            type_tag,
            ctor: Arc::new(move |owner: T::Owner, id: Id| {
                C::construct(owner, id)
                    .map(|c| <C as Upcast<T>>::upcast(Arc::new(c)))
                    .map_err(|source| Error::Construct {
                        type_tag: tag.clone(),
                        source,
                    })
            }),
        });
    }

    /// Constructs new instances with `f`, reported as `tag`.
    pub fn register_with<F>(&self, tag: impl Into<TypeTag>, f: F)
    where
        F: Fn(T::Owner, Id) -> std::result::Result<Arc<T>, ConstructError> + Send + Sync + 'static,
    {
        let type_tag = tag.into();
        let tag = type_tag.clone();

        self.set_registration(Registration {
            type_tag,
            ctor: Arc::new(move |owner: T::Owner, id: Id| {
                f(owner, id).map_err(|source| Error::Construct {
                    type_tag: tag.clone(),
                    source,
                })
            }),
        });
    }

    /// Uses the constructor `registry` holds under `tag`.
    ///
    /// Nothing checks here that the constructor yields this pool's element
    /// type; a mismatch surfaces as [`Error::DynamicCastFail`] on the first
    /// construction.
    pub fn register_tag(
        &self,
        registry: &TypeRegistry<T::Owner>,
        tag: impl Into<TypeTag>,
    ) -> Result<()> {
        let type_tag = tag.into();
        let descriptor = registry
            .get(&type_tag)
            .ok_or_else(|| Error::UnknownType(type_tag.clone()))?;
        let tag = type_tag.clone();

        self.set_registration(Registration {
            type_tag,
            ctor: Arc::new(move |owner: T::Owner, id: Id| {
                let erased = descriptor
                    .construct(owner, id)
                    .map_err(|source| Error::Construct {
                        type_tag: tag.clone(),
                        source,
                    })?;

                erased
                    .downcast::<Arc<T>>()
                    .map(|instance| *instance)
                    .map_err(|_| {
                        Error::DynamicCastFail(descriptor.produces().clone(), TypeTag::of::<Arc<T>>())
                    })
            }),
        });

        Ok(())
    }

    /// Forgets the registered type; returns whether there was one.
    pub fn unregister(&self) -> bool {
        self.registration.write().take().is_some()
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        self.registration.read().is_some()
    }

    pub fn registered_type(&self) -> Option<TypeTag> {
        self.registration
            .read()
            .as_ref()
            .map(|registration| registration.type_tag.clone())
    }

    /// First live instance owned by `owner` with identifier `id`.
    pub fn find(&self, owner: &T::Owner, id: Id) -> Option<Arc<T>> {
        let found = self.pool.find(|entity| entity.is(owner, id));
        log::trace!(
            "{}: find({:?}, {}) -> {}",
            self.type_tag,
            owner,
            id,
            if found.is_some() { "hit" } else { "miss" }
        );

        found
    }

    /// Every live instance owned by `owner`, in pool order.
    pub fn find_all(&self, owner: &T::Owner) -> Vec<Arc<T>> {
        self.pool.filter(|entity| entity.owner() == owner)
    }

    /// Constructs a new instance for `(owner, id)` and inserts it.
    ///
    /// Under [`DuplicatePolicy::Allow`] nothing stops a second live entry
    /// with the same pair; keeping pairs unique is up to the caller.
    pub fn add(&self, owner: T::Owner, id: Id) -> Result<Arc<T>> {
        let registration = self
            .registration
            .read()
            .clone()
            .ok_or_else(|| Error::NotRegistered(self.type_tag.clone()))?;

        match self.config.duplicate_policy {
            DuplicatePolicy::Allow => self.construct(&registration, owner, id),
            DuplicatePolicy::Reject => {
                let _guard = self.create_lock.lock();

                if self.find(&owner, id).is_some() {
                    log::warn!("{}: rejected duplicate ({:?}, {})", self.type_tag, owner, id);

                    return Err(Error::Duplicate {
                        type_tag: registration.type_tag,
                        id,
                    });
                }

                self.construct(&registration, owner, id)
            }
        }
    }

    /// Returns the live instance for `(owner, id)`, constructing it if absent.
    ///
    /// Lookup and construction happen under one guard, so concurrent callers
    /// asking for the same pair share a single instance. The guard is
    /// reentrant: constructors may use this pool from the same thread.
    pub fn find_or_create(&self, owner: T::Owner, id: Id) -> Result<Arc<T>> {
        let _guard = self.create_lock.lock();

        match self.find(&owner, id) {
            Some(found) => Ok(found),
            None => self.add(owner, id),
        }
    }

    /// Removes the first instance for `(owner, id)`.
    pub fn remove(&self, owner: &T::Owner, id: Id) -> Option<Arc<T>> {
        let key = self.pool.find_key(|entity| entity.is(owner, id))?;
        let removed = self.pool.remove(key);

        if removed.is_some() {
            log::trace!("{}: removed ({:?}, {})", self.type_tag, owner, id);
        }

        removed
    }

    /// Removes everything `owner` owns, e.g. when the player disconnects.
    pub fn remove_owner(&self, owner: &T::Owner) -> usize {
        let removed = self.pool.retain(|entity| entity.owner() != owner);
        log::debug!("{}: dropped {} entries of {:?}", self.type_tag, removed, owner);

        removed
    }

    /// The underlying slot storage.
    #[inline]
    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }

    #[inline]
    pub fn all(&self) -> Vec<Arc<T>> {
        self.pool.all()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn clear(&self) {
        self.pool.clear();
    }

    pub fn stats(&self) -> Stats {
        Stats {
            type_tag: self.type_tag.clone(),
            registered_type: self.registered_type(),
            len: self.pool.len(),
            capacity: self.pool.capacity(),
            free_slots: self.pool.free_slots(),
            duplicate_policy: self.config.duplicate_policy,
        }
    }

    fn set_registration(&self, registration: Registration<T>) {
        log::debug!("{}: registered {}", self.type_tag, registration.type_tag);

        if let Some(previous) = self.registration.write().replace(registration) {
            log::debug!("{}: replaced {}", self.type_tag, previous.type_tag);
        }
    }

    fn construct(&self, registration: &Registration<T>, owner: T::Owner, id: Id) -> Result<Arc<T>> {
        let instance = (registration.ctor)(owner.clone(), id).map_err(|err| {
            log::warn!("{}: failed to construct ({:?}, {}): {}", self.type_tag, owner, id, err);
            err
        })?;

        if !instance.is(&owner, id) {
            log::warn!(
                "{}: {} built for ({:?}, {}) reports ({:?}, {})",
                self.type_tag,
                registration.type_tag,
                owner,
                id,
                instance.owner(),
                instance.id()
            );

            return Err(Error::IdentityMismatch {
                type_tag: registration.type_tag.clone(),
                expected_owner: format!("{:?}", owner),
                expected_id: id,
                got_owner: format!("{:?}", instance.owner()),
                got_id: instance.id(),
            });
        }

        let key = self.pool.insert(instance.clone());
        log::trace!("{}: added ({:?}, {}) at slot {}", self.type_tag, owner, id, key.index());

        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::IdentifiedOwnedPool;
    use crate::{
        config::{DuplicatePolicy, PoolConfig},
        entity::{Id, Identified, Owned},
        error::ConstructError,
        Error,
    };

    #[derive(Debug)]
    struct Marker {
        owner: u16,
        id: Id,
    }

    impl Identified for Marker {
        fn id(&self) -> Id {
            self.id
        }
    }

    impl Owned for Marker {
        type Owner = u16;

        fn owner(&self) -> &u16 {
            &self.owner
        }
    }

    fn marker_pool(config: PoolConfig) -> (IdentifiedOwnedPool<Marker>, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let pool = IdentifiedOwnedPool::with_config(config);
        pool.register_with("test::Marker", move |owner, id| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Marker { owner, id }))
        });

        (pool, built)
    }

    #[test]
    fn lookup_is_by_owner_and_id() {
        let (pool, _) = marker_pool(PoolConfig::default());
        pool.add(1, 10).unwrap();
        pool.add(2, 10).unwrap();

        assert_eq!(pool.find(&1, 10).unwrap().owner, 1);
        assert_eq!(pool.find(&2, 10).unwrap().owner, 2);
        assert!(pool.find(&1, 11).is_none());
        assert!(pool.find(&3, 10).is_none());
    }

    #[test]
    fn allow_policy_keeps_duplicates_and_finds_first() {
        let (pool, built) = marker_pool(PoolConfig::default());
        let first = pool.add(1, 1).unwrap();
        let second = pool.add(1, 1).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len(), 2);
        assert!(Arc::ptr_eq(&pool.find(&1, 1).unwrap(), &first));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reject_policy_refuses_live_duplicates() {
        let (pool, built) =
            marker_pool(PoolConfig::default().duplicate_policy(DuplicatePolicy::Reject));
        pool.add(1, 1).unwrap();

        let err = pool.add(1, 1).unwrap_err();
        assert!(matches!(err, Error::Duplicate { id: 1, .. }));
        assert_eq!(built.load(Ordering::SeqCst), 1);

        pool.remove(&1, 1).unwrap();
        assert!(pool.add(1, 1).is_ok());
    }

    #[test]
    fn find_or_create_reuses_under_reject_policy() {
        let (pool, built) =
            marker_pool(PoolConfig::default().duplicate_policy(DuplicatePolicy::Reject));

        let a = pool.find_or_create(4, 2).unwrap();
        let b = pool.find_or_create(4, 2).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn constructor_rejection_inserts_nothing() {
        let pool = IdentifiedOwnedPool::<Marker>::new();
        pool.register_with("test::Marker", |owner, id| {
            if id >= 0 {
                Ok(Arc::new(Marker { owner, id }))
            } else {
                Err(ConstructError::InvalidId(id))
            }
        });

        let err = pool.add(1, -5).unwrap_err();
        assert!(err.is_construction());
        assert!(matches!(
            err,
            Error::Construct {
                source: ConstructError::InvalidId(-5),
                ..
            }
        ));
        assert!(pool.is_empty());
    }

    #[test]
    fn identity_mismatch_is_reported() {
        let pool = IdentifiedOwnedPool::<Marker>::new();
        pool.register_with("test::Sloppy", |owner, id| Ok(Arc::new(Marker { owner, id: id + 1 })));

        let err = pool.add(3, 7).unwrap_err();
        assert!(matches!(
            err,
            Error::IdentityMismatch {
                expected_id: 7,
                got_id: 8,
                ..
            }
        ));
        assert!(pool.is_empty());
    }

    #[test]
    fn foreign_owner_is_reported() {
        let pool = IdentifiedOwnedPool::<Marker>::new();
        pool.register_with("test::Stray", |owner, id| {
            Ok(Arc::new(Marker {
                owner: owner + 1,
                id,
            }))
        });

        match pool.add(3, 7).unwrap_err() {
            Error::IdentityMismatch {
                expected_owner,
                expected_id,
                got_owner,
                got_id,
                ..
            } => {
                assert_eq!(expected_owner, "3");
                assert_eq!(got_owner, "4");
                assert_eq!((expected_id, got_id), (7, 7));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(pool.find(&3, 7).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn remove_owner_drops_only_that_owner() {
        let (pool, _) = marker_pool(PoolConfig::default());
        for id in 0..3 {
            pool.add(1, id).unwrap();
            pool.add(2, id).unwrap();
        }

        assert_eq!(pool.find_all(&1).len(), 3);
        assert_eq!(pool.remove_owner(&1), 3);
        assert!(pool.find_all(&1).is_empty());
        assert_eq!(pool.find_all(&2).len(), 3);
        assert_eq!(pool.stats().free_slots, 3);
    }

    #[test]
    fn unregister_turns_add_into_configuration_error() {
        let (pool, _) = marker_pool(PoolConfig::named("markers"));
        assert!(pool.unregister());
        assert!(!pool.unregister());

        let err = pool.add(1, 1).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "No Type Registered: pool of markers");
    }
}
