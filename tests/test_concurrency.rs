//! `find_or_create` from several threads and from inside constructors.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

use ownedpool::{derive::Pooled, Id, IdentifiedOwnedPool};

#[derive(Debug, Pooled)]
struct Slow {
    #[owner]
    player: u16,
    #[id]
    id: Id,
}

#[derive(Debug, Pooled)]
struct Node {
    #[owner]
    player: u16,
    #[id]
    id: Id,
    parent: Option<Arc<Node>>,
}

#[test]
fn test_concurrent_find_or_create_constructs_once() {
    let _ = env_logger::builder().is_test(true).try_init();

    const THREADS: usize = 8;

    let built = Arc::new(AtomicUsize::new(0));
    let pool = Arc::new(IdentifiedOwnedPool::<Slow>::new());

    let counter = built.clone();
    pool.register_with("test::Slow", move |player, id| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        Ok(Arc::new(Slow { player, id }))
    });

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                pool.find_or_create(7, 1).unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<Slow>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(pool.len(), 1);
    for item in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], item));
    }
}

#[test]
fn test_constructor_may_reenter_pool() {
    let pool = Arc::new(IdentifiedOwnedPool::<Node>::new());
    let weak = Arc::downgrade(&pool);

    pool.register_with("test::Node", move |player, id| {
        let parent = if id > 0 {
            match weak.upgrade() {
                Some(pool) => Some(pool.find_or_create(player, id - 1).map_err(|err| {
                    ownedpool::ConstructError::rejected(err.to_string())
                })?),
                None => None,
            }
        } else {
            None
        };

        Ok(Arc::new(Node { player, id, parent }))
    });

    let leaf = pool.find_or_create(2, 3).unwrap();

    assert_eq!(pool.len(), 4);
    let mut depth = 0;
    let mut current = leaf.parent.clone();
    while let Some(node) = current {
        assert!(Arc::ptr_eq(&node, &pool.find(&2, node.id).unwrap()));
        depth += 1;
        current = node.parent.clone();
    }
    assert_eq!(depth, 3);
}
