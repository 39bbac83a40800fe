//! Integration tests for concurrent access to a shared registry.

use singleton_index::{Registry, RegistryError, ReplacePolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

struct Expensive {
    id: usize,
}

impl Default for Expensive {
    fn default() -> Self {
        let id = CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Self { id }
    }
}

#[test]
fn test_racing_first_access_constructs_once() {
    let registry = Arc::new(Registry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.get_or_create::<Expensive>("shared").unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<Expensive>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    assert_eq!(instances.len(), THREADS);
    for instance in &instances {
        assert!(Arc::ptr_eq(instance, &instances[0]));
        assert_eq!(instance.id, 0);
    }
}

#[test]
fn test_concurrent_distinct_names() {
    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || {
                let name = format!("worker.{i}");
                let value = registry.get_or_create_with(&name, || i).unwrap();
                assert_eq!(*value, i);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), THREADS);
    assert_eq!(registry.teardown(), THREADS);
}

#[derive(Debug, PartialEq)]
struct Settings(u32);

/// Starts creating `name` on another thread and returns once `init` is
/// running. `init` finishes when the returned sender is used.
fn start_slow_create(
    registry: &Arc<Registry>,
    name: &'static str,
    released: Arc<AtomicUsize>,
) -> (mpsc::Sender<()>, thread::JoinHandle<Arc<Settings>>) {
    let (started_tx, started_rx) = mpsc::channel();
    let (finish_tx, finish_rx) = mpsc::channel::<()>();
    let registry = registry.clone();

    let creator = thread::spawn(move || {
        registry
            .get_or_create_with_destructor(
                name,
                || {
                    started_tx.send(()).unwrap();
                    finish_rx.recv().unwrap();
                    Settings(1)
                },
                move || {
                    released.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap()
    });

    started_rx.recv().unwrap();
    (finish_tx, creator)
}

#[test]
fn test_register_waits_for_create_in_progress() {
    let registry = Arc::new(Registry::with_policy(ReplacePolicy::Reject));
    let released = Arc::new(AtomicUsize::new(0));
    let (finish, creator) = start_slow_create(&registry, "settings", released);

    let registrar = {
        let registry = registry.clone();
        thread::spawn(move || registry.register("settings", Arc::new(Settings(2))))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!registrar.is_finished());
    finish.send(()).unwrap();

    let created = creator.join().unwrap();
    let outcome = registrar.join().unwrap();

    assert_eq!(
        outcome,
        Err(RegistryError::AlreadyRegistered {
            name: "settings".to_string()
        })
    );
    let later: Arc<Settings> = registry.get("settings").unwrap();
    assert!(Arc::ptr_eq(&created, &later));
    assert_eq!(*later, Settings(1));
}

#[test]
fn test_replacement_after_create_in_progress_releases_created() {
    let registry = Arc::new(Registry::new());
    let released = Arc::new(AtomicUsize::new(0));
    let (finish, creator) = start_slow_create(&registry, "settings", released.clone());

    let registrar = {
        let registry = registry.clone();
        thread::spawn(move || registry.register("settings", Arc::new(Settings(2))))
    };

    thread::sleep(Duration::from_millis(50));
    finish.send(()).unwrap();

    let created = creator.join().unwrap();
    registrar.join().unwrap().unwrap();

    // The registration replaced the finished instance instead of racing it.
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(*created, Settings(1));
    assert_eq!(*registry.get::<Settings>("settings").unwrap(), Settings(2));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_teardown_releases_create_in_progress() {
    let registry = Arc::new(Registry::new());
    let released = Arc::new(AtomicUsize::new(0));
    let (finish, creator) = start_slow_create(&registry, "settings", released.clone());

    let teardown = {
        let registry = registry.clone();
        thread::spawn(move || registry.teardown())
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!teardown.is_finished());
    finish.send(()).unwrap();

    let created = creator.join().unwrap();
    assert_eq!(teardown.join().unwrap(), 1);

    // Released by that teardown; the caller's reference stays valid.
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(*created, Settings(1));
    assert!(registry.is_empty());

    let next = registry
        .get_or_create_with("settings", || Settings(3))
        .unwrap();
    assert!(!Arc::ptr_eq(&created, &next));
}
