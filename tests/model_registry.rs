//! Model Registry Tests
//!
//! Process-wide loading: the first `init()` loads from disk, later calls
//! reuse the cached registry without touching storage again. Kept as a single
//! test because the registry is global to the test process.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use neuraltrack::config::ModelsConfig;
use neuraltrack::ml_engine::registry;

#[test]
fn init_loads_once_and_caches() {
    assert!(registry::get().is_none());
    assert!(!registry::is_loaded());

    // A failed load leaves the cache empty.
    let missing = ModelsConfig {
        current_path: PathBuf::from("/nonexistent/current.json"),
        projection_path: PathBuf::from("/nonexistent/projection.json"),
    };
    assert!(registry::init(&missing).is_err());
    assert!(!registry::is_loaded());

    let dir = tempfile::tempdir().unwrap();
    let config = common::write_models(dir.path());

    // Concurrent first use settles on one registry.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let config = config.clone();
            std::thread::spawn(move || registry::init(&config))
        })
        .collect();
    let loaded: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Result<_, _>>()
        .unwrap();
    for r in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0], r));
    }
    assert!(registry::is_loaded());

    // Files are gone; the cached registry is still served.
    drop(dir);
    let again = registry::init(&config).unwrap();
    assert!(Arc::ptr_eq(&loaded[0], &again));

    let from_missing = registry::init(&missing).unwrap();
    assert!(Arc::ptr_eq(&loaded[0], &from_missing));
    assert!(Arc::ptr_eq(&loaded[0], &registry::get().unwrap()));
}
