//! The hook slot is process-wide, so everything touching it lives in one
//! test.

use cozctl::domain::HookError;
use cozctl::hits::{hook, HitAggregator, Partitioning};
use cozctl::progress_hit;
use std::sync::Arc;

#[test]
fn test_hook_routes_hits_to_installed_aggregator() {
    // Before install the hook is a silent no-op
    hook::hit("com/app/Worker", 42);
    assert!(hook::installed().is_none());

    let agg = Arc::new(HitAggregator::new(Partitioning::Global));
    hook::install(Arc::clone(&agg)).unwrap();
    assert_eq!(
        hook::install(Arc::new(HitAggregator::default())),
        Err(HookError::AlreadyInstalled)
    );

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    hook::hit("com/app/Worker", 42);
                }
            });
        }
    });
    for _ in 0..3 {
        progress_hit!();
    }

    let reports = agg.snapshot();
    let worker = reports.iter().find(|r| r.class_name == "com/app/Worker").unwrap();
    assert_eq!(worker.hits, 400);

    let here = reports.iter().find(|r| r.class_name == module_path!()).unwrap();
    assert_eq!(here.hits, 3);

    let mut out = Vec::new();
    hook::installed().unwrap().dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\tClass com/app/Worker\n\t\tline 42: 400 hits"));
}
