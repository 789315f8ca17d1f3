//! Mount protocol behavior under concurrency and failure.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{events_containing, is_mounted, register_echo_pool, test_state};
use poolkit::{PoolResolver, ResolverOptions, StorageError};

#[test]
fn test_concurrent_callers_balance_physical_transitions() {
    let (state, catalog, _temp) = test_state();
    register_echo_pool(&catalog, "pool-conc", 31, None);

    let resolver = PoolResolver::new(ResolverOptions::default());

    // Each caller re-resolves the pool, so each gets its own driver
    // instance; the shared mount state stands in for the machine-global
    // state of a real technology.
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let pool = resolver.pool_by_name(&state, "pool-conc").unwrap();
                let vol = pool.custom_volume("shared-vol", HashMap::new());
                vol.mount_task(
                    |_path, _op| {
                        thread::sleep(Duration::from_millis(2));
                        Ok(())
                    },
                    None,
                )
                .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let events = events_containing("pool-conc/custom/shared-vol");
    let mounts = events.iter().filter(|e| e.starts_with("mount ")).count();
    let umounts = events.iter().filter(|e| e.starts_with("umount ")).count();

    // Every physical mount is compensated by exactly one physical unmount,
    // issued by the caller that performed it; the volume ends unmounted.
    assert_eq!(mounts, umounts);
    assert!(mounts >= 1);
    assert!(!is_mounted("pool-conc/custom/shared-vol"));
}

#[test]
fn test_distinct_volumes_do_not_contend() {
    let (state, catalog, _temp) = test_state();
    register_echo_pool(&catalog, "pool-multi", 32, None);

    let resolver = PoolResolver::new(ResolverOptions::default());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let pool = resolver.pool_by_name(&state, "pool-multi").unwrap();
                let vol = pool.custom_volume(&format!("vol-{i}"), HashMap::new());
                vol.mount_task(|_path, _op| Ok(()), None).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..4 {
        let key = format!("pool-multi/custom/vol-{i}");
        assert_eq!(
            events_containing(&key),
            vec![format!("mount {key}"), format!("umount {key}")]
        );
    }
}

#[test]
fn test_unmount_runs_when_task_panics() {
    let (state, catalog, _temp) = test_state();
    register_echo_pool(&catalog, "pool-panic", 33, None);

    let resolver = PoolResolver::new(ResolverOptions::default());
    let pool = resolver.pool_by_name(&state, "pool-panic").unwrap();
    let vol = pool.custom_volume("doomed", HashMap::new());

    let result = thread::spawn(move || {
        vol.mount_task(|_path, _op| panic!("task blew up"), None)
    })
    .join();
    assert!(result.is_err());

    // The compensating unmount still ran during unwinding.
    assert_eq!(
        events_containing("pool-panic/custom/doomed"),
        vec![
            "mount pool-panic/custom/doomed",
            "umount pool-panic/custom/doomed"
        ]
    );
    assert!(!is_mounted("pool-panic/custom/doomed"));
}

#[test]
fn test_failed_task_still_unmounts_and_reports_task_error() {
    let (state, catalog, _temp) = test_state();
    register_echo_pool(&catalog, "pool-fail", 34, None);

    let resolver = PoolResolver::new(ResolverOptions::default());
    let pool = resolver.pool_by_name(&state, "pool-fail").unwrap();
    let vol = pool.custom_volume("flaky", HashMap::new());

    let err = vol
        .mount_task(
            |_path, _op| Err(StorageError::Driver("copy interrupted".to_string())),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, StorageError::Driver(msg) if msg == "copy interrupted"));

    assert_eq!(
        events_containing("pool-fail/custom/flaky"),
        vec!["mount pool-fail/custom/flaky", "umount pool-fail/custom/flaky"]
    );
}

#[test]
fn test_overlapping_holders_leave_volume_mounted_for_the_first() {
    let (state, catalog, _temp) = test_state();
    register_echo_pool(&catalog, "pool-hold", 35, None);

    let resolver = PoolResolver::new(ResolverOptions::default());
    let pool = resolver.pool_by_name(&state, "pool-hold").unwrap();

    let outer = pool.custom_volume("held", HashMap::new());
    let inner = pool.custom_volume("held", HashMap::new());

    outer
        .mount_task(
            |_path, _op| {
                // A second caller mounts while the first still holds the
                // volume; it must not trigger a physical unmount.
                inner.mount_task(|_path, _op| Ok(()), None)?;
                assert!(is_mounted("pool-hold/custom/held"));
                Ok(())
            },
            None,
        )
        .unwrap();

    assert_eq!(
        events_containing("pool-hold/custom/held"),
        vec!["mount pool-hold/custom/held", "umount pool-hold/custom/held"]
    );
    assert!(!is_mounted("pool-hold/custom/held"));
}
