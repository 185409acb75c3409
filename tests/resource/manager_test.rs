/*!
 * Resource Manager Tests
 * Teardown ordering, error aggregation and region release
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::ffi::c_void;
use std::sync::Arc;
use tsurugi_bridge::{
    BridgeConfig, BridgeError, NativeResource, RawHandle, ResourceKind, ResourceManager,
};

fn handle(n: usize) -> RawHandle {
    RawHandle::new(n as *mut c_void).expect("non-null test handle")
}

fn recording(log: &Arc<Mutex<Vec<usize>>>) -> impl Fn(RawHandle) -> tsurugi_bridge::BridgeResult<()> {
    let log = Arc::clone(log);
    move |h| {
        log.lock().push(h.addr());
        Ok(())
    }
}

#[test]
fn test_close_empty_manager() {
    let manager = ResourceManager::create();
    let stats = manager.close().expect("Failed to close empty manager");

    assert_eq!(stats.resources_disposed, 0);
    assert_eq!(stats.errors_encountered, 0);
    assert!(manager.is_closed());
}

#[test]
fn test_close_single_resource() {
    let manager = ResourceManager::create();
    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = NativeResource::adopt(&manager, handle(0x10), ResourceKind::Value, recording(&log))
        .expect("Failed to adopt");

    let stats = manager.close().expect("Failed to close manager");
    assert_eq!(stats.resources_disposed, 1);
    assert_eq!(*log.lock(), vec![0x10]);
    assert!(resource.is_closed());
}

#[test]
fn test_stragglers_released_newest_first() {
    let manager = ResourceManager::create();
    let log = Arc::new(Mutex::new(Vec::new()));

    let resources: Vec<_> = (1..=5)
        .map(|n| {
            NativeResource::adopt(&manager, handle(n * 0x10), ResourceKind::Value, recording(&log))
                .expect("Failed to adopt")
        })
        .collect();
    assert_eq!(manager.live_count(), 5);

    // A resource closed before teardown is skipped
    resources[2].close().expect("Failed to close");

    let stats = manager.close().expect("Failed to close manager");
    assert_eq!(stats.resources_disposed, 4);
    assert_eq!(*log.lock(), vec![0x30, 0x50, 0x40, 0x20, 0x10]);
    assert!(resources.iter().all(|r| r.is_closed()));
}

#[test]
fn test_failing_release_is_aggregated() {
    let manager = ResourceManager::create();
    let log = Arc::new(Mutex::new(Vec::new()));

    let _ok_first = NativeResource::adopt(&manager, handle(0x10), ResourceKind::Value, recording(&log))
        .expect("Failed to adopt");
    let _bad_a = NativeResource::adopt(&manager, handle(0x20), ResourceKind::Job, |_| {
        Err(BridgeError::Argument("dispose a failed".into()))
    })
    .expect("Failed to adopt");
    let _bad_b = NativeResource::adopt(&manager, handle(0x30), ResourceKind::Job, |_| {
        Err(BridgeError::Argument("dispose b failed".into()))
    })
    .expect("Failed to adopt");
    let _ok_last = NativeResource::adopt(&manager, handle(0x40), ResourceKind::Value, recording(&log))
        .expect("Failed to adopt");

    let _scratch = manager.allocate_out(0u64).expect("Failed to allocate");
    assert!(manager.allocated_bytes() > 0);

    let err = manager.close().expect_err("teardown must report release failures");
    match &err {
        BridgeError::Teardown {
            count,
            primary,
            secondary,
        } => {
            assert_eq!(*count, 2);
            // Newest first: b is released before a
            assert_eq!(primary.to_string(), "invalid argument: dispose b failed");
            assert_eq!(secondary.len(), 1);
        }
        other => panic!("expected Teardown, got {other:?}"),
    }

    // Every other release still ran and the region is gone
    assert_eq!(*log.lock(), vec![0x40, 0x10]);
    assert_eq!(manager.allocated_bytes(), 0);
    assert_eq!(manager.live_count(), 0);
    assert!(manager.is_closed());
}

#[test]
fn test_registration_after_close_fails() {
    let manager = ResourceManager::create();
    manager.close().expect("Failed to close manager");

    let log = Arc::new(Mutex::new(Vec::new()));
    let err = NativeResource::adopt(&manager, handle(0x10), ResourceKind::Value, recording(&log))
        .expect_err("closed manager must reject registrations");

    assert!(matches!(err, BridgeError::ManagerClosed));
    assert_eq!(*log.lock(), vec![0x10], "rejected handle is released right away");
    assert_eq!(manager.live_count(), 0);
}

#[test]
fn test_deregistered_resource_survives_teardown() {
    let manager = ResourceManager::create();
    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = NativeResource::adopt(&manager, handle(0x10), ResourceKind::Value, recording(&log))
        .expect("Failed to adopt");

    assert!(manager.deregister(&resource));
    manager.close().expect("Failed to close manager");
    assert!(log.lock().is_empty());
    assert!(!resource.is_closed());

    resource.close().expect("Failed to close resource");
    assert_eq!(*log.lock(), vec![0x10]);
}

#[test]
fn test_manager_from_config() {
    let config = BridgeConfig::new().with_region_capacity(256);
    let manager = ResourceManager::from_config(&config);
    let array = manager
        .allocate_string_array(&["a", "b", "c"])
        .expect("Failed to allocate array");

    assert_eq!(array.len(), 3);
    assert!(manager.allocated_bytes() > 0);
}

#[test]
fn test_manager_ids_are_unique() {
    let a = ResourceManager::create();
    let b = ResourceManager::create();
    assert_ne!(a.id(), b.id());
}
