/*!
 * Resource Property Tests
 * Registry accounting and exactly-once release under arbitrary close sequences
 */

use proptest::prelude::*;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tsurugi_bridge::{NativeResource, RawHandle, ResourceKind, ResourceManager};

#[derive(Debug, Clone)]
enum Step {
    Close(usize),
    Drop(usize),
    Deregister(usize),
}

fn step(count: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..count).prop_map(Step::Close),
        (0..count).prop_map(Step::Drop),
        (0..count).prop_map(Step::Deregister),
    ]
}

fn scenario() -> impl Strategy<Value = (usize, Vec<Step>)> {
    (1usize..16).prop_flat_map(|count| (Just(count), prop::collection::vec(step(count), 0..40)))
}

proptest! {
    #[test]
    fn prop_every_handle_released_exactly_once((count, steps) in scenario()) {
        let manager = ResourceManager::create();
        let released = Arc::new(AtomicUsize::new(0));
        let mut slots: Vec<Option<NativeResource>> = (1..=count)
            .map(|n| {
                let counter = Arc::clone(&released);
                let handle = RawHandle::new((n * 16) as *mut c_void).expect("non-null");
                let resource = NativeResource::adopt(&manager, handle, ResourceKind::Value, move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .expect("Failed to adopt");
                Some(resource)
            })
            .collect();

        let mut deregistered = vec![false; count];
        for step in steps {
            match step {
                Step::Close(i) => {
                    if let Some(resource) = &slots[i] {
                        resource.close().expect("close must not fail");
                    }
                }
                Step::Drop(i) => {
                    slots[i] = None;
                }
                Step::Deregister(i) => {
                    if let Some(resource) = &slots[i] {
                        if !resource.is_closed() {
                            manager.deregister(resource);
                            deregistered[i] = true;
                        }
                    }
                }
            }

            let live = slots
                .iter()
                .zip(&deregistered)
                .filter(|(slot, gone)| matches!(slot, Some(r) if !r.is_closed()) && !**gone)
                .count();
            prop_assert_eq!(manager.live_count(), live);
        }

        manager.close().expect("teardown must not fail");
        drop(slots);
        prop_assert_eq!(released.load(Ordering::SeqCst), count);
    }
}
