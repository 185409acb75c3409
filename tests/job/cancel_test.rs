/*!
 * Job Cancellation Tests
 */

use std::time::Duration;
use tsurugi_bridge::ffi::simulated::{self, DisposeProbe, JobSpec};
use tsurugi_bridge::{NativeObject, ResourceKind, ResourceManager, ReturnCode, VoidJob};

#[test]
fn test_cancel_async_after_completion_returns_none() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let job = VoidJob::void(&library, &manager, JobSpec::new("Execute").start())
        .expect("Failed to wrap job");

    assert!(job.wait(None, Duration::from_secs(1)).expect("wait succeeds"));
    assert!(job.cancel_async(None).expect("cancel_async succeeds").is_none());
    assert_eq!(manager.live_count(), 1);
}

#[test]
fn test_cancel_async_tracks_acknowledgment() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let cancel_probe = DisposeProbe::new();
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("LongQuery")
            .never_ready()
            .cancel_latency(Duration::from_millis(40))
            .cancel_probe(&cancel_probe)
            .start(),
    )
    .expect("Failed to wrap job");

    let handle = job
        .cancel_async(None)
        .expect("cancel_async succeeds")
        .expect("pending job yields a cancellation handle");
    assert_eq!(handle.kind(), ResourceKind::CancelJob);
    assert!(!handle.is_done(None).expect("is_done succeeds"));

    // A second request while one is in flight yields nothing new
    assert!(job.cancel_async(None).expect("cancel_async succeeds").is_none());

    assert!(handle.wait(None, Duration::from_secs(2)).expect("wait succeeds"));
    assert!(handle.is_done(None).expect("is_done succeeds"));
    assert!(job.is_done(None).expect("job is_done succeeds"));

    // A cancelled job has no result to take
    let err = job.take(None).expect_err("cancelled job has no result");
    assert_eq!(err.return_code(), Some(ReturnCode::CORE_CLIENT_CLIENT_ERROR));

    handle.close().expect("handle closes");
    handle.close().expect("second close is a no-op");
    assert_eq!(cancel_probe.count(), 1);
}

#[test]
fn test_cancel_handle_released_by_manager() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let cancel_probe = DisposeProbe::new();
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("LongQuery")
            .never_ready()
            .cancel_probe(&cancel_probe)
            .start(),
    )
    .expect("Failed to wrap job");

    let handle = job
        .cancel_async(None)
        .expect("cancel_async succeeds")
        .expect("pending job yields a cancellation handle");
    assert_eq!(manager.live_count(), 2);

    manager.close().expect("teardown succeeds");
    assert_eq!(cancel_probe.count(), 1);
    assert!(handle.is_closed());
    assert!(job.is_closed());
}

#[test]
fn test_cancel_for_bounded_by_timeout() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("LongQuery")
            .never_ready()
            .cancel_latency(Duration::from_millis(300))
            .start(),
    )
    .expect("Failed to wrap job");

    assert!(!job
        .cancel_for(None, Duration::from_millis(5))
        .expect("cancel_for succeeds"));
    assert!(job.cancel(None).expect("cancel succeeds"));
    assert!(job.is_done(None).expect("is_done succeeds"));
}

#[test]
fn test_cancel_completed_job_is_acknowledged() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let job = VoidJob::void(&library, &manager, JobSpec::new("Execute").start())
        .expect("Failed to wrap job");

    assert!(job.cancel(None).expect("cancel succeeds"));
    job.take(None).expect("completed result is still available");
}
