/*!
 * Job Scenario Tests
 * End-to-end flows through a shared error context
 */

use pretty_assertions::assert_eq;
use std::time::Duration;
use tsurugi_bridge::ffi::simulated::{self, JobSpec, Outcome, ServerDetail};
use tsurugi_bridge::{BridgeError, ErrorCategory, ErrorContext, RcType, ResourceManager, ReturnCode, VoidJob};

#[test]
fn test_wait_then_take_once() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("Execute")
            .ready_after(Duration::from_millis(50))
            .start(),
    )
    .expect("Failed to wrap job");

    assert!(!job
        .wait(Some(&context), Duration::from_millis(1))
        .expect("short wait succeeds"));
    assert!(job
        .wait(Some(&context), Duration::from_secs(10))
        .expect("long wait succeeds"));

    job.take(Some(&context)).expect("take succeeds");
    let err = job.take(Some(&context)).expect_err("second take fails");
    assert_eq!(err.to_string(), "Job<Execute> already taken");
    assert_eq!(err.category(), ErrorCategory::LocalArgument);

    let stats = manager.close().expect("teardown succeeds");
    assert_eq!(stats.resources_disposed, 2);
}

#[test]
fn test_server_error_carries_diagnostic() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");
    let detail = ServerDetail {
        category_number: 3,
        category_str: "SQL".into(),
        code_number: 2001,
        structured_code: "SQL-02001".into(),
    };
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("Execute")
            .outcome(Outcome::ServerError {
                message: "table not found".into(),
                detail: detail.clone(),
            })
            .start(),
    )
    .expect("Failed to wrap job");

    let err = job.take(Some(&context)).expect_err("server rejects the statement");
    assert_eq!(err.to_string(), "table not found");
    assert_eq!(err.category(), ErrorCategory::ServerDiagnostic);
    assert_eq!(err.return_code(), Some(ReturnCode::CORE_SERVER_ERROR));

    let diagnostic = err.diagnostic().expect("context captured a diagnostic");
    assert_eq!(diagnostic.rc_type, RcType::CoreServerError);
    assert_eq!(diagnostic.server_category_number, Some(3));
    assert_eq!(diagnostic.server_category_str.as_deref(), Some("SQL"));
    assert_eq!(diagnostic.server_code_number, Some(2001));
    assert_eq!(diagnostic.structured_code.as_deref(), Some("SQL-02001"));

    // The context still reports the same failure afterwards
    assert_eq!(context.return_code().expect("rc"), ReturnCode::CORE_SERVER_ERROR);
    assert_eq!(
        context.error_message().expect("message").as_deref(),
        Some("table not found")
    );
    assert_eq!(
        context.server_error_structured_code().expect("code").as_deref(),
        Some("SQL-02001")
    );
}

#[test]
fn test_error_without_context_has_code_only() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("Execute")
            .outcome(Outcome::ServerError {
                message: "table not found".into(),
                detail: ServerDetail {
                    category_number: 3,
                    category_str: "SQL".into(),
                    code_number: 2001,
                    structured_code: "SQL-02001".into(),
                },
            })
            .start(),
    )
    .expect("Failed to wrap job");

    let err = job.take(None).expect_err("server rejects the statement");
    assert!(err.diagnostic().is_none());
    assert_eq!(err.to_string(), "native call failed with CORE_SERVER_ERROR");
}

#[test]
fn test_context_shared_across_threads() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");

    std::thread::scope(|scope| {
        for n in 0..4 {
            let library = &library;
            let manager = &manager;
            let context = &context;
            scope.spawn(move || {
                let job = VoidJob::void(
                    library,
                    manager,
                    JobSpec::new(format!("Job{n}"))
                        .ready_after(Duration::from_millis(10))
                        .start(),
                )
                .expect("Failed to wrap job");
                job.take(Some(context)).expect("take succeeds");
                job.close(Some(context)).expect("close succeeds");
            });
        }
    });

    assert_eq!(manager.live_count(), 1);
    assert_eq!(context.return_code().expect("rc"), ReturnCode::OK);
}

#[test]
fn test_take_after_manager_close_fails() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let job = VoidJob::void(&library, &manager, JobSpec::new("Execute").start())
        .expect("Failed to wrap job");

    manager.close().expect("teardown succeeds");
    let err = job.take(None).expect_err("job was released with its scope");
    assert!(matches!(
        err,
        BridgeError::AlreadyClosed { .. } | BridgeError::ManagerClosed
    ));
}
