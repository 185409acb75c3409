/*!
 * Diagnostic Tests
 * Context getters and status code classification
 */

use pretty_assertions::assert_eq;
use std::time::Duration;
use tsurugi_bridge::ffi::simulated::{self, JobSpec, Outcome, ServerDetail};
use tsurugi_bridge::{
    BridgeError, ErrorCategory, ErrorContext, NativeDiagnostic, RcType, ResourceManager,
    ReturnCode, VoidJob,
};

fn failing_job(name: &str) -> JobSpec {
    JobSpec::new(name).outcome(Outcome::ServerError {
        message: "unique constraint violated".into(),
        detail: ServerDetail {
            category_number: 3,
            category_str: "SQL".into(),
            code_number: 2003,
            structured_code: "SQL-02003".into(),
        },
    })
}

#[test]
fn test_fresh_context_has_no_failure() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");

    let diagnostic = context.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.rc, ReturnCode::OK);
    assert_eq!(diagnostic.rc_type, RcType::Ok);
    assert_eq!(diagnostic.message, None);
    assert!(!diagnostic.is_server_error());
    assert_eq!(context.error_name().expect("name"), None);
    assert_eq!(context.server_error_category_str().expect("category"), None);
}

#[test]
fn test_context_getters_after_server_error() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");
    let job = VoidJob::void(&library, &manager, failing_job("Insert").start())
        .expect("Failed to wrap job");

    job.take(Some(&context)).expect_err("insert is rejected");

    assert_eq!(context.return_code().expect("rc"), ReturnCode::CORE_SERVER_ERROR);
    assert_eq!(context.error_type().expect("type"), RcType::CoreServerError);
    assert_eq!(
        context.error_name().expect("name").as_deref(),
        Some("CORE_SERVER_ERROR")
    );
    assert_eq!(context.server_error_category_number().expect("category"), Some(3));
    assert_eq!(
        context.server_error_category_str().expect("category").as_deref(),
        Some("SQL")
    );
    assert_eq!(context.server_error_code_number().expect("code"), Some(2003));

    let snapshot = context.diagnostic().expect("diagnostic");
    assert!(snapshot.is_server_error());
    assert_eq!(snapshot.structured_code.as_deref(), Some("SQL-02003"));
}

#[test]
fn test_successful_call_clears_context() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");
    let failing = VoidJob::void(&library, &manager, failing_job("Insert").start())
        .expect("Failed to wrap job");
    failing.take(Some(&context)).expect_err("insert is rejected");

    let healthy = VoidJob::void(&library, &manager, JobSpec::new("Select").start())
        .expect("Failed to wrap job");
    assert!(healthy
        .wait(Some(&context), Duration::from_secs(1))
        .expect("wait succeeds"));

    assert_eq!(context.return_code().expect("rc"), ReturnCode::OK);
    assert_eq!(context.error_message().expect("message"), None);
}

#[test]
fn test_client_timeout_classification() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");
    let job = VoidJob::void(
        &library,
        &manager,
        JobSpec::new("Slow").ready_after(Duration::from_secs(5)).start(),
    )
    .expect("Failed to wrap job");

    let err = job
        .take_for(Some(&context), Duration::from_millis(1))
        .expect_err("deadline passes first");
    assert!(err.is_timeout());
    assert_eq!(err.category(), ErrorCategory::ClientRuntime);

    let diagnostic = err.diagnostic().expect("context captured a diagnostic");
    assert_eq!(diagnostic.rc_type, RcType::CoreClientError);
    assert_eq!(diagnostic.message.as_deref(), Some("Job<Slow> timeout"));
    assert_eq!(diagnostic.server_code_number, None);
}

#[test]
fn test_closed_job_reports_job_error() {
    let library = simulated::library();
    let manager = ResourceManager::create();
    let context = ErrorContext::create(&library, &manager).expect("Failed to create context");
    let job = VoidJob::void(&library, &manager, JobSpec::new("Execute").start())
        .expect("Failed to wrap job");

    job.close(Some(&context)).expect("close succeeds");
    let err = job.wait(Some(&context), Duration::ZERO).expect_err("job is gone");
    assert!(matches!(err, BridgeError::AlreadyClosed { .. }));
}

#[test]
fn test_unknown_code_name_fallback() {
    let rc = ReturnCode::from_raw(0x8012_3456);
    assert_eq!(rc.name(), "Rc80123456");
    assert_eq!(rc.rc_type(), RcType::CoreClientError);

    let diagnostic = NativeDiagnostic::from_code(rc);
    assert_eq!(diagnostic.name.as_deref(), Some("Rc80123456"));
    let err = BridgeError::native(rc, None);
    assert_eq!(err.to_string(), "native call failed with Rc80123456");
}

#[test]
fn test_diagnostic_json_round_trip() {
    let diagnostic = NativeDiagnostic {
        message: Some("unique constraint violated".into()),
        server_code_number: Some(2003),
        ..NativeDiagnostic::from_code(ReturnCode::CORE_SERVER_ERROR)
    };
    let parsed: NativeDiagnostic =
        serde_json::from_str(&diagnostic.to_json()).expect("valid json");
    assert_eq!(parsed, diagnostic);
}
