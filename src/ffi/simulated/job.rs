/*!
 * Simulated Jobs
 *
 * Time-driven asynchronous operations. A job completes `ready_after` its
 * creation with a configured outcome; cancellation completes it early after
 * a configurable latency.
 */

use super::context::{fail, succeed, ServerDetail};
use super::{write_out, DisposeProbe};
use crate::core::RawHandle;
use crate::ffi::api::RawRc;
use crate::ffi::rc::ReturnCode;
use parking_lot::Mutex;
use std::ffi::{c_char, c_void, CString};
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

/// Result a simulated job produces on completion
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A value object carrying `payload`, disposed with `value_dispose`
    Value(i64),
    /// No value (`value_out` stays null)
    Void,
    /// The server rejects the request
    ServerError { message: String, detail: ServerDetail },
}

/// Blueprint for a simulated job
#[derive(Debug, Clone)]
pub struct JobSpec {
    name: String,
    ready_after: Option<Duration>,
    outcome: Outcome,
    cancel_latency: Duration,
    job_probe: Option<DisposeProbe>,
    value_probe: Option<DisposeProbe>,
    cancel_probe: Option<DisposeProbe>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready_after: Some(Duration::ZERO),
            outcome: Outcome::Void,
            cancel_latency: Duration::ZERO,
            job_probe: None,
            value_probe: None,
            cancel_probe: None,
        }
    }

    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.ready_after = Some(delay);
        self
    }

    /// The job never completes on its own; only cancellation finishes it
    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn cancel_latency(mut self, latency: Duration) -> Self {
        self.cancel_latency = latency;
        self
    }

    pub fn job_probe(mut self, probe: &DisposeProbe) -> Self {
        self.job_probe = Some(probe.clone());
        self
    }

    pub fn value_probe(mut self, probe: &DisposeProbe) -> Self {
        self.value_probe = Some(probe.clone());
        self
    }

    pub fn cancel_probe(mut self, probe: &DisposeProbe) -> Self {
        self.cancel_probe = Some(probe.clone());
        self
    }

    /// Start the job; the handle is what a native `*_async` call would return
    pub fn start(self) -> RawHandle {
        let job = Box::new(SimJob {
            name: CString::new(self.name.replace('\0', " ")).unwrap_or_default(),
            created: Instant::now(),
            spec: self,
            state: Mutex::new(JobState::default()),
        });
        let ptr = Box::into_raw(job) as *mut c_void;
        // SAFETY: Box::into_raw never yields null
        unsafe { RawHandle::new(ptr).unwrap_unchecked() }
    }
}

#[derive(Debug, Default)]
struct JobState {
    taken: bool,
    closed: bool,
    cancel_at: Option<Instant>,
}

struct SimJob {
    name: CString,
    created: Instant,
    spec: JobSpec,
    state: Mutex<JobState>,
}

enum Completion {
    Finished,
    Cancelled,
}

impl SimJob {
    fn ready_at(&self) -> Option<Instant> {
        self.spec.ready_after.map(|d| self.created + d)
    }

    /// Instant the job completes and how, if it ever does
    fn completion(&self) -> Option<(Instant, Completion)> {
        let cancel_at = self.state.lock().cancel_at;
        match (self.ready_at(), cancel_at) {
            (Some(ready), Some(cancel)) if cancel < ready => Some((cancel, Completion::Cancelled)),
            (Some(ready), _) => Some((ready, Completion::Finished)),
            (None, Some(cancel)) => Some((cancel, Completion::Cancelled)),
            (None, None) => None,
        }
    }

    fn is_done(&self) -> bool {
        self.completion()
            .map_or(false, |(at, _)| Instant::now() >= at)
    }

    /// Sleep until completion or `timeout`; true when completed
    fn wait(&self, timeout: Duration) -> bool {
        let now = Instant::now();
        match self.completion() {
            Some((at, _)) if at <= now => true,
            Some((at, _)) if at - now <= timeout => {
                thread::sleep(at - now);
                true
            }
            _ => {
                thread::sleep(timeout);
                false
            }
        }
    }

    fn label(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }

    fn take(&self, ctx: *mut c_void, value_out: *mut *mut c_void) -> RawRc {
        if self.state.lock().taken {
            return fail(
                ctx,
                ReturnCode::CORE_CLIENT_CLIENT_ERROR,
                format!("Job<{}> already taked", self.label()),
                None,
            );
        }
        let cancelled = matches!(self.completion(), Some((_, Completion::Cancelled)));
        self.state.lock().taken = true;

        if cancelled {
            return fail(
                ctx,
                ReturnCode::CORE_CLIENT_CLIENT_ERROR,
                format!("Job<{}> cancelled", self.label()),
                None,
            );
        }

        match &self.spec.outcome {
            Outcome::Value(payload) => {
                let value = Box::new(SimValue {
                    payload: *payload,
                    probe: self.spec.value_probe.clone(),
                });
                // SAFETY: caller checked `value_out` for null
                unsafe { write_out(value_out, Box::into_raw(value) as *mut c_void) };
                succeed(ctx)
            }
            Outcome::Void => succeed(ctx),
            Outcome::ServerError { message, detail } => fail(
                ctx,
                ReturnCode::CORE_SERVER_ERROR,
                message.clone(),
                Some(detail.clone()),
            ),
        }
    }
}

/// Result object produced by `Outcome::Value`
struct SimValue {
    payload: i64,
    probe: Option<DisposeProbe>,
}

struct SimCancelJob {
    done_at: Instant,
    probe: Option<DisposeProbe>,
}

/// Payload of a value handle taken from a simulated job
///
/// # Safety
///
/// `value` must be a live handle produced by a simulated job's take.
pub unsafe fn value_payload(value: RawHandle) -> i64 {
    (*(value.as_ptr() as *const SimValue)).payload
}

/// Dispose a value handle taken from a simulated job
///
/// # Safety
///
/// `value` must be a live handle produced by a simulated job's take, disposed once.
pub unsafe fn value_dispose(value: RawHandle) {
    let value = Box::from_raw(value.as_ptr() as *mut SimValue);
    if let Some(probe) = &value.probe {
        probe.record();
    }
}

macro_rules! job_ref {
    ($ctx:expr, $job:expr) => {{
        // SAFETY: non-null job pointers come from `JobSpec::start`
        match unsafe { ($job as *const SimJob).as_ref() } {
            Some(job) => job,
            None => return fail($ctx, ReturnCode::FFI_ARG1_ERROR, "job is null", None),
        }
    }};
}

macro_rules! require_open {
    ($ctx:expr, $job:expr, $function:expr) => {
        if $job.state.lock().closed {
            return fail(
                $ctx,
                ReturnCode::FFI_JOB_ALREADY_CLOSED,
                format!("{} error. job already closed", $function),
                None,
            );
        }
    };
}

macro_rules! require_out {
    ($ctx:expr, $out:expr, $position:expr) => {
        if $out.is_null() {
            return fail(
                $ctx,
                ReturnCode::arg_error($position),
                format!("arg{} is null", $position),
                None,
            );
        }
    };
}

pub(crate) unsafe extern "C" fn job_get_name(
    ctx: *mut c_void,
    job: *mut c_void,
    out: *mut *const c_char,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, out, 2);
    write_out(out, job.name.as_ptr());
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_wait(
    ctx: *mut c_void,
    job: *mut c_void,
    timeout_nanos: u64,
    out: *mut bool,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, out, 3);
    require_open!(ctx, job, "tsurugi_ffi_job_wait()");
    write_out(out, job.wait(Duration::from_nanos(timeout_nanos)));
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_is_done(
    ctx: *mut c_void,
    job: *mut c_void,
    out: *mut bool,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, out, 2);
    require_open!(ctx, job, "tsurugi_ffi_job_is_done()");
    write_out(out, job.is_done());
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_take(
    ctx: *mut c_void,
    job: *mut c_void,
    value_out: *mut *mut c_void,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, value_out, 2);
    write_out(value_out, ptr::null_mut());
    require_open!(ctx, job, "tsurugi_ffi_job_take()");
    if job.completion().is_none() {
        return fail(
            ctx,
            ReturnCode::CORE_CLIENT_IO_ERROR,
            format!("Job<{}> lost its session", job.label()),
            None,
        );
    }
    job.wait(Duration::MAX);
    job.take(ctx, value_out)
}

pub(crate) unsafe extern "C" fn job_take_for(
    ctx: *mut c_void,
    job: *mut c_void,
    timeout_nanos: u64,
    value_out: *mut *mut c_void,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, value_out, 3);
    write_out(value_out, ptr::null_mut());
    require_open!(ctx, job, "tsurugi_ffi_job_take_for()");
    if !job.wait(Duration::from_nanos(timeout_nanos)) {
        return fail(
            ctx,
            ReturnCode::CORE_CLIENT_TIMEOUT_ERROR,
            format!("Job<{}> timeout", job.label()),
            None,
        );
    }
    job.take(ctx, value_out)
}

pub(crate) unsafe extern "C" fn job_take_if_ready(
    ctx: *mut c_void,
    job: *mut c_void,
    is_ready_out: *mut bool,
    value_out: *mut *mut c_void,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, is_ready_out, 2);
    require_out!(ctx, value_out, 3);
    write_out(is_ready_out, false);
    write_out(value_out, ptr::null_mut());
    require_open!(ctx, job, "tsurugi_ffi_job_take_if_ready()");
    if !job.is_done() {
        return succeed(ctx);
    }
    write_out(is_ready_out, true);
    job.take(ctx, value_out)
}

/// Request cancellation; returns the instant it takes effect
fn request_cancel(job: &SimJob) -> Instant {
    let mut state = job.state.lock();
    *state
        .cancel_at
        .get_or_insert_with(|| Instant::now() + job.spec.cancel_latency)
}

pub(crate) unsafe extern "C" fn job_cancel(
    ctx: *mut c_void,
    job: *mut c_void,
    out: *mut bool,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, out, 2);
    require_open!(ctx, job, "tsurugi_ffi_job_cancel()");
    if !job.is_done() {
        request_cancel(job);
    }
    write_out(out, job.wait(Duration::MAX));
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_cancel_for(
    ctx: *mut c_void,
    job: *mut c_void,
    timeout_nanos: u64,
    out: *mut bool,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, out, 3);
    require_open!(ctx, job, "tsurugi_ffi_job_cancel_for()");
    if !job.is_done() {
        request_cancel(job);
    }
    write_out(out, job.wait(Duration::from_nanos(timeout_nanos)));
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_cancel_async(
    ctx: *mut c_void,
    job: *mut c_void,
    out: *mut *mut c_void,
) -> RawRc {
    let job = job_ref!(ctx, job);
    require_out!(ctx, out, 2);
    write_out(out, ptr::null_mut());
    require_open!(ctx, job, "tsurugi_ffi_job_cancel_async()");
    if job.is_done() || job.state.lock().cancel_at.is_some() {
        return succeed(ctx);
    }
    let cancel_job = Box::new(SimCancelJob {
        done_at: request_cancel(job),
        probe: job.spec.cancel_probe.clone(),
    });
    write_out(out, Box::into_raw(cancel_job) as *mut c_void);
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_close(ctx: *mut c_void, job: *mut c_void) -> RawRc {
    let job = job_ref!(ctx, job);
    job.state.lock().closed = true;
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn job_dispose(job: *mut c_void) {
    if job.is_null() {
        return;
    }
    let job = Box::from_raw(job as *mut SimJob);
    if let Some(probe) = &job.spec.job_probe {
        probe.record();
    }
}

fn cancel_job_ref<'a>(cancel_job: *mut c_void) -> Option<&'a SimCancelJob> {
    // SAFETY: non-null cancel job pointers come from `job_cancel_async`
    unsafe { (cancel_job as *const SimCancelJob).as_ref() }
}

pub(crate) unsafe extern "C" fn cancel_job_wait(
    ctx: *mut c_void,
    cancel_job: *mut c_void,
    timeout_nanos: u64,
    out: *mut bool,
) -> RawRc {
    let Some(cancel_job) = cancel_job_ref(cancel_job) else {
        return fail(ctx, ReturnCode::FFI_ARG1_ERROR, "cancel_job is null", None);
    };
    require_out!(ctx, out, 3);
    let now = Instant::now();
    let timeout = Duration::from_nanos(timeout_nanos);
    let done = if cancel_job.done_at <= now {
        true
    } else if cancel_job.done_at - now <= timeout {
        thread::sleep(cancel_job.done_at - now);
        true
    } else {
        thread::sleep(timeout);
        false
    };
    write_out(out, done);
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn cancel_job_is_done(
    ctx: *mut c_void,
    cancel_job: *mut c_void,
    out: *mut bool,
) -> RawRc {
    let Some(cancel_job) = cancel_job_ref(cancel_job) else {
        return fail(ctx, ReturnCode::FFI_ARG1_ERROR, "cancel_job is null", None);
    };
    require_out!(ctx, out, 2);
    write_out(out, Instant::now() >= cancel_job.done_at);
    succeed(ctx)
}

pub(crate) unsafe extern "C" fn cancel_job_dispose(cancel_job: *mut c_void) {
    if cancel_job.is_null() {
        return;
    }
    let cancel_job = Box::from_raw(cancel_job as *mut SimCancelJob);
    if let Some(probe) = &cancel_job.probe {
        probe.record();
    }
}
