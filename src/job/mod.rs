/*!
 * Job Bridge
 *
 * Native asynchronous operations exposed as blocking, bounded, polling and
 * cancellable calls with single consumption of the result.
 */

mod async_job;
mod cancel;
mod value;

pub use async_job::{AsyncJob, Converter, VoidJob};
pub use cancel::CancellationHandle;
pub use value::TakenValue;
