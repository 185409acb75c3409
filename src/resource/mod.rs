/*!
 * Native Resource Lifecycle
 *
 * Exactly-once release of native handles under concurrent access.
 *
 * ## Design Principles
 *
 * 1. **Exclusive ownership**: one wrapper per handle, never copied
 * 2. **Drop first**: wrappers release themselves when dropped
 * 3. **Scoped backstop**: the manager releases whatever is still registered
 * 4. **Aggregated teardown**: every release is attempted before reporting
 *
 * ## Example
 *
 * ```rust,ignore
 * let manager = ResourceManager::create();
 * let context = ErrorContext::create(&library, &manager)?;
 * let job = AsyncJob::void(&library, &manager, handle)?;
 * job.take(Some(&context))?;
 * manager.close()?; // releases `context` and `job` if still open
 * ```
 */

mod manager;
mod native;
mod region;
mod stats;
mod traits;

pub use manager::ResourceManager;
pub use native::{NativeResource, Releaser};
pub use region::Scratch;
pub use stats::TeardownStats;
pub use traits::NativeObject;

pub(crate) use manager::ManagerInner;
