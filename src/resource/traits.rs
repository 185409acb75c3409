/*!
 * Native Object Traits
 *
 * Common lifecycle surface of every wrapper built on a `NativeResource`
 */

use super::native::NativeResource;
use crate::core::{BridgeResult, ResourceId, ResourceKind};

/// Wrapper owning exactly one native handle
///
/// Implementors only expose their resource; lifecycle queries and release
/// come for free. Wrappers with extra native teardown steps override
/// `dispose`.
pub trait NativeObject {
    fn resource(&self) -> &NativeResource;

    /// Resource category, for logging and errors
    fn kind(&self) -> ResourceKind {
        self.resource().kind()
    }

    fn resource_id(&self) -> ResourceId {
        self.resource().id()
    }

    fn is_closed(&self) -> bool {
        self.resource().is_closed()
    }

    /// Release the native object; repeated calls are no-ops
    fn dispose(&self) -> BridgeResult<()> {
        self.resource().close()
    }
}

impl NativeObject for NativeResource {
    fn resource(&self) -> &NativeResource {
        self
    }
}
