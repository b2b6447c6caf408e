//! Token for a long-running service-side operation.

use vbx_protocol::ObjectRef;
use vbx_runtime::{Channel, Result};

/// Reference to an asynchronous operation running inside the service.
///
/// The client does not wait on or poll the operation; the token exists so
/// the caller can release the reference once the operation is no longer of
/// interest.
pub struct Progress {
    channel: Channel,
}

impl Progress {
    pub(crate) fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Releases the progress reference, consuming the token.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
