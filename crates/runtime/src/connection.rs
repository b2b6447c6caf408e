//! Shared context for one authenticated web service session.

use serde_json::{Value, json};

use crate::error::Result;
use crate::transport::Transport;
use vbx_protocol::ObjectRef;

/// Connection every managed object reference of a session points through.
///
/// A reference string is only meaningful against the connection that
/// produced it, so entity types hold the connection behind an `Arc` and
/// route every operation here. The connection itself is stateless beyond
/// its transport; dropping it releases nothing on the service side.
pub struct Connection {
    transport: Box<dyn Transport>,
}

impl Connection {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Executes one named operation against the service.
    pub async fn invoke(&self, operation: &str, request: Value) -> Result<Value> {
        tracing::debug!(target: "vbx::rpc", operation, "invoke");
        self.transport.invoke(operation, request).await
    }

    /// Releases a managed object reference held by the session.
    ///
    /// The reference is dangling afterwards; a later operation through it
    /// fails on the service side.
    pub async fn release(&self, object_ref: &ObjectRef) -> Result<()> {
        let request = json!({ "_this": object_ref });
        self.invoke("IManagedObjectRef_release", request).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
