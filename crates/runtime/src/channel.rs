//! Typed request helper bound to one managed object reference.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::{Error, Result};
use vbx_protocol::ObjectRef;
use vbx_protocol::wire::Returnval;

/// Channel couples a managed object reference with the connection that
/// minted it.
///
/// Entity types call through their channel; the `_this` parameter the
/// service expects on every interface operation is injected here, ahead
/// of the caller's parameters, so call sites only name the operation and
/// its own arguments.
#[derive(Clone)]
pub struct Channel {
    object_ref: ObjectRef,
    connection: Arc<Connection>,
}

impl Channel {
    pub fn new(object_ref: ObjectRef, connection: Arc<Connection>) -> Self {
        Self {
            object_ref,
            connection,
        }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        &self.object_ref
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Sends `operation` with `_this` plus `params`, deserializing the
    /// whole response body into `R`.
    ///
    /// `params` must serialize to a JSON object (or `null` for none);
    /// field order is preserved into the request, which the transport
    /// relies on for the ordered parameter sequence.
    pub async fn send<P, R>(&self, operation: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let mut request = Map::new();
        request.insert(
            "_this".to_owned(),
            Value::String(self.object_ref.as_str().to_owned()),
        );
        match params {
            Value::Null => {}
            Value::Object(fields) => request.extend(fields),
            _ => {
                return Err(Error::envelope(
                    operation,
                    "parameters must serialize to an object",
                ));
            }
        }

        let response = self
            .connection
            .invoke(operation, Value::Object(request))
            .await?;
        serde_json::from_value(response).map_err(|err| Error::envelope(operation, err))
    }

    /// Sends an operation whose result is the single `returnval` element.
    pub async fn send_returnval<P, T>(&self, operation: &str, params: P) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let response: Returnval<T> = self.send(operation, params).await?;
        Ok(response.returnval)
    }

    /// Sends an operation and discards its (typically empty) response.
    pub async fn send_no_result<P: Serialize>(&self, operation: &str, params: P) -> Result<()> {
        let _: Value = self.send(operation, params).await?;
        Ok(())
    }

    /// Fetches the `returnval` of a no-argument operation.
    pub async fn fetch<T: DeserializeOwned>(&self, operation: &str) -> Result<T> {
        self.send_returnval(operation, Value::Null).await
    }

    /// Releases the underlying reference.
    pub async fn release(&self) -> Result<()> {
        self.connection.release(&self.object_ref).await
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("object_ref", &self.object_ref)
            .finish_non_exhaustive()
    }
}
