//! Transport seam between the connection and the wire encoding.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Future type returned by [`Transport::invoke`].
pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// Executes single named operations against the web service.
///
/// `request` is the operation's parameter struct as a JSON object, in
/// declared parameter order; the returned value is the response body with
/// element text as strings and repeated elements collapsed into arrays.
/// A SOAP fault surfaces as [`Error::RemoteCall`](crate::Error::RemoteCall).
///
/// The trait is dyn-compatible so a [`Connection`](crate::Connection) can
/// hold `Box<dyn Transport>`; implementors return boxed futures instead of
/// using `async fn`.
pub trait Transport: Send + Sync {
    fn invoke(&self, operation: &str, request: Value) -> InvokeFuture<'_>;
}
