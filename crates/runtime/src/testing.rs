//! Scripted transport for exercising the client without a live service.

use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::Error;
use crate::transport::{InvokeFuture, Transport};
use vbx_protocol::wire;

enum Outcome {
    Respond(Value),
    Fault { code: Option<String>, message: String },
}

#[derive(Default)]
struct State {
    scripted: HashMap<String, VecDeque<Outcome>>,
    calls: Vec<(String, Value)>,
}

/// Transport double driven by canned outcomes.
///
/// Outcomes are scripted per operation name and consumed in FIFO order;
/// a call with no outcome left fails with a transport error. Every call
/// is recorded first, so assertions see the request even when it was
/// unscripted. Clones share state: keep one handle for scripting and
/// assertions, hand another to the connection.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the full response body for the next call of `operation`.
    pub fn respond(&self, operation: &str, response: Value) {
        self.push(operation, Outcome::Respond(response));
    }

    /// Scripts a response whose body is a lone `returnval` element.
    pub fn respond_returnval(&self, operation: &str, returnval: impl Into<Value>) {
        self.push(
            operation,
            Outcome::Respond(json!({ "returnval": returnval.into() })),
        );
    }

    /// Scripts an empty (void) response.
    pub fn respond_ok(&self, operation: &str) {
        self.push(operation, Outcome::Respond(json!({})));
    }

    /// Scripts a fault, with an optional COM result code in any of the
    /// wire spellings.
    pub fn fail(&self, operation: &str, code: Option<&str>, message: &str) {
        self.push(
            operation,
            Outcome::Fault {
                code: code.map(wire::normalize_result_code),
                message: message.to_owned(),
            },
        );
    }

    fn push(&self, operation: &str, outcome: Outcome) {
        self.state
            .lock()
            .scripted
            .entry(operation.to_owned())
            .or_default()
            .push_back(outcome);
    }

    /// Every `(operation, request)` pair seen, in call order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().calls.clone()
    }

    /// Operation names only, in call order.
    pub fn operations(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .map(|(operation, _)| operation.clone())
            .collect()
    }

    /// Number of calls recorded for `operation`.
    pub fn calls_for(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(recorded, _)| recorded == operation)
            .count()
    }

    /// Request payloads recorded for `operation`, in call order.
    pub fn requests_for(&self, operation: &str) -> Vec<Value> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(recorded, _)| recorded == operation)
            .map(|(_, request)| request.clone())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn invoke(&self, operation: &str, request: Value) -> InvokeFuture<'_> {
        let outcome = {
            let mut state = self.state.lock();
            state.calls.push((operation.to_owned(), request));
            state
                .scripted
                .get_mut(operation)
                .and_then(VecDeque::pop_front)
        };
        let operation = operation.to_owned();
        Box::pin(async move {
            match outcome {
                Some(Outcome::Respond(value)) => Ok(value),
                Some(Outcome::Fault { code, message }) => Err(Error::RemoteCall {
                    operation,
                    code,
                    message,
                }),
                None => Err(Error::transport(&operation, "no scripted response")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outcomes_are_consumed_in_fifo_order() {
        let transport = ScriptedTransport::new();
        transport.respond_returnval("IMachine_getName", "first");
        transport.respond_returnval("IMachine_getName", "second");

        let a = transport.invoke("IMachine_getName", json!({})).await.unwrap();
        let b = transport.invoke("IMachine_getName", json!({})).await.unwrap();
        assert_eq!(a["returnval"], "first");
        assert_eq!(b["returnval"], "second");
    }

    #[tokio::test]
    async fn scripted_fault_carries_normalized_code() {
        let transport = ScriptedTransport::new();
        transport.fail("IVirtualBox_findMachine", Some("0x80BB0001"), "no such machine");

        let err = transport
            .invoke("IVirtualBox_findMachine", json!({}))
            .await
            .unwrap_err();
        assert!(err.is_object_not_found());
    }

    #[tokio::test]
    async fn unscripted_operations_fail_but_are_recorded() {
        let transport = ScriptedTransport::new();

        let err = transport
            .invoke("IMachine_getName", json!({ "_this": "m-1" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "{err}");
        assert_eq!(transport.calls_for("IMachine_getName"), 1);
        assert_eq!(transport.operations(), ["IMachine_getName"]);
    }
}
